use log::{info, warn};
use std::{
    fmt::Display,
    marker::PhantomData,
    path::PathBuf,
};

use crate::{
    align::align,
    archive::Workspace,
    boundary::StudyArea,
    classify::{burnt_mask, ClassCounts, SeverityTable, BURNT},
    components::{backends::tiff_backend::write_float_grid, raster::Grid},
    config::PipelineConfig,
    errors::{BurnscarError, InputDataError, Result},
    export::{
        ArtifactStage, CLASSES_ARTIFACT, FOOTPRINT_ARTIFACT, MAP_ARTIFACT, RBR_ARTIFACT,
        RBR_PREVIEW_ARTIFACT,
    },
    footprint::{burnt_area_hectares, polygonize},
    indices::{self, mask_water, nbr},
    render::{rbr_preview, save_png, severity_map},
    sensors::Sensor,
    stats::RasterSummary,
};

/// Steps of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Extraction,
    Alignment,
    WaterMask,
    BurnRatio,
    RelativizedChange,
    Classification,
    Footprint,
    Reporting,
    Export,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Extraction => "archive extraction",
            Self::Alignment => "band alignment",
            Self::WaterMask => "water masking",
            Self::BurnRatio => "burn ratio",
            Self::RelativizedChange => "relativized burn ratio",
            Self::Classification => "severity classification",
            Self::Footprint => "burnt footprint",
            Self::Reporting => "reporting",
            Self::Export => "export",
        };
        f.write_str(name)
    }
}

/// A failed run: the stage it stopped at and why.
#[derive(thiserror::Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: BurnscarError,
}

impl PipelineError {
    /// Whether the operator can fix this by changing the inputs.
    pub fn is_input_error(&self) -> bool {
        self.source.is_input_error()
    }

    pub fn remediation(&self) -> Option<&'static str> {
        match &self.source {
            BurnscarError::InputData(error) => Some(error.remediation()),
            BurnscarError::Zip(_) => Some("check that the archives are complete zip files"),
            _ => None,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Tags a result with the stage that produced it.
pub trait StageContext<T> {
    fn stage(self, stage: Stage) -> PipelineResult<T>;
}

impl<T, E: Into<BurnscarError>> StageContext<T> for std::result::Result<T, E> {
    fn stage(self, stage: Stage) -> PipelineResult<T> {
        self.map_err(|source| PipelineError {
            stage,
            source: source.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inputs {
    pub pre_fire: PathBuf,
    pub post_fire: PathBuf,
    pub boundary: PathBuf,
}

/// What the operator inspects before picking a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct RbrReview {
    /// Relativized burn ratio GeoTIFF in the run workspace.
    pub raster: PathBuf,
    pub preview: PathBuf,
    pub summary: RasterSummary,
}

/// Supplies the severity threshold once the relativized burn ratio is ready.
pub trait ThresholdSource {
    fn threshold(&mut self, review: &RbrReview) -> Result<f64>;
}

impl<F: FnMut(&RbrReview) -> Result<f64>> ThresholdSource for F {
    fn threshold(&mut self, review: &RbrReview) -> Result<f64> {
        self(review)
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub threshold: f32,
    pub burnt_area_ha: f64,
    pub class_counts: ClassCounts,
    pub regions: usize,
    pub artifacts: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct Pipeline<S: Sensor> {
    config: PipelineConfig,
    sensor: PhantomData<S>,
}

impl<S: Sensor> Pipeline<S> {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sensor: PhantomData,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extracts, aligns and masks both scenes and computes the relativized
    /// burn ratio, stopping where a threshold is needed.
    pub fn prepare(&self, inputs: &Inputs) -> PipelineResult<PreparedRun> {
        let area = StudyArea::open(&inputs.boundary).stage(Stage::Alignment)?;
        let workspace = Workspace::create(&self.config.workspace).stage(Stage::Extraction)?;
        let pre_dir = workspace
            .extract(&inputs.pre_fire, "pre_fire")
            .stage(Stage::Extraction)?;
        let post_dir = workspace
            .extract(&inputs.post_fire, "post_fire")
            .stage(Stage::Extraction)?;

        info!("aligning {} scenes", S::NAME);
        let mut pre = align::<S>(&pre_dir, &area, self.config.clip).stage(Stage::Alignment)?;
        let mut post = align::<S>(&post_dir, &area, self.config.clip).stage(Stage::Alignment)?;
        if pre.shape() != post.shape() || !pre.transform().same_grid(post.transform()) {
            return Err(InputDataError::ScenesMisaligned).stage(Stage::Alignment);
        }

        let roles = S::roles();
        for (name, scene) in [("pre-fire", &mut pre), ("post-fire", &mut post)] {
            let masked = mask_water(scene, &roles).stage(Stage::WaterMask)?;
            let (rows, cols) = scene.shape();
            if masked == rows * cols {
                warn!("every {name} cell is water or no-data");
            }
        }

        let pre_nbr = nbr(&pre, &roles).stage(Stage::BurnRatio)?;
        let post_nbr = nbr(&post, &roles).stage(Stage::BurnRatio)?;
        drop((pre, post));
        let rbr = indices::rbr(&pre_nbr, &post_nbr).stage(Stage::RelativizedChange)?;
        info!("relativized burn ratio ready {rbr:?}");

        let summary = RasterSummary::from_grid(&rbr);
        let review_dir = workspace.review_dir().stage(Stage::Reporting)?;
        let review = RbrReview {
            raster: review_dir.join(RBR_ARTIFACT),
            preview: review_dir.join(RBR_PREVIEW_ARTIFACT),
            summary,
        };
        write_float_grid(&rbr, &review.raster).stage(Stage::Reporting)?;
        save_png(
            &rbr_preview(&rbr, &review.summary, &self.config.render),
            &review.preview,
        )
        .stage(Stage::Reporting)?;

        Ok(PreparedRun {
            workspace,
            rbr,
            review,
            config: self.config.clone(),
        })
    }

    /// Both phases, asking `source` for the threshold in between.
    pub fn run(
        &self,
        inputs: &Inputs,
        source: &mut impl ThresholdSource,
    ) -> PipelineResult<Outcome> {
        let prepared = self.prepare(inputs)?;
        let threshold = source
            .threshold(prepared.review())
            .stage(Stage::Classification)?;
        prepared.finish(threshold)
    }
}

/// A run paused for its threshold. Owns the run workspace.
#[derive(Debug)]
pub struct PreparedRun {
    workspace: Workspace,
    rbr: Grid<f32>,
    review: RbrReview,
    config: PipelineConfig,
}

impl PreparedRun {
    pub fn review(&self) -> &RbrReview {
        &self.review
    }

    pub fn rbr(&self) -> &Grid<f32> {
        &self.rbr
    }

    /// Classifies with `threshold`, writes every artifact and removes the workspace.
    pub fn finish(self, threshold: f64) -> PipelineResult<Outcome> {
        let table = SeverityTable::new(threshold).stage(Stage::Classification)?;
        let classes = table.reclassify(&self.rbr);
        let class_counts = ClassCounts::from_grid(&classes);

        let burnt_area_ha = burnt_area_hectares(&classes);
        let regions = polygonize(&burnt_mask(&classes), BURNT);
        info!("burnt area {burnt_area_ha:.2} ha in {} regions", regions.len());

        let map = severity_map(&classes, burnt_area_ha, &self.config.render);

        let mut stage = ArtifactStage::new(&self.config.output_dir).stage(Stage::Export)?;
        stage.float_grid(RBR_ARTIFACT, &self.rbr).stage(Stage::Export)?;
        stage
            .class_grid(CLASSES_ARTIFACT, &classes)
            .stage(Stage::Export)?;
        stage
            .footprint(FOOTPRINT_ARTIFACT, &regions)
            .stage(Stage::Footprint)?;
        stage.png(MAP_ARTIFACT, &map).stage(Stage::Reporting)?;
        let artifacts = stage.commit().stage(Stage::Export)?;
        self.workspace.close().stage(Stage::Export)?;

        Ok(Outcome {
            threshold: table.threshold(),
            burnt_area_ha,
            class_counts,
            regions: regions.len(),
            artifacts,
        })
    }

    /// Drops the run and its workspace without writing artifacts.
    pub fn abort(self) -> PipelineResult<()> {
        self.workspace.close().stage(Stage::Extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::Sentinel2;
    use rstest::rstest;

    #[rstest]
    fn stage_context_keeps_source() {
        let result: Result<()> = Err(InputDataError::NoIntersection.into());
        let error = result.stage(Stage::Alignment).unwrap_err();
        assert_eq!(error.stage, Stage::Alignment);
        assert!(error.is_input_error());
        assert!(error.remediation().is_some());
        assert_eq!(
            error.to_string(),
            "band alignment failed: the study area does not intersect the image extent"
        );
    }

    #[rstest]
    fn internal_errors_have_no_remediation() {
        let error = Err::<(), _>(BurnscarError::GridMismatch("a vs b".into()))
            .stage(Stage::RelativizedChange)
            .unwrap_err();
        assert!(!error.is_input_error());
        assert!(error.remediation().is_none());
    }

    #[rstest]
    fn invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.render.font_scale = 0;
        assert!(Pipeline::<Sentinel2>::new(config).is_err());
    }

    #[rstest]
    fn missing_boundary_fails_before_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            workspace: dir.path().join("work"),
            output_dir: dir.path().join("output"),
            ..Default::default()
        };
        let pipeline = Pipeline::<Sentinel2>::new(config).unwrap();
        let inputs = Inputs {
            pre_fire: dir.path().join("pre.zip"),
            post_fire: dir.path().join("post.zip"),
            boundary: dir.path().join("area.geojson"),
        };
        let error = pipeline.prepare(&inputs).unwrap_err();
        assert_eq!(error.stage, Stage::Alignment);
        assert!(error.is_input_error());
        assert!(!dir.path().join("work").exists());
    }
}
