use image::RgbImage;
use log::{debug, info, warn};
use serde_json::json;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

use crate::{
    classify::BURNT,
    components::{backends::tiff_backend, raster::Grid},
    errors::Result,
    footprint::BurntRegion,
    geojson::{Feature, FeatureCollection, Geometry},
    render::save_png,
};

pub const RBR_ARTIFACT: &str = "rbr.tif";
pub const CLASSES_ARTIFACT: &str = "rbr_reclassified.tif";
pub const FOOTPRINT_ARTIFACT: &str = "burnt_areas.geojson";
pub const MAP_ARTIFACT: &str = "fire_severity_classification.png";
pub const RBR_PREVIEW_ARTIFACT: &str = "rbr_preview.png";

/// Artifacts written next to `output_dir` and moved into it on [ArtifactStage::commit].
///
/// Dropping an uncommitted stage removes everything written to it.
#[derive(Debug)]
pub struct ArtifactStage {
    staging: TempDir,
    output_dir: PathBuf,
    staged: Vec<String>,
}

impl ArtifactStage {
    pub fn new(output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(output_dir)?;
        Ok(Self {
            staging,
            output_dir: output_dir.to_path_buf(),
            staged: Vec::new(),
        })
    }

    fn stage(&mut self, name: &str) -> PathBuf {
        self.staged.push(name.to_string());
        self.staging.path().join(name)
    }

    pub fn float_grid(&mut self, name: &str, grid: &Grid<f32>) -> Result<()> {
        tiff_backend::write_float_grid(grid, &self.stage(name))
    }

    pub fn class_grid(&mut self, name: &str, grid: &Grid<u8>) -> Result<()> {
        tiff_backend::write_byte_grid(grid, &self.stage(name), None)
    }

    pub fn footprint(&mut self, name: &str, regions: &[BurntRegion]) -> Result<()> {
        write_geojson(&footprint_collection(regions), &self.stage(name))
    }

    pub fn png(&mut self, name: &str, image: &RgbImage) -> Result<()> {
        save_png(image, &self.stage(name))
    }

    /// Moves every staged artifact into the output directory, replacing
    /// existing files of the same name.
    ///
    /// On failure the artifacts already moved are removed and the files they
    /// replaced are put back.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        let previous = tempfile::Builder::new()
            .prefix(".previous-")
            .tempdir_in(&self.output_dir)?;
        let mut committed = Vec::with_capacity(self.staged.len());
        let mut displaced = Vec::new();
        for name in &self.staged {
            let target = self.output_dir.join(name);
            if let Err(error) = self.swap_in(name, &target, previous.path(), &mut displaced) {
                warn!("could not commit {}, restoring previous outputs", target.display());
                self.roll_back(&committed, &displaced, previous.path());
                return Err(error);
            }
            debug!("committed {}", target.display());
            committed.push(target);
        }
        previous.close()?;
        self.staging.close()?;
        info!(
            "{} artifacts written to {}",
            committed.len(),
            self.output_dir.display()
        );
        Ok(committed)
    }

    /// Moves an existing `target` aside into `previous`, then the staged file onto it.
    fn swap_in(
        &self,
        name: &str,
        target: &Path,
        previous: &Path,
        displaced: &mut Vec<String>,
    ) -> Result<()> {
        if target.exists() {
            fs::rename(target, previous.join(name))?;
            displaced.push(name.to_string());
        }
        fs::rename(self.staging.path().join(name), target)?;
        Ok(())
    }

    fn roll_back(&self, committed: &[PathBuf], displaced: &[String], previous: &Path) {
        for target in committed {
            if let Err(error) = fs::remove_file(target) {
                warn!("could not remove {}: {error}", target.display());
            }
        }
        for name in displaced {
            let target = self.output_dir.join(name);
            if let Err(error) = fs::rename(previous.join(name), &target) {
                warn!("could not restore {}: {error}", target.display());
            }
        }
    }
}

/// One feature per burnt region.
pub fn footprint_collection(regions: &[BurntRegion]) -> FeatureCollection {
    FeatureCollection::new(
        regions
            .iter()
            .map(|region| {
                Feature::new(
                    region.id,
                    Geometry::from(&region.polygon),
                    json!({
                        "id": region.id,
                        "gridcode": BURNT,
                        "cells": region.cells,
                        "area_ha": region.area_ha,
                    }),
                )
            })
            .collect(),
    )
}

pub fn write_geojson(collection: &FeatureCollection, path: &Path) -> Result<()> {
    serde_json::to_writer(BufWriter::new(File::create(path)?), collection)?;
    info!("wrote {}", path.display());
    Ok(())
}
