use std::path::PathBuf;

use crate::components::band::BandId;

pub type Result<T> = std::result::Result<T, BurnscarError>;

#[derive(thiserror::Error, Debug)]
pub enum BurnscarError {
    #[error(transparent)]
    InputData(#[from] InputDataError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("tiff error: {0}")]
    Tiff(#[from] tiff::TiffError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    NdarrayError(#[from] ndarray::ShapeError),
    #[cfg(feature = "gdal")]
    #[error(transparent)]
    GdalError(#[from] gdal::errors::GdalError),
    #[error("rasters do not share a grid: {0}")]
    GridMismatch(String),
}

impl BurnscarError {
    /// Whether the operator can fix this by changing what was supplied.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InputData(_) | Self::Zip(_))
    }
}

/// Failures caused by the supplied archives, boundary, threshold or configuration.
#[derive(thiserror::Error, Debug)]
pub enum InputDataError {
    #[error("input not found: {0}")]
    MissingInput(PathBuf),
    #[error("no band files found under {0}")]
    NoBands(PathBuf),
    #[error("band {band} not found under {dir}")]
    MissingBand { band: BandId, dir: PathBuf },
    #[error("band {0} is not part of the composite")]
    BandNotInComposite(BandId),
    #[error("band {band} found twice: {first} and {second}")]
    DuplicateBand {
        band: BandId,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("{0} is not on the same grid as the other bands of its resolution")]
    MisalignedBands(PathBuf),
    #[error("{0} has no usable north-up georeference")]
    MissingGeoreference(PathBuf),
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("invalid study area boundary: {0}")]
    InvalidBoundary(String),
    #[error("the study area does not intersect the image extent")]
    NoIntersection,
    #[error("pre-fire and post-fire scenes do not share a grid after clipping")]
    ScenesMisaligned,
    #[error("raster has {found} bands but {expected} band names")]
    BandCountMismatch { expected: usize, found: usize },
    #[error("threshold {0} is outside (-0.5, 0.269)")]
    InvalidThreshold(f64),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("no threshold was supplied")]
    Aborted,
}

impl InputDataError {
    /// Short hint shown to the operator next to the error.
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::MissingInput(_) => "check the archive and boundary paths",
            Self::NoBands(_) | Self::MissingBand { .. } | Self::DuplicateBand { .. } => {
                "supply a single-granule Sentinel-2 L2A archive with R10m bands and the R20m B12 band"
            }
            Self::MisalignedBands(_) | Self::MissingGeoreference(_) => {
                "check that the archive tiles are unmodified north-up products"
            }
            Self::UnsupportedFormat(_) => {
                "use GeoTIFF tiles and a GeoJSON boundary, or build with the `gdal` feature"
            }
            Self::InvalidBoundary(_) => "supply a GeoJSON polygon or multipolygon boundary",
            Self::NoIntersection => {
                "make sure the boundary lies inside the image and uses the imagery's CRS"
            }
            Self::ScenesMisaligned => "use pre-fire and post-fire captures of the same tile",
            Self::BandCountMismatch { .. } | Self::BandNotInComposite(_) => {
                "check that every band tile was extracted"
            }
            Self::InvalidThreshold(_) => {
                "pick a threshold above -0.5 and below 0.269 after inspecting the RBR raster"
            }
            Self::InvalidConfig(_) => "fix the configuration file or flags",
            Self::Aborted => "rerun and enter a threshold when prompted",
        }
    }
}
