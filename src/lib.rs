pub mod align;
pub mod archive;
pub mod boundary;
pub mod classify;
pub mod components;
pub mod config;
pub mod errors;
pub mod export;
pub mod footprint;
pub mod geojson;
pub mod indices;
mod intersection;
pub mod pipeline;
pub mod render;
pub mod sensors;
pub mod stats;

pub use classify::{SeverityClass, SeverityTable};
pub use components::{Grid, Raster};
pub use config::{ClipMode, PipelineConfig};
pub use errors::{BurnscarError, InputDataError, Result};
pub use pipeline::{Inputs, Outcome, Pipeline, PipelineError, PreparedRun, RbrReview, Stage, ThresholdSource};
pub use sensors::{Sensor, Sentinel2};
