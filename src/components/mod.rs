pub mod backends;
pub mod band;
pub mod bounds;
pub mod file;
pub mod raster;
pub mod transforms;
pub mod view;

pub use band::{BandId, TileEntry};
pub use bounds::{GeoBounds, PixelBounds};
pub use file::TileFile;
pub use raster::{Grid, Raster};
pub use transforms::GeoTransform;

use std::fmt::Debug;

/// Cell value of a raster.
pub trait DataType: Copy + Debug + Send + Sync + 'static {}
impl<T: Copy + Debug + Send + Sync + 'static> DataType for T {}
