use ndarray::Array2;
use std::{fmt::Debug, path::Path};

use crate::{
    components::{
        bounds::{GeoBounds, PixelBounds},
        transforms::GeoTransform,
    },
    errors::Result,
};

/// Single band tile on disk.
pub trait TileFile: Debug {
    fn path(&self) -> &Path;
    /// (rows, cols)
    fn shape(&self) -> (usize, usize);
    fn transform(&self) -> &GeoTransform;
    fn nodata(&self) -> Option<f64>;
    /// Reads `window` as reflectance, with no-data cells as `NaN`.
    fn read_window(&self, window: &PixelBounds) -> Result<Array2<f32>>;

    fn bounds(&self) -> GeoBounds {
        self.transform().bounds(self.shape())
    }

    fn read(&self) -> Result<Array2<f32>> {
        self.read_window(&PixelBounds::full(self.shape()))
    }
}

/// Replaces `nodata` values with `NaN`.
pub(crate) fn mask_nodata(mut array: Array2<f32>, nodata: Option<f64>) -> Array2<f32> {
    if let Some(nodata) = nodata.filter(|nodata| !nodata.is_nan()) {
        let nodata = nodata as f32;
        array.mapv_inplace(|value| if value == nodata { f32::NAN } else { value });
    }
    array
}
