pub mod resample;

use log::debug;
use ndarray::Array2;

use crate::{
    components::{
        bounds::PixelBounds, file::TileFile, transforms::GeoTransform,
        view::resample::resample_bilinear,
    },
    errors::{InputDataError, Result},
};

/// Target window of a band read: a `(rows, cols)` grid on `transform`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub transform: GeoTransform,
    pub shape: (usize, usize),
}

impl View {
    pub fn new(transform: GeoTransform, shape: (usize, usize)) -> Self {
        Self { transform, shape }
    }

    /// Reads `tile` onto this view.
    ///
    /// Tiles on the view's grid are read directly, any other resolution is
    /// resampled bilinearly at the view's cell centres.
    pub fn read(&self, tile: &dyn TileFile) -> Result<Array2<f32>> {
        let bounds = self.transform.bounds(self.shape);
        let window = tile
            .transform()
            .window(&bounds, tile.shape())
            .ok_or(InputDataError::NoIntersection)?;

        if window.array_shape() == self.shape
            && tile.transform().shifted(&window).same_grid(&self.transform)
        {
            debug!("direct read {window:?} of {}", tile.path().display());
            return tile.read_window(&window);
        }

        // one cell of margin so edge centres interpolate across the window
        let window = pad(&window, 1, tile.shape());
        debug!("resampling {window:?} of {}", tile.path().display());
        let source = tile.read_window(&window)?;
        Ok(resample_bilinear(
            source.view(),
            &tile.transform().shifted(&window),
            &self.transform,
            self.shape,
        ))
    }
}

/// Grows `window` by `margin` cells on every side, within `(rows, cols)`.
fn pad(window: &PixelBounds, margin: usize, shape: (usize, usize)) -> PixelBounds {
    let (rows, cols) = shape;
    let offset = window.offset();
    let (height, width) = window.array_shape();
    let col = offset.x.saturating_sub(margin);
    let row = offset.y.saturating_sub(margin);
    let col_end = (offset.x + width + margin).min(cols);
    let row_end = (offset.y + height + margin).min(rows);
    PixelBounds::new((col, row), (col_end - col, row_end - row))
}
