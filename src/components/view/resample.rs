use ndarray::{Array2, ArrayView2};

use crate::components::transforms::GeoTransform;

/// Bilinear sample of `source` at fractional pixel `(x, y)`, where integer
/// coordinates are cell centres.
///
/// Coordinates are clamped to the raster; any `NaN` neighbour gives `NaN`.
pub fn bilinear_interpolate(source: ArrayView2<f32>, x: f64, y: f64) -> f32 {
    let (rows, cols) = source.dim();
    if rows == 0 || cols == 0 {
        return f32::NAN;
    }
    let x = x.clamp(0., (cols - 1) as f64);
    let y = y.clamp(0., (rows - 1) as f64);
    let x1 = x.floor() as usize;
    let y1 = y.floor() as usize;
    let x2 = (x1 + 1).min(cols - 1);
    let y2 = (y1 + 1).min(rows - 1);
    let dx = x - x1 as f64;
    let dy = y - y1 as f64;

    let v11 = source[[y1, x1]] as f64;
    let v21 = source[[y1, x2]] as f64;
    let v12 = source[[y2, x1]] as f64;
    let v22 = source[[y2, x2]] as f64;
    if [v11, v21, v12, v22].iter().any(|value| value.is_nan()) {
        return f32::NAN;
    }

    let lerp = |a: f64, b: f64, t: f64| a + (b - a) * t;
    let v1 = lerp(v11, v21, dx);
    let v2 = lerp(v12, v22, dx);
    lerp(v1, v2, dy) as f32
}

/// Resamples `source` (on `source_transform`) onto the cell centres of a
/// `(rows, cols)` grid on `target`.
pub fn resample_bilinear(
    source: ArrayView2<f32>,
    source_transform: &GeoTransform,
    target: &GeoTransform,
    shape: (usize, usize),
) -> Array2<f32> {
    Array2::from_shape_fn(shape, |(row, col)| {
        let pixel = source_transform.geo_to_pixel(target.pixel_center(col, row));
        bilinear_interpolate(source, pixel.x - 0.5, pixel.y - 0.5)
    })
}
