use geo::{AffineTransform, Coord, Rect};
use shrinkwraprs::Shrinkwrap;

use crate::components::bounds::{GeoBounds, PixelBounds};

const GRID_TOLERANCE: f64 = 1e-6;

/// North-up pixel to map transform of a raster.
///
/// Pixel `(col, row)` corner maps to `(xoff + col * a, yoff + row * e)`;
/// `e` is negative for north-up rasters.
#[derive(Shrinkwrap, Clone, Copy, Debug, PartialEq)]
pub struct GeoTransform(AffineTransform);

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, cell_width: f64, cell_height: f64) -> Self {
        Self(AffineTransform::new(
            cell_width, 0., origin_x, 0., cell_height, origin_y,
        ))
    }

    /// From `[origin_x, a, b, origin_y, d, e]`, the gdal ordering.
    ///
    /// Returns [None] for rotated or degenerate transforms.
    pub fn from_gdal(gdal_transform: [f64; 6]) -> Option<Self> {
        let [xoff, a, b, yoff, d, e] = gdal_transform;
        (b == 0. && d == 0. && a != 0. && e != 0.).then(|| Self::new(xoff, yoff, a, e))
    }

    pub fn origin(&self) -> Coord {
        Coord {
            x: self.xoff(),
            y: self.yoff(),
        }
    }

    /// Cell width, always positive.
    pub fn cell_width(&self) -> f64 {
        self.a().abs()
    }

    /// Cell height, always positive.
    pub fn cell_height(&self) -> f64 {
        self.e().abs()
    }

    pub fn pixel_to_geo(&self, col: f64, row: f64) -> Coord {
        self.apply(Coord { x: col, y: row })
    }

    pub fn pixel_center(&self, col: usize, row: usize) -> Coord {
        self.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional `(col, row)` of a map coordinate.
    pub fn geo_to_pixel(&self, coord: Coord) -> Coord {
        Coord {
            x: (coord.x - self.xoff()) / self.a(),
            y: (coord.y - self.yoff()) / self.e(),
        }
    }

    /// Map extent of a `(rows, cols)` raster on this grid.
    pub fn bounds(&self, shape: (usize, usize)) -> GeoBounds {
        let (rows, cols) = shape;
        GeoBounds::from(Rect::new(
            self.origin(),
            self.pixel_to_geo(cols as f64, rows as f64),
        ))
    }

    /// Transform of the sub-grid starting at `window`'s offset.
    pub fn shifted(&self, window: &PixelBounds) -> Self {
        let offset = window.offset();
        let origin = self.pixel_to_geo(offset.x as f64, offset.y as f64);
        Self::new(origin.x, origin.y, self.a(), self.e())
    }

    /// Smallest window of a `(rows, cols)` raster covering `bounds`.
    ///
    /// Snaps outward to whole cells and clamps to the raster.
    pub fn window(&self, bounds: &GeoBounds, shape: (usize, usize)) -> Option<PixelBounds> {
        let (rows, cols) = shape;
        let corner_a = self.geo_to_pixel(bounds.min());
        let corner_b = self.geo_to_pixel(bounds.max());
        let snap_min = |a: f64, b: f64| (a.min(b) + GRID_TOLERANCE).floor().max(0.);
        let snap_max = |a: f64, b: f64, limit: usize| {
            (a.max(b) - GRID_TOLERANCE).ceil().min(limit as f64)
        };
        let col_min = snap_min(corner_a.x, corner_b.x);
        let row_min = snap_min(corner_a.y, corner_b.y);
        let col_max = snap_max(corner_a.x, corner_b.x, cols);
        let row_max = snap_max(corner_a.y, corner_b.y, rows);
        if col_max <= col_min || row_max <= row_min {
            return None;
        }
        Some(PixelBounds::new(
            (col_min as usize, row_min as usize),
            ((col_max - col_min) as usize, (row_max - row_min) as usize),
        ))
    }

    /// Whether both transforms describe the same grid.
    ///
    /// Cell sizes are compared relative to their size, origins in cell units.
    pub fn same_grid(&self, other: &Self) -> bool {
        let close = |lhs: f64, rhs: f64| (lhs - rhs).abs() <= GRID_TOLERANCE * lhs.abs().max(1.);
        close(self.a(), other.a())
            && close(self.e(), other.e())
            && (self.xoff() - other.xoff()).abs() <= GRID_TOLERANCE * self.cell_width()
            && (self.yoff() - other.yoff()).abs() <= GRID_TOLERANCE * self.cell_height()
    }
}
