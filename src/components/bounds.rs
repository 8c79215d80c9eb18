use geo::{Coord, CoordNum, Rect};
use shrinkwraprs::Shrinkwrap;

use crate::{errors::Result, intersection::Intersection};

pub trait Bounds {
    type T: CoordNum;

    fn rect(&self) -> &Rect<Self::T>;

    /// (width, height)
    fn shape(&self) -> Coord<Self::T> {
        self.rect().max() - self.rect().min()
    }
}

/// Extent in map space, in the raster's crs.
#[derive(Shrinkwrap, Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds(Rect<f64>);

impl Bounds for GeoBounds {
    type T = f64;
    fn rect(&self) -> &Rect<f64> {
        &self.0
    }
}

impl Intersection for GeoBounds {
    type Output = GeoBounds;
    fn intersection(&self, rhs: &Self) -> Result<Self::Output> {
        Ok(GeoBounds(self.0.intersection(&rhs.0)?))
    }
}

impl From<Rect<f64>> for GeoBounds {
    fn from(value: Rect<f64>) -> Self {
        Self(value)
    }
}

/// Pixel window of a raster.
///
/// Deffined by:
///     - `offset`: (col, row) of the top left pixel,
///         with origin at top left pixel of raster.
///     - `shape`: (cols, rows).
///
/// In underlaying impl `offset` is given by `.min`,
/// and `shape` by `(.width, .height)`.
#[derive(Shrinkwrap, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBounds(Rect<usize>);

impl Bounds for PixelBounds {
    type T = usize;
    fn rect(&self) -> &Rect<usize> {
        &self.0
    }
}

impl PixelBounds {
    pub fn new(offset: (usize, usize), shape: (usize, usize)) -> Self {
        let offset = Coord::from(offset);
        let max = offset + Coord::from(shape);
        Self(Rect::new(offset, max))
    }

    /// Window covering a whole `(rows, cols)` raster.
    pub fn full(shape: (usize, usize)) -> Self {
        Self::new((0, 0), (shape.1, shape.0))
    }

    /// Coords of the top left pixel of the window.
    pub fn offset(&self) -> Coord<usize> {
        self.0.min()
    }

    pub fn shape(&self) -> Coord<usize> {
        Coord {
            x: self.0.width(),
            y: self.0.height(),
        }
    }

    /// ndarray ordering, (rows, cols).
    pub fn array_shape(&self) -> (usize, usize) {
        (self.0.height(), self.0.width())
    }

    /// Whether the window lies inside a `(rows, cols)` raster.
    pub fn fits(&self, shape: (usize, usize)) -> bool {
        self.0.max().y <= shape.0 && self.0.max().x <= shape.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pixel_bounds_shapes() {
        let window = PixelBounds::new((2, 1), (4, 3));
        assert_eq!(window.offset(), Coord { x: 2, y: 1 });
        assert_eq!(window.shape(), Coord { x: 4, y: 3 });
        assert_eq!(Bounds::shape(&window), Coord { x: 4, y: 3 });
        assert_eq!(window.array_shape(), (3, 4));
        assert!(window.fits((4, 6)));
        assert!(!window.fits((3, 6)));
    }

    #[rstest]
    fn geo_bounds_intersect() {
        let lhs = GeoBounds::from(Rect::new(Coord { x: 0., y: 0. }, Coord { x: 20., y: 5. }));
        let rhs = GeoBounds::from(Rect::new(Coord { x: 10., y: 2. }, Coord { x: 30., y: 9. }));
        assert_eq!(
            lhs.intersection(&rhs).unwrap(),
            GeoBounds::from(Rect::new(Coord { x: 10., y: 2. }, Coord { x: 20., y: 5. }))
        );
    }
}
