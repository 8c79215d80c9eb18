use ndarray::{Array2, ArrayView2};
use std::fmt::Debug;

use crate::{
    components::{bounds::GeoBounds, transforms::GeoTransform, DataType},
    errors::{BurnscarError, Result},
};

/// Single band raster on a georeferenced grid.
#[derive(Clone, PartialEq)]
pub struct Grid<T: DataType> {
    data: Array2<T>,
    transform: GeoTransform,
}

impl<T: DataType> Debug for Grid<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("transform", &self.transform)
            .field("shape", &self.shape())
            .finish()
    }
}

impl<T: DataType> Grid<T> {
    pub fn new(data: Array2<T>, transform: GeoTransform) -> Self {
        Self { data, transform }
    }

    pub fn data(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn cell_count(&self) -> usize {
        self.data.len()
    }

    pub fn cell_width(&self) -> f64 {
        self.transform.cell_width()
    }

    pub fn bounds(&self) -> GeoBounds {
        self.transform.bounds(self.shape())
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        self.data.get((row, col)).copied()
    }

    /// Whether `other` has the same shape, extent and cell size.
    pub fn same_grid<U: DataType>(&self, other: &Grid<U>) -> bool {
        self.shape() == other.shape() && self.transform.same_grid(&other.transform)
    }

    /// Fails with [BurnscarError::GridMismatch] unless [Grid::same_grid].
    pub fn check_grid<U: DataType>(&self, other: &Grid<U>) -> Result<()> {
        if self.same_grid(other) {
            Ok(())
        } else {
            Err(BurnscarError::GridMismatch(format!(
                "{:?} vs {:?}",
                self, other
            )))
        }
    }

    /// Elementwise map onto the same grid.
    pub fn map<U: DataType>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            data: self.data.map(f),
            transform: self.transform,
        }
    }
}
