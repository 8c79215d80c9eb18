pub mod grid;

use log::info;
use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};
use std::fmt::Debug;

use crate::{
    components::{band::BandId, bounds::GeoBounds, transforms::GeoTransform, DataType},
    errors::{BurnscarError, InputDataError, Result},
};

pub use grid::Grid;

/// Collection of bands that share size,
/// resolution and extent.
///
/// Data is (C, H, W), one channel per entry of `bands`.
#[derive(Clone)]
pub struct Raster<T: DataType> {
    data: Array3<T>,
    transform: GeoTransform,
    bands: Box<[BandId]>,
}

impl<T: DataType> Debug for Raster<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let f = &mut f.debug_struct("Raster");
        f.field("geo_bounds", &self.bounds())
            .field("shape", &self.shape())
            .field("bands", &self.bands)
            .finish()
    }
}

impl<T: DataType> Raster<T> {
    fn init(data: Array3<T>, transform: GeoTransform, bands: Box<[BandId]>) -> Self {
        let raster = Self {
            data,
            transform,
            bands,
        };
        info!("new {raster:?}");
        raster
    }

    pub fn new(data: Array3<T>, transform: GeoTransform, bands: Vec<BandId>) -> Result<Self> {
        let found = data.len_of(Axis(0));
        if found != bands.len() {
            Err(InputDataError::BandCountMismatch {
                expected: bands.len(),
                found,
            })?
        }
        Ok(Self::init(data, transform, bands.into()))
    }

    /// Stacks equally shaped bands, in order.
    pub fn stack(
        bands: Vec<(BandId, Array2<T>)>,
        transform: GeoTransform,
    ) -> Result<Self> {
        let (ids, arrays): (Vec<BandId>, Vec<Array2<T>>) = bands.into_iter().unzip();
        let views: Vec<ArrayView2<T>> = arrays.iter().map(Array2::view).collect();
        let data = ndarray::stack(Axis(0), &views)?;
        Self::new(data, transform, ids)
    }

    pub fn bands(&self) -> &[BandId] {
        &self.bands
    }

    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        let (_, rows, cols) = self.data.dim();
        (rows, cols)
    }

    pub fn bounds(&self) -> GeoBounds {
        self.transform.bounds(self.shape())
    }

    fn band_index(&self, band: &BandId) -> Result<usize> {
        self.bands
            .iter()
            .position(|id| id == band)
            .ok_or_else(|| InputDataError::BandNotInComposite(band.clone()).into())
    }

    pub fn band(&self, band: &BandId) -> Result<ArrayView2<'_, T>> {
        Ok(self.data.index_axis(Axis(0), self.band_index(band)?))
    }

    /// Sets every band of the cells flagged in `mask` to `value`.
    pub fn mask_cells(&mut self, mask: ArrayView2<bool>, value: T) -> Result<()> {
        if mask.dim() != self.shape() {
            return Err(BurnscarError::GridMismatch(format!(
                "mask {:?} vs raster {:?}",
                mask.dim(),
                self.shape()
            )));
        }
        Zip::from(self.data.lanes_mut(Axis(0)))
            .and(mask)
            .for_each(|mut lane, &masked| {
                if masked {
                    lane.fill(value)
                }
            });
        Ok(())
    }
}
