use std::{fmt::Debug, path::Path};

use crate::{
    components::band::{BandId, TileEntry},
    errors::Result,
};

mod sentinel2;
pub use sentinel2::Sentinel2;

/// Bands the spectral indices read from a composite.
#[derive(Debug, Clone, PartialEq)]
pub struct BandRoles {
    pub green: BandId,
    pub nir: BandId,
    pub swir: BandId,
}

pub trait Sensor: Debug {
    const NAME: &'static str;

    /// Picks the composite's tiles among those found under `dir`,
    /// in composite order.
    fn select(entries: Vec<TileEntry>, dir: &Path) -> Result<Vec<TileEntry>>;

    fn roles() -> BandRoles;
}
