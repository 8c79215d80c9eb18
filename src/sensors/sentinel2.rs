use itertools::Itertools;
use log::debug;
use std::path::Path;

use crate::{
    components::band::{BandId, TileEntry},
    errors::{InputDataError, Result},
};

use super::{BandRoles, Sensor};

/// Resolution group every composite band is aligned to.
const COMPOSITE_RESOLUTION: u32 = 10;
/// SWIR band only shipped at 20 m.
const SWIR_BAND: &str = "B12";
const SWIR_RESOLUTION: u32 = 20;

#[derive(Debug)]
pub struct Sentinel2;

impl Sensor for Sentinel2 {
    const NAME: &'static str = "Sentinel-2";

    /// All 10 m bands by band id, then B12 from the 20 m group.
    fn select(entries: Vec<TileEntry>, dir: &Path) -> Result<Vec<TileEntry>> {
        if entries.is_empty() {
            Err(InputDataError::NoBands(dir.to_path_buf()))?
        }

        let fine = entries
            .iter()
            .filter(|entry| entry.resolution == COMPOSITE_RESOLUTION)
            .sorted_by(|lhs, rhs| lhs.band.cmp(&rhs.band))
            .cloned()
            .collect_vec();
        if fine.is_empty() {
            Err(InputDataError::NoBands(dir.to_path_buf()))?
        }
        check_unique(&fine)?;

        let swir_band = BandId::new(SWIR_BAND);
        let swir = entries
            .iter()
            .filter(|entry| entry.resolution == SWIR_RESOLUTION && entry.band == swir_band)
            .cloned()
            .collect_vec();
        check_unique(&swir)?;
        let swir = swir
            .into_iter()
            .next()
            .ok_or_else(|| InputDataError::MissingBand {
                band: swir_band,
                dir: dir.to_path_buf(),
            })?;

        let roles = Self::roles();
        for band in [roles.green, roles.nir] {
            if !fine.iter().any(|entry| entry.band == band) {
                Err(InputDataError::MissingBand {
                    band,
                    dir: dir.to_path_buf(),
                })?
            }
        }

        let selected = fine.into_iter().chain([swir]).collect_vec();
        debug!(
            "{} composite: {}",
            Self::NAME,
            selected.iter().map(|entry| &entry.band).join(", ")
        );
        Ok(selected)
    }

    fn roles() -> BandRoles {
        BandRoles {
            green: BandId::new("B03"),
            nir: BandId::new("B08"),
            swir: BandId::new(SWIR_BAND),
        }
    }
}

/// Fails on a band that appears twice in a sorted group.
fn check_unique(sorted: &[TileEntry]) -> Result<()> {
    match sorted
        .iter()
        .tuple_windows()
        .find(|(lhs, rhs)| lhs.band == rhs.band)
    {
        Some((first, second)) => Err(InputDataError::DuplicateBand {
            band: first.band.clone(),
            first: first.path.clone(),
            second: second.path.clone(),
        }
        .into()),
        None => Ok(()),
    }
}
