use itertools::Itertools;
use log::{debug, info, warn};
use ndarray::Array2;
use std::path::Path;
use walkdir::WalkDir;

use crate::{
    boundary::StudyArea,
    components::{
        backends::open_tile, band::TileEntry, file::TileFile, raster::Raster, view::View,
    },
    config::ClipMode,
    errors::{InputDataError, Result},
    intersection::Intersection,
    sensors::Sensor,
};

const TILE_EXTENSIONS: [&str; 3] = ["tif", "tiff", "jp2"];

/// Band tiles under `dir`, in file-name order.
pub fn discover(dir: &Path) -> Result<Vec<TileEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let is_tile = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| {
                    TILE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
                });
        if let Some(tile) = is_tile.then(|| TileEntry::from_path(entry.path())).flatten() {
            entries.push(tile);
        }
    }
    debug!("{} band tiles under {}", entries.len(), dir.display());
    Ok(entries)
}

/// Composes the sensor's bands found under `dir` onto the grid of its finest
/// band, resampling coarser bands bilinearly, and clips to `area`.
pub fn align<S: Sensor>(dir: &Path, area: &StudyArea, clip: ClipMode) -> Result<Raster<f32>> {
    let selected = S::select(discover(dir)?, dir)?;
    let tiles = selected
        .into_iter()
        .map(|entry| Ok((open_tile(&entry.path)?, entry)))
        .collect::<Result<Vec<(Box<dyn TileFile>, TileEntry)>>>()?;

    let (reference, _) = tiles
        .iter()
        .min_by_key(|(_, entry)| entry.resolution)
        .ok_or_else(|| InputDataError::NoBands(dir.to_path_buf()))?;
    check_resolution_groups(&tiles)?;

    let extent = tiles
        .iter()
        .try_fold(reference.bounds(), |extent, (tile, _)| {
            extent.intersection(&tile.bounds())
        })?;
    let clip_bounds = extent.intersection(area.bounds())?;
    let window = reference
        .transform()
        .window(&clip_bounds, reference.shape())
        .ok_or(InputDataError::NoIntersection)?;
    let view = View::new(reference.transform().shifted(&window), window.array_shape());
    info!("aligning {} bands onto {window:?} of {}", tiles.len(), reference.path().display());

    let bands = tiles
        .iter()
        .map(|(tile, entry)| Ok((entry.band.clone(), view.read(tile.as_ref())?)))
        .collect::<Result<Vec<_>>>()?;
    let mut raster = Raster::stack(bands, view.transform)?;

    if clip == ClipMode::Geometry {
        let (rows, cols) = view.shape;
        let outside = Array2::from_shape_fn((rows, cols), |(row, col)| {
            !area.contains(view.transform.pixel_center(col, row))
        });
        let count = outside.iter().filter(|&&outside| outside).count();
        if count == outside.len() {
            warn!("no cell centre of the composite lies inside the study area");
        }
        debug!("{count} cells outside the study area polygons");
        raster.mask_cells(outside.view(), f32::NAN)?;
    }
    Ok(raster)
}

/// Tiles of one resolution must share a grid.
fn check_resolution_groups(tiles: &[(Box<dyn TileFile>, TileEntry)]) -> Result<()> {
    for (_, group) in &tiles.iter().chunk_by(|(_, entry)| entry.resolution) {
        let mut group = group.map(|(tile, _)| tile);
        let Some(first) = group.next() else {
            continue;
        };
        for tile in group {
            if tile.shape() != first.shape() || !tile.transform().same_grid(first.transform()) {
                Err(InputDataError::MisalignedBands(tile.path().to_path_buf()))?
            }
        }
    }
    Ok(())
}
