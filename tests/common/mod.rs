use burnscar::{
    components::{backends::tiff_backend::write_float_grid, GeoTransform},
    Grid,
};
use ndarray::Array2;
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use zip::{write::SimpleFileOptions, ZipWriter};

pub const ORIGIN: (f64, f64) = (600_000., 4_100_000.);
pub const SIZE: usize = 10;
const GRANULE: &str = "S2A_MSIL2A_20240101T000000.SAFE/GRANULE/L2A_T33PTM/IMG_DATA";

/// Reflectance of one band at `(row, col)` of the 10 m grid.
pub type Scene = fn(&str, usize, usize) -> f32;

/// Uniform 0.5 everywhere: no water, burn ratio 0.
pub fn unburnt(_: &str, _: usize, _: usize) -> f32 {
    0.5
}

/// Like [unburnt], with a dark, low-NIR 3x3 north-west corner.
pub fn burnt_corner(band: &str, row: usize, col: usize) -> f32 {
    match band {
        "B03" if row < 3 && col < 3 => 0.05,
        "B08" if row < 3 && col < 3 => 0.1,
        _ => 0.5,
    }
}

/// Zips the B02, B03, B04 and B08 10 m tiles and the 20 m B12 tile of `scene`.
pub fn write_archive(dir: &Path, name: &str, scene: Scene) -> PathBuf {
    write_archive_at(dir, name, scene, ORIGIN)
}

/// [write_archive] with the tiles' top left corner at `origin`.
pub fn write_archive_at(dir: &Path, name: &str, scene: Scene, origin: (f64, f64)) -> PathBuf {
    let tiles = dir.join(format!("{name}-tiles"));
    fs::create_dir_all(&tiles).unwrap();
    let path = dir.join(format!("{name}.zip"));
    let mut zip = ZipWriter::new(File::create(&path).unwrap());

    let bands = [("B02", 10), ("B03", 10), ("B04", 10), ("B08", 10), ("B12", 20)];
    for (band, resolution) in bands {
        let size = SIZE * 10 / resolution;
        let step = resolution / 10;
        let grid = Grid::new(
            Array2::from_shape_fn((size, size), |(row, col)| {
                scene(band, row * step, col * step)
            }),
            GeoTransform::new(origin.0, origin.1, resolution as f64, -(resolution as f64)),
        );
        let file_name = format!("T33PTM_20240101T000000_{band}_{resolution}m.tif");
        let tile = tiles.join(&file_name);
        write_float_grid(&grid, &tile).unwrap();

        zip.start_file(
            format!("{GRANULE}/R{resolution}m/{file_name}"),
            SimpleFileOptions::default(),
        )
        .unwrap();
        zip.write_all(&fs::read(&tile).unwrap()).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// GeoJSON rectangle `(min_x, min_y, max_x, max_y)`.
pub fn write_boundary(dir: &Path, (min_x, min_y, max_x, max_y): (f64, f64, f64, f64)) -> PathBuf {
    let path = dir.join("area.geojson");
    let document = serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"name": "study area"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [min_x, min_y], [max_x, min_y], [max_x, max_y], [min_x, max_y], [min_x, min_y]
                ]]
            }
        }]
    });
    fs::write(&path, document.to_string()).unwrap();
    path
}

/// Slightly larger than the scene extent.
pub fn covering_boundary(dir: &Path) -> PathBuf {
    let extent = SIZE as f64 * 10.;
    write_boundary(
        dir,
        (ORIGIN.0 - 5., ORIGIN.1 - extent - 5., ORIGIN.0 + extent + 5., ORIGIN.1 + 5.),
    )
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|entry| entry.unwrap().file_name().into_string().unwrap())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
