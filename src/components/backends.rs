use log::debug;
use std::path::Path;

use crate::{
    components::file::TileFile,
    errors::{InputDataError, Result},
};

/// Opens a band tile with the backend matching its format.
pub fn open_tile(path: &Path) -> Result<Box<dyn TileFile>> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    debug!("opening {}", path.display());
    match extension.as_str() {
        "tif" | "tiff" => Ok(Box::new(tiff_backend::TiffFile::open(path)?)),
        #[cfg(feature = "gdal")]
        _ => Ok(Box::new(gdal_backend::GdalFile::open(path)?)),
        #[cfg(not(feature = "gdal"))]
        _ => Err(InputDataError::UnsupportedFormat(path.to_path_buf()).into()),
    }
}

/// GeoTIFF tiles, read and written without native libraries.
pub mod tiff_backend {
    use super::*;
    use ndarray::{s, Array2};
    use std::{
        fs::File,
        io::{BufReader, BufWriter, Seek, Write},
        path::PathBuf,
    };
    use tiff::{
        decoder::{Decoder, DecodingResult, Limits},
        encoder::{
            colortype::{self, ColorType},
            ImageEncoder, TiffEncoder, TiffKind,
        },
        tags::Tag,
    };

    use crate::{
        components::{
            bounds::PixelBounds, file::mask_nodata, raster::Grid, transforms::GeoTransform,
        },
        errors::BurnscarError,
    };

    const MODEL_PIXEL_SCALE: u16 = 33550;
    const MODEL_TIEPOINT: u16 = 33922;
    const GEO_KEY_DIRECTORY: u16 = 34735;
    const GDAL_NODATA: u16 = 42113;

    fn tag(code: u16) -> Tag {
        Tag::from_u16_exhaustive(code)
    }

    #[derive(Debug)]
    pub struct TiffFile {
        path: PathBuf,
        transform: GeoTransform,
        nodata: Option<f64>,
        data: Array2<f32>,
    }

    impl TiffFile {
        pub fn open(path: &Path) -> Result<Self> {
            let reader = BufReader::new(File::open(path)?);
            let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());
            let (width, height) = decoder.dimensions()?;
            let (rows, cols) = (height as usize, width as usize);

            let transform = read_transform(&mut decoder)
                .ok_or_else(|| InputDataError::MissingGeoreference(path.to_path_buf()))?;
            let nodata = decoder
                .get_tag_ascii_string(tag(GDAL_NODATA))
                .ok()
                .and_then(|value| value.trim().trim_end_matches('\0').parse::<f64>().ok());

            let values: Vec<f32> = match decoder.read_image()? {
                DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
                DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
                DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
                DecodingResult::I8(buf) => buf.into_iter().map(f32::from).collect(),
                DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
                DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
                DecodingResult::F32(buf) => buf,
                DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
                _ => Err(InputDataError::UnsupportedFormat(path.to_path_buf()))?,
            };
            if values.len() != rows * cols {
                // multi-sample images are not band tiles
                Err(InputDataError::UnsupportedFormat(path.to_path_buf()))?
            }
            let data = mask_nodata(Array2::from_shape_vec((rows, cols), values)?, nodata);

            Ok(Self {
                path: path.to_path_buf(),
                transform,
                nodata,
                data,
            })
        }
    }

    /// North-up transform from `ModelPixelScale` + `ModelTiepoint`.
    fn read_transform<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
    ) -> Option<GeoTransform> {
        let scale = decoder.get_tag_f64_vec(tag(MODEL_PIXEL_SCALE)).ok()?;
        let tiepoint = decoder.get_tag_f64_vec(tag(MODEL_TIEPOINT)).ok()?;
        if scale.len() < 2 || tiepoint.len() < 6 || scale[0] <= 0. || scale[1] <= 0. {
            return None;
        }
        // tiepoint: [I, J, K, X, Y, Z]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
    }

    impl TileFile for TiffFile {
        fn path(&self) -> &Path {
            &self.path
        }
        fn shape(&self) -> (usize, usize) {
            self.data.dim()
        }
        fn transform(&self) -> &GeoTransform {
            &self.transform
        }
        fn nodata(&self) -> Option<f64> {
            self.nodata
        }
        fn read_window(&self, window: &PixelBounds) -> Result<Array2<f32>> {
            if !window.fits(self.shape()) {
                return Err(BurnscarError::GridMismatch(format!(
                    "window {:?} outside {}",
                    window,
                    self.path.display()
                )));
            }
            let offset = window.offset();
            let (rows, cols) = window.array_shape();
            Ok(self
                .data
                .slice(s![offset.y..offset.y + rows, offset.x..offset.x + cols])
                .to_owned())
        }
    }

    /// Reads a single band GeoTIFF as a float grid.
    pub fn read_grid(path: &Path) -> Result<Grid<f32>> {
        let file = TiffFile::open(path)?;
        Ok(Grid::new(file.data, file.transform))
    }

    /// GeoTIFF tags of a north-up projected grid, plus `GDAL_NODATA` when given.
    fn write_georeference<W: Write + Seek, C: ColorType, K: TiffKind>(
        image: &mut ImageEncoder<'_, W, C, K>,
        transform: &GeoTransform,
        nodata: Option<&str>,
    ) -> Result<()> {
        let encoder = image.encoder();
        let scale = [transform.cell_width(), transform.cell_height(), 0.];
        encoder.write_tag(tag(MODEL_PIXEL_SCALE), &scale[..])?;
        let tiepoint = [0., 0., 0., transform.xoff(), transform.yoff(), 0.];
        encoder.write_tag(tag(MODEL_TIEPOINT), &tiepoint[..])?;
        // Version 1.1.0 with two keys: GTModelType = projected,
        // GTRasterType = pixel is area.
        let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
        encoder.write_tag(tag(GEO_KEY_DIRECTORY), &geokeys[..])?;
        if let Some(nodata) = nodata {
            encoder.write_tag(tag(GDAL_NODATA), nodata)?;
        }
        Ok(())
    }

    /// Writes a float32 GeoTIFF with `nan` as no-data.
    pub fn write_float_grid(grid: &Grid<f32>, path: &Path) -> Result<()> {
        let (rows, cols) = grid.shape();
        let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
        let mut image = encoder.new_image::<colortype::Gray32Float>(cols as u32, rows as u32)?;
        write_georeference(&mut image, grid.transform(), Some("nan"))?;
        let data: Vec<f32> = grid.data().iter().copied().collect();
        image.write_data(&data)?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    /// Writes a uint8 GeoTIFF.
    pub fn write_byte_grid(grid: &Grid<u8>, path: &Path, nodata: Option<u8>) -> Result<()> {
        let (rows, cols) = grid.shape();
        let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
        let mut image = encoder.new_image::<colortype::Gray8>(cols as u32, rows as u32)?;
        let nodata = nodata.map(|value| value.to_string());
        write_georeference(&mut image, grid.transform(), nodata.as_deref())?;
        let data: Vec<u8> = grid.data().iter().copied().collect();
        image.write_data(&data)?;
        debug!("wrote {}", path.display());
        Ok(())
    }

}

/// Implementations for gdal
#[cfg(feature = "gdal")]
pub mod gdal_backend {
    use super::*;
    use gdal::Dataset as GdalDataset;
    use ndarray::Array2;
    use std::path::PathBuf;

    use crate::components::{bounds::PixelBounds, file::mask_nodata, transforms::GeoTransform};

    #[derive(Debug)]
    pub struct GdalFile {
        path: PathBuf,
        dataset: GdalDataset,
        transform: GeoTransform,
        nodata: Option<f64>,
    }

    impl GdalFile {
        pub fn open(path: &Path) -> Result<Self> {
            let dataset = GdalDataset::open(path)?;
            let transform = GeoTransform::from_gdal(dataset.geo_transform()?)
                .ok_or_else(|| InputDataError::MissingGeoreference(path.to_path_buf()))?;
            let nodata = dataset.rasterband(1)?.no_data_value();
            Ok(GdalFile {
                path: path.to_path_buf(),
                dataset,
                transform,
                nodata,
            })
        }
    }

    impl TileFile for GdalFile {
        fn path(&self) -> &Path {
            &self.path
        }
        fn shape(&self) -> (usize, usize) {
            let (cols, rows) = self.dataset.raster_size();
            (rows, cols)
        }
        fn transform(&self) -> &GeoTransform {
            &self.transform
        }
        fn nodata(&self) -> Option<f64> {
            self.nodata
        }
        fn read_window(&self, window: &PixelBounds) -> Result<Array2<f32>> {
            let offset = window.offset();
            let (rows, cols) = window.array_shape();
            let buffer = self.dataset.rasterband(1)?.read_as::<f32>(
                (offset.x as isize, offset.y as isize),
                (cols, rows),
                (cols, rows),
                None,
            )?;
            let array = Array2::from_shape_vec((rows, cols), buffer.data().to_vec())?;
            Ok(mask_nodata(array, self.nodata))
        }
    }
}
