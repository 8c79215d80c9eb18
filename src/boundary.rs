use geo::{BoundingRect, Coord, Intersects, MultiPolygon};
use log::info;
use serde_json::Value;
use std::{fmt::Debug, fs, path::Path};

use crate::{
    components::bounds::GeoBounds,
    errors::{InputDataError, Result},
    geojson::{Feature, FeatureCollection, Geometry},
};

/// Region of interest the composites are clipped to.
///
/// Assumed to be in the imagery's crs.
#[derive(Clone)]
pub struct StudyArea {
    geometry: MultiPolygon<f64>,
    bounds: GeoBounds,
}

impl Debug for StudyArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudyArea")
            .field("polygons", &self.geometry.0.len())
            .field("bounds", &self.bounds)
            .finish()
    }
}

impl StudyArea {
    pub fn new(geometry: MultiPolygon<f64>) -> Result<Self> {
        let bounds = geometry
            .bounding_rect()
            .filter(|rect| rect.width() > 0. && rect.height() > 0.)
            .ok_or_else(|| InputDataError::InvalidBoundary("boundary has no area".into()))?;
        let area = Self {
            geometry,
            bounds: GeoBounds::from(bounds),
        };
        info!("new {area:?}");
        Ok(area)
    }

    /// Reads a GeoJSON boundary, or any OGR vector with the `gdal` feature.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            Err(InputDataError::MissingInput(path.to_path_buf()))?
        }
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "geojson" | "json" => Self::from_geojson_str(&fs::read_to_string(path)?),
            #[cfg(feature = "gdal")]
            _ => Self::new(gdal_backend::read_polygons(path)?),
            #[cfg(not(feature = "gdal"))]
            _ => Err(InputDataError::UnsupportedFormat(path.to_path_buf()).into()),
        }
    }

    /// Accepts a FeatureCollection, a Feature, or a bare (Multi)Polygon.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let invalid = |error: serde_json::Error| InputDataError::InvalidBoundary(error.to_string());
        let document: Value = serde_json::from_str(text).map_err(invalid)?;
        let geometries = match document.get("type").and_then(Value::as_str) {
            Some("FeatureCollection") => {
                let collection: FeatureCollection =
                    serde_json::from_value(document).map_err(invalid)?;
                collection
                    .features
                    .into_iter()
                    .filter_map(|feature| feature.geometry)
                    .collect()
            }
            Some("Feature") => {
                let feature: Feature = serde_json::from_value(document).map_err(invalid)?;
                feature.geometry.into_iter().collect()
            }
            Some("Polygon" | "MultiPolygon") => {
                vec![serde_json::from_value::<Geometry>(document).map_err(invalid)?]
            }
            other => Err(InputDataError::InvalidBoundary(format!(
                "unsupported GeoJSON type {other:?}"
            )))?,
        };

        let mut polygons = Vec::new();
        for geometry in geometries {
            let multi = geometry.to_geo().ok_or_else(|| {
                InputDataError::InvalidBoundary("only polygon geometries are supported".into())
            })?;
            polygons.extend(multi);
        }
        if polygons.is_empty() {
            Err(InputDataError::InvalidBoundary("no polygons found".into()))?
        }
        Self::new(MultiPolygon::new(polygons))
    }

    pub fn bounds(&self) -> &GeoBounds {
        &self.bounds
    }

    /// Whether `coord` lies inside or on the boundary.
    pub fn contains(&self, coord: Coord) -> bool {
        self.geometry.intersects(&coord)
    }
}

#[cfg(feature = "gdal")]
mod gdal_backend {
    use gdal::vector::LayerAccess;
    use geo::{Geometry as GeoGeometry, MultiPolygon};
    use std::path::Path;

    use crate::errors::{InputDataError, Result};

    pub fn read_polygons(path: &Path) -> Result<MultiPolygon<f64>> {
        let dataset = gdal::Dataset::open(path)?;
        let mut layer = dataset.layer(0)?;
        let mut polygons = Vec::new();
        for feature in layer.features() {
            let Some(geometry) = feature.geometry() else {
                continue;
            };
            match geometry.to_geo()? {
                GeoGeometry::Polygon(polygon) => polygons.push(polygon),
                GeoGeometry::MultiPolygon(multi) => polygons.extend(multi),
                _ => Err(InputDataError::InvalidBoundary(
                    "only polygon geometries are supported".into(),
                ))?,
            }
        }
        Ok(MultiPolygon::new(polygons))
    }
}
