//! Minimal GeoJSON model (RFC 7946): what a study-area boundary may be and
//! what the burnt footprint is written as.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `[x, y]`, optionally followed by elevation.
pub type Position = Vec<f64>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Always "FeatureCollection".
    #[serde(rename = "type")]
    pub type_: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Always "Feature".
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Value,
}

impl Feature {
    pub fn new(id: usize, geometry: Geometry, properties: Value) -> Self {
        Self {
            type_: "Feature".to_string(),
            id: Some(id.into()),
            geometry: Some(geometry),
            properties,
        }
    }
}

/// Areal geometries. Anything else is read as [Geometry::Other].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    #[serde(other)]
    Other,
}

impl Geometry {
    /// Areal content as a multipolygon, [None] for non areal geometries
    /// or malformed positions.
    pub fn to_geo(&self) -> Option<MultiPolygon<f64>> {
        match self {
            Self::Polygon { coordinates } => Some(MultiPolygon::new(vec![polygon(coordinates)?])),
            Self::MultiPolygon { coordinates } => coordinates
                .iter()
                .map(|rings| polygon(rings))
                .collect::<Option<Vec<_>>>()
                .map(MultiPolygon::new),
            Self::Other => None,
        }
    }
}

impl From<&Polygon<f64>> for Geometry {
    fn from(polygon: &Polygon<f64>) -> Self {
        let ring = |ring: &LineString<f64>| -> Vec<Position> {
            ring.coords().map(|coord| vec![coord.x, coord.y]).collect()
        };
        Self::Polygon {
            coordinates: std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(ring)
                .collect(),
        }
    }
}

fn polygon(rings: &[Vec<Position>]) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        ring.iter()
            .map(|position| match position.as_slice() {
                [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(LineString::new)
    });
    let exterior = rings.next()??;
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    (exterior.0.len() >= 4).then(|| Polygon::new(exterior, interiors))
}
