use std::{
    fmt::{Debug, Display},
    path::{Path, PathBuf},
    rc::Rc,
};

/// Sensor band identifier as it appears in tile names (`B02`, `B8A`, `B12`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BandId(Rc<str>);

impl BandId {
    pub fn new(id: &str) -> Self {
        Self(Rc::from(id))
    }

    /// Parses a `B..` token: `B` followed by two ascii alphanumerics.
    pub fn parse(token: &str) -> Option<Self> {
        let bytes = token.as_bytes();
        (bytes.len() == 3
            && bytes[0] == b'B'
            && bytes[1].is_ascii_digit()
            && bytes[2].is_ascii_alphanumeric())
        .then(|| Self::new(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for BandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// A band tile found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct TileEntry {
    pub path: PathBuf,
    pub band: BandId,
    /// Native resolution group in meters (10, 20, 60).
    pub resolution: u32,
}

impl TileEntry {
    /// Recognises `.../R20m/T33PTM_20241126T093239_B12_20m.jp2`-style paths.
    ///
    /// The band comes from a `B..` token of the file stem, the resolution
    /// from an `R<n>m` directory or, failing that, an `<n>m` stem token.
    pub fn from_path(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        let tokens: Vec<&str> = stem.split('_').collect();
        let band = tokens.iter().find_map(|token| BandId::parse(token))?;
        let resolution = path
            .parent()
            .into_iter()
            .flat_map(Path::components)
            .filter_map(|component| component.as_os_str().to_str())
            .filter_map(|name| name.strip_prefix('R').and_then(parse_meters))
            .last()
            .or_else(|| tokens.iter().rev().find_map(|token| parse_meters(token)))?;
        Some(Self {
            path: path.to_path_buf(),
            band,
            resolution,
        })
    }
}

fn parse_meters(token: &str) -> Option<u32> {
    token
        .strip_suffix('m')
        .filter(|digits| !digits.is_empty())
        .and_then(|digits| digits.parse().ok())
}
