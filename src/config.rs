use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::errors::{InputDataError, Result};

/// How a composite is cut to the study area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    /// Boundary's bounding rectangle.
    #[default]
    Extent,
    /// Bounding rectangle, with cells centred outside the polygons set to no-data.
    Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Longest side, in pixels, the class map is upscaled towards.
    pub max_map_size: u32,
    /// Pixel size of one font dot.
    pub font_scale: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_map_size: 600,
            font_scale: 2,
        }
    }
}

/// Everything a run needs besides its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Root of the per-run scratch directories.
    pub workspace: PathBuf,
    /// Where artifacts are written.
    pub output_dir: PathBuf,
    pub clip: ClipMode,
    pub render: RenderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::temp_dir().join("fire_analysis"),
            output_dir: PathBuf::from("output"),
            clip: ClipMode::default(),
            render: RenderConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON configuration; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            Err(InputDataError::MissingInput(path.to_path_buf()))?
        }
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)
            .map_err(|error| InputDataError::InvalidConfig(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.render.font_scale == 0 {
            Err(InputDataError::InvalidConfig("font_scale must be positive".into()))?
        }
        if self.render.max_map_size == 0 {
            Err(InputDataError::InvalidConfig("max_map_size must be positive".into()))?
        }
        if self.output_dir.as_os_str().is_empty() {
            Err(InputDataError::InvalidConfig("output_dir is empty".into()))?
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BurnscarError;
    use rstest::rstest;

    fn write(text: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, text).unwrap();
        (dir, path)
    }

    #[rstest]
    fn partial_file_keeps_defaults() {
        let (_dir, path) = write(r#"{"output_dir": "maps", "clip": "geometry", "render": {"font_scale": 3}}"#);
        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("maps"));
        assert_eq!(config.clip, ClipMode::Geometry);
        assert_eq!(config.render.font_scale, 3);
        assert_eq!(config.render.max_map_size, 600);
        assert_eq!(config.workspace, PipelineConfig::default().workspace);
    }

    #[rstest]
    #[case(r#"{"outputs": "maps"}"#)]
    #[case(r#"{"clip": "polygon"}"#)]
    #[case(r#"{"render": {"font_scale": 0}}"#)]
    #[case("[")]
    fn rejects_bad_files(#[case] text: &str) {
        let (_dir, path) = write(text);
        assert!(matches!(
            PipelineConfig::from_file(&path),
            Err(BurnscarError::InputData(InputDataError::InvalidConfig(_)))
        ));
    }
}
