use log::{debug, info};
use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};
use tempfile::TempDir;
use zip::ZipArchive;

use crate::errors::{InputDataError, Result};

/// Per-run scratch directory for extracted scenes and review artifacts.
///
/// Removed on [Workspace::close], or when dropped on any failure path.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates a fresh run directory under `root`.
    pub fn create(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix("run-").tempdir_in(root)?;
        info!("workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Extracts `archive` into `<workspace>/<name>` and returns that directory.
    ///
    /// Entries that would land outside the target are rejected by [ZipArchive::extract].
    pub fn extract(&self, archive: &Path, name: &str) -> Result<PathBuf> {
        if !archive.is_file() {
            Err(InputDataError::MissingInput(archive.to_path_buf()))?
        }
        let target = self.dir.path().join(name);
        fs::create_dir_all(&target)?;
        let mut zip = ZipArchive::new(BufReader::new(File::open(archive)?))?;
        debug!("{} entries in {}", zip.len(), archive.display());
        zip.extract(&target)?;
        info!("extracted {} to {}", archive.display(), target.display());
        Ok(target)
    }

    /// Directory for intermediate artifacts shown to the operator.
    pub fn review_dir(&self) -> Result<PathBuf> {
        let dir = self.dir.path().join("review");
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        info!("removed workspace {}", path.display());
        Ok(())
    }
}
