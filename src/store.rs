use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Directory-backed token store, one file per user key
#[derive(Debug, Clone)]
pub struct FileDataStore {
    dir: PathBuf,
}

impl FileDataStore {
    /// Opens the store, creating the directory (owner-only on unix) if it is missing
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "creating token store");
            fs::create_dir_all(&dir)?;
            restrict_to_owner(&dir)?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File the token for `user` is persisted to
    pub fn token_path(&self, user: &str) -> PathBuf {
        self.dir.join(format!("{user}.json"))
    }

    pub fn contains(&self, user: &str) -> bool {
        self.token_path(user).is_file()
    }
}

#[cfg(unix)]
fn restrict_to_owner(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_to_owner(_dir: &Path) -> Result<()> {
    Ok(())
}
