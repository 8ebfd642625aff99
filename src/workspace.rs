use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SwarmError;

const ARCHIVE_CACHE_DIR: &str = "sra";

/// Per-run temporary directory. Removed on failure, kept on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    /// Creates `<temp_root>/<8 hex chars>`.
    pub fn create(temp_root: &Utf8Path) -> Result<Self, SwarmError> {
        let name = Uuid::new_v4().simple().to_string()[..8].to_string();
        Self::create_named(temp_root, &name)
    }

    pub fn create_named(temp_root: &Utf8Path, name: &str) -> Result<Self, SwarmError> {
        let root = temp_root.join(name);
        if root.as_std_path().exists() {
            return Err(SwarmError::WorkspaceExists(root.into_std_path_buf()));
        }
        fs::create_dir_all(temp_root.as_std_path())
            .map_err(|err| SwarmError::Filesystem(format!("create {temp_root}: {err}")))?;
        fs::create_dir(root.as_std_path()).map_err(|err| match err.kind() {
            io::ErrorKind::AlreadyExists => {
                SwarmError::WorkspaceExists(root.clone().into_std_path_buf())
            }
            _ => SwarmError::Filesystem(format!("create {root}: {err}")),
        })?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.root
    }

    pub fn join(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self) -> bool {
        self.root.as_std_path().exists()
    }

    pub fn destroy(&self) -> Result<(), SwarmError> {
        fs::remove_dir_all(self.root.as_std_path())
            .map_err(|err| SwarmError::Filesystem(format!("remove {}: {err}", self.root)))
    }

    /// Best-effort [`Workspace::destroy`] for a run that is already failing.
    pub fn teardown(&self) {
        info!("Removing temporary folder: {}", self.root);
        if let Err(err) = self.destroy() {
            warn!("could not remove temporary folder {}: {err}", self.root);
        }
    }

    /// Points `cache_link` at a fresh `sra/` folder inside this workspace so
    /// the archive toolkit caches downloads per run. Whatever was at
    /// `cache_link` before is removed.
    pub fn prepare_archive_cache(&self, cache_link: &Utf8Path) -> Result<Utf8PathBuf, SwarmError> {
        info!("Setting up fastq-dump cache within {}", self.root);
        if let Some(parent) = cache_link.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| SwarmError::Filesystem(format!("create {parent}: {err}")))?;
        }
        remove_existing(cache_link)?;

        let local_cache = self.join(ARCHIVE_CACHE_DIR);
        if local_cache.as_std_path().exists() {
            return Err(SwarmError::Filesystem(format!(
                "archive cache already exists: {local_cache}"
            )));
        }
        fs::create_dir(local_cache.as_std_path())
            .map_err(|err| SwarmError::Filesystem(format!("create {local_cache}: {err}")))?;
        symlink_dir(&local_cache, cache_link)
            .map_err(|err| SwarmError::Filesystem(format!("link {cache_link}: {err}")))?;
        Ok(local_cache)
    }
}

fn remove_existing(path: &Utf8Path) -> Result<(), SwarmError> {
    let Ok(meta) = fs::symlink_metadata(path.as_std_path()) else {
        return Ok(());
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(path.as_std_path())
    } else {
        fs::remove_file(path.as_std_path())
    };
    result.map_err(|err| SwarmError::Filesystem(format!("remove {path}: {err}")))
}

#[cfg(unix)]
fn symlink_dir(target: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target.as_std_path(), link.as_std_path())
}

#[cfg(windows)]
fn symlink_dir(target: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target.as_std_path(), link.as_std_path())
}
