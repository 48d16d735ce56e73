//! Mounted-volume references.
//!
//! The native calls scope directory resolution and queries to a volume,
//! identified by any path on it. Here a volume is its root directory
//! plus the device id behind it (the `dev_for_path` analog).

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};

/// The default volume queried when the caller names none.
pub const BOOT_VOLUME_ROOT: &str = "/boot";

/// A reference to a mounted volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    root: PathBuf,
    device: u64,
}

impl Volume {
    /// Opens the volume rooted at `path`.
    ///
    /// The path must exist and be a directory; otherwise the volume does
    /// not resolve and the call fails with `VolumeNotFound`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let root = fs::canonicalize(path)
            .map_err(|_| StorageError::VolumeNotFound(path.to_path_buf()))?;
        let metadata =
            fs::metadata(&root).map_err(|_| StorageError::VolumeNotFound(path.to_path_buf()))?;
        if !metadata.is_dir() {
            return Err(StorageError::VolumeNotFound(path.to_path_buf()));
        }
        Ok(Self {
            root,
            device: device_id(&metadata),
        })
    }

    /// The boot volume.
    pub fn boot() -> Result<Self> {
        Self::open(BOOT_VOLUME_ROOT)
    }

    /// The volume's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The device id of the filesystem backing this volume.
    pub fn device(&self) -> u64 {
        self.device
    }

    /// Whether `path` lives under this volume's root.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Whether queries can run against this volume.
    ///
    /// The host engine walks the volume directly, so any mounted
    /// directory tree qualifies as long as it is still present.
    pub fn is_queryable(&self) -> bool {
        self.root.is_dir()
    }
}

#[cfg(unix)]
fn device_id(metadata: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.dev()
}

#[cfg(not(unix))]
fn device_id(_metadata: &fs::Metadata) -> u64 {
    0
}
