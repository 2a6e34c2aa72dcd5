//! The catalog of files exposed for download.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use parking_lot::RwLock;
use serde::Serialize;

use crate::share::error::Error;

/// A file the operator has chosen to share.
///
/// Only `name` and `size` are ever serialized; the host path stays private.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedFile {
    /// Basename, also the lookup key.
    pub name: String,
    /// Absolute path on this host.
    #[serde(skip)]
    pub path: PathBuf,
    /// Size in bytes when the file was registered.
    pub size: u64,
}

/// Live mapping from exposed filename to its metadata.
///
/// Written by the front-end, read by request handlers. Every read returns an
/// owned copy taken under the lock, so a handler never observes half of an
/// update.
#[derive(Clone, Default)]
pub struct SharedFileCatalog {
    files: Arc<RwLock<HashMap<String, SharedFile>>>,
}

impl SharedFileCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Share the regular file at `path` under its basename.
    ///
    /// `path` is made absolute but symlinks are not resolved. A file already
    /// shared under the same name is replaced.
    pub fn register(&self, path: impl AsRef<Path>) -> Result<SharedFile, Error> {
        let path = path.as_ref();
        // The share name is the basename the operator picked, even for a symlink
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::NoFileName(path.to_path_buf()))?;
        let absolute = std::path::absolute(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let metadata = fs::metadata(&absolute).map_err(|source| Error::Io {
            path: absolute.clone(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(Error::NotAFile(absolute));
        }

        let file = SharedFile {
            name: name.clone(),
            path: absolute,
            size: metadata.len(),
        };

        let previous = self.files.write().insert(name, file.clone());
        match previous {
            Some(old) if old.path != file.path => warn!(
                "'{}' now shares {} instead of {}",
                file.name,
                file.path.display(),
                old.path.display()
            ),
            _ => info!("Sharing '{}' ({} bytes)", file.name, file.size),
        }

        Ok(file)
    }

    /// Stop sharing `name`, returning the removed entry.
    pub fn unregister(&self, name: &str) -> Option<SharedFile> {
        let removed = self.files.write().remove(name);
        if removed.is_some() {
            info!("Stopped sharing '{name}'");
        }
        removed
    }

    /// Look up a shared file by name.
    pub fn lookup(&self, name: &str) -> Option<SharedFile> {
        self.files.read().get(name).cloned()
    }

    /// Snapshot of all shared files, ordered by name.
    pub fn list_all(&self) -> Vec<SharedFile> {
        let mut files: Vec<SharedFile> = self.files.read().values().cloned().collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        files
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}
