//! Settings persisted between runs: the port and the shared file paths.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::server::DEFAULT_PORT;
use crate::share::SharedFileCatalog;

/// Default settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "config.json";

/// Errors reading or writing the settings file.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The persisted settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: u16,
    pub shared_files: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            shared_files: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write settings to `path` as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Register every saved path that is still a file; forget the rest.
    ///
    /// Returns how many paths were dropped.
    pub fn sync_catalog(&mut self, catalog: &SharedFileCatalog) -> usize {
        let before = self.shared_files.len();
        self.shared_files.retain(|path| match catalog.register(path) {
            Ok(_) => true,
            Err(e) => {
                warn!("Dropping saved share: {e}");
                false
            }
        });
        before - self.shared_files.len()
    }

    /// Remember `path` as shared. Returns `false` if it was already saved.
    pub fn add_shared_file(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.shared_files.contains(&path) {
            return false;
        }
        self.shared_files.push(path);
        true
    }

    /// Forget every saved path whose file name is `name`.
    pub fn remove_shared_file(&mut self, name: &str) -> usize {
        let before = self.shared_files.len();
        self.shared_files
            .retain(|path| path.file_name().map_or(true, |n| n.to_string_lossy() != name));
        before - self.shared_files.len()
    }
}
