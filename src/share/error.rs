//! Error types for shared-file registration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while registering a shared file.
#[derive(Debug, Error)]
pub enum Error {
    /// The path exists but is not a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// The path has no final component to share it under.
    #[error("Path has no file name: {0}")]
    NoFileName(PathBuf),

    /// The file could not be inspected.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
