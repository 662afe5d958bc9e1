//! Timeline error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised while persisting or loading a timeline.
///
/// A load failure means the session cannot be resumed from disk, so these are always
/// surfaced to the caller instead of falling back to an empty timeline.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The persisted bytes are not a valid timeline document.
    #[error("Malformed timeline: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure, annotated with the operation and the path involved.
    #[error("IO error while {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CodecError {
    pub(crate) fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}
