//! Error types for source ingestion.

use std::path::PathBuf;

use thiserror::Error;

/// A whole file could not be read as its declared format.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("unexpected shape: {0}")]
    Shape(String),
}

/// Failure that stops one source's ingestion unit.
///
/// Missing paths are not errors (the unit completes empty) and malformed
/// elements are counted and skipped; only these abort a unit.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("ingestion task for `{name}` did not complete: {reason}")]
    Task { name: String, reason: String },
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: ParseError) -> Self {
        LoadError::Parse {
            path: path.into(),
            source,
        }
    }
}
