use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving, building or inspecting one plugin archive
#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("Missing required file(s): {}", paths.join(", "))]
    MissingRequiredFile { paths: Vec<String> },

    #[error("Failed to write archive {path}: {message}")]
    ArchiveWrite { path: PathBuf, message: String },

    #[error("Failed to read archive {path}: {source}")]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid manifest for '{plugin}': {message}")]
    ManifestParse { plugin: String, message: String },

    #[error("Package header needs {needed} bytes but only {available} are available")]
    HeaderOverflow { needed: usize, available: usize },

    #[error("Invalid package header: {0}")]
    InvalidHeader(String),

    #[error("Pattern '{pattern}' skipped: {message}")]
    PatternMatch { pattern: String, message: String },

    #[error("Unknown package format '{0}' (expected v1 or v2)")]
    UnknownFormat(String),

    #[error("Packaging task failed: {0}")]
    Task(String),
}

impl PackagingError {
    pub(crate) fn write(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        PackagingError::ArchiveWrite {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
