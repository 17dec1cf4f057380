//! Error types for batch packaging and catalog generation

use kgpg_manifest::ManifestError;
use kgpg_pack::PackagingError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while packaging a batch of plugins or building the catalog
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Plugin directory not found: {0}")]
    PluginDirNotFound(PathBuf),

    #[error("No plugin directories found under {0}")]
    NoPluginDirs(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Packaging(#[from] PackagingError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Packaging task failed: {0}")]
    Task(String),
}

impl BatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BatchError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::*;

    #[test]
    fn test_batch_error_display() {
        let err = BatchError::PluginDirNotFound(PathBuf::from("plugins/ghost"));
        assert_eq!(err.to_string(), "Plugin directory not found: plugins/ghost");
    }

    #[test]
    fn test_packaging_error_is_transparent() {
        let err = BatchError::from(PackagingError::MissingRequiredFile {
            paths: vec!["crawl.rhai".to_string()],
        });
        assert_eq!(err.to_string(), "Missing required file(s): crawl.rhai");
    }
}
