use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading manifests or writing the catalog
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),
}
