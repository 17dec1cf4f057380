use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for config key '{key}'")]
    InvalidValue { key: String, value: String },
}
