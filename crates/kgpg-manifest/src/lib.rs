//! Plugin manifests and the release catalog
//!
//! Every plugin directory carries a `manifest.json` describing it. A release
//! publishes one `index.json` catalog listing every packaged plugin together
//! with its download location, size and SHA-256 digest.

pub mod catalog;
pub mod errors;
pub mod manifest;
pub mod manifest_writer;
pub mod types;

pub use errors::ManifestError;
pub use manifest::MANIFEST_FILE;
pub use types::{Catalog, CatalogEntry, PluginManifest, Repository};

// Re-export catalog writer utilities
pub use manifest_writer::{read_catalog, write_catalog};
