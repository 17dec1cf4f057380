//! Catalog persistence
//!
//! The catalog is written to a sibling `.tmp` file and renamed into place, so
//! readers never observe a half-written `index.json`.

use crate::errors::ManifestError;
use crate::types::Catalog;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Write the catalog atomically, replacing any previous file
pub fn write_catalog(catalog: &Catalog, output_path: &Path) -> Result<(), ManifestError> {
    debug!("Writing catalog to: {:?}", output_path);

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(|source| ManifestError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut content = catalog.to_json_string()?;
    content.push('\n');

    let temp_path = output_path.with_extension("json.tmp");
    let io_err = |source: std::io::Error| ManifestError::Io {
        path: temp_path.clone(),
        source,
    };
    {
        let file = fs::File::create(&temp_path).map_err(io_err)?;
        let mut writer = std::io::BufWriter::with_capacity(64 * 1024, file);
        writer.write_all(content.as_bytes()).map_err(io_err)?;
        writer.flush().map_err(io_err)?;
    }

    fs::rename(&temp_path, output_path).map_err(|source| ManifestError::Io {
        path: output_path.to_path_buf(),
        source,
    })?;

    info!(
        "Catalog written to {:?} ({} plugins)",
        output_path,
        catalog.plugins.len()
    );
    Ok(())
}

/// Read a catalog back from disk
pub fn read_catalog(path: &Path) -> Result<Catalog, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CatalogEntry, Repository};
    use tempfile::TempDir;

    #[test]
    fn test_write_replaces_previous_catalog() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let index_path = temp_dir.path().join("packed").join("index.json");

        let first = Catalog::new(
            "v1.0.0",
            Repository::new("kabegame", "crawler-plugins"),
            String::new(),
            vec![CatalogEntry {
                id: "old".to_string(),
                name: "Old".to_string(),
                version: "0.1.0".to_string(),
                description: String::new(),
                author: String::new(),
                package_version: 1,
                download_url: String::new(),
                size_bytes: 1,
                sha256: "a".repeat(64),
            }],
        );
        assert!(write_catalog(&first, &index_path).is_ok());

        let second = Catalog::new(
            "v1.1.0",
            Repository::new("kabegame", "crawler-plugins"),
            String::new(),
            vec![],
        );
        assert!(write_catalog(&second, &index_path).is_ok());

        let loaded = read_catalog(&index_path);
        assert!(loaded.is_ok_and(|c| c.version == "v1.1.0" && c.plugins.is_empty()));
        assert!(!index_path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_written_file_ends_with_newline() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let index_path = temp_dir.path().join("index.json");
        let catalog = Catalog::new("latest", Repository::new("o", "n"), String::new(), vec![]);
        assert!(write_catalog(&catalog, &index_path).is_ok());

        let content = fs::read_to_string(&index_path).unwrap_or_default();
        assert!(content.starts_with("{\n  \"version\": \"latest\""));
        assert!(content.ends_with("}\n"));
    }
}
