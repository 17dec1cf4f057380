//! Release catalog (`index.json`) generation from already-built archives

use crate::batch::{discover_plugins, ARCHIVE_SUFFIX};
use crate::errors::BatchError;
use futures::future::join_all;
use kgpg_config::ReleaseInfo;
use kgpg_logger as logger;
use kgpg_manifest::{
    write_catalog, Catalog, CatalogEntry, PluginManifest, Repository, MANIFEST_FILE,
};
use kgpg_pack::inspect;
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.json";

/// Human-readable size: `B`, `KB`, `MB` or `GB` with at most two decimals
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, UNITS[unit])
}

/// Catalog entry for one plugin, or `None` when it was skipped or failed
async fn catalog_entry(
    plugin_root: &Path,
    output_dir: &Path,
    id: &str,
    release: &ReleaseInfo,
) -> Option<CatalogEntry> {
    let manifest_path = plugin_root.join(id).join(MANIFEST_FILE);
    if !tokio::fs::try_exists(&manifest_path).await.unwrap_or(false) {
        logger::warn(&format!("{}: no {}, skipping", id, MANIFEST_FILE));
        return None;
    }
    let archive_path = output_dir.join(format!("{}{}", id, ARCHIVE_SUFFIX));
    if !tokio::fs::try_exists(&archive_path).await.unwrap_or(false) {
        logger::warn(&format!(
            "{}: {} not found, skipping",
            id,
            archive_path.display()
        ));
        return None;
    }

    let manifest = match tokio::fs::read_to_string(&manifest_path).await {
        Ok(content) => match PluginManifest::from_json(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                logger::error(&format!("{}: invalid {}: {}", id, MANIFEST_FILE, e));
                return None;
            }
        },
        Err(e) => {
            logger::error(&format!("{}: cannot read {}: {}", id, MANIFEST_FILE, e));
            return None;
        }
    };

    let info = match inspect(&archive_path).await {
        Ok(info) => info,
        Err(e) => {
            logger::error(&format!("{}: {}", id, e));
            return None;
        }
    };

    let entry = CatalogEntry {
        id: id.to_string(),
        name: manifest.display_name(id),
        version: manifest.version_or_default(),
        description: manifest.description_or_default(),
        author: manifest.author_or_default(),
        package_version: info.package_version,
        download_url: release.download_url(id),
        size_bytes: info.size_bytes,
        sha256: info.sha256.clone(),
    };
    logger::success(&format!(
        "{} v{} ({}, SHA256: {}...)",
        entry.name,
        entry.version,
        format_file_size(entry.size_bytes),
        info.short_sha()
    ));
    Some(entry)
}

/// Build the catalog for every plugin directory that has a built archive.
///
/// Plugins without a manifest or archive are skipped; zero plugin directories
/// is an error.
pub async fn generate_catalog(
    plugin_root: &Path,
    excluded_dirs: &[String],
    output_dir: &Path,
    release: &ReleaseInfo,
) -> Result<Catalog, BatchError> {
    let ids = discover_plugins(plugin_root, excluded_dirs).await?;
    if ids.is_empty() {
        return Err(BatchError::NoPluginDirs(plugin_root.to_path_buf()));
    }

    let entries: Vec<CatalogEntry> = join_all(
        ids.iter()
            .map(|id| catalog_entry(plugin_root, output_dir, id, release)),
    )
    .await
    .into_iter()
    .flatten()
    .collect();

    Ok(Catalog::new(
        &release.tag,
        Repository::new(&release.owner, &release.name),
        release.release_url(),
        entries,
    ))
}

/// Write `index.json` into the output directory, replacing any previous catalog
pub fn write_index(catalog: &Catalog, output_dir: &Path) -> Result<PathBuf, BatchError> {
    let path = output_dir.join(INDEX_FILE);
    write_catalog(catalog, &path)?;
    Ok(path)
}
