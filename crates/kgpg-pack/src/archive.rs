//! Archive building over a pluggable container backend

use crate::errors::PackagingError;
use crate::file_set::ResolvedFileSet;
use crate::header::{HeaderExcerpt, PackageFormat};
use kgpg_manifest::{PluginManifest, MANIFEST_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Entry script every plugin must ship
pub const SCRIPT_FILE: &str = "crawl.rhai";

/// Root entries without which an archive is never written
pub const REQUIRED_FILES: [&str; 2] = [MANIFEST_FILE, SCRIPT_FILE];

/// Icons embedded in the v2 header, in order of preference
pub const HEADER_ICONS: [&str; 2] = ["icon.png", "icon.ico"];

/// Everything a backend needs to produce one container
#[derive(Debug, Clone, Copy)]
pub struct ArchiveRequest<'a> {
    pub plugin_id: &'a str,
    pub files: &'a ResolvedFileSet,
    pub output_path: &'a Path,
    pub format: PackageFormat,
}

/// Outcome of a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveResult {
    pub output_path: PathBuf,
    pub size_bytes: u64,
    pub entry_count: usize,
}

/// Produces the container bytes for a validated file set
pub trait ArchiveBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Write the container to `request.output_path`.
    ///
    /// Implementations must leave no partial file at the output path on failure.
    fn write_archive(&self, request: &ArchiveRequest<'_>) -> Result<ArchiveResult, PackagingError>;
}

/// Validates file sets and hands them to a backend
#[derive(Clone)]
pub struct ArchiveBuilder {
    backend: Arc<dyn ArchiveBackend>,
    format: PackageFormat,
}

impl ArchiveBuilder {
    pub fn new(backend: Arc<dyn ArchiveBackend>, format: PackageFormat) -> Self {
        Self { backend, format }
    }

    pub fn format(&self) -> PackageFormat {
        self.format
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Build `<plugin_id>.kgpg` at `output_path` from the resolved files.
    ///
    /// Missing required files fail before the output path is touched.
    pub fn build(
        &self,
        plugin_id: &str,
        files: &ResolvedFileSet,
        output_path: &Path,
    ) -> Result<ArchiveResult, PackagingError> {
        let missing = files.missing(&REQUIRED_FILES);
        if !missing.is_empty() {
            return Err(PackagingError::MissingRequiredFile {
                paths: missing.iter().map(|p| (*p).to_string()).collect(),
            });
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| PackagingError::write(parent, e))?;
        }

        tracing::debug!(
            "Building {} ({} files, {}) with {} backend",
            output_path.display(),
            files.len(),
            self.format,
            self.backend.name()
        );

        let request = ArchiveRequest {
            plugin_id,
            files,
            output_path,
            format: self.format,
        };
        self.backend.write_archive(&request)
    }

    /// Run [`ArchiveBuilder::build`] on the blocking thread pool
    pub async fn build_async(
        &self,
        plugin_id: String,
        files: ResolvedFileSet,
        output_path: PathBuf,
    ) -> Result<ArchiveResult, PackagingError> {
        let builder = self.clone();
        tokio::task::spawn_blocking(move || builder.build(&plugin_id, &files, &output_path))
            .await
            .map_err(|e| PackagingError::Task(e.to_string()))?
    }
}

/// Header excerpt for a plugin, read from its resolved `manifest.json`
pub fn header_excerpt(
    plugin_id: &str,
    files: &ResolvedFileSet,
) -> Result<HeaderExcerpt, PackagingError> {
    let manifest_path = files
        .get(MANIFEST_FILE)
        .ok_or_else(|| PackagingError::MissingRequiredFile {
            paths: vec![MANIFEST_FILE.to_string()],
        })?;
    let manifest =
        PluginManifest::load_from_path(manifest_path).map_err(|e| PackagingError::ManifestParse {
            plugin: plugin_id.to_string(),
            message: e.to_string(),
        })?;
    Ok(HeaderExcerpt {
        id: plugin_id.to_string(),
        name: manifest.display_name(plugin_id),
        version: manifest.version_or_default(),
        description: manifest.description_or_default(),
        author: manifest.author_or_default(),
    })
}

/// Icon bytes for the v2 header, if the plugin ships one
pub fn header_icon(files: &ResolvedFileSet) -> Option<Vec<u8>> {
    HEADER_ICONS.iter().find_map(|name| {
        let path = files.get(name)?;
        match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", path.display(), e);
                None
            }
        }
    })
}

/// Write `bytes` next to `output_path` and rename into place
pub(crate) fn write_atomically(output_path: &Path, bytes: &[u8]) -> Result<u64, PackagingError> {
    let temp_path = spool_path(output_path);
    if let Err(e) = fs::write(&temp_path, bytes) {
        let _ = fs::remove_file(&temp_path);
        return Err(PackagingError::write(&temp_path, e));
    }
    if let Err(e) = fs::rename(&temp_path, output_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(PackagingError::write(output_path, e));
    }
    Ok(bytes.len() as u64)
}

/// Spool file used while an archive is being written
pub fn spool_path(output_path: &Path) -> PathBuf {
    let mut name = output_path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
