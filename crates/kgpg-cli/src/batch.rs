//! Batch packaging of plugin directories
//!
//! A run packages every plugin under the plugin root (`All`), one named plugin
//! (`Single`) or an allow-list (`Only`). Each plugin is packaged independently:
//! an error is recorded as a failed outcome and never stops its siblings.

use crate::errors::BatchError;
use futures::future::join_all;
use kgpg_config::PatternSpec;
use kgpg_logger as logger;
use kgpg_manifest::{PluginManifest, MANIFEST_FILE};
use kgpg_pack::{doc_images, patterns, ArchiveBuilder, ArchiveResult, PackagingError};
use std::path::{Path, PathBuf};

pub const ARCHIVE_SUFFIX: &str = ".kgpg";
pub const ICON_SUFFIX: &str = ".icon.png";
pub const SPOOL_SUFFIX: &str = ".kgpg.tmp";
const PLUGIN_ICON: &str = "icon.png";

/// Which plugins a run packages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchMode {
    All,
    Single(String),
    Only(Vec<String>),
}

impl BatchMode {
    /// An allow-list takes precedence over a single positional plugin name
    pub fn from_args(plugin: Option<String>, only: &[String]) -> Self {
        let allow_list = parse_only_list(only);
        if !allow_list.is_empty() {
            return BatchMode::Only(allow_list);
        }
        match plugin {
            Some(name) => BatchMode::Single(name),
            None => BatchMode::All,
        }
    }
}

/// Split comma-separated `--only` values, dropping blanks and repeats
pub fn parse_only_list(values: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in values.iter().flat_map(|v| v.split(',')).map(str::trim) {
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub plugin_root: PathBuf,
    pub output_dir: PathBuf,
    pub excluded_dirs: Vec<String>,
    pub patterns: PatternSpec,
    /// Skip `<id>.icon.png` side-files
    pub kgpg_only: bool,
    pub prune_doc_images: bool,
}

#[derive(Debug, Clone)]
pub struct PluginOutcome {
    pub name: String,
    pub success: bool,
    pub error: Option<String>,
    pub archive: Option<ArchiveResult>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<PluginOutcome>,
    pub output_dir: PathBuf,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }
}

/// A bare directory name: no separators, not `.` or `..`
pub fn is_plugin_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Plugin directory names under `plugin_root`, sorted, minus excluded names
pub async fn discover_plugins(
    plugin_root: &Path,
    excluded: &[String],
) -> Result<Vec<String>, BatchError> {
    let mut entries = tokio::fs::read_dir(plugin_root)
        .await
        .map_err(|e| BatchError::io(plugin_root, e))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| BatchError::io(plugin_root, e))?
    {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if excluded.iter().any(|e| *e == name) {
            continue;
        }
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .is_ok_and(|m| m.is_dir());
        if is_dir {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Remove stale output before a run, returning the removed paths.
///
/// - `All`: every archive, icon side-file and spool file
/// - `Only`: spool files, archives outside the allow-list and, unless
///   `kgpg_only`, icon side-files outside the allow-list
/// - `Single`: nothing
pub async fn clean_output_dir(
    output_dir: &Path,
    mode: &BatchMode,
    kgpg_only: bool,
) -> Result<Vec<PathBuf>, BatchError> {
    let allow_list: &[String] = match mode {
        BatchMode::Single(_) => return Ok(Vec::new()),
        BatchMode::All => &[],
        BatchMode::Only(names) => names,
    };
    let keep = |stem: &str| allow_list.iter().any(|n| n == stem);
    let is_all = matches!(mode, BatchMode::All);

    let mut entries = tokio::fs::read_dir(output_dir)
        .await
        .map_err(|e| BatchError::io(output_dir, e))?;
    let mut removed = Vec::new();

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| BatchError::io(output_dir, e))?
    {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        if !is_file {
            continue;
        }

        let stale = if name.ends_with(SPOOL_SUFFIX) {
            true
        } else if let Some(stem) = name.strip_suffix(ARCHIVE_SUFFIX) {
            is_all || !keep(stem)
        } else if let Some(stem) = name.strip_suffix(ICON_SUFFIX) {
            is_all || (!kgpg_only && !keep(stem))
        } else {
            false
        };

        if stale {
            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    logger::debug(&format!("Removed stale {}", path.display()));
                    removed.push(path);
                }
                Err(e) => logger::warn(&format!("Could not remove {}: {}", path.display(), e)),
            }
        }
    }
    removed.sort();
    Ok(removed)
}

/// Packages plugins from one plugin root into one output directory
pub struct BatchRunner {
    options: BatchOptions,
    builder: ArchiveBuilder,
}

impl BatchRunner {
    pub fn new(options: BatchOptions, builder: ArchiveBuilder) -> Self {
        Self { options, builder }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Package the plugins selected by `mode`.
    ///
    /// Only run-level problems are errors: an unreadable plugin root, zero
    /// plugin directories in `All` mode, or an unusable output directory.
    pub async fn run(&self, mode: &BatchMode) -> Result<BatchReport, BatchError> {
        let output_dir = &self.options.output_dir;
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| BatchError::io(output_dir, e))?;

        let ids = match mode {
            BatchMode::All => {
                let ids =
                    discover_plugins(&self.options.plugin_root, &self.options.excluded_dirs)
                        .await?;
                if ids.is_empty() {
                    return Err(BatchError::NoPluginDirs(self.options.plugin_root.clone()));
                }
                ids
            }
            BatchMode::Single(name) => vec![name.clone()],
            BatchMode::Only(names) => names.clone(),
        };

        let removed = clean_output_dir(output_dir, mode, self.options.kgpg_only).await?;
        if !removed.is_empty() {
            logger::info(&format!("Removed {} stale file(s)", removed.len()));
        }

        logger::info(&format!(
            "Packaging {} plugin(s) with the {} backend ({})",
            ids.len(),
            self.builder.backend_name(),
            self.builder.format()
        ));

        let outcomes = match mode {
            BatchMode::Single(_) => {
                let mut outcomes = Vec::with_capacity(ids.len());
                for id in &ids {
                    outcomes.push(self.package_outcome(id).await);
                }
                outcomes
            }
            BatchMode::All | BatchMode::Only(_) => {
                join_all(ids.iter().map(|id| self.package_outcome(id))).await
            }
        };

        Ok(BatchReport {
            outcomes,
            output_dir: output_dir.clone(),
        })
    }

    async fn package_outcome(&self, id: &str) -> PluginOutcome {
        match self.package_plugin(id).await {
            Ok(archive) => {
                logger::success(&format!(
                    "{} -> {} ({} bytes)",
                    id,
                    archive.output_path.display(),
                    archive.size_bytes
                ));
                PluginOutcome {
                    name: id.to_string(),
                    success: true,
                    error: None,
                    archive: Some(archive),
                }
            }
            Err(e) => {
                logger::error(&format!("{}: {}", id, e));
                PluginOutcome {
                    name: id.to_string(),
                    success: false,
                    error: Some(e.to_string()),
                    archive: None,
                }
            }
        }
    }

    /// Package one plugin into `<output_dir>/<id>.kgpg`
    pub async fn package_plugin(&self, id: &str) -> Result<ArchiveResult, BatchError> {
        let plugin_dir = self.options.plugin_root.join(id);
        if !is_plugin_name(id) {
            return Err(BatchError::PluginDirNotFound(plugin_dir));
        }
        let is_dir = tokio::fs::metadata(&plugin_dir)
            .await
            .is_ok_and(|m| m.is_dir());
        if !is_dir {
            return Err(BatchError::PluginDirNotFound(plugin_dir));
        }

        let manifest_path = plugin_dir.join(MANIFEST_FILE);
        if !tokio::fs::try_exists(&manifest_path).await.unwrap_or(false) {
            return Err(PackagingError::MissingRequiredFile {
                paths: vec![MANIFEST_FILE.to_string()],
            }
            .into());
        }
        let content = tokio::fs::read_to_string(&manifest_path)
            .await
            .map_err(|e| BatchError::io(&manifest_path, e))?;
        let manifest =
            PluginManifest::from_json(&content).map_err(|e| PackagingError::ManifestParse {
                plugin: id.to_string(),
                message: e.to_string(),
            })?;
        logger::step(&format!(
            "Packaging {} ({} {})",
            id,
            manifest.display_name(id),
            manifest.version_or_default()
        ));

        let spec = self.options.patterns.clone();
        let root = plugin_dir.clone();
        let prune = self.options.prune_doc_images;
        let files = tokio::task::spawn_blocking(move || {
            let mut files = patterns::resolve(&spec, &root);
            if prune {
                let dropped = doc_images::prune_unreferenced(&mut files);
                if !dropped.is_empty() {
                    tracing::debug!("Pruned {} unreferenced doc image(s)", dropped.len());
                }
            }
            files
        })
        .await
        .map_err(|e| BatchError::Task(e.to_string()))?;
        logger::debug(&format!("{}: {} file(s) selected", id, files.len()));

        let output_path = self
            .options
            .output_dir
            .join(format!("{}{}", id, ARCHIVE_SUFFIX));
        let archive = self
            .builder
            .build_async(id.to_string(), files, output_path)
            .await?;

        if !self.options.kgpg_only {
            let icon = plugin_dir.join(PLUGIN_ICON);
            if tokio::fs::try_exists(&icon).await.unwrap_or(false) {
                let target = self
                    .options
                    .output_dir
                    .join(format!("{}{}", id, ICON_SUFFIX));
                tokio::fs::copy(&icon, &target)
                    .await
                    .map_err(|e| BatchError::io(&target, e))?;
            }
        }

        Ok(archive)
    }
}
