use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the tool configuration, looked up in the project root
pub const CONFIG_FILE_NAME: &str = "kgpg.toml";

/// Environment variable that overrides the tool configuration path
pub const CONFIG_ENV_VAR: &str = "KGPG_CONFIG";

/// Project configuration holding the package target's input patterns
pub const PROJECT_FILE_NAME: &str = "project.json";

const DEFAULT_PLUGIN_DIR: &str = "plugins";
const DEFAULT_OUTPUT_DIR: &str = "packed";
const DEFAULT_RELEASE_MANIFEST: &str = "package.json";

/// Directory names under the plugin root that are never plugins
pub const DEFAULT_EXCLUDED_DIRS: [&str; 4] = ["node_modules", "packed", ".git", "plugins"];

const KNOWN_KEYS: [&str; 9] = [
    "plugin-dir",
    "output-dir",
    "repo-owner",
    "repo-name",
    "release-manifest",
    "package-format",
    "packer",
    "exclude-dirs",
    "prune-doc-images",
];

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_manifest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_dirs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prune_doc_images: Option<bool>,
}

impl Config {
    /// Resolve the config file path for a project root.
    ///
    /// Honors an explicit override via `KGPG_CONFIG` for tests and CI runs.
    pub fn path(root: &Path) -> PathBuf {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }
        root.join(CONFIG_FILE_NAME)
    }

    /// Load config for a project root, returning defaults if the file doesn't exist
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        Self::load_from_path(&Self::path(root))
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load config, falling back to defaults when the file is unreadable
    pub fn load_or_default(root: &Path) -> Self {
        match Self::load(root) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to read config, using defaults: {}", e);
                Config::default()
            }
        }
    }

    pub fn save(&self, root: &Path) -> Result<(), ConfigError> {
        self.save_to_path(&Self::path(root))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "plugin-dir" => self.plugin_dir.clone(),
            "output-dir" => self.output_dir.clone(),
            "repo-owner" => self.repo_owner.clone(),
            "repo-name" => self.repo_name.clone(),
            "release-manifest" => self.release_manifest.clone(),
            "package-format" => self.package_format.clone(),
            "packer" => self.packer.clone(),
            "exclude-dirs" => self.exclude_dirs.as_ref().map(|dirs| dirs.join(",")),
            "prune-doc-images" => self.prune_doc_images.map(|b| b.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), ConfigError> {
        match key {
            "plugin-dir" => self.plugin_dir = Some(value),
            "output-dir" => self.output_dir = Some(value),
            "repo-owner" => self.repo_owner = Some(value),
            "repo-name" => self.repo_name = Some(value),
            "release-manifest" => self.release_manifest = Some(value),
            "package-format" => self.package_format = Some(value),
            "packer" => self.packer = Some(value),
            "exclude-dirs" => {
                let dirs: Vec<String> = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                self.exclude_dirs = Some(dirs);
            }
            "prune-doc-images" => {
                let parsed = value.parse::<bool>().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone(),
                })?;
                self.prune_doc_images = Some(parsed);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn known_keys() -> &'static [&'static str] {
        &KNOWN_KEYS
    }

    pub fn is_empty(&self) -> bool {
        *self == Config::default()
    }

    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        KNOWN_KEYS
            .iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }

    /// Directory holding one sub-directory per plugin
    pub fn plugin_dir(&self, root: &Path) -> PathBuf {
        resolve_under(root, self.plugin_dir.as_deref().unwrap_or(DEFAULT_PLUGIN_DIR))
    }

    /// Directory receiving `.kgpg` archives, icon side-files and `index.json`
    pub fn output_dir(&self, root: &Path) -> PathBuf {
        resolve_under(root, self.output_dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR))
    }

    /// File declaring the release version (`version` field)
    pub fn release_manifest_path(&self, root: &Path) -> PathBuf {
        resolve_under(
            root,
            self.release_manifest
                .as_deref()
                .unwrap_or(DEFAULT_RELEASE_MANIFEST),
        )
    }

    pub fn project_file(root: &Path) -> PathBuf {
        root.join(PROJECT_FILE_NAME)
    }

    /// Directory names skipped when discovering plugins
    pub fn excluded_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect();
        if let Some(extra) = &self.exclude_dirs {
            for dir in extra {
                if !dirs.contains(dir) {
                    dirs.push(dir.clone());
                }
            }
        }
        dirs
    }

    pub fn prune_doc_images(&self) -> bool {
        self.prune_doc_images.unwrap_or(false)
    }
}

fn resolve_under(root: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
