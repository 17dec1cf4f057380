//! Manifest loading and catalog field defaults

use crate::errors::ManifestError;
use crate::types::PluginManifest;
use std::path::Path;

/// File name of the per-plugin manifest
pub const MANIFEST_FILE: &str = "manifest.json";

const DEFAULT_VERSION: &str = "1.0.0";

impl PluginManifest {
    /// Load `manifest.json` from a plugin directory
    pub fn load_from_dir(plugin_dir: &Path) -> Result<Self, ManifestError> {
        Self::load_from_path(&plugin_dir.join(MANIFEST_FILE))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Display name, falling back to the plugin id
    pub fn display_name(&self, id: &str) -> String {
        non_empty(self.name.as_deref()).unwrap_or(id).to_string()
    }

    pub fn version_or_default(&self) -> String {
        non_empty(self.version.as_deref())
            .unwrap_or(DEFAULT_VERSION)
            .to_string()
    }

    pub fn description_or_default(&self) -> String {
        self.description.clone().unwrap_or_default()
    }

    pub fn author_or_default(&self) -> String {
        self.author.clone().unwrap_or_default()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
