//! Pattern spec selecting each plugin's files, read from `project.json`

use crate::errors::ConfigError;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Token standing for the workspace root inside `project.json` inputs
pub const PROJECT_ROOT_TOKEN: &str = "{projectRoot}";

/// Prefix every plugin-anchored pattern starts with
pub const PLUGIN_ANCHOR: &str = "{projectRoot}/plugins/**/";

pub const DEFAULT_PATTERNS: [&str; 6] = [
    "{projectRoot}/plugins/**/manifest.json",
    "{projectRoot}/plugins/**/config.json",
    "{projectRoot}/plugins/**/crawl.rhai",
    "{projectRoot}/plugins/**/icon.png",
    "{projectRoot}/plugins/**/doc_root/doc.md",
    "{projectRoot}/plugins/**/doc_root/*.{jpg,jpeg,png,gif,webp,bmp,svg,ico}",
];

/// Ordered glob patterns, each anchored by [`PLUGIN_ANCHOR`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSpec {
    patterns: Vec<String>,
}

impl Default for PatternSpec {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

impl PatternSpec {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Read `targets.package.inputs` from a `project.json` file.
    ///
    /// Only string inputs mentioning `{projectRoot}` are patterns; named inputs
    /// like `"default"` or `"^default"` are skipped.
    pub fn from_project_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let project: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let inputs = project
            .get("targets")
            .and_then(|t| t.get("package"))
            .and_then(|p| p.get("inputs"))
            .and_then(Value::as_array)
            .ok_or_else(|| ConfigError::Parse {
                path: path.to_path_buf(),
                message: "missing targets.package.inputs array".to_string(),
            })?;

        let patterns = inputs
            .iter()
            .filter_map(Value::as_str)
            .filter(|input| input.contains(PROJECT_ROOT_TOKEN))
            .map(str::to_string)
            .collect();

        Ok(Self { patterns })
    }

    /// Load the pattern spec, falling back to the built-in defaults when the
    /// project file is missing or unreadable.
    ///
    /// A readable file that declares no plugin patterns is kept as-is.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "No project file at {}, using default patterns",
                path.display()
            );
            return Self::default();
        }
        match Self::from_project_file(path) {
            Ok(spec) => {
                if spec.is_empty() {
                    tracing::warn!(
                        "{} declares no plugin patterns; archives will only fail validation",
                        path.display()
                    );
                }
                spec
            }
            Err(e) => {
                tracing::warn!("Failed to read pattern spec, using defaults: {}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_patterns_are_anchored() {
        let spec = PatternSpec::default();
        assert_eq!(spec.patterns().len(), 6);
        assert!(spec.patterns().iter().all(|p| p.starts_with(PLUGIN_ANCHOR)));
    }

    #[test]
    fn test_named_inputs_are_skipped() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("project.json");
        let content = r#"{
  "name": "crawler-plugins",
  "targets": {
    "package": {
      "inputs": [
        "default",
        "^default",
        "{projectRoot}/plugins/**/manifest.json",
        { "env": "CI" },
        "{projectRoot}/plugins/**/crawl.rhai"
      ]
    }
  }
}"#;
        assert!(fs::write(&path, content).is_ok());

        let spec = PatternSpec::from_project_file(&path);
        assert!(spec.is_ok_and(|s| s.patterns()
            == [
                "{projectRoot}/plugins/**/manifest.json".to_string(),
                "{projectRoot}/plugins/**/crawl.rhai".to_string(),
            ]));
    }

    #[test]
    fn test_missing_project_file_uses_defaults() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let spec = PatternSpec::load_or_default(&temp_dir.path().join("project.json"));
        assert_eq!(spec, PatternSpec::default());
    }

    #[test]
    fn test_malformed_project_file_uses_defaults() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("project.json");
        assert!(fs::write(&path, "{ not json").is_ok());
        assert!(PatternSpec::from_project_file(&path).is_err());
        assert_eq!(PatternSpec::load_or_default(&path), PatternSpec::default());
    }

    #[test]
    fn test_missing_inputs_key_uses_defaults() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("project.json");
        assert!(fs::write(&path, r#"{"targets": {"build": {}}}"#).is_ok());
        assert_eq!(PatternSpec::load_or_default(&path), PatternSpec::default());
    }
}
