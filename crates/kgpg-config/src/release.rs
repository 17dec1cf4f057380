//! Release tag and repository coordinates for a batch run

use crate::config_manager::Config;
use serde_json::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

pub const DEFAULT_REPO_OWNER: &str = "kabegame";
pub const DEFAULT_REPO_NAME: &str = "crawler-plugins";

/// Tag used when no version source yields anything
pub const LATEST_TAG: &str = "latest";

pub const ENV_REF_NAME: &str = "GITHUB_REF_NAME";
pub const ENV_REPOSITORY_OWNER: &str = "GITHUB_REPOSITORY_OWNER";
pub const ENV_REPOSITORY: &str = "GITHUB_REPOSITORY";

static RELEASE_REF: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)^v[0-9]+\.[0-9]+\.[0-9]+[^\r\n\x{2028}\x{2029}]*$").ok());

/// CI environment captured once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseEnv {
    pub ref_name: Option<String>,
    pub repository_owner: Option<String>,
    /// `owner/name` slug
    pub repository: Option<String>,
}

impl ReleaseEnv {
    pub fn from_env() -> Self {
        Self {
            ref_name: read_env(ENV_REF_NAME),
            repository_owner: read_env(ENV_REPOSITORY_OWNER),
            repository: read_env(ENV_REPOSITORY),
        }
    }

    /// Repository name from the second segment of the `owner/name` slug
    pub fn repository_name(&self) -> Option<String> {
        self.repository
            .as_deref()
            .and_then(|slug| slug.split('/').nth(1))
            .and_then(non_empty)
    }
}

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct ReleaseOverrides {
    pub tag: Option<String>,
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
}

/// Resolved release coordinates shared by every catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub tag: String,
    pub owner: String,
    pub name: String,
}

impl ReleaseInfo {
    /// Resolve tag and repository.
    ///
    /// Tag: explicit > CI ref (release-shaped only) > manifest version > `latest`.
    /// Owner/name: explicit > environment > `kgpg.toml` > defaults.
    pub fn resolve(
        overrides: &ReleaseOverrides,
        env: &ReleaseEnv,
        config: &Config,
        manifest_version: Option<&str>,
    ) -> Self {
        let tag = resolve_release_tag(
            overrides.tag.as_deref(),
            env.ref_name.as_deref(),
            manifest_version,
        );

        let owner = overrides
            .repo_owner
            .as_deref()
            .and_then(non_empty)
            .or_else(|| env.repository_owner.as_deref().and_then(non_empty))
            .or_else(|| config.repo_owner.as_deref().and_then(non_empty))
            .unwrap_or_else(|| DEFAULT_REPO_OWNER.to_string());

        let name = overrides
            .repo_name
            .as_deref()
            .and_then(non_empty)
            .or_else(|| env.repository_name())
            .or_else(|| config.repo_name.as_deref().and_then(non_empty))
            .unwrap_or_else(|| DEFAULT_REPO_NAME.to_string());

        tracing::debug!("Release resolved: {}/{} @ {}", owner, name, tag);
        Self { tag, owner, name }
    }

    pub fn repository_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }

    pub fn release_url(&self) -> String {
        format!("{}/releases/tag/{}", self.repository_url(), self.tag)
    }

    pub fn download_url(&self, plugin_id: &str) -> String {
        format!(
            "{}/releases/download/{}/{}.kgpg",
            self.repository_url(),
            self.tag,
            plugin_id
        )
    }
}

/// Pick the release tag by strict first match.
pub fn resolve_release_tag(
    explicit_tag: Option<&str>,
    ci_ref_name: Option<&str>,
    manifest_version: Option<&str>,
) -> String {
    if let Some(tag) = explicit_tag.and_then(non_empty) {
        return tag;
    }
    if let Some(ci_ref) = ci_ref_name.and_then(non_empty) {
        if is_release_ref(&ci_ref) {
            return ci_ref;
        }
        tracing::debug!("Ignoring non-release CI ref '{}'", ci_ref);
    }
    if let Some(version) = manifest_version.and_then(non_empty) {
        return to_tag(&version);
    }
    LATEST_TAG.to_string()
}

/// True for refs shaped like `v<major>.<minor>.<patch>[anything]`, any case of `v`.
///
/// The suffix may not contain line terminators.
pub fn is_release_ref(name: &str) -> bool {
    RELEASE_REF.as_ref().is_some_and(|re| re.is_match(name))
}

/// Turn a manifest version into a tag: `v`-prefixed unless it already is, `latest` kept.
pub fn to_tag(version: &str) -> String {
    let version = version.trim();
    if version == LATEST_TAG || version.starts_with(['v', 'V']) {
        version.to_string()
    } else {
        format!("v{}", version)
    }
}

/// Read the `version` field of the release manifest.
///
/// Missing or malformed files log a warning and yield `None`.
pub fn read_manifest_version(path: &Path) -> Option<String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Cannot read release manifest {}: {}", path.display(), e);
            return None;
        }
    };
    let parsed: Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Cannot parse release manifest {}: {}", path.display(), e);
            return None;
        }
    };
    parsed
        .get("version")
        .and_then(Value::as_str)
        .and_then(non_empty)
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().as_deref().and_then(non_empty)
}

/// The value unchanged, unless it is empty or whitespace-only
fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_tag_wins() {
        let tag = resolve_release_tag(Some("v9.9.9"), Some("main"), Some("2.0.0"));
        assert_eq!(tag, "v9.9.9");
    }

    #[test]
    fn test_release_shaped_ci_ref_beats_manifest() {
        let tag = resolve_release_tag(None, Some("v1.2.3-rc1"), Some("2.0.0"));
        assert_eq!(tag, "v1.2.3-rc1");
    }

    #[test]
    fn test_branch_ref_falls_through_to_manifest() {
        let tag = resolve_release_tag(None, Some("main"), Some("2.0.0"));
        assert_eq!(tag, "v2.0.0");
    }

    #[test]
    fn test_nothing_resolves_to_latest() {
        assert_eq!(resolve_release_tag(None, None, None), "latest");
        assert_eq!(resolve_release_tag(Some("  "), Some(""), Some(" ")), "latest");
    }

    #[test]
    fn test_is_release_ref() {
        assert!(is_release_ref("v1.2.3"));
        assert!(is_release_ref("V10.0.12-beta.1"));
        assert!(is_release_ref("v1.2.3+build"));
        assert!(!is_release_ref("1.2.3"));
        assert!(!is_release_ref("v1.2"));
        assert!(!is_release_ref("v1..3"));
        assert!(!is_release_ref("release/v1.2.3"));
        assert!(!is_release_ref("main"));
        assert!(!is_release_ref(" v1.2.3"));
        assert!(!is_release_ref("v1.2.3\r"));
        assert!(!is_release_ref("v1.2.3\nmain"));
        assert!(!is_release_ref("v١.2.3"));
    }

    #[test]
    fn test_ci_ref_and_explicit_tag_are_not_rewritten() {
        assert_eq!(
            resolve_release_tag(None, Some(" v1.2.3"), Some("2.0.0")),
            "v2.0.0"
        );
        assert_eq!(
            resolve_release_tag(None, Some("v1.2.3\r"), Some("2.0.0")),
            "v2.0.0"
        );
        assert_eq!(
            resolve_release_tag(Some(" v9.9.9 "), Some("v1.2.3"), None),
            " v9.9.9 "
        );
    }

    #[test]
    fn test_to_tag() {
        assert_eq!(to_tag("1.4.0"), "v1.4.0");
        assert_eq!(to_tag("v1.4.0"), "v1.4.0");
        assert_eq!(to_tag("V2.0.0"), "V2.0.0");
        assert_eq!(to_tag("latest"), "latest");
    }

    #[test]
    fn test_repository_precedence() {
        let env = ReleaseEnv {
            ref_name: None,
            repository_owner: Some("ci-owner".to_string()),
            repository: Some("ci-owner/ci-repo".to_string()),
        };
        let config = Config {
            repo_owner: Some("cfg-owner".to_string()),
            repo_name: Some("cfg-repo".to_string()),
            ..Default::default()
        };

        let overrides = ReleaseOverrides {
            repo_owner: Some("flag-owner".to_string()),
            ..Default::default()
        };
        let info = ReleaseInfo::resolve(&overrides, &env, &config, Some("1.0.0"));
        assert_eq!(info.owner, "flag-owner");
        assert_eq!(info.name, "ci-repo");
        assert_eq!(info.tag, "v1.0.0");

        let info = ReleaseInfo::resolve(
            &ReleaseOverrides::default(),
            &ReleaseEnv::default(),
            &config,
            None,
        );
        assert_eq!(info.owner, "cfg-owner");
        assert_eq!(info.name, "cfg-repo");

        let info = ReleaseInfo::resolve(
            &ReleaseOverrides::default(),
            &ReleaseEnv::default(),
            &Config::default(),
            None,
        );
        assert_eq!(info.owner, DEFAULT_REPO_OWNER);
        assert_eq!(info.name, DEFAULT_REPO_NAME);
        assert_eq!(info.tag, LATEST_TAG);
    }

    #[test]
    fn test_repository_slug_without_name_segment() {
        let env = ReleaseEnv {
            repository: Some("lonely".to_string()),
            ..Default::default()
        };
        assert_eq!(env.repository_name(), None);
    }

    #[test]
    fn test_release_urls() {
        let info = ReleaseInfo {
            tag: "v1.0.0".to_string(),
            owner: "kabegame".to_string(),
            name: "crawler-plugins".to_string(),
        };
        assert_eq!(
            info.release_url(),
            "https://github.com/kabegame/crawler-plugins/releases/tag/v1.0.0"
        );
        assert_eq!(
            info.download_url("pixiv"),
            "https://github.com/kabegame/crawler-plugins/releases/download/v1.0.0/pixiv.kgpg"
        );
    }

    #[test]
    fn test_read_manifest_version() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("package.json");
        assert!(fs::write(&path, r#"{"name": "crawler-plugins", "version": "0.7.1"}"#).is_ok());
        assert_eq!(read_manifest_version(&path), Some("0.7.1".to_string()));

        assert!(fs::write(&path, "{broken").is_ok());
        assert_eq!(read_manifest_version(&path), None);

        assert_eq!(read_manifest_version(&temp_dir.path().join("absent.json")), None);
    }
}
