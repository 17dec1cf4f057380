//! Expansion of the pattern spec into a plugin's file set

use crate::errors::PackagingError;
use crate::file_set::ResolvedFileSet;
use glob::{MatchOptions, Pattern};
use kgpg_config::project::{PatternSpec, PLUGIN_ANCHOR, PROJECT_ROOT_TOKEN};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Resolve every pattern against `plugin_root`, logging skipped patterns.
pub fn resolve(spec: &PatternSpec, plugin_root: &Path) -> ResolvedFileSet {
    let (files, warnings) = resolve_with_warnings(spec, plugin_root);
    for warning in &warnings {
        tracing::warn!("{}: {}", plugin_root.display(), warning);
    }
    files
}

/// Resolve every pattern against `plugin_root`.
///
/// Malformed patterns and unreadable directory entries do not abort resolution;
/// they are returned alongside the files that did match.
pub fn resolve_with_warnings(
    spec: &PatternSpec,
    plugin_root: &Path,
) -> (ResolvedFileSet, Vec<PackagingError>) {
    let mut warnings = Vec::new();
    let candidates = walk_files(plugin_root, &mut warnings);
    let mut files = ResolvedFileSet::new();

    for raw in spec.patterns() {
        let Some(relative) = strip_anchor(raw) else {
            warnings.push(PackagingError::PatternMatch {
                pattern: raw.clone(),
                message: "not anchored to the plugin directory".to_string(),
            });
            continue;
        };

        for alternative in expand_braces(&relative) {
            let pattern = match Pattern::new(&alternative) {
                Ok(pattern) => pattern,
                Err(e) => {
                    warnings.push(PackagingError::PatternMatch {
                        pattern: raw.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            for (relative_path, absolute) in &candidates {
                if pattern.matches_with(relative_path, MATCH_OPTIONS) {
                    files.insert(relative_path, absolute.clone());
                }
            }
        }
    }

    files.retain_existing();
    tracing::debug!(
        "Resolved {} file(s) under {}",
        files.len(),
        plugin_root.display()
    );
    (files, warnings)
}

/// Strip the plugin anchor, returning a pattern relative to the plugin root.
///
/// Returns `None` when the pattern still refers to the project root afterwards.
pub fn strip_anchor(pattern: &str) -> Option<String> {
    let unified = pattern.replace('\\', "/");
    let relative = unified.replace(PLUGIN_ANCHOR, "");
    if relative.contains(PROJECT_ROOT_TOKEN) || relative.is_empty() {
        None
    } else {
        Some(relative)
    }
}

/// Expand `{a,b}` alternation groups into plain glob patterns.
///
/// Groups may nest; an unmatched `{` is kept literally.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0usize;
    let mut close = None;
    let mut splits = Vec::new();
    for (offset, ch) in pattern[open..].char_indices() {
        let index = open + offset;
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(index);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(index),
            _ => {}
        }
    }

    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    let mut expanded = Vec::new();
    for window in bounds.windows(2) {
        let option = &pattern[window[0] + 1..window[1]];
        for tail in expand_braces(&format!("{}{}{}", prefix, option, suffix)) {
            if !expanded.contains(&tail) {
                expanded.push(tail);
            }
        }
    }
    expanded
}

/// Every regular file under `root` as (relative, absolute), in file-name order.
fn walk_files(root: &Path, warnings: &mut Vec<PackagingError>) -> Vec<(String, PathBuf)> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warnings.push(PackagingError::PatternMatch {
                    pattern: root.display().to_string(),
                    message: e.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let Some(relative) = relative.to_str() else {
            tracing::warn!("Skipping non UTF-8 path {}", entry.path().display());
            continue;
        };
        files.push((relative.replace('\\', "/"), entry.path().to_path_buf()));
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            assert!(fs::create_dir_all(parent).is_ok());
        }
        assert!(fs::write(path, relative).is_ok());
    }

    #[test]
    fn test_expand_braces() {
        assert_eq!(
            expand_braces("doc_root/*.{jpg,png}"),
            ["doc_root/*.jpg", "doc_root/*.png"]
        );
        assert_eq!(expand_braces("icon.png"), ["icon.png"]);
        assert_eq!(
            expand_braces("{a,b{c,d}}.txt"),
            ["a.txt", "bc.txt", "bd.txt"]
        );
        assert_eq!(expand_braces("odd{brace"), ["odd{brace"]);
    }

    #[test]
    fn test_strip_anchor() {
        assert_eq!(
            strip_anchor("{projectRoot}/plugins/**/doc_root/doc.md"),
            Some("doc_root/doc.md".to_string())
        );
        assert_eq!(
            strip_anchor("{projectRoot}\\plugins\\**\\icon.png"),
            Some("icon.png".to_string())
        );
        assert_eq!(strip_anchor("{projectRoot}/README.md"), None);
    }

    #[test]
    fn test_default_spec_selects_plugin_files() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let root = temp_dir.path();
        write(root, "manifest.json");
        write(root, "crawl.rhai");
        write(root, "icon.png");
        write(root, "notes.txt");
        write(root, "doc_root/doc.md");
        write(root, "doc_root/shot.webp");
        write(root, "doc_root/raw.psd");
        write(root, "doc_root/nested/deep.png");
        write(root, "doc_root/.hidden.png");

        let files = resolve(&PatternSpec::default(), root);
        let keys: Vec<&str> = files.relative_paths().collect();
        assert_eq!(
            keys,
            [
                "crawl.rhai",
                "doc_root/doc.md",
                "doc_root/shot.webp",
                "icon.png",
                "manifest.json"
            ]
        );
    }

    #[test]
    fn test_duplicate_matches_collapse() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        write(temp_dir.path(), "crawl.rhai");
        let spec = PatternSpec::new(vec![
            "{projectRoot}/plugins/**/crawl.rhai".to_string(),
            "{projectRoot}/plugins/**/*.rhai".to_string(),
        ]);
        let files = resolve(&spec, temp_dir.path());
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_bad_patterns_are_warnings() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        write(temp_dir.path(), "manifest.json");
        let spec = PatternSpec::new(vec![
            "{projectRoot}/plugins/**/[bad".to_string(),
            "{projectRoot}/package.json".to_string(),
            "{projectRoot}/plugins/**/manifest.json".to_string(),
        ]);
        let (files, warnings) = resolve_with_warnings(&spec, temp_dir.path());
        assert_eq!(warnings.len(), 2);
        assert!(warnings
            .iter()
            .all(|w| matches!(w, PackagingError::PatternMatch { .. })));
        assert!(files.contains("manifest.json"));
    }

    #[test]
    fn test_no_matches_is_empty_not_error() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let (files, warnings) = resolve_with_warnings(&PatternSpec::default(), temp_dir.path());
        assert!(files.is_empty());
        assert!(warnings.is_empty());
    }
}
