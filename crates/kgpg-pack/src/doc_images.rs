//! Dropping `doc_root/` images that `doc.md` never references

use crate::file_set::{normalize_relative, ResolvedFileSet};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;

pub const DOC_ROOT: &str = "doc_root";
pub const DOC_FILE: &str = "doc_root/doc.md";

pub const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg", "ico"];

static MARKDOWN_IMAGE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\(([^)]+)\)").ok());
static HTML_IMAGE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["'][^>]*>"#).ok());

/// Raw image targets from Markdown `![alt](path)` and HTML `<img src="...">`
pub fn extract_references(markdown: &str) -> Vec<String> {
    let mut references = Vec::new();
    for regex in [&*MARKDOWN_IMAGE, &*HTML_IMAGE].into_iter().flatten() {
        for captures in regex.captures_iter(markdown) {
            if let Some(target) = captures.get(1) {
                references.push(target.as_str().trim().to_string());
            }
        }
    }
    references
}

/// Map a reference to the file-set key it names, if any
fn resolve_reference(reference: &str, files: &ResolvedFileSet) -> Option<String> {
    let path = reference.split(['?', '#']).next().unwrap_or_default().trim();
    if path.is_empty()
        || path.starts_with("http://")
        || path.starts_with("https://")
        || path.starts_with("//")
    {
        return None;
    }

    if !path.starts_with('/') {
        if let Some(key) = normalize_relative(&format!("{}/{}", DOC_ROOT, path)) {
            if files.contains(&key) {
                // Present but outside doc_root
                return key.starts_with("doc_root/").then_some(key);
            }
        }
    }

    let file_name = path.rsplit(['/', '\\']).next()?;
    let fallback = format!("{}/{}", DOC_ROOT, file_name);
    files.contains(&fallback).then_some(fallback)
}

fn is_image(relative: &str) -> bool {
    relative
        .rsplit_once('.')
        .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Remove unreferenced `doc_root/` images from the set, returning what was dropped.
///
/// Without a readable `doc_root/doc.md` the set is left unchanged.
pub fn prune_unreferenced(files: &mut ResolvedFileSet) -> Vec<String> {
    let Some(doc_path) = files.get(DOC_FILE) else {
        return Vec::new();
    };
    let markdown = match fs::read_to_string(doc_path) {
        Ok(markdown) => markdown,
        Err(e) => {
            tracing::warn!("Cannot read {}: {}", doc_path.display(), e);
            return Vec::new();
        }
    };

    let referenced: BTreeSet<String> = extract_references(&markdown)
        .iter()
        .filter_map(|reference| resolve_reference(reference, files))
        .collect();

    let dropped: Vec<String> = files
        .relative_paths()
        .filter(|key| {
            key.starts_with("doc_root/")
                && *key != DOC_FILE
                && is_image(key)
                && !referenced.contains(*key)
        })
        .map(str::to_string)
        .collect();

    for key in &dropped {
        files.remove(key);
        tracing::debug!("Dropping unreferenced doc image {}", key);
    }
    dropped
}
