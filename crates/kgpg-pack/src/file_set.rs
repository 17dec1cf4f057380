use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Files selected for one plugin archive.
///
/// Keys are relative paths with forward slashes and no leading slash; iteration
/// is in ascending ordinal order so archives are built in a stable entry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFileSet {
    files: BTreeMap<String, PathBuf>,
}

impl ResolvedFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, keeping the first mapping for an already present path.
    ///
    /// Returns `false` when the path was already present or normalises to nothing.
    pub fn insert(&mut self, relative: &str, absolute: PathBuf) -> bool {
        let Some(key) = normalize_relative(relative) else {
            return false;
        };
        if self.files.contains_key(&key) {
            return false;
        }
        self.files.insert(key, absolute);
        true
    }

    pub fn contains(&self, relative: &str) -> bool {
        self.files.contains_key(relative)
    }

    pub fn get(&self, relative: &str) -> Option<&Path> {
        self.files.get(relative).map(PathBuf::as_path)
    }

    pub fn remove(&mut self, relative: &str) -> Option<PathBuf> {
        self.files.remove(relative)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn relative_paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Drop entries that are no longer regular files on disk
    pub fn retain_existing(&mut self) -> Vec<String> {
        let mut dropped = Vec::new();
        self.files.retain(|relative, absolute| {
            if absolute.is_file() {
                true
            } else {
                tracing::warn!("{} vanished before packaging, skipping", absolute.display());
                dropped.push(relative.clone());
                false
            }
        });
        dropped
    }

    /// Required relative paths that are absent from the set
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|path| !self.files.contains_key(**path))
            .copied()
            .collect()
    }
}

/// Normalise a relative path to forward slashes without `.` segments or a leading slash.
///
/// Returns `None` for empty paths and paths that climb above their root.
pub fn normalize_relative(relative: &str) -> Option<String> {
    let unified = relative.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                parts.pop()?;
            }
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
