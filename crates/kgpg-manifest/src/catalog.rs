//! Catalog construction

use crate::types::{Catalog, CatalogEntry, Repository};
use chrono::{SecondsFormat, Utc};

impl Repository {
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            url: format!("https://github.com/{}/{}", owner, name),
        }
    }
}

impl Catalog {
    /// Build a catalog stamped with the current UTC time.
    ///
    /// Entries are sorted by id using ordinal comparison.
    pub fn new(
        tag: &str,
        repository: Repository,
        release_url: String,
        plugins: Vec<CatalogEntry>,
    ) -> Self {
        let mut catalog = Self {
            version: tag.to_string(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            repository,
            release_url,
            plugins,
        };
        catalog.sort_plugins();
        catalog
    }

    pub fn sort_plugins(&mut self) {
        self.plugins.sort_by(|a, b| a.id.cmp(&b.id));
    }

    pub fn get_plugin(&self, id: &str) -> Option<&CatalogEntry> {
        self.plugins.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Pretty-printed JSON with 2-space indentation
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
