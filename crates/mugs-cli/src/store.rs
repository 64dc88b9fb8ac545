//! Extension store catalog.
//!
//! The store publishes a JSON array of entries, each naming a downloadable
//! extension. Installing an entry goes through the same streaming download
//! as `import`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::lifecycle::{ExtensionManager, ImportError};

fn default_version() -> String {
    "1.0".to_string()
}

/// One extension offered by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(alias = "download_url")]
    pub download_url: String,
    #[serde(default)]
    pub author: String,
}

/// Errors from reading the catalog.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no store URL configured")]
    NotConfigured,

    #[error(transparent)]
    Fetch(#[from] ImportError),

    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parsed store catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<StoreEntry>,
}

impl Catalog {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        Ok(Self {
            entries: serde_json::from_str(text)?,
        })
    }

    pub fn entries(&self) -> &[StoreEntry] {
        &self.entries
    }

    /// Entries whose name or description contains `query`, ignoring case. An
    /// empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&StoreEntry> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&query)
                    || e.description.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// The entry named `name`, ignoring case.
    pub fn find(&self, name: &str) -> Option<&StoreEntry> {
        self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }
}

/// Remote store client.
pub struct Store {
    url: String,
    manager: Arc<ExtensionManager>,
}

impl Store {
    pub fn new(url: &str, manager: Arc<ExtensionManager>) -> Self {
        Self {
            url: url.trim().to_string(),
            manager,
        }
    }

    /// Fetches and parses the catalog.
    pub async fn catalog(&self) -> Result<Catalog, StoreError> {
        if self.url.is_empty() {
            return Err(StoreError::NotConfigured);
        }
        let text = self.manager.fetch_text(&self.url).await?;
        let catalog = Catalog::from_json(&text)?;
        tracing::debug!(url = self.url.as_str(), entries = catalog.entries().len(), "store catalog loaded");
        Ok(catalog)
    }

    /// Downloads `entry` into the extensions directory.
    pub async fn install(&self, entry: &StoreEntry) -> Result<PathBuf, ImportError> {
        self.manager.import(&entry.download_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{http_client, FixtureServer};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const CATALOG: &str = r#"[
        {"name": "Weather", "description": "Shows the forecast", "version": "2.1",
         "downloadUrl": "https://example.com/weather.star", "author": "someone"},
        {"name": "notes", "description": "Keeps quick notes",
         "download_url": "https://example.com/notes.bzl"}
    ]"#;

    #[test]
    fn test_catalog_parses_both_url_spellings() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.entries().len(), 2);
        assert_eq!(catalog.entries()[0].download_url, "https://example.com/weather.star");
        assert_eq!(catalog.entries()[1].download_url, "https://example.com/notes.bzl");
        assert_eq!(catalog.entries()[1].version, "1.0");
    }

    #[test]
    fn test_search_and_find_ignore_case() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let names = |q: &str| catalog.search(q).iter().map(|e| e.name.clone()).collect::<Vec<_>>();
        assert_eq!(names("FORECAST"), vec!["Weather"]);
        assert_eq!(names("note"), vec!["notes"]);
        assert_eq!(names("").len(), 2);
        assert!(names("zzz").is_empty());

        assert_eq!(catalog.find("weather").map(|e| e.version.as_str()), Some("2.1"));
        assert!(catalog.find("weath").is_none());
    }

    #[tokio::test]
    async fn test_install_from_served_catalog() {
        let server = FixtureServer::start(|base| {
            vec![
                (
                    "/catalog.json".to_string(),
                    format!(r#"[{{"name": "hello", "downloadUrl": "{}/files/hello.star"}}]"#, base),
                ),
                ("/files/hello.star".to_string(), "x = 1\n".to_string()),
            ]
        });
        let dir = TempDir::new().unwrap();
        let manager = Arc::new(ExtensionManager::with_client(dir.path(), http_client()));
        let store = Store::new(&server.url("/catalog.json"), manager);

        let catalog = store.catalog().await.unwrap();
        let entry = catalog.find("HELLO").unwrap();
        let path = store.install(entry).await.unwrap();
        assert_eq!(path, dir.path().join("hello.star"));
        assert_eq!(fs::read_to_string(path).unwrap(), "x = 1\n");
    }

    #[tokio::test]
    async fn test_catalog_errors() {
        let server = FixtureServer::start(|_| vec![("/catalog.json".to_string(), "{}".to_string())]);
        let dir = TempDir::new().unwrap();
        let manager = Arc::new(ExtensionManager::with_client(dir.path(), http_client()));

        let broken = Store::new(&server.url("/catalog.json"), Arc::clone(&manager));
        assert!(matches!(broken.catalog().await, Err(StoreError::Parse(_))));

        let missing = Store::new(&server.url("/nope.json"), Arc::clone(&manager));
        assert!(matches!(missing.catalog().await, Err(StoreError::Fetch(ImportError::Status(_)))));

        let unset = Store::new("", manager);
        assert!(matches!(unset.catalog().await, Err(StoreError::NotConfigured)));
    }
}
