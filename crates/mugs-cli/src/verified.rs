//! Verified extensions.
//!
//! A published `verified_hashes.json` maps extension file names to the
//! content hash of a reviewed revision. A file counts as verified only while
//! its current bytes hash to the published value, so any local edit drops
//! the mark. The table is fetched at most once per session.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::hash::hash_file;
use crate::lifecycle::ExtensionManager;
use crate::report::Reporter;

/// Marker appended to verified commands in listings.
pub const VERIFIED_MARK: &str = "✅";

/// File name to expected content hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedHashes {
    by_name: HashMap<String, String>,
}

impl VerifiedHashes {
    /// Parses a JSON object of `"file name": "hex hash"` pairs.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(text)?;
        Ok(Self {
            by_name: raw
                .into_iter()
                .map(|(name, hash)| (name.to_lowercase(), hash.trim().to_ascii_lowercase()))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Published hash for `file_name`, matched case-insensitively.
    pub fn expected(&self, file_name: &str) -> Option<&str> {
        self.by_name.get(&file_name.to_lowercase()).map(String::as_str)
    }

    /// True if `path` is listed and its content hashes to the listed value.
    pub fn is_verified(&self, path: &Path) -> bool {
        let Some(expected) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| self.expected(n))
        else {
            return false;
        };
        match hash_file(path) {
            Ok(actual) => actual == expected,
            Err(e) => {
                tracing::debug!(path = %path.display(), "cannot hash for verification: {}", e);
                false
            }
        }
    }
}

/// Session-wide view of the published hashes.
pub struct VerifiedExtensions {
    url: Option<String>,
    manager: Arc<ExtensionManager>,
    reporter: Arc<dyn Reporter>,
    hashes: OnceCell<VerifiedHashes>,
}

impl VerifiedExtensions {
    /// Fetches from `url` on first use. An empty `url` turns verification off.
    pub fn new(url: &str, manager: Arc<ExtensionManager>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            url: Some(url.trim()).filter(|u| !u.is_empty()).map(str::to_string),
            manager,
            reporter,
            hashes: OnceCell::new(),
        }
    }

    /// The published table. A failed fetch is reported once and treated as
    /// an empty table for the rest of the session.
    pub async fn hashes(&self) -> &VerifiedHashes {
        self.hashes.get_or_init(|| self.fetch()).await
    }

    pub async fn is_verified(&self, path: &Path) -> bool {
        self.hashes().await.is_verified(path)
    }

    async fn fetch(&self) -> VerifiedHashes {
        let Some(url) = &self.url else {
            return VerifiedHashes::default();
        };
        let parsed = match self.manager.fetch_text(url).await {
            Ok(text) => VerifiedHashes::from_json(&text).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match parsed {
            Ok(hashes) => {
                tracing::debug!(url = url.as_str(), count = hashes.len(), "verified hashes loaded");
                hashes
            }
            Err(message) => {
                self.reporter.error("verified_load_error", &[&message]);
                VerifiedHashes::default()
            }
        }
    }
}
