//! Persisted application settings.
//!
//! Settings live in `settings.json` under the platform config directory. A
//! missing file is created with defaults; a file that fails to parse is
//! ignored with a warning and defaults are used for the session.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::compiler::DEFAULT_TIMEOUT_SECONDS;

/// Settings file name inside the config directory.
pub const SETTINGS_FILE: &str = "settings.json";
/// Metadata cache file name inside the data directory.
pub const METADATA_CACHE_FILE: &str = "command_cache.json";
/// User alias file name inside the data directory.
pub const ALIASES_FILE: &str = "aliases.json";

const APP_DIR: &str = "mugs";

/// Published hashes of extensions reviewed as safe.
pub const DEFAULT_VERIFIED_HASHES_URL: &str =
    "https://raw.githubusercontent.com/shead0shead/mugs/main/verified_hashes.json";
/// Extension store catalog.
pub const DEFAULT_STORE_URL: &str =
    "https://raw.githubusercontent.com/shead0shead/mugs-store/main/catalog.json";
/// Smallest accepted evaluation timeout.
pub const MIN_TIMEOUT_SECONDS: u64 = 1;

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory scanned for extension files.
    pub extensions_dir: PathBuf,
    /// Directory holding the metadata cache and alias table.
    pub data_dir: PathBuf,
    /// Upper bound on a single extension evaluation. Values below
    /// [`MIN_TIMEOUT_SECONDS`] are raised to it on load.
    pub eval_timeout_seconds: u64,
    /// Show debug lines from the loader and from extensions.
    pub debug_output: bool,
    /// Offer a completion hint when a command is not found.
    pub enable_suggestions: bool,
    /// Where `verified_hashes.json` is fetched from. Empty disables the check.
    pub verified_hashes_url: String,
    /// Where the store catalog is fetched from.
    pub store_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            extensions_dir: data_dir.join("extensions"),
            data_dir,
            eval_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            debug_output: false,
            enable_suggestions: true,
            verified_hashes_url: DEFAULT_VERIFIED_HASHES_URL.to_string(),
            store_url: DEFAULT_STORE_URL.to_string(),
        }
    }
}

/// Platform data directory for mugs, or `.mugs` in the working directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".mugs"))
}

impl Settings {
    /// Default location of the settings file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Loads settings from `path`.
    ///
    /// A missing file is created with defaults. A corrupt file yields
    /// defaults and is left untouched.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save(path)?;
            return Ok(settings);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        match serde_json::from_str::<Self>(&content) {
            Ok(settings) => Ok(settings.normalized()),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring corrupt settings: {}", e);
                Ok(Self::default())
            }
        }
    }

    fn normalized(mut self) -> Self {
        if self.eval_timeout_seconds < MIN_TIMEOUT_SECONDS {
            tracing::warn!(
                value = self.eval_timeout_seconds,
                "eval_timeout_seconds raised to {}",
                MIN_TIMEOUT_SECONDS
            );
            self.eval_timeout_seconds = MIN_TIMEOUT_SECONDS;
        }
        self
    }

    /// Writes settings to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))
    }

    /// Creates the extension and data directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.extensions_dir, &self.data_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn metadata_cache_path(&self) -> PathBuf {
        self.data_dir.join(METADATA_CACHE_FILE)
    }

    pub fn aliases_path(&self) -> PathBuf {
        self.data_dir.join(ALIASES_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config").join(SETTINGS_FILE);

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.eval_timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"debug_output": true, "eval_timeout_seconds": 5}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert!(settings.debug_output);
        assert_eq!(settings.eval_timeout_seconds, 5);
        assert!(settings.enable_suggestions);
    }

    #[test]
    fn test_zero_timeout_is_raised() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"eval_timeout_seconds": 0}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.eval_timeout_seconds, MIN_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_remote_urls_default_and_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"verified_hashes_url": ""}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.verified_hashes_url, "");
        assert_eq!(settings.store_url, DEFAULT_STORE_URL);
    }

    #[test]
    fn test_derived_paths() {
        let settings = Settings {
            data_dir: PathBuf::from("/tmp/mugs-data"),
            ..Settings::default()
        };
        assert_eq!(
            settings.metadata_cache_path(),
            PathBuf::from("/tmp/mugs-data/command_cache.json")
        );
        assert_eq!(settings.aliases_path(), PathBuf::from("/tmp/mugs-data/aliases.json"));
    }
}
