//! Extension lifecycle: enable, disable and import.
//!
//! Enabled state lives entirely in the filename. Disabling appends
//! [`DISABLED_SUFFIX`] and enabling strips it; file bytes are never touched.
//! None of these operations reload the registry. Callers request a reload
//! afterwards.

use chrono::Local;
use futures_util::StreamExt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::compiler::{SourceForm, SCRIPT_EXTENSION};

/// Filename marker excluding an extension from discovery.
pub const DISABLED_SUFFIX: &str = ".disable";

/// Errors from enable and disable.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no extension name given")]
    MissingName,

    #[error("'{name}' not found")]
    NotFound { name: String },

    #[error("multiple extensions match '{name}'")]
    Ambiguous { name: String, candidates: Vec<String> },

    #[error("'{}' already exists", .path.display())]
    AlreadyExists { path: PathBuf },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors from import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with {0}")]
    Status(reqwest::StatusCode),

    #[error("'{}' already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Returns true if `path` carries the disabled marker.
pub fn is_disabled(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.to_ascii_lowercase().ends_with(DISABLED_SUFFIX))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Name of `path` with the disabled marker removed.
fn strip_disabled(name: &str) -> Option<&str> {
    let cut = name.len().checked_sub(DISABLED_SUFFIX.len())?;
    name.get(cut..)
        .filter(|tail| tail.eq_ignore_ascii_case(DISABLED_SUFFIX))
        .map(|_| &name[..cut])
}

/// Name a source file is matched under: the file name without the disabled
/// marker and without its final extension (`greet.v2.star` is `greet.v2`).
fn stem_of(name: &str) -> &str {
    let name = strip_disabled(name).unwrap_or(name);
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
}

/// File-level operations on the extensions directory.
#[derive(Debug, Clone)]
pub struct ExtensionManager {
    extensions_dir: PathBuf,
    http: reqwest::Client,
}

impl ExtensionManager {
    pub fn new(extensions_dir: impl Into<PathBuf>) -> Self {
        Self::with_client(extensions_dir, reqwest::Client::new())
    }

    /// Manager that downloads through `http`.
    pub fn with_client(extensions_dir: impl Into<PathBuf>, http: reqwest::Client) -> Self {
        Self {
            extensions_dir: extensions_dir.into(),
            http,
        }
    }

    pub fn extensions_dir(&self) -> &Path {
        &self.extensions_dir
    }

    /// Files in the extensions directory, sorted by name.
    fn entries(&self) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.extensions_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Disabled extension files, sorted by name.
    pub fn disabled(&self) -> io::Result<Vec<PathBuf>> {
        if !self.extensions_dir.is_dir() {
            return Ok(Vec::new());
        }
        Ok(self
            .entries()?
            .into_iter()
            .filter(|p| {
                strip_disabled(&file_name(p))
                    .is_some_and(|inner| SourceForm::from_path(Path::new(inner)).is_some())
            })
            .collect())
    }

    /// Re-enables a disabled extension named by exact filename
    /// (`greet.star.disable`) or by command name (`greet`).
    ///
    /// Returns the enabled path.
    pub fn enable(&self, name: &str) -> Result<PathBuf, LifecycleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LifecycleError::MissingName);
        }

        let disabled = if strip_disabled(name).is_some() {
            let path = self.extensions_dir.join(name);
            if !path.is_file() {
                return Err(LifecycleError::NotFound {
                    name: name.to_string(),
                });
            }
            path
        } else {
            let candidates: Vec<PathBuf> = self
                .disabled()?
                .into_iter()
                .filter(|p| stem_of(&file_name(p)).eq_ignore_ascii_case(name))
                .collect();
            single_candidate(name, candidates)?
        };

        let enabled_name = strip_disabled(&file_name(&disabled))
            .map(str::to_string)
            .unwrap_or_default();
        let enabled = self.extensions_dir.join(enabled_name);
        rename_new(&disabled, &enabled)?;
        tracing::info!(from = %disabled.display(), to = %enabled.display(), "extension enabled");
        Ok(enabled)
    }

    /// Disables an extension named by exact filename (`greet.star`) or by
    /// command name (`greet`).
    ///
    /// Returns the path that was disabled (its name before the rename).
    pub fn disable(&self, name: &str) -> Result<PathBuf, LifecycleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LifecycleError::MissingName);
        }

        let source = if SourceForm::from_path(Path::new(name)).is_some() {
            let path = self.extensions_dir.join(name);
            if !path.is_file() {
                return Err(LifecycleError::NotFound {
                    name: name.to_string(),
                });
            }
            path
        } else {
            let candidates: Vec<PathBuf> = if self.extensions_dir.is_dir() {
                self.entries()?
                    .into_iter()
                    .filter(|p| SourceForm::from_path(p).is_some())
                    .filter(|p| stem_of(&file_name(p)).eq_ignore_ascii_case(name))
                    .collect()
            } else {
                Vec::new()
            };
            single_candidate(name, candidates)?
        };

        let disabled = self
            .extensions_dir
            .join(format!("{}{}", file_name(&source), DISABLED_SUFFIX));
        rename_new(&source, &disabled)?;
        tracing::info!(from = %source.display(), to = %disabled.display(), "extension disabled");
        Ok(source)
    }

    /// Fetches `url` and returns the body as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String, ImportError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ImportError::Status(response.status()));
        }
        Ok(response.text().await?)
    }

    /// Downloads `url` into the extensions directory.
    ///
    /// The file is named after the URL's last path segment, or
    /// `extension_<timestamp>.star` when there is none. An existing file is
    /// never overwritten, and a failed download leaves nothing behind.
    pub async fn import(&self, url: &str) -> Result<PathBuf, ImportError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ImportError::Status(response.status()));
        }

        let name = import_file_name(response.url());
        let target = self.extensions_dir.join(&name);
        if target.exists() {
            return Err(ImportError::AlreadyExists(target));
        }
        tokio::fs::create_dir_all(&self.extensions_dir).await?;

        match write_body(response, &target).await {
            Ok(()) => {
                tracing::info!(url, path = %target.display(), "extension imported");
                Ok(target)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&target).await;
                Err(e)
            }
        }
    }
}

fn single_candidate(name: &str, mut candidates: Vec<PathBuf>) -> Result<PathBuf, LifecycleError> {
    match candidates.len() {
        0 => Err(LifecycleError::NotFound {
            name: name.to_string(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(LifecycleError::Ambiguous {
            name: name.to_string(),
            candidates: candidates.iter().map(|p| file_name(p)).collect(),
        }),
    }
}

fn rename_new(from: &Path, to: &Path) -> Result<(), LifecycleError> {
    if to.exists() {
        return Err(LifecycleError::AlreadyExists {
            path: to.to_path_buf(),
        });
    }
    fs::rename(from, to)?;
    Ok(())
}

/// Target filename for an imported extension.
pub fn import_file_name(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "extension_{}.{}",
                Local::now().format("%Y%m%d%H%M%S"),
                SCRIPT_EXTENSION
            )
        })
}

async fn write_body(response: reqwest::Response, target: &Path) -> Result<(), ImportError> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{http_client, FixtureServer};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn setup(files: &[&str]) -> (TempDir, ExtensionManager) {
        let dir = TempDir::new().unwrap();
        for name in files {
            fs::write(dir.path().join(name), format!("# {}\n", name)).unwrap();
        }
        let manager = ExtensionManager::new(dir.path());
        (dir, manager)
    }

    #[test]
    fn test_disable_enable_round_trip() {
        let (dir, manager) = setup(&["greet.star"]);
        let before = fs::read(dir.path().join("greet.star")).unwrap();

        manager.disable("greet").unwrap();
        assert!(!dir.path().join("greet.star").exists());
        assert!(dir.path().join("greet.star.disable").exists());

        let enabled = manager.enable("greet").unwrap();
        assert_eq!(enabled, dir.path().join("greet.star"));
        assert_eq!(fs::read(&enabled).unwrap(), before);
    }

    #[test]
    fn test_exact_filenames() {
        let (dir, manager) = setup(&["tools.bzl"]);
        manager.disable("tools.bzl").unwrap();
        manager.enable("tools.bzl.disable").unwrap();
        assert!(dir.path().join("tools.bzl").exists());
    }

    #[test]
    fn test_name_match_is_case_insensitive() {
        let (dir, manager) = setup(&["Greet.star"]);
        manager.disable("GREET").unwrap();
        assert!(dir.path().join("Greet.star.disable").exists());
    }

    #[test]
    fn test_stem_keeps_inner_dots() {
        assert_eq!(stem_of("greet.v2.star"), "greet.v2");
        assert_eq!(stem_of("greet.v2.star.disable"), "greet.v2");
        assert_eq!(stem_of("tools.bzl"), "tools");
    }

    #[test]
    fn test_dotted_names_match_only_their_file() {
        let (dir, manager) = setup(&["greet.star", "greet.v2.star"]);

        let source = manager.disable("greet.v2").unwrap();
        assert_eq!(source, dir.path().join("greet.v2.star"));
        assert!(dir.path().join("greet.star").exists());

        let source = manager.disable("greet").unwrap();
        assert_eq!(source, dir.path().join("greet.star"));

        let enabled = manager.enable("greet.v2").unwrap();
        assert_eq!(enabled, dir.path().join("greet.v2.star"));
        assert!(dir.path().join("greet.star.disable").exists());
    }

    #[test]
    fn test_ambiguous_enable_refuses() {
        let (dir, manager) = setup(&["greet.star.disable", "greet.bzl.disable"]);
        match manager.enable("greet") {
            Err(LifecycleError::Ambiguous { candidates, .. }) => {
                assert_eq!(candidates, vec!["greet.bzl.disable", "greet.star.disable"]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
        assert!(dir.path().join("greet.star.disable").exists());
        assert!(dir.path().join("greet.bzl.disable").exists());
    }

    #[test]
    fn test_missing_and_empty_names() {
        let (_dir, manager) = setup(&[]);
        assert!(matches!(manager.enable("  "), Err(LifecycleError::MissingName)));
        assert!(matches!(manager.disable("ghost"), Err(LifecycleError::NotFound { .. })));
        assert!(matches!(manager.enable("ghost.star.disable"), Err(LifecycleError::NotFound { .. })));
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let (_dir, manager) = setup(&["greet.star", "greet.star.disable"]);
        assert!(matches!(
            manager.disable("greet.star"),
            Err(LifecycleError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_disabled_listing() {
        let (_dir, manager) = setup(&["a.star.disable", "b.star", "notes.txt.disable"]);
        let names: Vec<_> = manager.disabled().unwrap().iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.star.disable"]);
    }

    #[tokio::test]
    async fn test_import_streams_body_into_new_file() {
        let server = FixtureServer::start(|_| vec![("/ext/greet.star".to_string(), "x = 1\n".to_string())]);
        let dir = TempDir::new().unwrap();
        let manager = ExtensionManager::with_client(dir.path(), http_client());

        let path = manager.import(&server.url("/ext/greet.star")).await.unwrap();
        assert_eq!(path, dir.path().join("greet.star"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 1\n");

        let again = manager.import(&server.url("/ext/greet.star")).await;
        assert!(matches!(again, Err(ImportError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_import_error_status_leaves_nothing() {
        let server = FixtureServer::start(|_| Vec::new());
        let dir = TempDir::new().unwrap();
        let manager = ExtensionManager::with_client(dir.path(), http_client());

        let result = manager.import(&server.url("/missing.star")).await;
        match result {
            Err(ImportError::Status(status)) => assert_eq!(status.as_u16(), 404),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_text() {
        let server = FixtureServer::start(|_| vec![("/notes".to_string(), "hello".to_string())]);
        let dir = TempDir::new().unwrap();
        let manager = ExtensionManager::with_client(dir.path(), http_client());
        assert_eq!(manager.fetch_text(&server.url("/notes")).await.unwrap(), "hello");
    }

    #[test]
    fn test_import_file_name() {
        let url = reqwest::Url::parse("https://example.com/ext/greet.star?raw=1").unwrap();
        assert_eq!(import_file_name(&url), "greet.star");

        let url = reqwest::Url::parse("https://example.com/").unwrap();
        let name = import_file_name(&url);
        assert!(name.starts_with("extension_"), "{}", name);
        assert!(name.ends_with(".star"), "{}", name);
    }

    #[test]
    fn test_is_disabled() {
        assert!(is_disabled(Path::new("x.star.DISABLE")));
        assert!(!is_disabled(Path::new("x.star")));
    }
}
