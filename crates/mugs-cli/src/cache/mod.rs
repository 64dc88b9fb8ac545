//! Compiled-artifact and metadata caches, plus the JSON persistence helpers
//! shared with the alias store.

pub mod artifact;
pub mod metadata;

pub use artifact::ArtifactCache;
pub use metadata::{CommandMetadata, MetadataCache};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

/// Serializes `value` and atomically replaces `path` with it.
///
/// The new content is written to a temp file in the same directory and
/// renamed over the target while an exclusive lock is held on a sibling
/// `.lock` file, so readers never see a partial table and concurrent
/// writers from other processes are serialized.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let json = serde_json::to_vec_pretty(value).context("Failed to serialize table")?;

    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path(path))
        .with_context(|| format!("Failed to open lock for {}", path.display()))?;
    lock_file
        .lock_exclusive()
        .with_context(|| format!("Failed to lock {}", path.display()))?;

    let result = (|| -> Result<()> {
        let mut temp = tempfile::NamedTempFile::new_in(&parent)
            .context("Failed to create temp file")?;
        temp.write_all(&json).context("Failed to write temp file")?;
        temp.as_file().sync_all().context("Failed to flush temp file")?;
        temp.persist(path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    })();

    lock_file
        .unlock()
        .with_context(|| format!("Failed to unlock {}", path.display()))?;
    result
}

/// Reads a JSON table from `path`.
///
/// A missing file yields the default value. An unreadable or corrupt file
/// also yields the default, paired with a description of the problem for the
/// owner to surface, so a damaged table never blocks start-up.
pub(crate) fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> (T, Option<String>) {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return (T::default(), None),
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to read table: {}", e);
            return (T::default(), Some(e.to_string()));
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => (value, None),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring corrupt table: {}", e);
            (T::default(), Some(e.to_string()))
        }
    }
}
