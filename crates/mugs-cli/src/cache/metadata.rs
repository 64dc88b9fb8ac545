//! Persisted command metadata, keyed by extension file path.
//!
//! An entry records what a file declared the last time it loaded, together
//! with the content hash and modification time of the bytes it was loaded
//! from. The hash is authoritative: a differing timestamp is a cheap early
//! reject, but a matching timestamp never stands in for the hash check.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{read_json_or_default, write_json_atomic};
use crate::command::CommandInfo;
use crate::hash::hash_file;

/// Declared fields of a loaded command plus the identity of its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub author: String,
    pub version: String,
    pub file_path: PathBuf,
    /// BLAKE3 hex digest of the file bytes.
    pub hash: String,
    pub last_modified: DateTime<Utc>,
}

impl CommandMetadata {
    /// Builds an entry from a command's declared fields. Hash and timestamp
    /// are filled in by [`MetadataCache::update`].
    pub fn new(info: &CommandInfo, file_path: &Path) -> Self {
        Self {
            name: info.name.clone(),
            description: info.description.clone(),
            aliases: info.aliases.clone(),
            author: info.author.clone(),
            version: info.version.clone(),
            file_path: file_path.to_path_buf(),
            hash: String::new(),
            last_modified: DateTime::<Utc>::MIN_UTC,
        }
    }
}

fn modified_time(path: &Path) -> io::Result<DateTime<Utc>> {
    Ok(DateTime::<Utc>::from(std::fs::metadata(path)?.modified()?))
}

fn table_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Metadata table persisted as a single JSON file.
#[derive(Debug)]
pub struct MetadataCache {
    path: PathBuf,
    table: Mutex<BTreeMap<String, CommandMetadata>>,
    load_warning: Option<String>,
}

impl MetadataCache {
    /// Opens the table stored at `path`. Missing or corrupt files start empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (table, load_warning) = read_json_or_default(&path);
        Self {
            path,
            table: Mutex::new(table),
            load_warning,
        }
    }

    /// Location of the persisted table.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Why the file on disk was discarded at open, if it was.
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, CommandMetadata>> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the stored entry for `file` if it still describes the bytes on
    /// disk: both the modification time and a freshly computed content hash
    /// must match.
    pub fn try_get(&self, file: &Path) -> Option<CommandMetadata> {
        let entry = self.lock().get(&table_key(file)).cloned()?;

        let modified = modified_time(file).ok()?;
        if modified != entry.last_modified {
            return None;
        }
        let hash = hash_file(file).ok()?;
        if hash != entry.hash {
            return None;
        }
        Some(entry)
    }

    /// Returns the stored entry without validating it against disk.
    pub fn get(&self, file: &Path) -> Option<CommandMetadata> {
        self.lock().get(&table_key(file)).cloned()
    }

    /// Overwrites the entry for `file`, stamping it with the current hash and
    /// modification time of the file.
    pub fn update(&self, file: &Path, mut metadata: CommandMetadata) -> io::Result<()> {
        metadata.hash = hash_file(file)?;
        metadata.last_modified = modified_time(file)?;
        metadata.file_path = file.to_path_buf();
        self.lock().insert(table_key(file), metadata);
        Ok(())
    }

    /// Persists the whole table, replacing the file atomically.
    pub fn save(&self) -> Result<()> {
        let table = self.lock();
        write_json_atomic(&self.path, &*table)
    }

    /// Empties the table and persists the empty state.
    pub fn clear(&self) -> Result<()> {
        let mut table = self.lock();
        table.clear();
        write_json_atomic(&self.path, &*table)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn info(name: &str) -> CommandInfo {
        CommandInfo::new(name, "test command")
    }

    fn setup() -> (TempDir, MetadataCache, PathBuf) {
        let dir = TempDir::new().unwrap();
        let cache = MetadataCache::open(dir.path().join("command_cache.json"));
        let file = dir.path().join("greet.star");
        fs::write(&file, "original").unwrap();
        (dir, cache, file)
    }

    #[test]
    fn test_update_then_hit() {
        let (_dir, cache, file) = setup();
        cache.update(&file, CommandMetadata::new(&info("greet"), &file)).unwrap();

        let entry = cache.try_get(&file).unwrap();
        assert_eq!(entry.name, "greet");
        assert_eq!(entry.hash, hash_file(&file).unwrap());
    }

    #[test]
    fn test_content_change_misses() {
        let (_dir, cache, file) = setup();
        cache.update(&file, CommandMetadata::new(&info("greet"), &file)).unwrap();

        fs::write(&file, "changed!").unwrap();
        assert!(cache.try_get(&file).is_none());
    }

    #[test]
    fn test_matching_timestamp_does_not_override_hash() {
        let (_dir, cache, file) = setup();
        cache.update(&file, CommandMetadata::new(&info("greet"), &file)).unwrap();

        // Tamper with the stored hash while the timestamp still matches.
        {
            let mut table = cache.lock();
            let entry = table.get_mut(&table_key(&file)).unwrap();
            entry.hash = "0".repeat(64);
        }
        assert!(cache.try_get(&file).is_none());
    }

    #[test]
    fn test_save_and_reopen() {
        let (dir, cache, file) = setup();
        cache.update(&file, CommandMetadata::new(&info("greet"), &file)).unwrap();
        cache.save().unwrap();

        let reopened = MetadataCache::open(dir.path().join("command_cache.json"));
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(&file), cache.get(&file));
        assert!(reopened.try_get(&file).is_some());
    }

    #[test]
    fn test_clear_persists_empty_table() {
        let (dir, cache, file) = setup();
        cache.update(&file, CommandMetadata::new(&info("greet"), &file)).unwrap();
        cache.save().unwrap();
        cache.clear().unwrap();

        assert!(cache.try_get(&file).is_none());
        let reopened = MetadataCache::open(dir.path().join("command_cache.json"));
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_corrupt_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("command_cache.json");
        fs::write(&path, "not json").unwrap();
        let cache = MetadataCache::open(&path);
        assert!(cache.is_empty());
        assert!(cache.load_warning().is_some());
        assert!(MetadataCache::open(dir.path().join("none.json")).load_warning().is_none());
    }
}
