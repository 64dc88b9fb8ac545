//! User-defined aliases.
//!
//! Separate from the aliases a command declares for itself. Keys and values
//! are stored lowercased and the table is persisted after every mutation.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::cache::{read_json_or_default, write_json_atomic};

/// Persisted alias → command table.
#[derive(Debug, Default)]
pub struct AliasStore {
    path: Option<PathBuf>,
    aliases: Mutex<BTreeMap<String, String>>,
    load_warning: Option<String>,
}

impl AliasStore {
    /// Opens the table stored at `path`. Missing or corrupt files start empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (loaded, load_warning): (BTreeMap<String, String>, _) = read_json_or_default(&path);
        let aliases = loaded
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
            .collect();
        Self {
            path: Some(path),
            aliases: Mutex::new(aliases),
            load_warning,
        }
    }

    /// A table that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Why the file on disk was discarded at open, if it was.
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.aliases.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, table: &BTreeMap<String, String>) -> Result<()> {
        match &self.path {
            Some(path) => write_json_atomic(path, table),
            None => Ok(()),
        }
    }

    /// Maps `alias` to `command`, replacing any previous mapping. The table
    /// in memory only changes once the new one is on disk.
    pub fn add(&self, command: &str, alias: &str) -> Result<()> {
        let mut table = self.lock();
        let mut next = table.clone();
        next.insert(alias.to_lowercase(), command.to_lowercase());
        self.persist(&next)?;
        *table = next;
        Ok(())
    }

    /// Removes `alias`. Returns false if it was not defined. The table in
    /// memory only changes once the new one is on disk.
    pub fn remove(&self, alias: &str) -> Result<bool> {
        let mut table = self.lock();
        let mut next = table.clone();
        if next.remove(&alias.to_lowercase()).is_none() {
            return Ok(false);
        }
        self.persist(&next)?;
        *table = next;
        Ok(true)
    }

    /// Returns the command name an alias maps to.
    pub fn get(&self, alias: &str) -> Option<String> {
        self.lock().get(&alias.to_lowercase()).cloned()
    }

    /// All aliases, sorted by alias.
    pub fn all(&self) -> Vec<(String, String)> {
        self.lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
