//! Named-export table for cross-extension calls.
//!
//! An extension publishes a frozen value under a string key with
//! `export(key, value)` while it loads; any extension can fetch it later with
//! `imported(key)`, which yields `None` for unknown keys.

use starlark::values::OwnedFrozenValue;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
pub struct ExportTable {
    entries: Mutex<HashMap<String, OwnedFrozenValue>>,
}

impl ExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, OwnedFrozenValue>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publishes `value` under `key` (case-insensitive), replacing any
    /// earlier export.
    pub fn publish(&self, key: &str, value: OwnedFrozenValue) {
        self.lock().insert(key.to_lowercase(), value);
    }

    pub fn lookup(&self, key: &str) -> Option<OwnedFrozenValue> {
        self.lock().get(&key.to_lowercase()).cloned()
    }

    /// Sorted export keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl std::fmt::Debug for ExportTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportTable")
            .field("keys", &self.keys())
            .finish()
    }
}
