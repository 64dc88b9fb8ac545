//! Host services handed to compiled extension code.
//!
//! Extension code never sees globals of the host process. Everything it can
//! reach is on the [`HostContext`] injected into each evaluation: the
//! reporting interface, a process-wide key/value store, and the named-export
//! table used for cross-extension calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::compiler::ExportTable;
use crate::report::Reporter;

/// Process-wide key/value store shared by all extensions.
///
/// Values are plain JSON so they can cross evaluator heaps. Each access takes
/// the lock for the whole read-modify-write.
#[derive(Debug, Default)]
pub struct SharedStore {
    values: Mutex<HashMap<String, serde_json::Value>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, serde_json::Value>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.lock().insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Applies `f` to the current value and stores its result, holding the
    /// lock across both steps. Nothing is stored when `f` fails.
    pub fn update<F, E>(&self, key: &str, f: F) -> Result<serde_json::Value, E>
    where
        F: FnOnce(Option<&serde_json::Value>) -> Result<serde_json::Value, E>,
    {
        let mut values = self.lock();
        let next = f(values.get(key))?;
        values.insert(key.to_string(), next.clone());
        Ok(next)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Capabilities available to extension code.
pub struct HostContext {
    reporter: Arc<dyn Reporter>,
    shared: SharedStore,
    exports: ExportTable,
}

impl HostContext {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            reporter,
            shared: SharedStore::new(),
            exports: ExportTable::new(),
        }
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    pub fn shared(&self) -> &SharedStore {
        &self.shared
    }

    pub fn exports(&self) -> &ExportTable {
        &self.exports
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("shared", &self.shared)
            .field("exports", &self.exports)
            .finish_non_exhaustive()
    }
}
