//! Live name/alias → command map.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::aliases::AliasStore;
use crate::command::Command;

/// Owns every registered command, keyed by lowercased name and by each
/// lowercased declared alias. User aliases are consulted first on lookup.
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
    aliases: Arc<AliasStore>,
    /// Registrations made by running commands, applied between commands.
    pending: Mutex<Vec<Arc<dyn Command>>>,
}

impl CommandRegistry {
    pub fn new(aliases: Arc<AliasStore>) -> Self {
        Self {
            commands: HashMap::new(),
            aliases,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// User alias table consulted by [`resolve`](Self::resolve).
    pub fn aliases(&self) -> &Arc<AliasStore> {
        &self.aliases
    }

    /// Stores `command` under its name and every declared alias. Colliding
    /// keys are overwritten by the newer registration.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        let info = command.info();
        for key in std::iter::once(&info.name).chain(info.aliases.iter()) {
            self.commands.insert(key.to_lowercase(), Arc::clone(&command));
        }
    }

    /// Finds a command by name or alias, case-insensitively. A user alias
    /// takes precedence over declared names and aliases.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Command>> {
        let mut key = name.to_lowercase();
        if let Some(target) = self.aliases.get(&key) {
            key = target;
        }
        self.commands.get(&key).cloned()
    }

    /// Distinct commands sorted by name.
    pub fn list_all(&self) -> Vec<Arc<dyn Command>> {
        let mut by_name: BTreeMap<String, Arc<dyn Command>> = BTreeMap::new();
        for (key, command) in &self.commands {
            let name = command.info().name.to_lowercase();
            // A shadowed command can survive under one of its aliases; the
            // entry stored under the name itself wins.
            if *key == name || !by_name.contains_key(&name) {
                by_name.insert(name, Arc::clone(command));
            }
        }
        by_name.into_values().collect()
    }

    /// Registered keys (names and declared aliases) starting with `prefix`,
    /// case-insensitive, sorted ascending.
    pub fn prefix_search(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        let mut keys: Vec<String> = self
            .commands
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Remaining characters of the first key completing `prefix`.
    pub fn suggest(&self, prefix: &str) -> Option<String> {
        let first = self.prefix_search(prefix).into_iter().next()?;
        let typed = prefix.to_lowercase().len();
        (first.len() > typed).then(|| first[typed..].to_string())
    }

    /// True iff the first whitespace-delimited token is a registered key.
    /// Queues `command` for registration. Running commands only hold a
    /// shared reference, so their registrations wait here until
    /// [`register_pending`](Self::register_pending).
    pub fn defer(&self, command: Arc<dyn Command>) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push(command);
        }
    }

    /// Registers every queued command in queue order. Returns how many.
    pub fn register_pending(&mut self) -> usize {
        let queued = match self.pending.get_mut() {
            Ok(pending) => std::mem::take(pending),
            Err(_) => return 0,
        };
        let count = queued.len();
        for command in queued {
            self.register(command);
        }
        count
    }

    pub fn is_valid(&self, line: &str) -> bool {
        line.split_whitespace()
            .next()
            .is_some_and(|name| self.commands.contains_key(&name.to_lowercase()))
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        if let Ok(pending) = self.pending.get_mut() {
            pending.clear();
        }
    }

    /// Number of keys, aliases included.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
