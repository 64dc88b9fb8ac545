//! In-memory cache of compiled extension artifacts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compiler::Artifact;

/// Normalizes a path into a cache key: absolute, symlinks resolved when the
/// file exists, then case-folded.
pub fn canonical_key(path: &Path) -> String {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| absolute_path(path));
    absolute.to_string_lossy().to_lowercase()
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Compiled artifacts keyed by canonical path. At most one live entry per
/// path; inserting again replaces the previous artifact.
#[derive(Default)]
pub struct ArtifactCache {
    entries: HashMap<String, Arc<dyn Artifact>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Arc<dyn Artifact>> {
        self.entries.get(&canonical_key(path)).cloned()
    }

    pub fn insert(&mut self, path: &Path, artifact: Arc<dyn Artifact>) {
        self.entries.insert(canonical_key(path), artifact);
    }

    /// Drops the entry for `path`. Returns true if one existed.
    pub fn evict(&mut self, path: &Path) -> bool {
        self.entries.remove(&canonical_key(path)).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ArtifactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::compiler::CompileError;
    use crate::host::HostContext;

    struct EmptyArtifact;

    impl Artifact for EmptyArtifact {
        fn instantiate(
            &self,
            _host: &Arc<HostContext>,
        ) -> Result<Vec<Arc<dyn Command>>, CompileError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_key_is_case_folded() {
        let mut cache = ArtifactCache::new();
        cache.insert(Path::new("/Ext/Greet.star"), Arc::new(EmptyArtifact));

        assert!(cache.get(Path::new("/ext/greet.STAR")).is_some());
        assert_eq!(cache.len(), 1);

        cache.insert(Path::new("/EXT/greet.star"), Arc::new(EmptyArtifact));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_relative_and_absolute_agree() {
        let cwd = std::env::current_dir().unwrap();
        let mut cache = ArtifactCache::new();
        cache.insert(Path::new("some_ext.star"), Arc::new(EmptyArtifact));
        assert!(cache.get(&cwd.join("some_ext.star")).is_some());
    }

    #[test]
    fn test_evict_and_clear() {
        let mut cache = ArtifactCache::new();
        cache.insert(Path::new("/a.star"), Arc::new(EmptyArtifact));
        cache.insert(Path::new("/b.star"), Arc::new(EmptyArtifact));

        assert!(cache.evict(Path::new("/A.star")));
        assert!(!cache.evict(Path::new("/a.star")));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(Path::new("/b.star")).is_none());
    }
}
