//! Extension discovery and loading.
//!
//! A full load clears the registry and both caches, registers the builtins,
//! then compiles every enabled extension file independently. A file that
//! fails to compile is reported and skipped; the rest still load.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::cache::{ArtifactCache, CommandMetadata, MetadataCache};
use crate::command::Command;
use crate::compiler::{CompileError, Compiler, SourceForm, SourceUnit};
use crate::host::HostContext;
use crate::registry::CommandRegistry;

/// Outcome of a full load pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Files that produced at least one command.
    pub loaded: usize,
    /// Files that failed to compile.
    pub failed: usize,
    /// Commands registered from extension files.
    pub commands: usize,
}

/// Lists enabled extension sources in `dir`, sorted by file name.
///
/// Only the top level is searched. Files carrying the disabled marker do not
/// have a recognized source extension and are skipped.
pub fn discover(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| SourceForm::from_path(p).is_some())
        .collect()
}

/// Compiles extension files into registered commands.
pub struct ExtensionLoader {
    extensions_dir: PathBuf,
    compiler: Arc<dyn Compiler>,
    host: Arc<HostContext>,
    builtins: Vec<Arc<dyn Command>>,
    artifacts: ArtifactCache,
    metadata: MetadataCache,
}

impl ExtensionLoader {
    pub fn new(
        extensions_dir: impl Into<PathBuf>,
        compiler: Arc<dyn Compiler>,
        host: Arc<HostContext>,
        metadata: MetadataCache,
    ) -> Self {
        Self {
            extensions_dir: extensions_dir.into(),
            compiler,
            host,
            builtins: Vec::new(),
            artifacts: ArtifactCache::new(),
            metadata,
        }
    }

    /// Sets the commands registered ahead of every extension.
    pub fn with_builtins(mut self, builtins: Vec<Arc<dyn Command>>) -> Self {
        self.builtins = builtins;
        self
    }

    pub fn extensions_dir(&self) -> &Path {
        &self.extensions_dir
    }

    pub fn host(&self) -> &Arc<HostContext> {
        &self.host
    }

    pub fn artifacts(&self) -> &ArtifactCache {
        &self.artifacts
    }

    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    /// Rebuilds `registry` from the builtins and the extensions directory,
    /// recompiling every file from disk.
    pub async fn load_all(&mut self, registry: &mut CommandRegistry) -> LoadSummary {
        registry.clear();
        self.artifacts.clear();
        self.host.exports().clear();
        if let Err(e) = self.metadata.clear() {
            self.host
                .reporter()
                .error("cache_save_error", &[&format!("{:#}", e)]);
        }

        for builtin in &self.builtins {
            registry.register(Arc::clone(builtin));
        }

        let mut summary = LoadSummary::default();
        for path in discover(&self.extensions_dir) {
            match self.load_file(&path, registry).await {
                Ok(count) => {
                    summary.loaded += 1;
                    summary.commands += count;
                }
                Err(e) => {
                    summary.failed += 1;
                    self.report_failure(&path, &e);
                }
            }
        }

        if let Err(e) = self.metadata.save() {
            self.host
                .reporter()
                .error("cache_save_error", &[&format!("{:#}", e)]);
        }

        tracing::info!(
            loaded = summary.loaded,
            failed = summary.failed,
            commands = summary.commands,
            "extensions loaded"
        );
        summary
    }

    /// Loads one file into `registry`, reusing its cached artifact when
    /// present. A cached artifact that fails to instantiate is evicted and
    /// the file is compiled once more.
    ///
    /// Returns the number of commands registered.
    pub async fn load_file(
        &mut self,
        path: &Path,
        registry: &mut CommandRegistry,
    ) -> Result<usize, CompileError> {
        if let Some(artifact) = self.artifacts.get(path) {
            match artifact.instantiate(&self.host) {
                Ok(commands) => return Ok(self.install(path, commands, registry)),
                Err(e) => {
                    self.host
                        .reporter()
                        .debug(&format!("cached artifact for {} failed: {}", path.display(), e));
                    self.artifacts.evict(path);
                }
            }
        }

        let unit = SourceUnit::read(path)?;
        let artifact = self.compiler.compile(unit, Arc::clone(&self.host)).await?;
        let commands = artifact.instantiate(&self.host)?;
        self.artifacts.insert(path, artifact);
        Ok(self.install(path, commands, registry))
    }

    /// Evicts the cached artifact for `path` and loads the file again.
    pub async fn recompile(
        &mut self,
        path: &Path,
        registry: &mut CommandRegistry,
    ) -> Result<usize, CompileError> {
        self.artifacts.evict(path);
        let count = self.load_file(path, registry).await?;
        if let Err(e) = self.metadata.save() {
            self.host
                .reporter()
                .error("cache_save_error", &[&format!("{:#}", e)]);
        }
        Ok(count)
    }

    fn install(
        &self,
        path: &Path,
        commands: Vec<Arc<dyn Command>>,
        registry: &mut CommandRegistry,
    ) -> usize {
        let count = commands.len();
        // Bookkeeping is skipped while the stored entry still matches the
        // bytes on disk.
        let current = self.metadata.try_get(path).is_some();

        for command in commands {
            if !current {
                let metadata = CommandMetadata::new(command.info(), path);
                if let Err(e) = self.metadata.update(path, metadata) {
                    tracing::warn!(path = %path.display(), "failed to record metadata: {}", e);
                }
            }
            self.host.reporter().debug(&format!(
                "registered '{}' from {}",
                command.info().name,
                path.display()
            ));
            registry.register(command);
        }
        count
    }

    fn report_failure(&self, path: &Path, error: &CompileError) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tracing::warn!(path = %path.display(), code = error.code(), "{}", error);
        self.host.reporter().error("compile_error", &[&name, error]);
    }
}
