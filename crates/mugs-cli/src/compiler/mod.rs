//! Extension compiler.
//!
//! Turns an extension source file into an [`Artifact`], and an artifact into
//! live command handles. Two source forms are accepted:
//!
//! - **Script** (`.star`): the module's final expression is a single
//!   `command(...)` value.
//! - **Declaration** (`.bzl`): the module calls `register(command(...))`
//!   once per command it defines.
//!
//! Before evaluation, `#load "other.star"` lines are expanded textually,
//! each included file at most once.

mod convert;
mod error;
pub(crate) mod eval;
mod exports;
mod include;
mod script;
pub mod stdlib;

pub use error::CompileError;
pub use eval::StarlarkArtifact;
pub use exports::ExportTable;
pub use include::LineOrigin;
pub use script::ScriptCommand;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::command::Command;
use crate::host::HostContext;

/// Default evaluation timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Extension of script-form sources.
pub const SCRIPT_EXTENSION: &str = "star";

/// Extension of declaration-form sources.
pub const DECLARATION_EXTENSION: &str = "bzl";

/// Configuration for the compiler.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Timeout for module evaluation and each command call, in seconds.
    pub timeout_seconds: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

/// How an extension declares its commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceForm {
    Script,
    Declaration,
}

impl SourceForm {
    /// Classifies a path by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            SCRIPT_EXTENSION => Some(SourceForm::Script),
            DECLARATION_EXTENSION => Some(SourceForm::Declaration),
            _ => None,
        }
    }
}

/// An extension source with its includes expanded.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub form: SourceForm,
    pub source: String,
    /// Files pulled in through `#load`, in inclusion order.
    pub includes: Vec<PathBuf>,
    /// Origin of each line of `source`. Empty when the source was not read
    /// from disk.
    pub origins: Vec<LineOrigin>,
}

impl SourceUnit {
    /// Reads `path` and expands its includes.
    pub fn read(path: &Path) -> Result<Self, CompileError> {
        let form = SourceForm::from_path(path).ok_or_else(|| CompileError::Read {
            path: path.display().to_string(),
            message: "not an extension source".to_string(),
        })?;
        let expanded = include::expand(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            form,
            source: expanded.source,
            includes: expanded.includes,
            origins: expanded.origins,
        })
    }

    /// Renders a 0-based line and column of `source` as `file:line:col`
    /// against the file the line really came from.
    pub fn locate(&self, line: usize, column: usize) -> String {
        match self.origins.get(line) {
            Some(origin) => format!("{}:{}:{}", origin.file.display(), origin.line, column + 1),
            None => format!("{}:{}:{}", self.path.display(), line + 1, column + 1),
        }
    }
}

/// Compiles sources into artifacts.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(
        &self,
        unit: SourceUnit,
        host: Arc<HostContext>,
    ) -> Result<Arc<dyn Artifact>, CompileError>;
}

/// A compiled extension that can produce command handles.
pub trait Artifact: Send + Sync {
    /// Creates one handle per command the extension declared.
    fn instantiate(&self, host: &Arc<HostContext>) -> Result<Vec<Arc<dyn Command>>, CompileError>;
}

/// Compiler backed by the embedded Starlark interpreter.
#[derive(Debug, Clone, Default)]
pub struct StarlarkCompiler {
    config: CompilerConfig,
}

impl StarlarkCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }
}

#[async_trait]
impl Compiler for StarlarkCompiler {
    async fn compile(
        &self,
        unit: SourceUnit,
        host: Arc<HostContext>,
    ) -> Result<Arc<dyn Artifact>, CompileError> {
        let artifact = eval::compile_with_timeout(unit, host, self.config.clone()).await?;
        Ok(Arc::new(artifact))
    }
}
