//! Sequential dispatch loop.
//!
//! One command runs to completion before the next line is read. Failures
//! inside a command are caught here and reported; they never end the loop.

use futures_util::FutureExt;
use std::any::Any;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::aliases::AliasStore;
use crate::cache::MetadataCache;
use crate::command::{Command, ExecError, Flow, Invocation};
use crate::commands::{builtins, BuiltinContext};
use crate::compiler::{CompilerConfig, StarlarkCompiler};
use crate::config::{Settings, MIN_TIMEOUT_SECONDS};
use crate::host::HostContext;
use crate::lifecycle::ExtensionManager;
use crate::loader::{ExtensionLoader, LoadSummary};
use crate::registry::CommandRegistry;
use crate::report::Reporter;

/// Words that end the loop regardless of the registry.
const EXIT_WORDS: &[&str] = &["exit", "quit"];

/// Owns the registry and the loader and dispatches input lines.
pub struct Shell {
    registry: CommandRegistry,
    loader: ExtensionLoader,
    reporter: Arc<dyn Reporter>,
    suggestions: bool,
    prompt: Option<String>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Shell {
    pub fn new(registry: CommandRegistry, loader: ExtensionLoader, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            registry,
            loader,
            reporter,
            suggestions: true,
            prompt: None,
        }
    }

    /// Wires a shell from settings: persisted aliases and metadata under the
    /// data directory, the Starlark compiler and every builtin with the
    /// configured remote URLs.
    pub fn from_settings(settings: &Settings, reporter: Arc<dyn Reporter>) -> Self {
        let aliases = Arc::new(AliasStore::open(settings.aliases_path()));
        let metadata = MetadataCache::open(settings.metadata_cache_path());
        for (path, warning) in [
            (settings.aliases_path(), aliases.load_warning()),
            (settings.metadata_cache_path(), metadata.load_warning()),
        ] {
            if let Some(warning) = warning {
                reporter.error("table_discarded", &[&path.display(), &warning]);
            }
        }

        let host = Arc::new(HostContext::new(Arc::clone(&reporter)));
        let ctx = BuiltinContext::new(
            Arc::clone(&reporter),
            Arc::new(ExtensionManager::new(&settings.extensions_dir)),
            &settings.verified_hashes_url,
            &settings.store_url,
        );
        let compiler = Arc::new(StarlarkCompiler::new(CompilerConfig {
            timeout_seconds: settings.eval_timeout_seconds.max(MIN_TIMEOUT_SECONDS),
        }));
        let loader = ExtensionLoader::new(
            &settings.extensions_dir,
            compiler,
            host,
            metadata,
        )
        .with_builtins(builtins(&ctx));

        Self::new(CommandRegistry::new(aliases), loader, reporter)
            .with_suggestions(settings.enable_suggestions)
    }

    /// Offers a completion hint when a command is not found.
    pub fn with_suggestions(mut self, enabled: bool) -> Self {
        self.suggestions = enabled;
        self
    }

    /// Prompt printed before each line is read.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn loader(&self) -> &ExtensionLoader {
        &self.loader
    }

    /// Rebuilds the registry from disk.
    pub async fn load_all(&mut self) -> LoadSummary {
        self.loader.load_all(&mut self.registry).await
    }

    /// Rebuilds the registry and reports the outcome.
    pub async fn reload(&mut self) -> LoadSummary {
        let summary = self.load_all().await;
        self.reporter
            .response("commands_reloaded", &[&summary.loaded, &summary.failed]);
        summary
    }

    /// Runs one input line, reloading afterwards if the command asked for it.
    pub async fn dispatch(&mut self, line: &str) -> Flow {
        match self.execute_line(line).await {
            Flow::Reload => {
                self.reload().await;
                Flow::Continue
            }
            other => other,
        }
    }

    /// Runs one input line and returns the command's flow as is. A
    /// [`Flow::Reload`] is left to the caller.
    pub async fn execute_line(&mut self, line: &str) -> Flow {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Flow::Continue;
        };
        if EXIT_WORDS.iter().any(|w| w.eq_ignore_ascii_case(name)) {
            return Flow::Exit;
        }
        let args: Vec<String> = parts.map(str::to_string).collect();

        let Some(command) = self.registry.resolve(name) else {
            self.report_not_found(name);
            return Flow::Continue;
        };

        let flow = match self.execute(&command, &args).await {
            Ok(flow) => flow,
            Err(error) => match command.source().map(Path::to_path_buf) {
                Some(path) if !matches!(error, ExecError::Timeout { .. }) => {
                    self.retry(name, &path, &args, error).await
                }
                _ => {
                    self.report_failure(&error);
                    Flow::Continue
                }
            },
        };

        let added = self.registry.register_pending();
        if added > 0 {
            tracing::debug!(command = name, added, "commands registered at run time");
        }
        flow
    }

    /// Reads lines from `input` until end of input or an exit word.
    pub async fn run<R>(&mut self, input: R) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            if let Some(prompt) = &self.prompt {
                print!("{}", prompt);
                std::io::stdout().flush()?;
            }
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if self.dispatch(line).await == Flow::Exit {
                break;
            }
        }
        Ok(())
    }

    async fn execute(&self, command: &Arc<dyn Command>, args: &[String]) -> Result<Flow, ExecError> {
        let invocation = Invocation {
            args,
            registry: &self.registry,
        };
        match AssertUnwindSafe(command.execute(invocation)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(ExecError::Panicked {
                command: command.info().name.clone(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    /// Recompiles the failing command's file once and runs it again.
    async fn retry(&mut self, name: &str, path: &Path, args: &[String], first: ExecError) -> Flow {
        tracing::debug!(command = name, path = %path.display(), "retrying after {}", first);
        self.reporter
            .debug(&format!("{} failed, recompiling {}", name, path.display()));

        if let Err(e) = self.loader.recompile(path, &mut self.registry).await {
            tracing::warn!(path = %path.display(), "recompile failed: {}", e);
            self.report_failure(&first);
            return Flow::Continue;
        }
        let Some(command) = self.registry.resolve(name) else {
            self.report_failure(&first);
            return Flow::Continue;
        };

        match self.execute(&command, args).await {
            Ok(flow) => flow,
            Err(e) => {
                self.report_failure(&e);
                Flow::Continue
            }
        }
    }

    fn report_failure(&self, error: &ExecError) {
        tracing::warn!(code = error.code(), "{}", error);
        self.reporter.error("command_error", &[error]);
    }

    fn report_not_found(&self, name: &str) {
        self.reporter.error("command_not_found", &[&name]);
        if !self.suggestions {
            return;
        }
        if let Some(candidate) = self.registry.prefix_search(name).first() {
            self.reporter.response("command_suggestion", &[candidate]);
        }
    }
}
