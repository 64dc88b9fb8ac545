//! `enable`, `disable` and `import` commands.
//!
//! Each one changes the extensions directory and, on success, asks the shell
//! to reload. Failures are reported and leave the directory untouched.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::{builtin_info, BuiltinContext};
use crate::command::{Command, CommandInfo, ExecError, Flow, Invocation};
use crate::lifecycle::{ExtensionManager, LifecycleError};
use crate::report::Reporter;

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reports a failed enable or disable. `not_found_key` is used when a bare
/// command name matched nothing.
fn report_lifecycle_error(reporter: &dyn Reporter, error: &LifecycleError, not_found_key: &str) {
    match error {
        LifecycleError::MissingName => reporter.error("missing_extension_name", &[]),
        LifecycleError::NotFound { name } if name.contains('.') => {
            reporter.error("extension_not_found", &[name])
        }
        LifecycleError::NotFound { name } => reporter.error(not_found_key, &[&name.to_lowercase()]),
        LifecycleError::Ambiguous { name, candidates } => {
            reporter.response("multiple_extensions", &[name]);
            for candidate in candidates {
                reporter.response(&format!("- {}", candidate), &[]);
            }
            reporter.error("specify_filename", &[]);
        }
        LifecycleError::AlreadyExists { path } => {
            reporter.error("extension_exists", &[&display_name(path)])
        }
        LifecycleError::Io(e) => reporter.error("command_error", &[e]),
    }
}

pub struct EnableCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
    manager: Arc<ExtensionManager>,
}

impl EnableCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("enable", "enable_description")
                .with_usage("enable mycommand\nenable mycommand.star.disable"),
            reporter: Arc::clone(&ctx.reporter),
            manager: Arc::clone(&ctx.manager),
        }
    }
}

#[async_trait]
impl Command for EnableCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let name = invocation.args.first().map(String::as_str).unwrap_or_default();
        match self.manager.enable(name) {
            Ok(path) => {
                self.reporter.response("extension_enabled", &[&display_name(&path)]);
                Ok(Flow::Reload)
            }
            Err(e) => {
                report_lifecycle_error(self.reporter.as_ref(), &e, "no_disabled_extensions");
                Ok(Flow::Continue)
            }
        }
    }
}

pub struct DisableCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
    manager: Arc<ExtensionManager>,
}

impl DisableCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("disable", "disable_description")
                .with_usage("disable mycommand\ndisable mycommand.star"),
            reporter: Arc::clone(&ctx.reporter),
            manager: Arc::clone(&ctx.manager),
        }
    }
}

#[async_trait]
impl Command for DisableCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let name = invocation.args.first().map(String::as_str).unwrap_or_default();
        match self.manager.disable(name) {
            Ok(path) => {
                self.reporter.response("extension_disabled", &[&display_name(&path)]);
                Ok(Flow::Reload)
            }
            Err(e) => {
                report_lifecycle_error(self.reporter.as_ref(), &e, "command_not_found_disable");
                Ok(Flow::Continue)
            }
        }
    }
}

pub struct ImportCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
    manager: Arc<ExtensionManager>,
}

impl ImportCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("import", "import_description")
                .with_usage("import https://example.com/extension.star"),
            reporter: Arc::clone(&ctx.reporter),
            manager: Arc::clone(&ctx.manager),
        }
    }
}

#[async_trait]
impl Command for ImportCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let Some(url) = invocation.args.first() else {
            self.reporter.error("missing_url", &[]);
            return Ok(Flow::Continue);
        };

        self.reporter.response("downloading_extension", &[url]);
        match self.manager.import(url).await {
            Ok(path) => {
                let name = display_name(&path);
                self.reporter.response("extension_downloaded", &[&name]);
                self.reporter.response("scan_hint", &[&name]);
                Ok(Flow::Reload)
            }
            Err(e) => {
                self.reporter.error("download_error", &[&e]);
                Ok(Flow::Continue)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{builtin_registry, run, test_context};
    use crate::command::Flow;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[tokio::test]
    async fn test_disable_then_enable() {
        let (dir, reporter, ctx) = test_context();
        fs::write(dir.path().join("greet.star"), "x").unwrap();
        let registry = builtin_registry(&ctx);

        assert_eq!(run(&registry, "disable greet").await.unwrap(), Flow::Reload);
        assert!(dir.path().join("greet.star.disable").exists());
        assert_eq!(run(&registry, "enable greet").await.unwrap(), Flow::Reload);
        assert!(dir.path().join("greet.star").exists());

        let texts: Vec<_> = reporter.responses().into_iter().map(|e| e.text).collect();
        assert_eq!(
            texts,
            vec!["Extension 'greet.star' disabled", "Extension 'greet.star' enabled"]
        );
    }

    #[tokio::test]
    async fn test_enable_ambiguous_lists_candidates() {
        let (dir, reporter, ctx) = test_context();
        fs::write(dir.path().join("greet.star.disable"), "x").unwrap();
        fs::write(dir.path().join("greet.bzl.disable"), "x").unwrap();
        let registry = builtin_registry(&ctx);

        assert_eq!(run(&registry, "enable greet").await.unwrap(), Flow::Continue);
        let texts: Vec<_> = reporter.entries().into_iter().map(|e| e.text).collect();
        assert_eq!(
            texts,
            vec![
                "Found multiple extensions for 'greet':",
                "- greet.bzl.disable",
                "- greet.star.disable",
                "Specify the exact filename",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_names() {
        let (_dir, reporter, ctx) = test_context();
        let registry = builtin_registry(&ctx);

        run(&registry, "enable").await.unwrap();
        run(&registry, "disable ghost").await.unwrap();
        run(&registry, "enable ghost.star.disable").await.unwrap();
        run(&registry, "import").await.unwrap();

        let keys: Vec<_> = reporter.errors().into_iter().map(|e| e.key).collect();
        assert_eq!(
            keys,
            vec![
                "missing_extension_name",
                "command_not_found_disable",
                "extension_not_found",
                "missing_url"
            ]
        );
    }
}
