//! `scan` command.
//!
//! Advisory only: scanning never blocks loading or execution.

use async_trait::async_trait;
use mugs_scan::Scanner;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{builtin_info, BuiltinContext};
use crate::command::{Command, CommandInfo, ExecError, Flow, Invocation};
use crate::compiler::{SourceForm, DECLARATION_EXTENSION, SCRIPT_EXTENSION};
use crate::lifecycle::{is_disabled, ExtensionManager};
use crate::report::Reporter;

pub struct ScanCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
    manager: Arc<ExtensionManager>,
    scanner: Arc<Scanner>,
}

impl ScanCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("scan", "scan_description")
                .with_aliases(&["analyze"])
                .with_usage("scan mycommand.star"),
            reporter: Arc::clone(&ctx.reporter),
            manager: Arc::clone(&ctx.manager),
            scanner: Arc::clone(&ctx.scanner),
        }
    }

    /// Resolves a user-supplied name to a file in the extensions directory.
    /// A bare name is tried with the script extension, then the declaration
    /// extension. When neither exists the script name is reported.
    fn target(&self, name: &str) -> (String, PathBuf) {
        let path = Path::new(name);
        let locate = |file_name: String| {
            let full = if path.is_absolute() {
                PathBuf::from(&file_name)
            } else {
                self.manager.extensions_dir().join(&file_name)
            };
            (file_name, full)
        };

        if SourceForm::from_path(path).is_some() || is_disabled(path) {
            return locate(name.to_string());
        }
        let script = locate(format!("{}.{}", name, SCRIPT_EXTENSION));
        if script.1.is_file() {
            return script;
        }
        let declaration = locate(format!("{}.{}", name, DECLARATION_EXTENSION));
        if declaration.1.is_file() {
            declaration
        } else {
            script
        }
    }
}

#[async_trait]
impl Command for ScanCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let Some(name) = invocation.args.first() else {
            self.reporter.error("scan_missing_file", &[]);
            return Ok(Flow::Continue);
        };

        let (file_name, path) = self.target(name);
        if !path.is_file() {
            self.reporter.error("scan_file_not_found", &[&file_name]);
            self.reporter
                .response("full_path_display", &[&path.display()]);
            return Ok(Flow::Continue);
        }

        match self.scanner.scan_file(&path) {
            Ok(report) if report.is_clean() => {
                self.reporter.response("scan_no_issues", &[&file_name]);
            }
            Ok(report) => {
                self.reporter.error("scan_issues_found", &[&file_name]);
                for finding in &report.findings {
                    self.reporter.error(&format!("- {}", finding.text), &[]);
                }
                self.reporter
                    .response("scan_total_issues", &[&report.total_sites]);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "scan failed: {}", e);
                self.reporter.error("scan_error", &[&e]);
            }
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{builtin_registry, run, test_context};
    use pretty_assertions::assert_eq;
    use std::fs;

    #[tokio::test]
    async fn test_scan_reports_findings() {
        let (dir, reporter, ctx) = test_context();
        fs::write(
            dir.path().join("risky.star"),
            "def _run(args):\n    os.remove(args[0])\n    os.remove(args[0])\n",
        )
        .unwrap();
        let registry = builtin_registry(&ctx);

        run(&registry, "analyze risky").await.unwrap();
        let texts: Vec<_> = reporter.entries().into_iter().map(|e| e.text).collect();
        assert_eq!(
            texts,
            vec![
                "Potential security issues found in risky.star:",
                "- os.remove(args[0])",
                "Total issues found: 2",
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_clean_file() {
        let (dir, reporter, ctx) = test_context();
        fs::write(dir.path().join("ok.bzl"), "respond('hi')\n").unwrap();
        let registry = builtin_registry(&ctx);

        run(&registry, "scan ok.bzl").await.unwrap();
        assert_eq!(
            reporter.responses()[0].text,
            "No dangerous code patterns found in ok.bzl"
        );
    }

    #[tokio::test]
    async fn test_bare_name_falls_back_to_declaration_form() {
        let (dir, reporter, ctx) = test_context();
        fs::write(dir.path().join("tools.bzl"), "respond('hi')\n").unwrap();
        let registry = builtin_registry(&ctx);

        run(&registry, "scan tools").await.unwrap();
        assert_eq!(
            reporter.responses()[0].text,
            "No dangerous code patterns found in tools.bzl"
        );
    }

    #[tokio::test]
    async fn test_bare_name_prefers_script_form() {
        let (dir, reporter, ctx) = test_context();
        fs::write(dir.path().join("both.star"), "respond('hi')\n").unwrap();
        fs::write(dir.path().join("both.bzl"), "respond('hi')\n").unwrap();
        let registry = builtin_registry(&ctx);

        run(&registry, "scan both").await.unwrap();
        assert!(reporter.contains("found in both.star"));
    }

    #[tokio::test]
    async fn test_scan_missing_file() {
        let (_dir, reporter, ctx) = test_context();
        let registry = builtin_registry(&ctx);

        run(&registry, "scan ghost").await.unwrap();
        assert_eq!(reporter.errors()[0].text, "File 'ghost.star' not found");
        assert!(reporter.contains("Full path: "));
    }
}
