//! `version` and `time` commands.

use async_trait::async_trait;
use chrono::Local;
use std::sync::Arc;

use super::{builtin_info, is_builtin, BuiltinContext};
use crate::command::{Command, CommandInfo, ExecError, Flow, Invocation};
use crate::messages::render;
use crate::report::Reporter;

const ART: &[&str] = &[
    "░░░░░░░░░░░░░     ",
    "▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒ ",
    "▓▓▓▓▓▓▓▓▓▓▓▓▓   ▓▓",
    "▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒ ",
    "░░░░░░░░░░░░░     ",
    " ░░░░░░░░░░░      ",
];

pub struct VersionCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
}

impl VersionCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("version", "version_description").with_aliases(&["ver"]),
            reporter: Arc::clone(&ctx.reporter),
        }
    }
}

#[async_trait]
impl Command for VersionCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let commands = invocation.registry.list_all();
        let extensions = commands.iter().filter(|c| !is_builtin(c)).count();

        let label = |key: &str| format!("{}:", render(key, &[]));
        let info = [
            format!("{:<15} {}", label("application"), render("app_title", &[])),
            format!("{:<15} {}", label("version"), env!("CARGO_PKG_VERSION")),
            format!("{:<15} {}", label("commands"), commands.len()),
            format!("{:<15} {} {}", label("extensions"), extensions, render("loaded", &[])),
        ];

        let width = ART.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let lines: Vec<String> = (0..ART.len().max(info.len()))
            .map(|i| {
                let art = ART.get(i).copied().unwrap_or("");
                let text = info.get(i).map(String::as_str).unwrap_or("");
                format!("{:<width$}  {}", art, text, width = width)
                    .trim_end()
                    .to_string()
            })
            .collect();

        self.reporter.response(&lines.join("\n"), &[]);
        Ok(Flow::Continue)
    }
}

pub struct TimeCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
}

impl TimeCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("time", "time_description"),
            reporter: Arc::clone(&ctx.reporter),
        }
    }
}

#[async_trait]
impl Command for TimeCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, _invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let now = Local::now().format("%H:%M:%S").to_string();
        self.reporter.response("current_time", &[&now]);
        Ok(Flow::Continue)
    }
}
