//! `list` command.

use async_trait::async_trait;
use std::sync::Arc;

use super::{builtin_info, BuiltinContext};
use crate::command::{Command, CommandInfo, ExecError, Flow, Invocation};
use crate::lifecycle::ExtensionManager;
use crate::messages::render;
use crate::report::Reporter;
use crate::verified::{VerifiedExtensions, VERIFIED_MARK};

pub struct ListCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
    manager: Arc<ExtensionManager>,
    verified: Arc<VerifiedExtensions>,
}

impl ListCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("list", "list_description").with_aliases(&["ls", "dir"]),
            reporter: Arc::clone(&ctx.reporter),
            manager: Arc::clone(&ctx.manager),
            verified: Arc::clone(&ctx.verified),
        }
    }
}

#[async_trait]
impl Command for ListCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let mut lines = vec![render("available_commands", &[])];
        let hashes = self.verified.hashes().await;
        for command in invocation.registry.list_all() {
            let info = command.info();
            let mark = match command.source() {
                Some(path) if hashes.is_verified(path) => format!(" {}", VERIFIED_MARK),
                _ => String::new(),
            };
            lines.push(format!(
                "  {:<12} v{:<6} {:<12} - {}{}",
                info.name, info.version, info.author, info.description, mark
            ));
        }

        let disabled = self
            .manager
            .disabled()
            .map_err(|e| ExecError::runtime(&self.info.name, e))?;
        if !disabled.is_empty() {
            lines.push(String::new());
            lines.push(render("disabled_extensions", &[]));
            for path in &disabled {
                if let Some(name) = path.file_name() {
                    let mark = if hashes.is_verified(path) {
                        format!(" {}", VERIFIED_MARK)
                    } else {
                        String::new()
                    };
                    lines.push(format!("  - {}{}", name.to_string_lossy(), mark));
                }
            }
            lines.push(render("enable_usage", &[]));
        }

        self.reporter.response(&lines.join("\n"), &[]);
        Ok(Flow::Continue)
    }
}
