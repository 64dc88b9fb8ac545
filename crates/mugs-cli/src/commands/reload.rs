//! `reload` command.

use async_trait::async_trait;
use std::sync::Arc;

use super::{builtin_info, BuiltinContext};
use crate::command::{Command, CommandInfo, ExecError, Flow, Invocation};
use crate::report::Reporter;

/// Asks the shell to rebuild the registry from disk.
pub struct ReloadCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
}

impl ReloadCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("reload", "reload_description"),
            reporter: Arc::clone(&ctx.reporter),
        }
    }
}

#[async_trait]
impl Command for ReloadCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, _invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        self.reporter.response("reloading_commands", &[]);
        Ok(Flow::Reload)
    }
}
