//! `new` command: writes a script-form extension template.

use async_trait::async_trait;
use std::fs;
use std::sync::Arc;

use super::{builtin_info, BuiltinContext};
use crate::command::{Command, CommandInfo, ExecError, Flow, Invocation};
use crate::compiler::SCRIPT_EXTENSION;
use crate::lifecycle::ExtensionManager;
use crate::report::Reporter;

pub struct NewCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
    manager: Arc<ExtensionManager>,
}

impl NewCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("new", "new_description")
                .with_aliases(&["template"])
                .with_usage("new mycommand"),
            reporter: Arc::clone(&ctx.reporter),
            manager: Arc::clone(&ctx.manager),
        }
    }
}

/// Source of a new extension declaring `name`.
pub fn template(name: &str) -> String {
    let short: String = name.chars().take(3).collect();
    let first: String = name.chars().take(1).collect();
    format!(
        r#"# Extension for command '{name}'.
# Edit the description and the body of _run, then type 'reload'.

def _run(args):
    respond("Command '{name}' executed!")
    if args:
        respond("Received arguments: " + ", ".join(args))

command(
    name = "{name}",
    description = "Description of {name} command",
    aliases = ["{first}", "{short}"],
    author = "Your Name",
    version = "1.0",
    usage = "{name} arg1 arg2\n{name} --option",
    execute = _run,
)
"#
    )
}

#[async_trait]
impl Command for NewCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let Some(name) = invocation.args.first() else {
            self.reporter.error("missing_command_name", &[]);
            return Ok(Flow::Continue);
        };

        let name = name.to_lowercase();
        let file_name = format!("{}.{}", name, SCRIPT_EXTENSION);
        let path = self.manager.extensions_dir().join(&file_name);
        if path.exists() {
            self.reporter.error("file_exists", &[&file_name]);
            return Ok(Flow::Continue);
        }

        fs::create_dir_all(self.manager.extensions_dir())
            .and_then(|_| fs::write(&path, template(&name)))
            .map_err(|e| ExecError::runtime(&self.info.name, e))?;

        self.reporter.response("template_created", &[&file_name]);
        self.reporter.response("reload_usage", &[]);
        Ok(Flow::Continue)
    }
}
