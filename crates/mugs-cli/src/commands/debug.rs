//! `debug` command: runs another command with timing output.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use super::{builtin_info, BuiltinContext};
use crate::command::{Command, CommandInfo, ExecError, Flow, Invocation};
use crate::report::Reporter;

pub struct DebugCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
}

impl DebugCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("debug", "debug_description")
                .with_usage("debug mycommand --args \"test\""),
            reporter: Arc::clone(&ctx.reporter),
        }
    }
}

/// Unwraps `--args <value>` pairs and strips one level of double quotes
/// from their values. Other arguments pass through.
pub fn parse_debug_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--args" {
            if let Some(value) = iter.next() {
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                out.push(value.to_string());
                continue;
            }
        }
        out.push(arg.clone());
    }
    out
}

#[async_trait]
impl Command for DebugCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let Some((name, rest)) = invocation.args.split_first() else {
            self.reporter.error("missing_debug_command", &[]);
            return Ok(Flow::Continue);
        };
        let Some(command) = invocation.registry.resolve(name) else {
            self.reporter.error("command_not_found", &[name]);
            return Ok(Flow::Continue);
        };

        let args = parse_debug_args(rest);
        let args_json = serde_json::to_string(&args).unwrap_or_default();
        self.reporter
            .response("debug_start", &[&command.info().name, &args.join(" ")]);
        self.reporter.response("debug_vars", &[&args_json]);

        let started = Instant::now();
        let result = command
            .execute(Invocation {
                args: &args,
                registry: invocation.registry,
            })
            .await;
        match &result {
            Ok(_) => {
                let elapsed = started.elapsed().as_millis();
                self.reporter.response("debug_completed", &[&elapsed]);
            }
            Err(e) => self.reporter.error("debug_error", &[&e.code(), e]),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{builtin_registry, run, test_context};
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_debug_args() {
        assert_eq!(
            parse_debug_args(&strings(&["--args", "\"a b\"", "c", "--args"])),
            strings(&["a b", "c", "--args"])
        );
    }

    #[tokio::test]
    async fn test_debug_runs_target() {
        let (_dir, reporter, ctx) = test_context();
        let registry = builtin_registry(&ctx);

        let flow = run(&registry, "debug reload").await.unwrap();
        assert_eq!(flow, Flow::Reload);
        assert!(reporter.contains("Running reload with arguments: "));
        assert!(reporter.contains("Variables: args = []"));
        assert!(reporter.contains("Command completed in "));
    }

    #[tokio::test]
    async fn test_debug_unknown_target() {
        let (_dir, reporter, ctx) = test_context();
        let registry = builtin_registry(&ctx);

        run(&registry, "debug nope").await.unwrap();
        assert_eq!(reporter.errors()[0].key, "command_not_found");
    }
}
