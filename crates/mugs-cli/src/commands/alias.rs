//! `alias` command: manages user-defined aliases.

use async_trait::async_trait;
use std::sync::Arc;

use super::{builtin_info, BuiltinContext};
use crate::command::{Command, CommandInfo, ExecError, Flow, Invocation};
use crate::messages::render;
use crate::report::Reporter;

pub struct AliasCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
}

impl AliasCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("alias", "alias_description").with_usage(render("alias_usage", &[])),
            reporter: Arc::clone(&ctx.reporter),
        }
    }
}

#[async_trait]
impl Command for AliasCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let aliases = invocation.registry.aliases();
        let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();

        match args.as_slice() {
            [] | ["list", ..] => {
                let all = aliases.all();
                if all.is_empty() {
                    self.reporter.response("alias_no_aliases", &[]);
                } else {
                    let mut lines = vec![render("alias_header", &[])];
                    lines.extend(all.iter().map(|(alias, target)| format!("- {} => {}", alias, target)));
                    self.reporter.response(&lines.join("\n"), &[]);
                }
            }
            ["add", command, alias, ..] => match aliases.add(command, alias) {
                Ok(()) => self.reporter.response("alias_added", &[alias, command]),
                Err(e) => self.reporter.error("alias_error", &[&format!("{:#}", e)]),
            },
            ["remove", alias, ..] => match aliases.remove(alias) {
                Ok(true) => self.reporter.response("alias_removed", &[alias]),
                Ok(false) => self.reporter.error("alias_not_found", &[]),
                Err(e) => self.reporter.error("alias_error", &[&format!("{:#}", e)]),
            },
            _ => {
                self.reporter.error("alias_invalid_syntax", &[]);
                self.reporter.response("alias_usage", &[]);
            }
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{builtin_registry, run, test_context};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_alias_add_list_remove() {
        let (_dir, reporter, ctx) = test_context();
        let registry = builtin_registry(&ctx);

        run(&registry, "alias add time now").await.unwrap();
        assert_eq!(registry.resolve("NOW").unwrap().info().name, "time");

        run(&registry, "alias").await.unwrap();
        run(&registry, "alias remove now").await.unwrap();
        run(&registry, "alias remove now").await.unwrap();
        assert!(registry.resolve("now").is_none());

        let texts: Vec<_> = reporter.entries().into_iter().map(|e| e.text).collect();
        assert_eq!(
            texts,
            vec![
                "Alias 'now' added for command 'time'",
                "Custom aliases:\n- now => time",
                "Alias 'now' removed",
                "Alias not found",
            ]
        );
    }

    #[tokio::test]
    async fn test_alias_bad_syntax() {
        let (_dir, reporter, ctx) = test_context();
        let registry = builtin_registry(&ctx);

        run(&registry, "alias add only").await.unwrap();
        assert_eq!(reporter.errors()[0].key, "alias_invalid_syntax");
    }
}
