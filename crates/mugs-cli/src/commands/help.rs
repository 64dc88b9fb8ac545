//! `help` command.

use async_trait::async_trait;
use std::sync::Arc;

use super::{builtin_info, is_builtin, BuiltinContext};
use crate::command::{Command, CommandInfo, ExecError, Flow, Invocation};
use crate::messages::render;
use crate::report::Reporter;
use crate::verified::{VerifiedExtensions, VERIFIED_MARK};

pub struct HelpCommand {
    info: CommandInfo,
    reporter: Arc<dyn Reporter>,
    verified: Arc<VerifiedExtensions>,
}

impl HelpCommand {
    pub fn new(ctx: &BuiltinContext) -> Self {
        Self {
            info: builtin_info("help", "help_description")
                .with_aliases(&["?"])
                .with_usage(render("help_usage", &[])),
            reporter: Arc::clone(&ctx.reporter),
            verified: Arc::clone(&ctx.verified),
        }
    }
}

/// One line of the command overview.
pub(crate) fn summary_line(info: &CommandInfo) -> String {
    let aliases = if info.aliases.is_empty() {
        String::new()
    } else {
        format!("({})", info.aliases.join(", "))
    };
    format!("  {:<12}{:<15} - {}", info.name, aliases, info.description)
}

/// Full description of one command.
pub(crate) fn details(command: &dyn Command, verified: bool) -> String {
    let info = command.info();
    let mut lines = vec![
        format!("{}: {}", render("command", &[]), info.name),
        String::new(),
        format!("{}: {}", render("description", &[]), info.description),
    ];
    if !info.aliases.is_empty() {
        lines.push(format!("{}: {}", render("aliases", &[]), info.aliases.join(", ")));
    }
    lines.push(format!("{}: {}", render("author", &[]), info.author));
    lines.push(format!("{}: {}", render("version", &[]), info.version));
    if let Some(source) = command.source() {
        lines.push(format!("{}: {}", render("source", &[]), source.display()));
    }
    if verified {
        lines.push(format!(
            "{}: {} {}",
            render("verification", &[]),
            VERIFIED_MARK,
            render("verified_safe", &[])
        ));
    }
    if let Some(usage) = &info.usage {
        lines.push(String::new());
        lines.push(format!("{}:", render("usage_examples", &[])));
        lines.extend(usage.lines().map(|l| format!("  {}", l.trim())));
    }
    lines.join("\n")
}

#[async_trait]
impl Command for HelpCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let hashes = self.verified.hashes().await;
        let is_verified =
            |command: &dyn Command| command.source().is_some_and(|path| hashes.is_verified(path));

        if let Some(name) = invocation.args.first() {
            match invocation.registry.resolve(name) {
                Some(command) => {
                    let text = details(command.as_ref(), is_verified(command.as_ref()));
                    self.reporter.response(&text, &[]);
                    return Ok(Flow::Continue);
                }
                None => self.reporter.error("command_not_found", &[&name.to_lowercase()]),
            }
        }

        let commands = invocation.registry.list_all();
        let (builtin, external): (Vec<_>, Vec<_>) =
            commands.iter().partition(|c| is_builtin(c));
        let (verified, unverified): (Vec<_>, Vec<_>) =
            external.into_iter().partition(|c| is_verified(c.as_ref()));

        let mut lines = vec![render("builtin_commands", &[])];
        lines.extend(builtin.iter().map(|c| summary_line(c.info())));
        if !verified.is_empty() {
            lines.push(String::new());
            lines.push(render("verified_commands", &[]));
            lines.extend(verified.iter().map(|c| summary_line(c.info())));
        }
        if !unverified.is_empty() {
            lines.push(String::new());
            lines.push(render("external_commands", &[]));
            lines.extend(unverified.iter().map(|c| summary_line(c.info())));
        }
        lines.push(String::new());
        lines.push(render("command_help", &[]));

        self.reporter.response(&lines.join("\n"), &[]);
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{builtin_registry, context_with_urls, run, test_context};
    use crate::compiler::{Compiler, CompilerConfig, SourceUnit, StarlarkCompiler};
    use crate::hash::hash_bytes;
    use crate::host::HostContext;
    use crate::registry::tests::StaticCommand;
    use crate::testing::FixtureServer;
    use std::fs;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_help_overview_splits_sections() {
        let (_dir, reporter, ctx) = test_context();
        let mut registry = builtin_registry(&ctx);
        registry.register(StaticCommand::new("zap", &["z"]));

        run(&registry, "help").await.unwrap();
        let text = &reporter.responses()[0].text;
        assert!(text.starts_with("Built-in commands:"), "{}", text);
        assert!(text.contains("  help        (?)"), "{}", text);
        assert!(text.contains("For detailed help type: help <command>"));
    }

    #[tokio::test]
    async fn test_help_for_one_command() {
        let (_dir, reporter, ctx) = test_context();
        let registry = builtin_registry(&ctx);

        run(&registry, "? LS").await.unwrap();
        let text = &reporter.responses()[0].text;
        assert!(text.starts_with("Command: list"), "{}", text);
        assert!(text.contains("Aliases: ls, dir"), "{}", text);
        assert!(text.contains("Author: System"), "{}", text);
    }

    #[tokio::test]
    async fn test_help_unknown_command_falls_back_to_overview() {
        let (_dir, reporter, ctx) = test_context();
        let registry = builtin_registry(&ctx);

        run(&registry, "help nope").await.unwrap();
        assert_eq!(reporter.errors()[0].text, "Command 'nope' not found. Type 'help' for command list");
        assert!(reporter.contains("Built-in commands:"));
    }

    #[tokio::test]
    async fn test_help_puts_verified_commands_in_their_own_section() {
        const SAFE: &str = "command(name = 'safe', execute = lambda args: None)\n";
        const RISKY: &str = "command(name = 'risky', execute = lambda args: None)\n";
        let body = format!(r#"{{"safe.star": "{}"}}"#, hash_bytes(SAFE.as_bytes()));
        let server = FixtureServer::start(|_| vec![("/verified.json".to_string(), body)]);
        let (dir, reporter, ctx) = context_with_urls(&server.url("/verified.json"), "");
        fs::write(dir.path().join("safe.star"), SAFE).unwrap();
        fs::write(dir.path().join("risky.star"), RISKY).unwrap();

        let mut registry = builtin_registry(&ctx);
        let host = Arc::new(HostContext::new(reporter.clone()));
        let compiler = StarlarkCompiler::new(CompilerConfig::default());
        for name in ["safe.star", "risky.star"] {
            let unit = SourceUnit::read(&dir.path().join(name)).unwrap();
            let artifact = compiler.compile(unit, Arc::clone(&host)).await.unwrap();
            for command in artifact.instantiate(&host).unwrap() {
                registry.register(command);
            }
        }

        run(&registry, "help").await.unwrap();
        run(&registry, "help safe").await.unwrap();
        run(&registry, "help risky").await.unwrap();
        let texts: Vec<_> = reporter.responses().into_iter().map(|e| e.text).collect();

        let overview = &texts[0];
        let verified_at = overview.find("Verified commands (✅ safe):\n  safe").unwrap();
        let external_at = overview.find("Third-party commands (use with caution):\n  risky").unwrap();
        assert!(verified_at < external_at, "{}", overview);
        assert!(texts[1].contains("Verification: ✅ This command is verified and safe"));
        assert!(!texts[2].contains("Verification"));
    }
}
