//! Commands backed by extension code.

use async_trait::async_trait;
use starlark::values::list::ListRef;
use starlark::values::OwnedFrozenValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::error::CompileError;
use super::eval::{call_execute, StarlarkArtifact};
use super::stdlib::command::{field, is_command};
use super::Artifact;
use crate::command::{Command, CommandInfo, ExecError, Flow, Invocation};
use crate::host::HostContext;

/// A command whose `execute` is a Starlark function in a frozen module.
pub struct ScriptCommand {
    info: CommandInfo,
    source: PathBuf,
    value: OwnedFrozenValue,
    host: Arc<HostContext>,
    timeout_seconds: u64,
}

impl ScriptCommand {
    /// Builds a command handle from a frozen `command(...)` value.
    pub(crate) fn from_value(
        source: &Path,
        value: OwnedFrozenValue,
        host: Arc<HostContext>,
        timeout_seconds: u64,
    ) -> Result<Self, CompileError> {
        let info = read_info(&value)?;
        Ok(Self {
            info,
            source: source.to_path_buf(),
            value,
            host,
            timeout_seconds,
        })
    }
}

fn read_info(value: &OwnedFrozenValue) -> Result<CommandInfo, CompileError> {
    let value = value.value();
    if !is_command(value) {
        return Err(CompileError::NotACommand {
            type_name: value.get_type().to_string(),
        });
    }

    let text = |key: &str| -> Result<String, CompileError> {
        field(value, key)
            .and_then(|v| v.unpack_str())
            .map(str::to_string)
            .ok_or_else(|| CompileError::invalid(format!("missing string field '{}'", key)))
    };

    let aliases = match field(value, "aliases").and_then(ListRef::from_value) {
        Some(list) => list
            .iter()
            .map(|a| {
                a.unpack_str()
                    .map(str::to_string)
                    .ok_or_else(|| CompileError::invalid("aliases must be strings"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(CommandInfo {
        name: text("name")?,
        description: text("description")?,
        aliases,
        author: text("author")?,
        version: text("version")?,
        usage: field(value, "usage")
            .and_then(|v| v.unpack_str())
            .map(str::to_string),
    })
}

#[async_trait]
impl Command for ScriptCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    fn source(&self) -> Option<&Path> {
        Some(&self.source)
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError> {
        let value = self.value.clone();
        let host = Arc::clone(&self.host);
        let args = invocation.args.to_vec();
        let name = self.info.name.clone();

        // A timed-out task is detached, not stopped: the evaluator has no
        // cancellation point, so it runs on in the blocking pool until it
        // returns.
        let task = tokio::task::spawn_blocking(move || call_execute(&value, &args, host));
        let registered = match timeout(Duration::from_secs(self.timeout_seconds), task).await {
            Ok(Ok(Ok(registered))) => registered,
            Ok(Ok(Err(message))) => {
                return Err(ExecError::Runtime {
                    command: name,
                    message,
                })
            }
            Ok(Err(e)) => {
                return Err(ExecError::Panicked {
                    command: name,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ExecError::Timeout {
                    command: name,
                    seconds: self.timeout_seconds,
                })
            }
        };

        for value in registered {
            let command = ScriptCommand::from_value(
                &self.source,
                value,
                Arc::clone(&self.host),
                self.timeout_seconds,
            )
            .map_err(|e| ExecError::runtime(&name, e))?;
            invocation.registry.defer(Arc::new(command));
        }
        Ok(Flow::Continue)
    }
}

impl Artifact for StarlarkArtifact {
    fn instantiate(&self, host: &Arc<HostContext>) -> Result<Vec<Arc<dyn Command>>, CompileError> {
        self.symbols
            .iter()
            .map(|symbol| {
                let value = self.module.get(symbol).map_err(|e| CompileError::Runtime {
                    location: self.path.display().to_string(),
                    message: e.to_string(),
                })?;
                let command =
                    ScriptCommand::from_value(&self.path, value, Arc::clone(host), self.timeout_seconds)?;
                Ok(Arc::new(command) as Arc<dyn Command>)
            })
            .collect()
    }
}
