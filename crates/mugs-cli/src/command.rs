//! The command capability shared by builtins and extension commands.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::registry::CommandRegistry;

/// Author recorded for builtin commands.
pub const BUILTIN_AUTHOR: &str = "System";

/// Declared, immutable fields of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub author: String,
    pub version: String,
    /// Multi-line usage text.
    pub usage: Option<String>,
}

impl CommandInfo {
    /// Creates info with builtin author and version `1.0`.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            aliases: Vec::new(),
            author: BUILTIN_AUTHOR.to_string(),
            version: "1.0".to_string(),
            usage: None,
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }
}

/// What the dispatch loop should do after a command returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Rebuild the registry from disk before reading the next line.
    Reload,
    Exit,
}

/// Arguments and read access handed to a running command.
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    /// Arguments after the command name.
    pub args: &'a [String],
    pub registry: &'a CommandRegistry,
}

/// Errors raised while executing a command.
///
/// Error codes:
/// - X001: runtime failure inside the command
/// - X002: execution exceeded the configured timeout
/// - X003: the command panicked
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("X001: {command}: {message}")]
    Runtime { command: String, message: String },

    #[error("X002: {command}: timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("X003: {command}: panicked: {message}")]
    Panicked { command: String, message: String },
}

impl ExecError {
    pub fn runtime(command: impl Into<String>, message: impl ToString) -> Self {
        ExecError::Runtime {
            command: command.into(),
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ExecError::Runtime { .. } => "X001",
            ExecError::Timeout { .. } => "X002",
            ExecError::Panicked { .. } => "X003",
        }
    }
}

/// A named unit of functionality the shell can dispatch to.
#[async_trait]
pub trait Command: Send + Sync {
    fn info(&self) -> &CommandInfo;

    /// Extension file this command was loaded from. `None` for builtins.
    fn source(&self) -> Option<&Path> {
        None
    }

    async fn execute(&self, invocation: Invocation<'_>) -> Result<Flow, ExecError>;
}
