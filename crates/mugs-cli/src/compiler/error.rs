//! Error types for extension compilation.
//!
//! ## Error Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | C001 | Syntax error |
//! | C002 | Runtime error while the module evaluates |
//! | C003 | Evaluation timed out |
//! | C004 | Script form did not produce a command value |
//! | C005 | A command value has invalid fields |
//! | C006 | Declaration form registered no commands |
//! | C007 | `#load` target not found |
//! | C008 | Source file unreadable |
//! | C009 | `#load` target outside the extension's directory |

use thiserror::Error;

/// Errors from compiling one extension file. Always scoped to that file.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("C001: syntax error at {location}: {message}")]
    Syntax { location: String, message: String },

    #[error("C002: runtime error at {location}: {message}")]
    Runtime { location: String, message: String },

    #[error("C003: evaluation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("C004: script must evaluate to a command(...) value, got {type_name}")]
    NotACommand { type_name: String },

    #[error("C005: invalid command: {message}")]
    InvalidCommand { message: String },

    #[error("C006: {location} declares no commands")]
    NoCommands { location: String },

    #[error("C007: {location}: included file not found: {include}")]
    IncludeNotFound { location: String, include: String },

    #[error("C008: failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("C009: {location}: include escapes the extension directory: {include}")]
    IncludeOutsideRoot { location: String, include: String },
}

impl CompileError {
    /// Returns the error code (e.g., "C001").
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Syntax { .. } => "C001",
            CompileError::Runtime { .. } => "C002",
            CompileError::Timeout { .. } => "C003",
            CompileError::NotACommand { .. } => "C004",
            CompileError::InvalidCommand { .. } => "C005",
            CompileError::NoCommands { .. } => "C006",
            CompileError::IncludeNotFound { .. } => "C007",
            CompileError::Read { .. } => "C008",
            CompileError::IncludeOutsideRoot { .. } => "C009",
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        CompileError::InvalidCommand {
            message: message.into(),
        }
    }
}
