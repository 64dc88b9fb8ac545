//! CLI argument definitions for the mugs command-line interface.
//!
//! All `#[derive(Parser)]` and `#[derive(Subcommand)]` types are defined here,
//! keeping `main.rs` focused on dispatch logic.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mugs - Extensible command shell
#[derive(Parser)]
#[command(name = "mugs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Directory containing extension files (overrides settings)
    #[arg(long, global = true)]
    pub extensions_dir: Option<PathBuf>,

    /// Directory for the metadata cache and aliases (overrides settings)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Path to settings.json
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Runs the interactive shell when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start the interactive shell (default)
    Shell,

    /// Enable a disabled extension
    Enable {
        /// Command name or exact filename (e.g. greet.star.disable)
        name: String,
    },

    /// Disable an extension
    Disable {
        /// Command name or exact filename (e.g. greet.star)
        name: String,
    },

    /// Download an extension into the extensions directory
    Import {
        /// URL of the extension source
        url: String,
    },

    /// Scan an extension for potentially dangerous code
    Scan {
        /// Extension file, relative to the extensions directory
        file: String,

        /// Output machine-readable JSON report
        #[arg(long)]
        json: bool,
    },

    /// Compile every extension and report failures
    Reload,

    /// List available commands and disabled extensions
    List,
}
