//! Mugs CLI - Extensible command shell
//!
//! Runs the interactive shell by default. Lifecycle subcommands run one
//! operation against the extensions directory and exit with status 1 if the
//! operation reported an error.

mod cli_args;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::BufReader;

use cli_args::{Cli, Commands};
use mugs_cli::config::Settings;
use mugs_cli::report::{ConsoleReporter, CountingReporter, Reporter};
use mugs_cli::shell::Shell;
use mugs_scan::Scanner;

const PROMPT: &str = "> ";

fn init_logging(verbose: bool) {
    let json_logging = std::env::var("MUGS_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

    let default_level = if verbose { "mugs_cli=debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("MUGS_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Loads settings and applies command-line overrides.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match cli.config.clone().or_else(Settings::default_path) {
        Some(path) => Settings::load(&path)?,
        None => Settings::default(),
    };
    if let Some(dir) = &cli.extensions_dir {
        settings.extensions_dir = dir.clone();
    }
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
    }
    if cli.verbose {
        settings.debug_output = true;
    }
    settings
        .ensure_dirs()
        .context("Failed to prepare mugs directories")?;
    Ok(settings)
}

fn scan_json(settings: &Settings, file: &str) -> Result<ExitCode> {
    let given = PathBuf::from(file);
    let path = if given.is_file() {
        given
    } else {
        settings.extensions_dir.join(file)
    };
    let report = Scanner::default()
        .scan_file(&path)
        .with_context(|| format!("Failed to scan {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = load_settings(&cli)?;
    tracing::debug!(
        extensions = %settings.extensions_dir.display(),
        data = %settings.data_dir.display(),
        "settings loaded"
    );

    let counter = Arc::new(CountingReporter::new(Arc::new(ConsoleReporter::new(
        settings.debug_output,
    ))));
    let reporter: Arc<dyn Reporter> = counter.clone();
    let mut shell = Shell::from_settings(&settings, Arc::clone(&reporter));

    let line = match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            shell.load_all().await;
            reporter.response("welcome_message", &[]);
            let stdin = BufReader::new(tokio::io::stdin());
            shell.with_prompt(PROMPT).run(stdin).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Reload => {
            let summary = shell.reload().await;
            return Ok(if summary.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            });
        }
        Commands::Scan { file, json: true } => return scan_json(&settings, &file),
        Commands::Scan { file, json: false } => format!("scan {}", file),
        Commands::Enable { name } => format!("enable {}", name),
        Commands::Disable { name } => format!("disable {}", name),
        Commands::Import { url } => format!("import {}", url),
        Commands::List => "list".to_string(),
    };

    shell.load_all().await;
    let errors_before = counter.error_count();
    shell.execute_line(&line).await;
    Ok(if counter.error_count() > errors_before {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} failed to start runtime: {}", "error:".red().bold(), e);
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}
