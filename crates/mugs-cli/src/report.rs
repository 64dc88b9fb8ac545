//! Reporting interface.
//!
//! The loader, lifecycle operations and builtins never write to a terminal
//! directly. All user-visible output goes through a [`Reporter`], so the same
//! code runs under the console shell and in headless tests.

use colored::Colorize;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::messages;

/// Sink for user-visible output.
pub trait Reporter: Send + Sync {
    /// Writes a normal response rendered from a message key.
    fn response(&self, key: &str, args: &[&dyn Display]);

    /// Writes an error rendered from a message key.
    fn error(&self, key: &str, args: &[&dyn Display]);

    /// Writes a debug line. Implementations may drop it.
    fn debug(&self, message: &str);
}

const BORDER: &str = "▌ ";

/// Colored terminal reporter.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    debug_enabled: AtomicBool,
}

impl ConsoleReporter {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled: AtomicBool::new(debug_enabled),
        }
    }

    /// Turns debug output on or off.
    pub fn set_debug(&self, enabled: bool) {
        self.debug_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled.load(Ordering::Relaxed)
    }
}

impl Reporter for ConsoleReporter {
    fn response(&self, key: &str, args: &[&dyn Display]) {
        let text = messages::render(key, args);
        tracing::info!(key, "{}", text);
        for line in text.lines() {
            println!("{}{}", BORDER.cyan(), line);
        }
    }

    fn error(&self, key: &str, args: &[&dyn Display]) {
        let text = messages::render(key, args);
        tracing::warn!(key, "{}", text);
        for line in text.lines() {
            println!("{}{}", BORDER.red(), line.red());
        }
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
        if self.debug_enabled() {
            println!("{}{} {}", BORDER.yellow(), "[DEBUG]".yellow().bold(), message.dimmed());
        }
    }
}

/// Reporter that forwards to another and counts the errors it passes on.
pub struct CountingReporter {
    inner: Arc<dyn Reporter>,
    errors: AtomicUsize,
}

impl CountingReporter {
    pub fn new(inner: Arc<dyn Reporter>) -> Self {
        Self {
            inner,
            errors: AtomicUsize::new(0),
        }
    }

    /// Errors reported so far.
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }
}

impl Reporter for CountingReporter {
    fn response(&self, key: &str, args: &[&dyn Display]) {
        self.inner.response(key, args);
    }

    fn error(&self, key: &str, args: &[&dyn Display]) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.inner.error(key, args);
    }

    fn debug(&self, message: &str) {
        self.inner.debug(message);
    }
}

/// Severity of a recorded report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Response,
    Error,
    Debug,
}

/// One recorded report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub level: ReportLevel,
    /// Message key (the raw text for debug lines).
    pub key: String,
    /// Rendered text.
    pub text: String,
}

/// Reporter that records everything in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    entries: Mutex<Vec<ReportEntry>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: ReportLevel, key: &str, text: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(ReportEntry {
                level,
                key: key.to_string(),
                text,
            });
        }
    }

    /// Returns a snapshot of all entries.
    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn with_level(&self, level: ReportLevel) -> Vec<ReportEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }

    pub fn responses(&self) -> Vec<ReportEntry> {
        self.with_level(ReportLevel::Response)
    }

    pub fn errors(&self) -> Vec<ReportEntry> {
        self.with_level(ReportLevel::Error)
    }

    /// Returns true if any rendered entry contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.text.contains(needle))
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl Reporter for MemoryReporter {
    fn response(&self, key: &str, args: &[&dyn Display]) {
        self.push(ReportLevel::Response, key, messages::render(key, args));
    }

    fn error(&self, key: &str, args: &[&dyn Display]) {
        self.push(ReportLevel::Error, key, messages::render(key, args));
    }

    fn debug(&self, message: &str) {
        self.push(ReportLevel::Debug, message, message.to_string());
    }
}
