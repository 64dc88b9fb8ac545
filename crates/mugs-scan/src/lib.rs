//! Execution-free security scanner for mugs extensions.
//!
//! Flags call sites and object constructions in an extension's source text
//! that touch dangerous host APIs (filesystem mutation, process control,
//! reflection, native interop, OS management, raw networking, SQL). The
//! scanner never evaluates the file and never blocks loading; it is a review
//! aid invoked explicitly before a human decides to trust a file.
//!
//! # Example
//!
//! ```no_run
//! use mugs_scan::Scanner;
//! use std::path::Path;
//!
//! let scanner = Scanner::default();
//! let report = scanner.scan_file(Path::new("extensions/greet.star")).unwrap();
//!
//! for finding in &report.findings {
//!     eprintln!("- {} ({})", finding.text, finding.category);
//! }
//! ```

pub mod lexer;
pub mod policy;
pub mod report;
pub mod walker;

pub use policy::ScanPolicy;
pub use report::{FindingCategory, ScanFinding, ScanReport};
pub use walker::{CallSite, SiteKind};

use std::path::Path;

/// Errors that can occur while scanning a file.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Failed to read the source file.
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),

    /// The source could not be parsed into call sites.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Scans extension sources against a [`ScanPolicy`].
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    policy: ScanPolicy,
}

impl Scanner {
    /// Creates a scanner with a custom policy.
    pub fn new(policy: ScanPolicy) -> Self {
        Self { policy }
    }

    /// Returns the active policy.
    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    /// Reads and scans a file.
    pub fn scan_file(&self, path: &Path) -> Result<ScanReport, ScanError> {
        let source = std::fs::read_to_string(path)?;
        let mut report = self.scan_source(&source)?;
        report.path = Some(path.to_path_buf());
        Ok(report)
    }

    /// Scans source text already in memory.
    pub fn scan_source(&self, source: &str) -> Result<ScanReport, ScanError> {
        let tokens = lexer::tokenize(source)?;
        let sites = walker::walk(source, &tokens)?;

        let mut report = ScanReport::new();
        for site in sites {
            if let Some(finding) = self.classify(&site) {
                report.add_finding(finding);
            }
        }
        report.finish();
        Ok(report)
    }

    fn classify(&self, site: &CallSite) -> Option<ScanFinding> {
        match site.kind {
            SiteKind::Invocation => {
                if let Some(prefix) = self.policy.matching_type(&site.text) {
                    return Some(ScanFinding::new(
                        site.text.clone(),
                        FindingCategory::DangerousType,
                        prefix,
                        site.line,
                    ));
                }
                self.policy.matching_method(&site.text).map(|method| {
                    ScanFinding::new(
                        site.text.clone(),
                        FindingCategory::DangerousMethod,
                        method,
                        site.line,
                    )
                })
            }
            SiteKind::Construction => {
                let type_name = site.type_name.as_deref().unwrap_or_default();
                self.policy.matching_type(type_name).map(|prefix| {
                    ScanFinding::new(
                        format!("new {}()", type_name),
                        FindingCategory::DangerousType,
                        prefix,
                        site.line,
                    )
                })
            }
        }
    }
}
