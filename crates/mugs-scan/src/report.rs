//! Scan report types for structured output.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which curated set a finding matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    /// Qualified type or namespace prefix.
    DangerousType,
    /// Method-name fragment.
    DangerousMethod,
}

impl std::fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingCategory::DangerousType => write!(f, "dangerous type"),
            FindingCategory::DangerousMethod => write!(f, "dangerous method"),
        }
    }
}

/// One flagged call or construction site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFinding {
    /// Rendered source text of the site.
    pub text: String,
    pub category: FindingCategory,
    /// The policy entry that matched.
    pub pattern: String,
    /// 1-based line of the first occurrence.
    pub line: usize,
}

impl ScanFinding {
    pub fn new(
        text: impl Into<String>,
        category: FindingCategory,
        pattern: impl Into<String>,
        line: usize,
    ) -> Self {
        Self {
            text: text.into(),
            category,
            pattern: pattern.into(),
            line,
        }
    }
}

/// Result of scanning one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// Scanned file, if the scan came from disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Distinct findings sorted by rendered text.
    pub findings: Vec<ScanFinding>,
    /// Number of flagged sites before deduplication.
    pub total_sites: usize,
}

impl ScanReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a flagged site.
    pub fn add_finding(&mut self, finding: ScanFinding) {
        self.total_sites += 1;
        self.findings.push(finding);
    }

    /// Sorts by rendered text and drops repeated sites, keeping the first
    /// occurrence of each.
    pub fn finish(&mut self) {
        self.findings
            .sort_by(|a, b| a.text.cmp(&b.text).then(a.line.cmp(&b.line)));
        self.findings.dedup_by(|later, earlier| later.text == earlier.text);
    }

    /// Returns true if nothing was flagged.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_finish_keeps_earliest_line() {
        let mut report = ScanReport::new();
        report.add_finding(ScanFinding::new("b()", FindingCategory::DangerousMethod, "b", 9));
        report.add_finding(ScanFinding::new("a()", FindingCategory::DangerousMethod, "a", 4));
        report.add_finding(ScanFinding::new("b()", FindingCategory::DangerousMethod, "b", 2));
        report.finish();

        assert_eq!(report.total_sites, 3);
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.findings[0].text, "a()");
        assert_eq!(report.findings[1].line, 2);
    }

    #[test]
    fn test_serialization() {
        let mut report = ScanReport::new();
        report.add_finding(ScanFinding::new(
            "os.remove(p)",
            FindingCategory::DangerousType,
            "os.",
            1,
        ));
        report.finish();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["findings"][0]["category"], "dangerous_type");
        assert_eq!(json["total_sites"], 1);
        assert!(json.get("path").is_none());
    }
}
