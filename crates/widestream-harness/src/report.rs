//! Run reports.

use serde::{Deserialize, Serialize};

use crate::runner::ScenarioResult;
use crate::structured_log::now_utc;

/// Aggregate counts plus the individual results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<ScenarioResult>,
}

impl RunSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<ScenarioResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total,
            passed,
            failed: total - passed,
            results,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// One harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub title: String,
    pub run_id: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    pub summary: RunSummary,
}

impl RunReport {
    #[must_use]
    pub fn new(run_id: impl Into<String>, results: Vec<ScenarioResult>) -> Self {
        Self {
            title: "widestream conformance".to_string(),
            run_id: run_id.into(),
            timestamp: now_utc(),
            summary: RunSummary::from_results(results),
        }
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Run: {}\n", self.run_id));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.summary.failed));

        out.push_str("| Scenario | Status | SHA-256 |\n");
        out.push_str("|----------|--------|---------|\n");
        for r in &self.summary.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            let digest = r.sha256.as_deref().map_or("-", |d| d.get(..12).unwrap_or(d));
            out.push_str(&format!("| {} | {} | {} |\n", r.name, status, digest));
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
