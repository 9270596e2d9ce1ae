//! Scenario execution engine.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::scenarios::{CATALOG, Scenario};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};

/// Result of running a single scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub description: String,
    pub passed: bool,
    pub duration_ms: u64,
    /// Lowercase hex SHA-256 of the produced file, when the scenario passed.
    pub sha256: Option<String>,
    pub produced_bytes: Option<usize>,
    pub error: Option<String>,
}

/// Runs catalog scenarios inside a scratch directory.
pub struct ScenarioRunner {
    scratch: PathBuf,
    run_id: String,
}

impl ScenarioRunner {
    /// Create a runner; `scratch` is created on first run if missing.
    #[must_use]
    pub fn new(scratch: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            scratch: scratch.into(),
            run_id: run_id.into(),
        }
    }

    #[must_use]
    pub fn scratch(&self) -> &Path {
        &self.scratch
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run every catalog scenario.
    pub fn run_all(&self, log: Option<&mut LogEmitter>) -> std::io::Result<Vec<ScenarioResult>> {
        self.run_selected(CATALOG, log)
    }

    /// Run `scenarios` in order, logging a start and end record for each.
    pub fn run_selected(
        &self,
        scenarios: &[Scenario],
        mut log: Option<&mut LogEmitter>,
    ) -> std::io::Result<Vec<ScenarioResult>> {
        std::fs::create_dir_all(&self.scratch)?;
        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            if let Some(log) = log.as_deref_mut() {
                log.emit_entry(
                    LogEntry::new("", LogLevel::Debug, "scenario_start")
                        .with_scenario(scenario.name),
                )?;
            }
            let result = self.run_one(scenario);
            if let Some(log) = log.as_deref_mut() {
                log.emit_entry(end_entry(&result))?;
            }
            results.push(result);
        }
        if let Some(log) = log {
            log.flush()?;
        }
        Ok(results)
    }

    fn run_one(&self, scenario: &Scenario) -> ScenarioResult {
        let started = Instant::now();
        let outcome = scenario.run(&self.scratch);
        let duration_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(bytes) => ScenarioResult {
                name: scenario.name.to_string(),
                description: scenario.description.to_string(),
                passed: true,
                duration_ms,
                sha256: Some(sha256_hex(&bytes)),
                produced_bytes: Some(bytes.len()),
                error: None,
            },
            Err(err) => ScenarioResult {
                name: scenario.name.to_string(),
                description: scenario.description.to_string(),
                passed: false,
                duration_ms,
                sha256: None,
                produced_bytes: None,
                error: Some(err.to_string()),
            },
        }
    }
}

fn end_entry(result: &ScenarioResult) -> LogEntry {
    let (level, outcome) = if result.passed {
        (LogLevel::Info, Outcome::Pass)
    } else {
        (LogLevel::Error, Outcome::Fail)
    };
    let mut entry = LogEntry::new("", level, "scenario_end")
        .with_scenario(&result.name)
        .with_outcome(outcome)
        .with_duration_ms(result.duration_ms);
    if let Some(digest) = &result.sha256 {
        entry = entry.with_sha256(digest);
    }
    if let Some(error) = &result.error {
        entry = entry.with_details(serde_json::json!({ "error": error }));
    }
    entry
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn failing_result_logs_error_details() {
        let result = ScenarioResult {
            name: "append".into(),
            description: String::new(),
            passed: false,
            duration_ms: 1,
            sha256: None,
            produced_bytes: None,
            error: Some("boom".into()),
        };
        let entry = end_entry(&result);
        assert_eq!(entry.outcome, Some(Outcome::Fail));
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.details.unwrap()["error"], "boom");
    }
}
