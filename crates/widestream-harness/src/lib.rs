//! Conformance harness for widestream.
//!
//! This crate provides:
//! - A catalog of stream scenarios that run against real scratch files
//! - A runner that records pass/fail, timing and a SHA-256 of each produced file
//! - Structured JSONL logging of every scenario run
//! - Machine-readable (JSON) and human-readable (markdown) reports

#![forbid(unsafe_code)]

pub mod report;
pub mod runner;
pub mod scenarios;
pub mod structured_log;

pub use report::{RunReport, RunSummary};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::{Scenario, ScenarioError};
