//! CLI entrypoint for the widestream conformance harness.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use widestream_harness::scenarios::{self, CATALOG};
use widestream_harness::structured_log::{LogEmitter, validate_log_file};
use widestream_harness::{RunReport, ScenarioRunner};

/// Conformance tooling for widestream.
#[derive(Debug, Parser)]
#[command(name = "widestream-harness")]
#[command(about = "Conformance scenarios for widestream file streams")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List catalog scenarios.
    List,
    /// Run scenarios against real files.
    Run {
        /// Directory for scratch files (created if missing).
        #[arg(long)]
        scratch: PathBuf,
        /// Only run the named scenario (repeatable).
        #[arg(long = "scenario")]
        scenarios: Vec<String>,
        /// JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// JSON report output path.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Run identifier used in trace ids (defaults to a timestamp).
        #[arg(long)]
        run_id: Option<String>,
    },
    /// Validate a JSONL log file.
    ValidateLog {
        /// Path to the log.
        file: PathBuf,
    },
}

fn default_run_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("run-{secs}")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::List => {
            for scenario in CATALOG {
                println!("{:<26} {}", scenario.name, scenario.description);
            }
        }
        Command::Run {
            scratch,
            scenarios: names,
            log,
            report,
            run_id,
        } => {
            let selected = if names.is_empty() {
                CATALOG.to_vec()
            } else {
                names
                    .iter()
                    .map(|name| {
                        scenarios::find(name)
                            .copied()
                            .ok_or_else(|| format!("unknown scenario: {name}"))
                    })
                    .collect::<Result<Vec<_>, _>>()?
            };

            let run_id = run_id.unwrap_or_else(default_run_id);
            let runner = ScenarioRunner::new(&scratch, &run_id);
            let mut emitter = match &log {
                Some(path) => Some(LogEmitter::to_file(path, "widestream", &run_id)?),
                None => None,
            };
            eprintln!(
                "Running {} scenario(s) in {}",
                selected.len(),
                scratch.display()
            );
            let results = runner.run_selected(&selected, emitter.as_mut())?;
            let report_doc = RunReport::new(&run_id, results);

            for r in &report_doc.summary.results {
                let status = if r.passed { "PASS" } else { "FAIL" };
                match &r.error {
                    Some(err) => eprintln!("[{status}] {}: {err}", r.name),
                    None => eprintln!("[{status}] {}", r.name),
                }
            }
            println!("{}", report_doc.to_markdown());
            if let Some(path) = &report {
                std::fs::write(path, report_doc.to_json())?;
                eprintln!("Report written to {}", path.display());
            }
            if let Some(path) = &log {
                eprintln!("Log written to {}", path.display());
            }

            let summary = &report_doc.summary;
            eprintln!(
                "Total: {} Passed: {} Failed: {}",
                summary.total, summary.passed, summary.failed
            );
            if !summary.all_passed() {
                return Err(format!("{} scenario(s) failed", summary.failed).into());
            }
        }
        Command::ValidateLog { file } => {
            let (lines, errors) = validate_log_file(&file)?;
            for err in &errors {
                eprintln!("{err}");
            }
            if !errors.is_empty() {
                return Err(format!("{} invalid field(s) in {lines} line(s)", errors.len()).into());
            }
            println!("{}: {lines} valid line(s)", file.display());
        }
    }

    Ok(())
}
