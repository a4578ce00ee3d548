//! examguard - proctoring session harness
//!
//! Replays recorded event traces through a full proctored session, which is
//! how integration against real host frontends is exercised: the host dumps
//! its event stream as JSONL, this binary reproduces the monitor's decisions
//! and writes the session report.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{error, info, warn};

use examguard::config::AppConfig;
use examguard::logging;
use examguard::monitor::{MonitorPolicy, NoopClipboard};
use examguard::report::ReportWriter;
use examguard::session::{ExamRules, ExamSession};
use examguard::viewport::{FileStore, RecordingBackend, ViewportOptions};
use examguard::InputEvent;

#[derive(Parser)]
#[command(name = "examguard")]
#[command(about = "Exam proctoring session harness", version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "EXAMGUARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSONL event trace through a proctored session
    Replay {
        /// Trace file, one timed event per line: {"at_ms":0,"type":"..."}
        #[arg(short, long)]
        trace: PathBuf,
        /// Print the full session report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Print the exam rules shown before a session starts
    Rules,
}

/// One line of a replay trace: an input event with its offset from session
/// start.
#[derive(Debug, Deserialize)]
struct TraceEvent {
    at_ms: u64,
    #[serde(flatten)]
    event: InputEvent,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_ref()).context("failed to load configuration")?;
    let _log_guard = logging::init(&config.storage.logs_dir)?;

    info!("Starting examguard v{}", env!("CARGO_PKG_VERSION"));

    if let Err(errors) = config.validate() {
        error!("Configuration validation failed:");
        for error in errors {
            error!("  - {}", error);
        }
        anyhow::bail!("configuration validation failed");
    }

    match cli.command {
        Command::Rules => print_rules(&config),
        Command::Replay { trace, json } => replay(&config, &trace, json).await?,
    }

    Ok(())
}

fn print_rules(config: &AppConfig) {
    let rules = ExamRules::standard(config.proctor.max_warnings);
    println!("Strictly prohibited actions:");
    for item in &rules.prohibited {
        println!("  - {item}");
    }
    println!("\nWarning system:");
    for item in &rules.warning_policy {
        println!("  - {item}");
    }
    println!("\nAllowed during the exam:");
    for item in &rules.allowed {
        println!("  - {item}");
    }
}

fn load_trace(path: &PathBuf) -> Result<Vec<TraceEvent>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open trace file {}", path.display()))?;
    let mut events = Vec::new();
    for (index, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: TraceEvent = serde_json::from_str(&line)
            .with_context(|| format!("invalid trace event on line {}", index + 1))?;
        events.push(event);
    }
    Ok(events)
}

async fn replay(config: &AppConfig, trace: &PathBuf, json: bool) -> Result<()> {
    let events = load_trace(trace)?;
    info!(events = events.len(), "trace loaded");

    let store = FileStore::new(&config.storage.state_file);
    let mut session = ExamSession::new(
        MonitorPolicy::from(&config.proctor),
        ViewportOptions::from(&config.viewport),
        store,
        RecordingBackend::default(),
        Box::new(NoopClipboard),
        None,
    );

    let base = Utc::now();
    session.accept_rules(base);

    for trace_event in &events {
        let now = base + Duration::milliseconds(trace_event.at_ms as i64);
        let verdict = session.handle_event(&trace_event.event, now);
        if let Some(prompt) = verdict.prompt {
            if prompt.limit_reached {
                warn!(
                    "warning {}/{}: maximum reached, auto-submit pending",
                    prompt.warning_count, prompt.max_warnings
                );
            } else {
                warn!(
                    "warning {}/{}: {} remaining",
                    prompt.warning_count,
                    prompt.max_warnings,
                    prompt.remaining()
                );
            }
        }
        if session.tick(now) {
            break;
        }
    }

    // Let a pending auto-submit timer run out in real time.
    if let Some(due) = session.pending_submit_due() {
        let wait = (due - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
        session.tick(Utc::now());
    }

    if session.outcome().is_none() {
        session.submit(Utc::now());
    }

    let report = session.report();
    let writer = ReportWriter::new(&config.storage.reports_dir)?;
    let path = writer.write(&report)?;
    info!("session report written to {}", path.display());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("session:    {}", report.session_id);
        println!(
            "outcome:    {}",
            report
                .outcome
                .map(|o| format!("{o:?}"))
                .unwrap_or_else(|| "unknown".to_string())
        );
        println!(
            "warnings:   {}/{}",
            report.warning_count, report.max_warnings
        );
        println!("violations: {}", report.violations.len());
        for violation in &report.violations {
            println!(
                "  {} {}",
                violation.occurred_at.format("%H:%M:%S%.3f"),
                violation.kind.description()
            );
        }
    }

    Ok(())
}
