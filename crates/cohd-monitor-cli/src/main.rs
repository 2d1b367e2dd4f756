//! COHD Monitor CLI
//!
//! The `cohd-monitor` command runs health and correctness checks against the
//! COHD API and its TRAPI endpoints.
//!
//! ## Commands
//!
//! - `run`: run every configured suite now (manual trigger)
//! - `schedule`: run on the twice-daily schedule until interrupted
//! - `suites`: list configured suites in execution order
//!
//! The exit status reflects whether environment setup succeeded. Individual
//! suite failures are reported but do not change it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cohd_monitor::obs::emit_gate_evaluated;
use cohd_monitor::{
    cancel_pair, CancelHandle, CheckKind, HealthGate, MonitorConfig, MonitorRunner, RunOutcome,
    Scheduler, Trigger,
};
use std::path::PathBuf;
use tracing::{error, warn, Level};

#[derive(Parser)]
#[command(name = "cohd-monitor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scheduled health checks for the COHD API", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults to the builtin COHD suites)
    #[arg(short, long, global = true, env = "COHD_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured suite now
    Run {
        /// Print the run report as JSON
        #[arg(long)]
        report_json: bool,
    },

    /// Run on the configured schedule until interrupted
    Schedule {
        /// Fire the next scheduled slot, then exit
        #[arg(long)]
        once: bool,

        /// Print each run report as JSON
        #[arg(long)]
        report_json: bool,
    },

    /// List configured suites in execution order
    Suites,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    cohd_monitor::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Run { report_json } => cmd_run(&config, report_json).await,
        Commands::Schedule { once, report_json } => cmd_schedule(&config, once, report_json).await,
        Commands::Suites => cmd_suites(&config),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<MonitorConfig> {
    match path {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => MonitorConfig::from_env().context("Invalid monitor configuration"),
    }
}

/// Cancel on Ctrl-C.
fn cancel_on_interrupt(handle: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling remaining suites");
            handle.cancel();
        }
    });
}

/// Run every suite once, on demand.
async fn cmd_run(config: &MonitorConfig, report_json: bool) -> Result<()> {
    let runner = MonitorRunner::from_config(config).context("Failed to build monitor runner")?;

    let (handle, signal) = cancel_pair();
    cancel_on_interrupt(handle);

    let outcome = runner.run_with_cancel(Trigger::Manual, signal).await;
    print_outcome(&outcome, report_json)
}

/// Run on the schedule until interrupted.
async fn cmd_schedule(config: &MonitorConfig, once: bool, report_json: bool) -> Result<()> {
    let runner = MonitorRunner::from_config(config).context("Failed to build monitor runner")?;
    let scheduler = Scheduler::new(config.schedule().context("Invalid schedule")?);

    let times: Vec<String> = scheduler
        .schedule()
        .times()
        .iter()
        .map(|t| t.format("%H:%M").to_string())
        .collect();
    println!("Scheduling {} suites at {} UTC", runner.suites().len(), times.join(", "));

    let (handle, signal) = cancel_pair();
    cancel_on_interrupt(handle);

    let mut last_error = None;
    scheduler
        .run_loop(&runner, signal, once.then_some(1), |outcome| {
            if let Err(e) = print_outcome(outcome, report_json) {
                error!(run_id = %outcome.run_id(), error = %e, "Scheduled run failed");
                last_error = Some(e);
            }
        })
        .await;

    match last_error {
        Some(e) if once => Err(e),
        _ => Ok(()),
    }
}

/// Print a run outcome. Errors only when setup failed.
fn print_outcome(outcome: &RunOutcome, report_json: bool) -> Result<()> {
    match outcome {
        RunOutcome::SetupFailed { run_id, error, .. } => {
            if report_json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "run_id": run_id,
                        "setup_failed": true,
                        "error": error,
                        "results": [],
                    }))?
                );
            } else {
                println!("Run {}: environment setup failed", run_id);
                println!("  {}", error);
                println!("No suites were executed.");
            }
            anyhow::bail!("Environment setup failed: {}", error)
        }
        RunOutcome::Reported(report) => {
            let verdict = HealthGate::evaluate(report);
            emit_gate_evaluated(&report.run_id, verdict.passed, verdict.violations.len());

            if report_json {
                println!("{}", serde_json::to_string_pretty(report)?);
                return Ok(());
            }

            print!("{}", report.render_text());
            println!("Gate: {}", if verdict.passed { "✓ PASSED" } else { "✗ FAILED" });
            if !verdict.violations.is_empty() {
                println!("Violations:");
                for violation in &verdict.violations {
                    println!("  - {}", violation);
                }
            }
            Ok(())
        }
    }
}

/// List configured suites.
fn cmd_suites(config: &MonitorConfig) -> Result<()> {
    for (index, suite) in config.resolved_suites().iter().enumerate() {
        let kind = match &suite.check {
            CheckKind::Command { command } => command.join(" "),
            CheckKind::Http { servers, path } => format!("GET {} on {} server(s)", path, servers.len()),
        };
        println!(
            "{}. {}{} [{}] ({}s) {}",
            index + 1,
            suite.name,
            if suite.enabled { "" } else { " (disabled)" },
            suite.target,
            suite.timeout_secs,
            kind
        );
    }
    Ok(())
}
