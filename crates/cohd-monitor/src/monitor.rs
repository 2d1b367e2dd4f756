//! Monitor runner: setup gate, then every enabled suite in declared order.

use crate::cancel::CancelSignal;
use crate::config::MonitorConfig;
use crate::error::MonitorResult;
use crate::obs;
use crate::report::{RunReport, RunResult};
use crate::runner::{DefaultExecutor, SuiteExecutor};
use crate::setup::{CommandSetup, EnvironmentSetup, NoSetup};
use crate::spec::MonitorSpec;
use crate::suite::CheckSuite;
use crate::trigger::Trigger;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Detail recorded for a suite aborted by cancellation.
pub const CANCELLED_DETAIL: &str = "cancelled";

/// Result of one monitor invocation.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Environment setup failed; no suite ran.
    SetupFailed {
        run_id: String,
        trigger: Trigger,
        error: String,
    },

    /// Setup succeeded (or was cancelled) and suites were reported.
    Reported(RunReport),
}

impl RunOutcome {
    pub fn run_id(&self) -> &str {
        match self {
            RunOutcome::SetupFailed { run_id, .. } => run_id,
            RunOutcome::Reported(report) => &report.run_id,
        }
    }

    pub fn setup_succeeded(&self) -> bool {
        matches!(self, RunOutcome::Reported(_))
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Reported(report) => Some(report),
            RunOutcome::SetupFailed { .. } => None,
        }
    }

    /// Per-suite results; empty when setup failed.
    pub fn results(&self) -> &[RunResult] {
        self.report().map(|r| r.results.as_slice()).unwrap_or(&[])
    }
}

/// Sequential health-check runner.
pub struct MonitorRunner {
    setup: Arc<dyn EnvironmentSetup>,
    executor: Arc<dyn SuiteExecutor>,
    suites: Vec<CheckSuite>,
    spec: MonitorSpec,
}

impl MonitorRunner {
    pub fn new(
        setup: Arc<dyn EnvironmentSetup>,
        executor: Arc<dyn SuiteExecutor>,
        suites: Vec<CheckSuite>,
    ) -> Self {
        let spec = MonitorSpec::new(&suites);
        Self {
            setup,
            executor,
            suites,
            spec,
        }
    }

    /// Build a runner with process/HTTP executors from configuration.
    pub fn from_config(config: &MonitorConfig) -> MonitorResult<Self> {
        let setup: Arc<dyn EnvironmentSetup> = if config.setup_commands.is_empty() {
            Arc::new(NoSetup)
        } else {
            Arc::new(
                CommandSetup::new(config.setup_commands.clone())
                    .with_timeout(config.setup_timeout_secs)
                    .with_working_dir(config.working_dir.clone()),
            )
        };
        let executor = Arc::new(DefaultExecutor::new(config.working_dir.clone())?);
        Ok(Self::new(setup, executor, config.resolved_suites()))
    }

    pub fn suites(&self) -> &[CheckSuite] {
        &self.suites
    }

    pub fn spec(&self) -> &MonitorSpec {
        &self.spec
    }

    /// Execute one run to completion.
    pub async fn run(&self, trigger: Trigger) -> RunOutcome {
        self.run_with_cancel(trigger, CancelSignal::never()).await
    }

    /// Execute one run, aborting the remaining queue when `cancel` fires.
    ///
    /// Each suite executes in its own task: an error or panic in one suite is
    /// recorded as that suite's failure and the next suite still runs. On
    /// cancellation the in-flight suite is aborted and recorded as failed;
    /// later suites are not executed.
    pub async fn run_with_cancel(&self, trigger: Trigger, cancel: CancelSignal) -> RunOutcome {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id, trigger.label());
        self.run_inner(run_id, trigger, cancel).instrument(span).await
    }

    async fn run_inner(&self, run_id: String, trigger: Trigger, mut cancel: CancelSignal) -> RunOutcome {
        let started_at = Utc::now();

        let enabled: Vec<&CheckSuite> = self.suites.iter().filter(|s| s.enabled).collect();
        obs::emit_run_started(&run_id, trigger.label(), enabled.len());

        let setup = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.setup.prepare() => Some(result),
        };
        match setup {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                obs::emit_setup_failed(&run_id, &e);
                return RunOutcome::SetupFailed {
                    run_id,
                    trigger,
                    error: e.to_string(),
                };
            }
            None => {
                obs::emit_run_cancelled(&run_id, 0, enabled.len());
                return RunOutcome::Reported(RunReport {
                    run_id,
                    trigger,
                    config_digest: self.spec.suites_digest.clone(),
                    started_at,
                    finished_at: Utc::now(),
                    results: Vec::new(),
                    cancelled: true,
                });
            }
        }

        let mut results = Vec::with_capacity(enabled.len());
        let mut cancelled = false;

        for suite in self.suites.iter() {
            if !suite.enabled {
                info!(suite = %suite.name, "Skipping disabled suite");
                continue;
            }
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            obs::emit_suite_started(&suite.name, &suite.target);
            let (result, aborted) = self.execute_isolated(suite, &mut cancel).await;

            if let Some(detail) = &result.error_detail {
                obs::emit_suite_failed(&suite.name, detail);
            }
            obs::emit_suite_finished(&suite.name, result.passed, result.duration_ms);
            results.push(result);

            if aborted {
                cancelled = true;
                break;
            }
        }

        if cancelled {
            obs::emit_run_cancelled(&run_id, results.len(), enabled.len() - results.len());
        }

        let report = RunReport {
            run_id: run_id.clone(),
            trigger,
            config_digest: self.spec.suites_digest.clone(),
            started_at,
            finished_at: Utc::now(),
            results,
            cancelled,
        };

        obs::emit_run_finished(
            &run_id,
            report.duration_ms(),
            report.passed_count(),
            report.failed_count(),
        );

        RunOutcome::Reported(report)
    }

    /// Run one suite in its own task. Returns the result and whether the
    /// suite was aborted by cancellation.
    async fn execute_isolated(&self, suite: &CheckSuite, cancel: &mut CancelSignal) -> (RunResult, bool) {
        let timestamp = Utc::now();
        let started = std::time::Instant::now();
        let executor = Arc::clone(&self.executor);
        let owned = suite.clone();
        let mut task = tokio::spawn(async move { executor.execute(&owned).await }.in_current_span());

        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            joined = &mut task => Some(joined),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let mut result = RunResult {
            suite_name: suite.name.clone(),
            target: suite.target.clone(),
            passed: false,
            error_detail: None,
            exit_code: None,
            output: String::new(),
            duration_ms: elapsed_ms,
            timestamp,
        };

        match joined {
            None => {
                task.abort();
                result.error_detail = Some(CANCELLED_DETAIL.to_string());
                (result, true)
            }
            Some(Ok(Ok(outcome))) => {
                result.passed = outcome.passed;
                result.error_detail = outcome.error_detail;
                result.exit_code = outcome.exit_code;
                result.output = outcome.output;
                result.duration_ms = outcome.duration_ms;
                (result, false)
            }
            Some(Ok(Err(e))) => {
                result.exit_code = Some(-1);
                result.error_detail = Some(e.to_string());
                (result, false)
            }
            Some(Err(join_error)) => {
                result.exit_code = Some(-1);
                result.error_detail = Some(format!("suite task failed: {}", join_error));
                (result, false)
            }
        }
    }
}
