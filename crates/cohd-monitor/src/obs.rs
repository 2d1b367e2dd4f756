//! Structured lifecycle events for monitor runs.
//!
//! Every run is instrumented with a `cohd_monitor.run` span; the functions below
//! emit one event per lifecycle step with an `event` field for filtering.

use tracing::{info, warn, Span};

/// Run-scoped span. Attach with `Instrument::instrument` so the run future
/// stays `Send`.
pub fn run_span(run_id: &str, trigger: &str) -> Span {
    tracing::info_span!("cohd_monitor.run", run_id = %run_id, trigger = %trigger)
}

pub fn emit_run_started(run_id: &str, trigger: &str, suites: usize) {
    info!(event = "run.started", run_id = %run_id, trigger = %trigger, suites = suites);
}

pub fn emit_setup_failed(run_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "setup.failed", run_id = %run_id, error = %error);
}

pub fn emit_suite_started(suite: &str, target: &str) {
    info!(event = "suite.started", suite = %suite, target = %target);
}

pub fn emit_suite_finished(suite: &str, passed: bool, duration_ms: u64) {
    info!(
        event = "suite.finished",
        suite = %suite,
        passed = passed,
        duration_ms = duration_ms,
    );
}

/// Suite failures are logged at warn level with the captured detail.
pub fn emit_suite_failed(suite: &str, detail: &str) {
    warn!(event = "suite.failed", suite = %suite, detail = %detail);
}

pub fn emit_run_cancelled(run_id: &str, executed: usize, remaining: usize) {
    warn!(
        event = "run.cancelled",
        run_id = %run_id,
        executed = executed,
        remaining = remaining,
    );
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, passed: usize, failed: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        passed = passed,
        failed = failed,
    );
}

pub fn emit_gate_evaluated(run_id: &str, passed: bool, violations: usize) {
    info!(
        event = "gate.evaluated",
        run_id = %run_id,
        passed = passed,
        violations = violations,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let _entered = run_span("test-run-id", "manual").entered();
        emit_suite_started("alive", "https://cohd.io/api");
    }
}
