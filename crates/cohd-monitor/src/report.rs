//! Per-run reporting.
//!
//! A [`RunReport`] is built fresh for every invocation and discarded after it
//! is printed; nothing is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::spec::short_digest;
use crate::trigger::Trigger;

/// Outcome of one suite in one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunResult {
    pub suite_name: String,
    pub target: String,
    pub passed: bool,
    pub error_detail: Option<String>,
    /// Exit code for command suites; `-1` when the suite could not be executed.
    pub exit_code: Option<i32>,
    /// Captured diagnostic output.
    pub output: String,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl RunResult {
    /// A suite that ran and passed.
    pub fn pass(suite_name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            target: target.into(),
            passed: true,
            error_detail: None,
            exit_code: None,
            output: String::new(),
            duration_ms: 0,
            timestamp: Utc::now(),
        }
    }

    /// A suite that failed with `detail`.
    pub fn fail(
        suite_name: impl Into<String>,
        target: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            passed: false,
            error_detail: Some(detail.into()),
            ..Self::pass(suite_name, target)
        }
    }
}

/// Ordered results of one monitor invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub run_id: String,
    pub trigger: Trigger,
    /// Digest of the suite configuration that produced this report.
    pub config_digest: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per executed suite, in execution order.
    pub results: Vec<RunResult>,
    /// True if the run was cancelled before every suite executed.
    pub cancelled: bool,
}

impl RunReport {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// True if every executed suite passed and the run was not cancelled.
    pub fn all_passed(&self) -> bool {
        !self.cancelled && self.results.iter().all(|r| r.passed)
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as u64
    }

    /// Pass/fail outcomes in execution order.
    pub fn outcomes(&self) -> Vec<bool> {
        self.results.iter().map(|r| r.passed).collect()
    }

    /// Plain-text summary for terminal output.
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "Run {} ({} trigger, config {})\n",
            self.run_id,
            self.trigger.label(),
            short_digest(&self.config_digest)
        );
        out.push_str(&format!("Duration: {}ms\n\n", self.duration_ms()));

        for result in &self.results {
            let status = if result.passed { "✓" } else { "✗" };
            out.push_str(&format!(
                "  {} {} [{}] ({}ms)\n",
                status, result.suite_name, result.target, result.duration_ms
            ));
            if let Some(detail) = &result.error_detail {
                out.push_str(&format!("      {}\n", detail));
            }
        }

        if self.cancelled {
            out.push_str("\nRun cancelled; remaining suites were not executed.\n");
        }
        out.push_str(&format!(
            "\nSummary: {}/{} suites passed\n",
            self.passed_count(),
            self.results.len()
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(results: Vec<RunResult>) -> RunReport {
        let now = Utc::now();
        RunReport {
            run_id: "run123".to_string(),
            trigger: Trigger::Manual,
            config_digest: "abcdef0123456789".to_string(),
            started_at: now,
            finished_at: now,
            results,
            cancelled: false,
        }
    }

    #[test]
    fn test_report_counts() {
        let r = report(vec![
            RunResult::pass("alive", "https://cohd.io/api"),
            RunResult::fail("cohd_io", "https://cohd.io/api", "exited with code 1"),
            RunResult::pass("cohd_trapi", "https://cohd.io/api/query"),
        ]);
        assert_eq!(r.passed_count(), 2);
        assert_eq!(r.failed_count(), 1);
        assert!(!r.all_passed());
        assert_eq!(r.outcomes(), vec![true, false, true]);
    }

    #[test]
    fn test_render_text_tolerates_non_hex_digest() {
        let mut r = report(vec![RunResult::pass("alive", "x")]);
        r.config_digest = "config-v12-ü-restored".to_string();
        assert!(r.render_text().contains("config config-v12-ü-restored"));
    }

    #[test]
    fn test_cancelled_report_never_all_passed() {
        let mut r = report(vec![RunResult::pass("alive", "x")]);
        assert!(r.all_passed());
        r.cancelled = true;
        assert!(!r.all_passed());
    }

    #[test]
    fn test_render_text_lists_failures() {
        let r = report(vec![
            RunResult::pass("alive", "https://cohd.io/api"),
            RunResult::fail("cohd_io", "https://cohd.io/api", "HTTP 503"),
        ]);
        let text = r.render_text();
        assert!(text.contains("✓ alive"));
        assert!(text.contains("✗ cohd_io"));
        assert!(text.contains("HTTP 503"));
        assert!(text.contains("1/2 suites passed"));
        assert!(text.contains("config abcdef012345"));
    }

    #[test]
    fn test_report_serializes_trigger_source() {
        let r = report(vec![]);
        let json = serde_json::to_value(&r).expect("serialize");
        assert_eq!(json["trigger"]["source"], "manual");
    }
}
