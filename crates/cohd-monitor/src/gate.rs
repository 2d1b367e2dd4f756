//! Health gate evaluation for pass/fail criteria.

use crate::report::RunReport;
use serde::{Deserialize, Serialize};

/// Gate evaluation verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateVerdict {
    /// Whether the gate passed.
    pub passed: bool,

    /// Violations that caused failure (empty if passed).
    pub violations: Vec<String>,

    /// Summary message.
    pub message: String,
}

/// Health gate rules.
pub struct HealthGate;

impl HealthGate {
    /// Evaluate whether every executed suite passed.
    ///
    /// Gate rule:
    /// - Every failed suite is a violation, carrying its error detail
    /// - A cancelled run is a violation
    /// - A run with no results at all is a violation
    pub fn evaluate(report: &RunReport) -> GateVerdict {
        let mut violations = Vec::new();

        for result in &report.results {
            if !result.passed {
                let detail = result.error_detail.as_deref().unwrap_or("unknown error");
                violations.push(format!("Suite '{}' failed: {}", result.suite_name, detail));
            }
        }

        if report.cancelled {
            violations.push("Run was cancelled before all suites executed".to_string());
        } else if report.results.is_empty() {
            violations.push("No suites were executed".to_string());
        }

        let passed = violations.is_empty();
        let message = if passed {
            "All suites passed".to_string()
        } else {
            format!("Gate failed with {} violation(s)", violations.len())
        };

        GateVerdict {
            passed,
            violations,
            message,
        }
    }
}
