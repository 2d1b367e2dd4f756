//! Scripted fakes for the setup and executor traits (testing only)
//!
//! Provides `ScriptedSetup` and `ScriptedExecutor` so runner behaviour can be
//! exercised without spawning processes or touching the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{MonitorError, MonitorResult, SetupError};
use crate::runner::{SuiteExecutor, SuiteOutcome};
use crate::setup::EnvironmentSetup;
use crate::suite::CheckSuite;

// ---------------------------------------------------------------------------
// ScriptedSetup
// ---------------------------------------------------------------------------

/// Setup step that succeeds or fails on demand and counts invocations.
#[derive(Debug, Default)]
pub struct ScriptedSetup {
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedSetup {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnvironmentSetup for ScriptedSetup {
    async fn prepare(&self) -> Result<(), SetupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SetupError::Failed {
                command: "pip install -r requirements.txt".to_string(),
                exit_code: 1,
                stderr: "dependency install error".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedExecutor
// ---------------------------------------------------------------------------

/// Scripted behaviour for one suite.
#[derive(Debug, Clone)]
pub enum Behavior {
    Pass,
    /// Runs, but fails with the given detail.
    Fail(String),
    /// Cannot be executed at all.
    Error(String),
    /// Sleeps before passing.
    Slow(Duration),
    Panic,
}

/// Executor that follows a per-suite script and records execution order.
/// Suites without a script pass.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    script: HashMap<String, Behavior>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, suite: &str, behavior: Behavior) -> Self {
        self.script.insert(suite.to_string(), behavior);
        self
    }

    /// Names of executed suites, in execution order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SuiteExecutor for ScriptedExecutor {
    async fn execute(&self, suite: &CheckSuite) -> MonitorResult<SuiteOutcome> {
        self.executed.lock().unwrap().push(suite.name.clone());

        let behavior = self.script.get(&suite.name).cloned().unwrap_or(Behavior::Pass);
        let passed = SuiteOutcome {
            passed: true,
            exit_code: Some(0),
            output: format!("{} ok", suite.name),
            error_detail: None,
            duration_ms: 1,
        };

        match behavior {
            Behavior::Pass => Ok(passed),
            Behavior::Fail(detail) => Ok(SuiteOutcome {
                passed: false,
                exit_code: Some(1),
                output: String::new(),
                error_detail: Some(detail),
                duration_ms: 1,
            }),
            Behavior::Error(reason) => Err(MonitorError::Spawn {
                suite: suite.name.clone(),
                reason,
            }),
            Behavior::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(passed)
            }
            Behavior::Panic => panic!("scripted panic in suite {}", suite.name),
        }
    }
}
