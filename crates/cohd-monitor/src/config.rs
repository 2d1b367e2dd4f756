//! Monitor configuration.
//!
//! Loaded from a JSON file; missing fields fall back to the standard COHD
//! setup, the four builtin suites and the twice-daily schedule.
//!
//! Environment overrides (applied after the file):
//! - `COHD_MONITOR_TIMEOUT_SECS` : monitor-wide default suite timeout
//! - `COHD_MONITOR_WORKDIR` : working directory for setup and command suites

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{MonitorError, MonitorResult};
use crate::setup::{default_setup_commands, DEFAULT_SETUP_TIMEOUT_SECS};
use crate::suite::{builtin_suites, CheckKind, CheckSuite};
use crate::trigger::Schedule;

/// Default suite timeout inherited by suites that do not set their own.
pub const DEFAULT_RUNNER_TIMEOUT_SECS: u64 = 600;

pub const ENV_TIMEOUT_SECS: &str = "COHD_MONITOR_TIMEOUT_SECS";
pub const ENV_WORKDIR: &str = "COHD_MONITOR_WORKDIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Install commands run before any suite. Empty disables setup.
    pub setup_commands: Vec<Vec<String>>,

    pub setup_timeout_secs: u64,

    /// Suites in execution order.
    pub suites: Vec<CheckSuite>,

    /// Daily fire times, `HH:MM` UTC.
    pub schedule: Vec<String>,

    /// Timeout for suites whose own timeout is zero.
    pub default_timeout_secs: u64,

    pub working_dir: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            setup_commands: default_setup_commands(),
            setup_timeout_secs: DEFAULT_SETUP_TIMEOUT_SECS,
            suites: builtin_suites(),
            schedule: vec!["00:00".to_string(), "12:00".to_string()],
            default_timeout_secs: DEFAULT_RUNNER_TIMEOUT_SECS,
            working_dir: None,
        }
    }
}

impl MonitorConfig {
    /// Read a config file, apply environment overrides and validate.
    pub fn load(path: &Path) -> MonitorResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config: MonitorConfig = serde_json::from_str(&raw)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> MonitorResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> MonitorResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            self.default_timeout_secs = value.trim().parse().map_err(|_| {
                MonitorError::Config(format!("{} must be an integer, got '{}'", ENV_TIMEOUT_SECS, value))
            })?;
        }
        if let Some(dir) = lookup(ENV_WORKDIR) {
            if !dir.trim().is_empty() {
                self.working_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(())
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> MonitorResult<()> {
        let mut seen = HashSet::new();
        for suite in &self.suites {
            if suite.name.trim().is_empty() {
                return Err(MonitorError::Config("suite name must not be empty".to_string()));
            }
            if !seen.insert(suite.name.as_str()) {
                return Err(MonitorError::Config(format!("duplicate suite name '{}'", suite.name)));
            }
            match &suite.check {
                CheckKind::Command { command } if command.is_empty() => {
                    return Err(MonitorError::Config(format!(
                        "suite '{}' has an empty command",
                        suite.name
                    )));
                }
                CheckKind::Http { servers, .. } if servers.is_empty() => {
                    return Err(MonitorError::Config(format!(
                        "suite '{}' has no servers to probe",
                        suite.name
                    )));
                }
                _ => {}
            }
        }
        if let Some(index) = self.setup_commands.iter().position(|c| c.is_empty()) {
            return Err(MonitorError::Config(format!("setup command #{} is empty", index)));
        }
        self.schedule()?;
        Ok(())
    }

    pub fn schedule(&self) -> MonitorResult<Schedule> {
        Schedule::parse(&self.schedule)
    }

    /// Suites with inherited timeouts filled in.
    pub fn resolved_suites(&self) -> Vec<CheckSuite> {
        self.suites
            .iter()
            .cloned()
            .map(|mut suite| {
                if suite.timeout_secs == 0 {
                    suite.timeout_secs = self.default_timeout_secs;
                }
                suite
            })
            .collect()
    }
}
