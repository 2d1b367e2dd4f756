//! Error types for the monitor runner.

use thiserror::Error;

/// Fatal failure of the environment setup step. No suite runs after this.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A setup command had no executable.
    #[error("setup command #{index} is empty")]
    EmptyCommand { index: usize },

    /// The setup command could not be started.
    #[error("failed to spawn setup command `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    /// The setup command exited unsuccessfully.
    #[error("setup command `{command}` exited with code {exit_code}: {stderr}")]
    Failed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The setup command exceeded its time budget.
    #[error("setup command `{command}` timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },
}

/// Errors produced while executing a single suite or loading configuration.
///
/// Suite errors are caught by the runner and recorded as a failed result;
/// they never abort the run.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Suite command had no executable.
    #[error("suite '{suite}' has an empty command")]
    EmptyCommand { suite: String },

    /// Suite command could not be started.
    #[error("failed to spawn suite '{suite}': {reason}")]
    Spawn { suite: String, reason: String },

    /// Suite exceeded its time budget.
    #[error("suite '{suite}' timed out after {timeout_secs}s")]
    Timeout { suite: String, timeout_secs: u64 },

    /// HTTP client could not be constructed.
    #[error("http client error: {0}")]
    HttpClient(String),

    /// Configuration is invalid or could not be read.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result alias.
pub type MonitorResult<T> = std::result::Result<T, MonitorError>;
