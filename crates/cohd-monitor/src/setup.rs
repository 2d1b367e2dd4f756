//! Environment setup gate.
//!
//! Setup installs the test-execution environment before any suite runs. A
//! setup failure is fatal to the whole run.

use crate::error::SetupError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Default budget for a single install command.
pub const DEFAULT_SETUP_TIMEOUT_SECS: u64 = 600;

/// Precondition gate executed once per run before any suite.
#[async_trait]
pub trait EnvironmentSetup: Send + Sync {
    async fn prepare(&self) -> Result<(), SetupError>;
}

/// Setup that always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSetup;

#[async_trait]
impl EnvironmentSetup for NoSetup {
    async fn prepare(&self) -> Result<(), SetupError> {
        Ok(())
    }
}

/// Runs install commands in order; the first failure aborts setup.
#[derive(Debug, Clone)]
pub struct CommandSetup {
    commands: Vec<Vec<String>>,
    timeout_secs: u64,
    working_dir: Option<PathBuf>,
}

impl CommandSetup {
    pub fn new(commands: Vec<Vec<String>>) -> Self {
        Self {
            commands,
            timeout_secs: DEFAULT_SETUP_TIMEOUT_SECS,
            working_dir: None,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    async fn run_one(&self, index: usize, command: &[String]) -> Result<(), SetupError> {
        let Some((exe, args)) = command.split_first() else {
            return Err(SetupError::EmptyCommand { index });
        };
        let rendered = command.join(" ");

        debug!(command = %rendered, "Running setup command");

        let mut cmd = Command::new(exe);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| SetupError::Spawn {
            command: rendered.clone(),
            reason: e.to_string(),
        })?;

        let waited = if self.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(self.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| SetupError::Timeout {
                command: rendered.clone(),
                timeout_secs: self.timeout_secs,
            })?
        } else {
            child.wait_with_output().await
        };

        let output = waited.map_err(|e| SetupError::Spawn {
            command: rendered.clone(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(SetupError::Failed {
                command: rendered,
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EnvironmentSetup for CommandSetup {
    async fn prepare(&self) -> Result<(), SetupError> {
        for (index, command) in self.commands.iter().enumerate() {
            self.run_one(index, command).await?;
        }
        info!(commands = self.commands.len(), "Environment setup complete");
        Ok(())
    }
}

/// Install commands used by the standard COHD test environment.
pub fn default_setup_commands() -> Vec<Vec<String>> {
    vec![
        vec![
            "python".to_string(),
            "-m".to_string(),
            "pip".to_string(),
            "install".to_string(),
            "--upgrade".to_string(),
            "pip".to_string(),
        ],
        vec![
            "pip".to_string(),
            "install".to_string(),
            "-r".to_string(),
            "requirements.txt".to_string(),
        ],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_no_setup_succeeds() {
        assert!(NoSetup.prepare().await.is_ok());
    }

    #[tokio::test]
    async fn test_command_setup_runs_all_commands() {
        let dir = tempfile::tempdir().expect("tempdir");
        let setup = CommandSetup::new(vec![sh("touch a"), sh("touch b")])
            .with_working_dir(Some(dir.path().to_path_buf()));
        setup.prepare().await.expect("setup");
        assert!(dir.path().join("a").exists());
        assert!(dir.path().join("b").exists());
    }

    #[tokio::test]
    async fn test_first_failure_aborts_setup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let setup = CommandSetup::new(vec![sh("echo nope >&2; exit 2"), sh("touch never")])
            .with_working_dir(Some(dir.path().to_path_buf()));
        let err = setup.prepare().await.unwrap_err();
        match err {
            SetupError::Failed { exit_code, stderr, .. } => {
                assert_eq!(exit_code, 2);
                assert_eq!(stderr, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("never").exists());
    }

    #[tokio::test]
    async fn test_setup_runs_with_debug_logging() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let err = CommandSetup::new(vec![sh("exit 7")]).prepare().await.unwrap_err();
        assert!(err.to_string().contains("sh -c exit 7"), "error was: {err}");
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let setup = CommandSetup::new(vec![vec!["/nonexistent-installer".to_string()]]);
        assert!(matches!(setup.prepare().await, Err(SetupError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let setup = CommandSetup::new(vec![sh("true"), vec![]]);
        assert!(matches!(
            setup.prepare().await,
            Err(SetupError::EmptyCommand { index: 1 })
        ));
    }

    #[tokio::test]
    async fn test_setup_timeout() {
        let setup = CommandSetup::new(vec![sh("sleep 5")]).with_timeout(1);
        assert!(matches!(
            setup.prepare().await,
            Err(SetupError::Timeout { timeout_secs: 1, .. })
        ));
    }
}
