//! Suite execution against remote endpoints.

use crate::error::{MonitorError, MonitorResult};
use crate::suite::{CheckKind, CheckSuite};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Environment variable carrying the suite target into command suites.
pub const TARGET_ENV_VAR: &str = "COHD_TARGET";

/// Raw outcome of executing one suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteOutcome {
    /// Whether the suite passed.
    pub passed: bool,

    /// Exit code for command suites.
    pub exit_code: Option<i32>,

    /// Captured diagnostic output.
    pub output: String,

    /// Failure detail (None if passed).
    pub error_detail: Option<String>,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

/// Executes a single suite against its target.
///
/// An `Err` means the suite could not be executed at all (spawn failure,
/// timeout); the monitor records it as a failed suite like any other failure.
#[async_trait]
pub trait SuiteExecutor: Send + Sync {
    async fn execute(&self, suite: &CheckSuite) -> MonitorResult<SuiteOutcome>;
}

/// Runs command suites as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    working_dir: Option<PathBuf>,
}

impl ProcessExecutor {
    pub fn new(working_dir: Option<PathBuf>) -> Self {
        Self { working_dir }
    }

    async fn run_command(&self, suite: &CheckSuite, command: &[String]) -> MonitorResult<SuiteOutcome> {
        let start = Instant::now();

        let Some((exe, args)) = command.split_first() else {
            return Err(MonitorError::EmptyCommand {
                suite: suite.name.clone(),
            });
        };

        let mut cmd = Command::new(exe);
        cmd.args(args)
            .env(TARGET_ENV_VAR, &suite.target)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| MonitorError::Spawn {
            suite: suite.name.clone(),
            reason: e.to_string(),
        })?;

        let output = if suite.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(suite.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| MonitorError::Timeout {
                suite: suite.name.clone(),
                timeout_secs: suite.timeout_secs,
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let passed = output.status.success();

        let error_detail = if passed {
            None
        } else {
            let tail = stderr.trim();
            Some(if tail.is_empty() {
                format!("exited with code {}", exit_code)
            } else {
                format!("exited with code {}: {}", exit_code, tail)
            })
        };

        Ok(SuiteOutcome {
            passed,
            exit_code: Some(exit_code),
            output: format!("{}{}", stdout, stderr),
            error_detail,
            duration_ms,
        })
    }
}

#[async_trait]
impl SuiteExecutor for ProcessExecutor {
    async fn execute(&self, suite: &CheckSuite) -> MonitorResult<SuiteOutcome> {
        match &suite.check {
            CheckKind::Command { command } => self.run_command(suite, command).await,
            CheckKind::Http { .. } => Err(MonitorError::Config(format!(
                "suite '{}' is an http probe, not a command",
                suite.name
            ))),
        }
    }
}

/// Probes `/health`-style endpoints over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProbeExecutor {
    client: Client,
}

impl HttpProbeExecutor {
    pub fn new() -> MonitorResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("cohd-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MonitorError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    async fn probe(&self, suite: &CheckSuite, servers: &[String], path: &str) -> MonitorResult<SuiteOutcome> {
        let start = Instant::now();
        let mut output = String::new();
        let mut unhealthy = Vec::new();

        for server in servers {
            let url = match probe_url(server, path) {
                Ok(url) => url,
                Err(reason) => {
                    output.push_str(&format!("{}: invalid url ({})\n", server, reason));
                    unhealthy.push(format!("{} (invalid url)", server));
                    continue;
                }
            };

            debug!(suite = %suite.name, url = %url, "Probing server");

            let mut request = self.client.get(url.clone());
            if suite.timeout_secs > 0 {
                request = request.timeout(Duration::from_secs(suite.timeout_secs));
            }

            match request.send().await {
                Ok(response) if response.status() == StatusCode::OK => match response.text().await {
                    Ok(body) => output.push_str(&format!("{}: {}\n", url, body.trim())),
                    Err(e) => {
                        let reason = failure_reason(&e);
                        output.push_str(&format!("{}: UNHEALTHY (body: {})\n", url, reason));
                        unhealthy.push(format!("{} (body: {})", url, reason));
                    }
                },
                Ok(response) => {
                    output.push_str(&format!("{}: UNHEALTHY (HTTP {})\n", url, response.status()));
                    unhealthy.push(format!("{} (HTTP {})", url, response.status().as_u16()));
                }
                Err(e) => {
                    let reason = failure_reason(&e);
                    output.push_str(&format!("{}: UNHEALTHY ({})\n", url, reason));
                    unhealthy.push(format!("{} ({})", url, reason));
                }
            }
        }

        let passed = unhealthy.is_empty();
        Ok(SuiteOutcome {
            passed,
            exit_code: None,
            output,
            error_detail: (!passed).then(|| format!("unhealthy: {}", unhealthy.join(", "))),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

fn failure_reason(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timeout".to_string()
    } else {
        e.to_string()
    }
}

/// Resolve `path` against `server` with URL-reference semantics: an absolute
/// path replaces the server's own path.
fn probe_url(server: &str, path: &str) -> Result<Url, String> {
    let base = Url::parse(server).map_err(|e| e.to_string())?;
    base.join(path).map_err(|e| e.to_string())
}

#[async_trait]
impl SuiteExecutor for HttpProbeExecutor {
    async fn execute(&self, suite: &CheckSuite) -> MonitorResult<SuiteOutcome> {
        match &suite.check {
            CheckKind::Http { servers, path } => self.probe(suite, servers, path).await,
            CheckKind::Command { .. } => Err(MonitorError::Config(format!(
                "suite '{}' is a command, not an http probe",
                suite.name
            ))),
        }
    }
}

/// Dispatches each suite to the executor for its check kind.
#[derive(Debug, Clone)]
pub struct DefaultExecutor {
    process: ProcessExecutor,
    http: HttpProbeExecutor,
}

impl DefaultExecutor {
    pub fn new(working_dir: Option<PathBuf>) -> MonitorResult<Self> {
        Ok(Self {
            process: ProcessExecutor::new(working_dir),
            http: HttpProbeExecutor::new()?,
        })
    }
}

#[async_trait]
impl SuiteExecutor for DefaultExecutor {
    async fn execute(&self, suite: &CheckSuite) -> MonitorResult<SuiteOutcome> {
        match suite.check {
            CheckKind::Command { .. } => self.process.execute(suite).await,
            CheckKind::Http { .. } => self.http.execute(suite).await,
        }
    }
}
