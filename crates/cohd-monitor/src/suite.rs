//! Check-suite definitions and configuration.

use serde::{Deserialize, Serialize};

/// Per-request budget of the liveness probe.
pub const PROBE_TIMEOUT_SECS: u64 = 10;

/// Production and Translator deployments probed by the liveness suite.
pub const COHD_SERVERS: [&str; 4] = [
    "https://cohd.io/api",
    "https://cohd-api.ci.transltr.io/api",
    "https://cohd-api.test.transltr.io/api",
    "https://cohd-api.transltr.io/api",
];

/// Builtin COHD suites, in the order they run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinSuite {
    /// GET /health on every COHD deployment
    Alive,

    /// pytest -s test_cohd_io.py
    CohdIo,

    /// pytest -s test_cohd_trapi.py
    CohdTrapi,

    /// pytest -s test_cohd_covid_io.py
    CohdCovidIo,
}

impl BuiltinSuite {
    /// All builtin suites in declared order.
    pub const ALL: [BuiltinSuite; 4] = [
        BuiltinSuite::Alive,
        BuiltinSuite::CohdIo,
        BuiltinSuite::CohdTrapi,
        BuiltinSuite::CohdCovidIo,
    ];

    /// Get the suite name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinSuite::Alive => "alive",
            BuiltinSuite::CohdIo => "cohd_io",
            BuiltinSuite::CohdTrapi => "cohd_trapi",
            BuiltinSuite::CohdCovidIo => "cohd_covid_io",
        }
    }

    /// Endpoint family this suite targets.
    pub fn target(&self) -> &'static str {
        match self {
            BuiltinSuite::Alive => COHD_SERVERS[0],
            BuiltinSuite::CohdIo => "https://cohd.io/api",
            BuiltinSuite::CohdTrapi => "https://cohd.io/api/query",
            BuiltinSuite::CohdCovidIo => "https://covid.cohd.io/api",
        }
    }

    /// How the suite is checked.
    pub fn check(&self) -> CheckKind {
        match self {
            BuiltinSuite::Alive => CheckKind::Http {
                servers: COHD_SERVERS.iter().map(|s| s.to_string()).collect(),
                path: "/health".to_string(),
            },
            BuiltinSuite::CohdIo => pytest("test_cohd_io.py"),
            BuiltinSuite::CohdTrapi => pytest("test_cohd_trapi.py"),
            BuiltinSuite::CohdCovidIo => pytest("test_cohd_covid_io.py"),
        }
    }

    /// Builtin timeout. Zero inherits the monitor-wide default.
    pub fn timeout_secs(&self) -> u64 {
        match self {
            BuiltinSuite::Alive => PROBE_TIMEOUT_SECS,
            _ => 0,
        }
    }
}

fn pytest(script: &str) -> CheckKind {
    CheckKind::Command {
        command: vec![
            "python".to_string(),
            "-m".to_string(),
            "pytest".to_string(),
            "-s".to_string(),
            script.to_string(),
        ],
    }
}

/// How a suite is executed against its target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckKind {
    /// External test-set executable (first element is the program).
    /// Passes iff it exits with status 0.
    Command { command: Vec<String> },

    /// Native liveness probe: `GET <server><path>` on every server.
    /// Passes iff every server answers HTTP 200.
    Http { servers: Vec<String>, path: String },
}

/// Configuration for a single check-suite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckSuite {
    /// Unique suite name.
    pub name: String,

    /// Endpoint family under test. Exported to command suites as `COHD_TARGET`.
    pub target: String,

    /// Executable test-set reference.
    pub check: CheckKind,

    /// Timeout in seconds. Zero inherits the monitor-wide default; zero
    /// after resolution leaves the suite unbounded.
    #[serde(default)]
    pub timeout_secs: u64,

    /// Whether this suite is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl CheckSuite {
    /// Create a suite from a builtin definition.
    pub fn from_builtin(suite: BuiltinSuite, timeout_secs: u64) -> Self {
        Self {
            name: suite.name().to_string(),
            target: suite.target().to_string(),
            check: suite.check(),
            timeout_secs,
            enabled: true,
        }
    }

    /// Create a suite that runs an external command.
    pub fn command(
        name: impl Into<String>,
        target: impl Into<String>,
        command: Vec<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            check: CheckKind::Command { command },
            timeout_secs,
            enabled: true,
        }
    }

    /// Create a suite that probes `path` on each server over HTTP.
    pub fn http(
        name: impl Into<String>,
        servers: Vec<String>,
        path: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let target = servers.first().cloned().unwrap_or_default();
        Self {
            name: name.into(),
            target,
            check: CheckKind::Http {
                servers,
                path: path.into(),
            },
            timeout_secs,
            enabled: true,
        }
    }

    /// Disable this suite.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// The four standard COHD suites in declared order, with builtin timeouts.
pub fn builtin_suites() -> Vec<CheckSuite> {
    BuiltinSuite::ALL
        .into_iter()
        .map(|s| CheckSuite::from_builtin(s, s.timeout_secs()))
        .collect()
}
