//! COHD Monitor - scheduled health checks for the COHD API
//!
//! Provides a monitor runner that:
//! - Installs the test environment once per run (fatal on failure)
//! - Executes check-suites sequentially in declared order
//! - Records every suite's outcome, continuing past failures
//! - Fires on a twice-daily schedule or on demand

pub mod cancel;
pub mod config;
pub mod error;
pub mod fakes;
pub mod gate;
pub mod monitor;
pub mod obs;
pub mod report;
pub mod runner;
pub mod scheduler;
pub mod setup;
pub mod spec;
pub mod suite;
pub mod telemetry;
pub mod trigger;

// Re-export key types
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use config::MonitorConfig;
pub use error::{MonitorError, MonitorResult, SetupError};
pub use gate::{GateVerdict, HealthGate};
pub use monitor::{MonitorRunner, RunOutcome};
pub use report::{RunReport, RunResult};
pub use runner::{DefaultExecutor, HttpProbeExecutor, ProcessExecutor, SuiteExecutor, SuiteOutcome};
pub use scheduler::Scheduler;
pub use setup::{CommandSetup, EnvironmentSetup, NoSetup};
pub use spec::MonitorSpec;
pub use suite::{BuiltinSuite, CheckKind, CheckSuite};
pub use telemetry::init_tracing;
pub use trigger::{Schedule, Trigger};
