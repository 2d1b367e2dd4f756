//! Integration tests for the monitor runner.

use cohd_monitor::fakes::{Behavior, ScriptedExecutor, ScriptedSetup};
use cohd_monitor::{
    cancel_pair, CheckSuite, DefaultExecutor, HealthGate, MonitorRunner, NoSetup, RunOutcome,
    Trigger,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn suite(name: &str) -> CheckSuite {
    CheckSuite::command(
        name,
        format!("https://{}.example/api", name),
        vec!["true".to_string()],
        60,
    )
}

fn four_suites() -> Vec<CheckSuite> {
    vec![
        suite("alive"),
        suite("cohd_io"),
        suite("cohd_trapi"),
        suite("cohd_covid_io"),
    ]
}

fn sh(name: &str, script: &str) -> CheckSuite {
    CheckSuite::command(
        name,
        "http://localhost/api",
        vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        60,
    )
}

/// Loopback HTTP responder answering every request with `status`.
async fn serve(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}/api", addr)
}

/// Loopback listener that accepts connections and never answers.
async fn hang() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _socket = socket;
                std::future::pending::<()>().await;
            });
        }
    });
    format!("http://{}/api", addr)
}

/// Test: four suites, the second fails; all four are attempted in order.
#[tokio::test]
async fn test_second_suite_failure_does_not_stop_run() {
    let executor = Arc::new(
        ScriptedExecutor::new().with("cohd_io", Behavior::Fail("HTTP 500 from /api/omop/concepts".to_string())),
    );
    let runner = MonitorRunner::new(Arc::new(ScriptedSetup::ok()), executor.clone(), four_suites());

    let outcome = runner.run(Trigger::Manual).await;

    assert!(outcome.setup_succeeded());
    let report = outcome.report().expect("report");
    assert_eq!(report.outcomes(), vec![true, false, true, true]);
    assert_eq!(
        executor.executed(),
        vec!["alive", "cohd_io", "cohd_trapi", "cohd_covid_io"]
    );
    assert!(!report.cancelled);
    assert_eq!(report.results[1].error_detail.as_deref(), Some("HTTP 500 from /api/omop/concepts"));
    assert!(report.results.iter().filter(|r| r.passed).all(|r| r.error_detail.is_none()));
}

/// Test: setup failure means zero suite executions and an empty report.
#[tokio::test]
async fn test_setup_failure_runs_nothing() {
    let setup = Arc::new(ScriptedSetup::failing());
    let executor = Arc::new(ScriptedExecutor::new());
    let runner = MonitorRunner::new(setup.clone(), executor.clone(), four_suites());

    let outcome = runner.run(Trigger::Manual).await;

    assert_eq!(setup.calls(), 1);
    assert!(executor.executed().is_empty(), "no suite may run after setup failure");
    assert!(outcome.results().is_empty());
    match outcome {
        RunOutcome::SetupFailed { error, trigger, .. } => {
            assert!(error.contains("dependency install error"));
            assert_eq!(trigger, Trigger::Manual);
        }
        RunOutcome::Reported(_) => panic!("expected setup failure"),
    }
}

/// Test: execution errors and panics are isolated to their own suite.
#[tokio::test]
async fn test_errors_and_panics_are_isolated() {
    let executor = Arc::new(
        ScriptedExecutor::new()
            .with("alive", Behavior::Error("connection refused".to_string()))
            .with("cohd_trapi", Behavior::Panic),
    );
    let runner = MonitorRunner::new(Arc::new(ScriptedSetup::ok()), executor.clone(), four_suites());

    let outcome = runner.run(Trigger::Manual).await;
    let report = outcome.report().expect("report");

    assert_eq!(report.outcomes(), vec![false, true, false, true]);
    assert_eq!(report.results[0].exit_code, Some(-1));
    assert!(report.results[0]
        .error_detail
        .as_deref()
        .unwrap_or_default()
        .contains("connection refused"));
    assert!(report.results[2]
        .error_detail
        .as_deref()
        .unwrap_or_default()
        .contains("suite task failed"));
    assert_eq!(executor.executed().len(), 4);
}

/// Test: outcome of one suite is independent of its neighbours' outcomes.
#[tokio::test]
async fn test_failure_does_not_alter_other_outcomes() {
    let baseline = MonitorRunner::new(
        Arc::new(ScriptedSetup::ok()),
        Arc::new(ScriptedExecutor::new()),
        four_suites(),
    )
    .run(Trigger::Manual)
    .await;

    let with_failure = MonitorRunner::new(
        Arc::new(ScriptedSetup::ok()),
        Arc::new(ScriptedExecutor::new().with("cohd_trapi", Behavior::Fail("schema".to_string()))),
        four_suites(),
    )
    .run(Trigger::Manual)
    .await;

    let a = baseline.report().expect("report").outcomes();
    let b = with_failure.report().expect("report").outcomes();
    for i in [0, 1, 3] {
        assert_eq!(a[i], b[i], "suite {} outcome changed", i);
    }
    assert!(!b[2]);
}

/// Test: disabled suites are skipped and leave no result.
#[tokio::test]
async fn test_disabled_suite_skipped() {
    let mut suites = four_suites();
    suites[2] = suites[2].clone().disabled();
    let executor = Arc::new(ScriptedExecutor::new());
    let runner = MonitorRunner::new(Arc::new(NoSetup), executor.clone(), suites);

    let outcome = runner.run(Trigger::Manual).await;

    assert_eq!(outcome.results().len(), 3);
    assert_eq!(executor.executed(), vec!["alive", "cohd_io", "cohd_covid_io"]);
    assert_eq!(runner.spec().suite_names.len(), 3);
}

/// Test: cancelling a manual run aborts the in-flight suite and the rest of the queue.
#[tokio::test]
async fn test_manual_cancellation_aborts_remaining_queue() {
    let executor = Arc::new(
        ScriptedExecutor::new().with("cohd_io", Behavior::Slow(Duration::from_secs(30))),
    );
    let runner = MonitorRunner::new(Arc::new(ScriptedSetup::ok()), executor.clone(), four_suites());
    let (handle, signal) = cancel_pair();

    let (outcome, _) = tokio::join!(runner.run_with_cancel(Trigger::Manual, signal), async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.cancel();
    });

    let report = outcome.report().expect("report");
    assert!(report.cancelled);
    assert_eq!(report.outcomes(), vec![true, false]);
    assert_eq!(report.results[1].error_detail.as_deref(), Some("cancelled"));
    assert_eq!(executor.executed(), vec!["alive", "cohd_io"]);
    assert!(!HealthGate::evaluate(report).passed);
}

/// Test: a run cancelled before it starts executes nothing.
#[tokio::test]
async fn test_cancelled_before_start() {
    let executor = Arc::new(ScriptedExecutor::new());
    let runner = MonitorRunner::new(Arc::new(ScriptedSetup::ok()), executor.clone(), four_suites());
    let (handle, signal) = cancel_pair();
    handle.cancel();

    let outcome = runner.run_with_cancel(Trigger::Manual, signal).await;

    let report = outcome.report().expect("report");
    assert!(report.cancelled);
    assert!(report.results.is_empty());
    assert!(executor.executed().is_empty());
}

/// Test: repeated runs are independent and keep declared order.
#[tokio::test]
async fn test_runs_are_independent() {
    let runner = MonitorRunner::new(
        Arc::new(ScriptedSetup::ok()),
        Arc::new(ScriptedExecutor::new()),
        four_suites(),
    );

    let first = runner.run(Trigger::Manual).await;
    let second = runner.run(Trigger::Manual).await;

    assert_ne!(first.run_id(), second.run_id());
    let names = |o: &RunOutcome| o.results().iter().map(|r| r.suite_name.clone()).collect::<Vec<_>>();
    assert_eq!(names(&first), names(&second));
    assert_eq!(
        first.report().expect("report").config_digest,
        second.report().expect("report").config_digest
    );
}

/// Test: real processes, including a spawn failure, through the default executor.
#[tokio::test]
async fn test_real_commands_continue_on_error() {
    let suites = vec![
        sh("first", "echo hello"),
        CheckSuite::command(
            "missing",
            "http://localhost/api",
            vec!["/nonexistent-binary-that-does-not-exist".to_string()],
            5,
        ),
        sh("failing", "exit 4"),
        sh("last", "echo $COHD_TARGET"),
    ];
    let runner = MonitorRunner::new(
        Arc::new(NoSetup),
        Arc::new(DefaultExecutor::new(None).expect("executor")),
        suites,
    );

    let outcome = runner.run(Trigger::Manual).await;
    let report = outcome.report().expect("report");

    assert_eq!(report.outcomes(), vec![true, false, false, true]);
    assert_eq!(report.results[1].exit_code, Some(-1));
    assert_eq!(report.results[2].exit_code, Some(4));
    assert!(report.results[3].output.contains("http://localhost/api"));
}

/// Test: a suite that exceeds its timeout fails and the next suite still runs.
#[tokio::test]
async fn test_suite_timeout_recorded_and_run_continues() {
    let mut slow = sh("slow", "sleep 5");
    slow.timeout_secs = 1;
    let runner = MonitorRunner::new(
        Arc::new(NoSetup),
        Arc::new(DefaultExecutor::new(None).expect("executor")),
        vec![slow, sh("after", "true")],
    );

    let outcome = runner.run(Trigger::Manual).await;
    let report = outcome.report().expect("report");

    assert_eq!(report.outcomes(), vec![false, true]);
    assert_eq!(report.results[0].exit_code, Some(-1));
    let detail = report.results[0].error_detail.as_deref().expect("detail");
    assert!(detail.contains("timed out"), "detail was: {}", detail);
    assert!(!report.cancelled);
}

/// Test: every server is probed after earlier ones time out or refuse.
#[tokio::test]
async fn test_http_probe_continues_past_unhealthy_servers() {
    let hanging = hang().await;
    let refused = "http://127.0.0.1:1/api".to_string();
    let healthy = serve("200 OK", "COHD is healthy").await;

    let suites = vec![
        CheckSuite::http("alive", vec![hanging.clone(), refused, healthy], "/health", 1),
        sh("after", "true"),
    ];
    let runner = MonitorRunner::new(
        Arc::new(NoSetup),
        Arc::new(DefaultExecutor::new(None).expect("executor")),
        suites,
    );

    let outcome = runner.run(Trigger::Manual).await;
    let report = outcome.report().expect("report");

    assert_eq!(report.outcomes(), vec![false, true]);
    let detail = report.results[0].error_detail.as_deref().expect("detail");
    let hanging_health = hanging.replace("/api", "/health");
    assert!(
        detail.contains(&format!("{} (timeout)", hanging_health)),
        "detail was: {}",
        detail
    );
    assert!(detail.contains("127.0.0.1:1/health"), "detail was: {}", detail);
    assert!(report.results[0].output.contains("COHD is healthy"));
}

/// Test: liveness probe reports unhealthy servers but the run continues.
#[tokio::test]
async fn test_http_probe_against_loopback_servers() {
    let healthy = serve("200 OK", "COHD is healthy").await;
    let unhealthy = serve("503 Service Unavailable", "down").await;

    let suites = vec![
        CheckSuite::http("alive_ok", vec![healthy.clone()], "/health", 5),
        CheckSuite::http("alive_mixed", vec![healthy, unhealthy], "/health", 5),
        sh("after", "echo still running"),
    ];
    let runner = MonitorRunner::new(
        Arc::new(NoSetup),
        Arc::new(DefaultExecutor::new(None).expect("executor")),
        suites,
    );

    let outcome = runner.run(Trigger::Manual).await;
    let report = outcome.report().expect("report");

    assert_eq!(report.outcomes(), vec![true, false, true]);
    assert!(report.results[0].output.contains("COHD is healthy"));
    let detail = report.results[1].error_detail.as_deref().expect("detail");
    assert!(detail.contains("503"), "detail was: {}", detail);

    let verdict = HealthGate::evaluate(report);
    assert!(!verdict.passed);
    assert_eq!(verdict.violations.len(), 1);
    assert!(verdict.violations[0].contains("alive_mixed"));
}
