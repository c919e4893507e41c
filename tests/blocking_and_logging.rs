// tests/blocking_and_logging.rs

use tracing::info_span;

use xcproc::errors::ExecError;
use xcproc::exec::{CancellationToken, Invocation, ProcessRunner};
use xcproc_test_utils::logs::capture_logs;

#[test]
fn blocking_run_works_outside_a_runtime() {
    let runner = ProcessRunner::default();

    let out = runner
        .run_blocking(&Invocation::new("echo").args(["hello", "world"]), None)
        .unwrap();

    assert_eq!(out.exit_code, 0);
    assert_eq!(out.stdout, "hello world\n");
}

#[test]
fn blocking_run_reports_nonzero_exit_and_cancellation() {
    let runner = ProcessRunner::default();

    let out = runner
        .run_blocking(&Invocation::new("sh").args(["-c", "exit 42"]), None)
        .unwrap();
    assert_eq!(out.exit_code, 42);

    let token = CancellationToken::new();
    token.cancel();
    let err = runner
        .run_blocking(&Invocation::new("sleep").arg("30"), Some(&token))
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn blocking_run_refuses_to_block_a_runtime() {
    let runner = ProcessRunner::default();

    let err = runner
        .run_blocking(&Invocation::new("echo"), None)
        .unwrap_err();

    assert!(matches!(err, ExecError::BlockingInAsyncContext));
}

#[test]
fn runner_logs_inside_the_injected_span() {
    let (result, logs) = capture_logs(|| {
        let runner = ProcessRunner::default().with_span(info_span!("simctl"));
        runner.run_blocking(&Invocation::new("echo").arg("hi"), None)
    });

    assert_eq!(result.unwrap().stdout, "hi\n");
    assert!(logs.contains("simctl"), "span name missing from logs:\n{logs}");
    assert!(logs.contains("starting process"), "logs:\n{logs}");
    assert!(logs.contains("process exited"), "logs:\n{logs}");
    assert!(logs.contains("exit_code=0"), "logs:\n{logs}");
}

#[test]
fn launch_failures_are_logged() {
    let (result, logs) = capture_logs(|| {
        ProcessRunner::default()
            .run_blocking(&Invocation::new("/nonexistent/definitely-not-here"), None)
    });

    assert!(result.unwrap_err().is_launch());
    assert!(logs.contains("failed to launch process"), "logs:\n{logs}");
}

#[test]
fn separate_runners_log_independently() {
    let (_, first) = capture_logs(|| {
        ProcessRunner::default()
            .with_span(info_span!("xcode_select"))
            .run_blocking(&Invocation::new("true"), None)
    });
    let (_, second) = capture_logs(|| {
        ProcessRunner::default()
            .with_span(info_span!("pkgutil"))
            .run_blocking(&Invocation::new("true"), None)
    });

    assert!(first.contains("xcode_select") && !first.contains("pkgutil"));
    assert!(second.contains("pkgutil") && !second.contains("xcode_select"));
}
