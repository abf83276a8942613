#![cfg(unix)]

mod common;
use crate::common::{CaptureSink, TestResult, init_tracing, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use penwatch::errors::{ErrorKind, PenwatchError};
use penwatch::exec::{ProcessFailure, ShellExecutor};
use penwatch::signals::Signal;

fn executor(cmd: &str) -> Result<ShellExecutor, PenwatchError> {
    let dir = std::env::temp_dir();
    ShellExecutor::new("sh", cmd, dir)
}

#[tokio::test]
async fn successful_command_streams_stdout() -> TestResult {
    init_tracing();
    let sink = CaptureSink::new();

    let result = executor("echo hello; echo world")?.run(&sink, false).await?;

    assert!(result.success());
    assert_eq!(sink.stdout(), vec!["hello", "world"]);
    assert!(sink.lines().iter().all(|l| l.command == "echo hello; echo world"));
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_is_classified() -> TestResult {
    let sink = CaptureSink::new();

    let result = executor("exit 3")?.run(&sink, false).await?;

    assert_eq!(result.error, Some(ProcessFailure::Exit(3)));
    assert_eq!(result.error.map(|e| e.to_string()).as_deref(), Some("exit status 3"));
    Ok(())
}

#[tokio::test]
async fn unknown_command_fails_through_the_shell() -> TestResult {
    let sink = CaptureSink::new();

    let result = executor("definitely-not-a-command-penwatch")?
        .run(&sink, false)
        .await?;

    assert_eq!(result.error, Some(ProcessFailure::Exit(127)));
    assert!(!sink.stderr().is_empty());
    Ok(())
}

#[tokio::test]
async fn buffered_stderr_is_returned_not_streamed() -> TestResult {
    let sink = CaptureSink::new();

    let result = executor("echo out; echo oops >&2; exit 1")?
        .run(&sink, true)
        .await?;

    assert_eq!(result.error, Some(ProcessFailure::Exit(1)));
    assert_eq!(result.err_output, "oops\n");
    assert_eq!(sink.stdout(), vec!["out"]);
    assert!(sink.stderr().is_empty());
    Ok(())
}

#[tokio::test]
async fn killed_process_reports_the_signal() -> TestResult {
    init_tracing();
    let sink = Arc::new(CaptureSink::new());
    let ex = Arc::new(executor("sleep 30")?);

    let process = ex.spawn()?;
    assert!(ex.is_running());

    let waiter = {
        let sink = Arc::clone(&sink);
        tokio::spawn(async move { process.wait(sink.as_ref(), false).await })
    };

    ex.signal(Signal::Kill)?;
    let result = with_timeout(Duration::from_secs(5), waiter).await???;

    assert_eq!(result.error, Some(ProcessFailure::Signal(Signal::Kill.raw())));
    assert_eq!(result.error.map(|e| e.to_string()).as_deref(), Some("signal: killed"));
    assert!(!ex.is_running());
    Ok(())
}

#[tokio::test]
async fn signalling_an_idle_executor_reports_no_process() -> TestResult {
    let ex = executor("true")?;
    let err = ex.signal(Signal::Term).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoRunningProcess);
    Ok(())
}

#[test]
fn unknown_shell_is_rejected_before_spawning() {
    let err = ShellExecutor::new("fish-but-not-really", "true", ".").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShellNotFound);
}
