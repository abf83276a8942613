#![cfg(unix)]

mod common;
use crate::common::{
    CaptureSink, TestResult, canonical, eventually, init_tracing, with_timeout, write_file,
};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::kill;
use nix::unistd::Pid;
use tokio::sync::mpsc;

use penwatch::engine::Orchestrator;
use penwatch::errors::{ErrorKind, PenwatchError};
use penwatch::logging::OutputSink;
use penwatch::signals::Signal;

const WAIT: Duration = Duration::from_secs(10);

fn read_log(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn orchestrator(root: &Path, sink: &Arc<CaptureSink>) -> Result<Orchestrator, PenwatchError> {
    let sink: Arc<dyn OutputSink> = Arc::clone(sink) as Arc<dyn OutputSink>;
    Orchestrator::with_root("penwatch.toml", root, sink, Vec::new(), true)
}

#[tokio::test]
async fn prep_only_mode_runs_every_block_once() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = canonical(dir.path());
    write_file(
        &root,
        "penwatch.toml",
        r#"
[[block]]
[[block.prep]]
cmd = "echo hello"
[[block.prep]]
cmd = "echo later"
onchange = true

[[block]]
[[block.prep]]
cmd = "echo second"
"#,
    )?;
    let sink = Arc::new(CaptureSink::new());

    let orchestrator = orchestrator(&root, &sink)?;
    assert_eq!(orchestrator.config().blocks.len(), 2);
    orchestrator.run_preps_only(true).await?;

    assert_eq!(sink.stdout(), vec!["hello", "second"]);
    Ok(())
}

#[tokio::test]
async fn prep_only_mode_stops_at_a_failing_block() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = canonical(dir.path());
    write_file(
        &root,
        "penwatch.toml",
        r#"
[[block]]
[[block.prep]]
cmd = "exit 1"

[[block]]
[[block.prep]]
cmd = "echo unreachable"
"#,
    )?;
    let sink = Arc::new(CaptureSink::new());

    let err = orchestrator(&root, &sink)?.run_preps_only(true).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProcessExit);
    assert_eq!(err.to_string(), "exit status 1");
    assert!(sink.stdout().is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_shell_is_rejected_at_startup() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = canonical(dir.path());
    write_file(&root, "penwatch.toml", "[variables]\nshell = \"tcsh-ish\"\n")?;
    let sink = Arc::new(CaptureSink::new());

    let err = orchestrator(&root, &sink).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShellNotFound);
    assert_eq!(err.to_string(), "unknown shell: tcsh-ish");
    Ok(())
}

#[tokio::test]
async fn file_changes_trigger_matching_blocks() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = canonical(dir.path());
    write_file(&root, "a.txt", "a")?;
    write_file(
        &root,
        "penwatch.toml",
        r#"
[[block]]
include = ["*.txt"]
[[block.prep]]
cmd = "echo changed @mods"

[[block]]
include = ["*.md"]
[[block.prep]]
cmd = "echo markdown @mods"
[[block.prep]]
cmd = "echo md-onchange"
onchange = true
"#,
    )?;
    let sink = Arc::new(CaptureSink::new());
    let mut orchestrator = orchestrator(&root, &sink)?;
    orchestrator.set_timings(Duration::from_millis(50), Duration::from_millis(50));

    let check = async {
        if !eventually(WAIT, || sink.stdout().contains(&"changed ./a.txt".to_string())).await {
            return Err("initial run did not happen");
        }
        // No markdown files yet: the initial run still activates the block.
        if !sink.stdout().contains(&"markdown".to_string()) {
            return Err("initial run skipped the markdown block");
        }
        write_file(&root, "b.txt", "b").map_err(|_| "write failed")?;
        if !eventually(WAIT, || sink.stdout().contains(&"changed ./b.txt".to_string())).await {
            return Err("change to b.txt was not picked up");
        }
        if sink.stdout().contains(&"md-onchange".to_string()) {
            return Err("markdown block ran for a text file");
        }
        Ok(())
    };

    tokio::select! {
        res = orchestrator.run() => panic!("run loop ended early: {res:?}"),
        outcome = check => outcome?,
    }
    Ok(())
}

#[tokio::test]
async fn editing_the_config_reloads_it() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = canonical(dir.path());
    write_file(
        &root,
        "penwatch.toml",
        "[[block]]\ninclude = [\"*.txt\"]\n[[block.prep]]\ncmd = \"echo first\"\n",
    )?;
    let sink = Arc::new(CaptureSink::new());
    let mut orchestrator = orchestrator(&root, &sink)?;
    orchestrator.set_timings(Duration::from_millis(50), Duration::from_millis(50));

    let check = async {
        if !eventually(WAIT, || sink.stdout().contains(&"first".to_string())).await {
            return Err("initial run did not happen");
        }
        write_file(
            &root,
            "penwatch.toml",
            "[[block]]\ninclude = [\"*.txt\"]\n[[block.prep]]\ncmd = \"echo reloaded\"\n",
        )
        .map_err(|_| "write failed")?;
        if !eventually(WAIT, || sink.stdout().contains(&"reloaded".to_string())).await {
            return Err("config was not reloaded");
        }
        Ok(())
    };

    tokio::select! {
        res = orchestrator.run() => panic!("run loop ended early: {res:?}"),
        outcome = check => outcome?,
    }
    Ok(())
}

#[tokio::test]
async fn unexpandable_block_does_not_stop_its_siblings() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = canonical(dir.path());
    write_file(
        &root,
        "penwatch.toml",
        r#"
[[block]]
include = ["@nope/*.txt"]
[[block.prep]]
cmd = "echo one"
[[block.daemon]]
cmd = "serve @mods"

[[block]]
[[block.prep]]
cmd = "echo two"
"#,
    )?;
    let sink = Arc::new(CaptureSink::new());
    let mut orchestrator = orchestrator(&root, &sink)?;
    orchestrator.set_timings(Duration::from_millis(50), Duration::from_millis(50));
    let (_tx, rx) = mpsc::channel(8);

    let check = async {
        if !eventually(WAIT, || sink.stdout().contains(&"two".to_string())).await {
            return Err("second block did not run");
        }
        // Give a failing cycle the chance to end the loop.
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(())
    };

    tokio::select! {
        res = orchestrator.run_with_signals(rx) => panic!("run loop ended early: {res:?}"),
        outcome = check => outcome?,
    }
    assert!(!sink.stdout().contains(&"one".to_string()));
    Ok(())
}

#[tokio::test]
async fn fatal_signal_lets_daemons_exit_before_the_loop_stops() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = canonical(dir.path());
    let log = root.join("daemon.log");
    write_file(
        &root,
        "penwatch.toml",
        &format!(
            r#"
[[block]]
include = ["*.txt"]
[[block.daemon]]
cmd = "trap 'sleep 0.5; echo graceful >> {log}; exit 0' TERM; echo up >> {log}; while true; do sleep 0.05; done"
"#,
            log = log.display()
        ),
    )?;
    let sink = Arc::new(CaptureSink::new());
    let mut orchestrator = orchestrator(&root, &sink)?;
    orchestrator.set_timings(Duration::from_millis(50), Duration::from_millis(50));
    let (tx, rx) = mpsc::channel(8);

    let run = orchestrator.run_with_signals(rx);
    tokio::pin!(run);

    tokio::select! {
        res = &mut run => panic!("run loop ended early: {res:?}"),
        up = eventually(WAIT, || read_log(&log) == ["up"]) => assert!(up, "daemon did not start"),
    }

    tx.send(Signal::Term).await?;
    let err = with_timeout(WAIT, &mut run).await?.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ShutdownRequested);
    assert_eq!(read_log(&log), ["up", "graceful"]);
    Ok(())
}

#[tokio::test]
async fn daemon_ignoring_the_first_signal_is_killed_on_second_interrupt() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = canonical(dir.path());
    let log = root.join("daemon.log");
    let pid_file = root.join("daemon.pid");
    write_file(
        &root,
        "penwatch.toml",
        &format!(
            r#"
[[block]]
include = ["*.txt"]
[[block.daemon]]
cmd = "trap '' TERM; echo $$ > {pid}; echo up >> {log}; while true; do sleep 0.05; done"
"#,
            pid = pid_file.display(),
            log = log.display()
        ),
    )?;
    let sink = Arc::new(CaptureSink::new());
    let mut orchestrator = orchestrator(&root, &sink)?;
    orchestrator.set_timings(Duration::from_millis(50), Duration::from_millis(50));
    let (tx, rx) = mpsc::channel(8);

    let run = orchestrator.run_with_signals(rx);
    tokio::pin!(run);

    tokio::select! {
        res = &mut run => panic!("run loop ended early: {res:?}"),
        up = eventually(WAIT, || read_log(&log) == ["up"]) => assert!(up, "daemon did not start"),
    }
    let pid: i32 = std::fs::read_to_string(&pid_file)?.trim().parse()?;

    tx.send(Signal::Term).await?;
    tokio::select! {
        res = &mut run => panic!("loop stopped while the daemon was still running: {res:?}"),
        _ = tokio::time::sleep(Duration::from_millis(500)) => {}
    }
    assert!(kill(Pid::from_raw(pid), None).is_ok(), "daemon should still be alive");

    tx.send(Signal::Int).await?;
    let err = with_timeout(WAIT, &mut run).await?.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ShutdownRequested);
    assert!(kill(Pid::from_raw(pid), None).is_err(), "daemon should be gone");
    Ok(())
}
