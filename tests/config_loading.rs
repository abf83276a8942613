mod common;
use crate::common::{TestResult, write_file};

use penwatch::config::load_and_validate;
use penwatch::errors::{ErrorKind, PenwatchError};
use penwatch::expand::Expander;
use penwatch::signals::{Signal, SignalTable};

#[cfg(unix)]
#[test]
fn full_config_loads_and_expands_against_its_directory() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_file(
        dir.path(),
        "penwatch.toml",
        r#"
[variables]
out = "@confdir/build"

[[block]]
include = ["src/**/*.c"]
indir = "@confdir/app"

[[block.prep]]
cmd = "make -C @out @mods"

[[block.prep]]
cmd = "touch @out/stamp"
onchange = true

[[block.daemon]]
cmd = "./server"
signal = "sigterm"
signal_map = { sigusr1 = "sigusr2" }
"#,
    )?;

    let config = load_and_validate(&path, &SignalTable::platform())?;
    assert_eq!(config.blocks.len(), 1);

    let block = &config.blocks[0];
    assert_eq!(block.prep.len(), 2);
    assert!(!block.prep[0].onchange);
    assert!(block.prep[1].onchange);

    let daemon = &block.daemon[0];
    assert_eq!(daemon.restart_signal, Signal::Term);
    assert_eq!(daemon.mapped(Signal::Usr1), Signal::Usr2);
    assert_eq!(daemon.mapped(Signal::Hup), Signal::Hup);

    let expander = Expander::for_config(&config, &path);
    let confdir = dir.path().to_string_lossy().replace('\\', "/");
    assert_eq!(expander.global("@out")?, format!("{confdir}/build"));
    assert_eq!(
        expander.workdir(block, dir.path())?,
        dir.path().join("app")
    );
    Ok(())
}

#[test]
fn overriding_a_builtin_is_a_config_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_file(
        dir.path(),
        "penwatch.toml",
        "[variables]\nmods = \"nope\"\n",
    )?;

    match load_and_validate(&path, &SignalTable::platform()) {
        Err(PenwatchError::ConfigError { reason, .. }) => {
            assert!(reason.contains("\"mods\" is a built-in variable"), "{reason}");
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
    Ok(())
}

#[test]
fn unknown_signal_name_is_reported() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_file(
        dir.path(),
        "penwatch.toml",
        "[[block]]\n[[block.daemon]]\ncmd = \"x\"\nsignal = \"sigbogus\"\n",
    )?;

    let err = load_and_validate(&path, &SignalTable::platform()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(err.to_string().contains("unknown signal: sigbogus"), "{err}");
    Ok(())
}

#[test]
fn empty_file_is_a_valid_config() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_file(dir.path(), "penwatch.toml", "")?;

    let config = load_and_validate(&path, &SignalTable::platform())?;
    assert!(config.blocks.is_empty());
    assert!(config.variables.is_empty());
    Ok(())
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_validate(dir.path().join("absent.toml"), &SignalTable::platform())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}
