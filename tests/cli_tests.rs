//! Integration tests for the CLI interface
//!
//! Drives the binary end to end over piped stdin and checks the live output,
//! the teed file, and the exit-code mapping.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn linegrab() -> Command {
    Command::cargo_bin("linegrab").unwrap()
}

#[test]
fn test_cli_help() {
    linegrab()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--quitpat"));
}

#[test]
fn test_cli_version() {
    linegrab()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("linegrab"));
}

#[test]
fn test_passthrough_without_timing() {
    linegrab()
        .write_stdin("abc\ndef\n")
        .assert()
        .success()
        .stdout("abc\ndef\n");
}

#[test]
fn test_relative_timing_annotates_each_line() {
    linegrab()
        .arg("-t")
        .write_stdin("abc\ndef\n")
        .assert()
        .success()
        .stdout(
            predicate::str::is_match(
                r"^\[ *\d+\.\d{6} +\d+\.\d{6}\] abc\n\[ *\d+\.\d{6} +-?\d+\.\d{6}\] def\n$",
            )
            .unwrap(),
        );
}

#[test]
fn test_systime_nodelta_has_no_delta_field() {
    linegrab()
        .args(["-s", "--nodelta", "--timeformat", "%H:%M:%S"])
        .write_stdin("abc\n")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\[\d{2}:\d{2}:\d{2}\] abc\n$").unwrap());
}

#[test]
fn test_output_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cap.log");
    linegrab()
        .args(["-o", path.to_str().unwrap()])
        .write_stdin("abc\ndef\n")
        .assert()
        .success();
    assert_eq!(std::fs::read(&path).unwrap(), b"abc\ndef\n");
}

#[test]
fn test_quiet_silences_stdout_but_writes_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quiet.log");
    linegrab()
        .args(["-t", "-Q", "-o", path.to_str().unwrap()])
        .write_stdin("abc\n")
        .assert()
        .success()
        .stdout("");
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.ends_with("abc\n"), "unexpected file: {contents:?}");
    assert!(contents.starts_with('['));
}

#[test]
fn test_append_preserves_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("append.log");
    std::fs::write(&path, "first\n").unwrap();
    linegrab()
        .args(["-a", "-o", path.to_str().unwrap()])
        .write_stdin("second\n")
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
}

#[test]
fn test_quit_pattern_stops_the_stream() {
    linegrab()
        .args(["-q", "ERROR"])
        .write_stdin("ok\nERROR occurred\nmore\n")
        .assert()
        .success()
        .stdout("ok\nERROR");
}

#[test]
fn test_inline_pattern_reported_once() {
    linegrab()
        .args(["-i", "ready"])
        .write_stdin("ready\nready\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pattern 'ready' matched at").count(1));
}

#[test]
fn test_crtonewline_promotes_carriage_returns() {
    linegrab()
        .arg("--crtonewline")
        .write_stdin("ab\rcd\n")
        .assert()
        .success()
        .stdout("ab\ncd\n");
}

#[test]
fn test_carriage_returns_dropped_by_default() {
    linegrab()
        .write_stdin("ab\rcd\n")
        .assert()
        .success()
        .stdout("abcd\n");
}

#[test]
fn test_command_source_reads_subprocess_output() {
    linegrab()
        .args(["-c", "echo hi"])
        .assert()
        .success()
        .stdout("hi\n");
}

#[test]
fn test_invalid_endtime_rejected_by_parser() {
    linegrab()
        .args(["-e", "not-a-number"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_stderr_flag_requires_command() {
    linegrab()
        .arg("--stderr")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_invalid_quit_pattern_exits_with_config_code() {
    linegrab()
        .args(["-q", "[unclosed"])
        .write_stdin("x")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid pattern"));
}

#[test]
fn test_invalid_output_template_exits_with_config_code() {
    linegrab()
        .args(["-o", "log-%q"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid output template"));
}

#[test]
fn test_interrupt_aborts_a_blocked_read() {
    use assert_cmd::cargo::CommandCargoExt;
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    // Keep the write end of the stdin pipe open so the read stays blocked.
    let mut child = std::process::Command::cargo_bin("linegrab")
        .unwrap()
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(300));

    nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(child.id() as i32),
        nix::sys::signal::Signal::SIGINT,
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("process kept blocking after the interrupt");
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    assert!(status.success());
}

#[test]
fn test_device_and_command_conflict() {
    linegrab()
        .args(["-d", "/dev/null", "-c", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}
