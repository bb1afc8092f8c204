#![cfg(unix)]

use std::ffi::OsString;

use fincantatem::cli::{exit_code, run_program};
use fincantatem::{parse_panic_report, FincantatemError};

fn command(parts: &[&str]) -> Vec<OsString> {
    parts.iter().map(OsString::from).collect()
}

#[test]
fn captures_stderr_and_forwards_the_exit_code() {
    let run = run_program(&command(&[
        "sh",
        "-c",
        "echo to-stdout; printf 'thread %s panicked at src/main.rs:2:5:\\nboom\\n' \"'main'\" >&2; exit 101",
    ]))
    .expect("sh runs");

    assert_eq!(exit_code(run.status), 101);
    assert!(!run.stderr.contains("to-stdout"));
    let report = parse_panic_report(&run.stderr).expect("panic captured");
    assert_eq!(report.message, "boom");
}

#[test]
fn child_sees_backtraces_enabled() {
    let run = run_program(&command(&["sh", "-c", "echo \"$RUST_BACKTRACE\" >&2"]))
        .expect("sh runs");
    assert_eq!(run.stderr.trim(), "1");
    assert_eq!(exit_code(run.status), 0);
}

#[test]
fn missing_and_unknown_programs_are_errors() {
    assert!(matches!(
        run_program(&[]),
        Err(FincantatemError::MissingProgram)
    ));
    assert!(matches!(
        run_program(&command(&["/definitely/not/a/program"])),
        Err(FincantatemError::Spawn { .. })
    ));
}
