//! Running a program under observation.

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use tracing::debug;

use crate::error::FincantatemError;

/// Outcome of a child run: its status and everything it wrote to stderr.
#[derive(Debug)]
pub struct ProgramRun {
    pub status: ExitStatus,
    pub stderr: String,
}

/// Runs `command` with `RUST_BACKTRACE=1`, passing its stderr through while capturing it.
///
/// Stdin and stdout are inherited.
pub fn run_program(command: &[OsString]) -> Result<ProgramRun, FincantatemError> {
    let (program, args) = command.split_first().ok_or(FincantatemError::MissingProgram)?;
    let spawn_error = |source: io::Error| FincantatemError::Spawn {
        program: PathBuf::from(program),
        source,
    };

    let mut child = Command::new(program)
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_error)?;

    let tee = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut captured = Vec::new();
            let mut buffer = [0_u8; 4096];
            let mut stderr = io::stderr();
            loop {
                match pipe.read(&mut buffer) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let _ = stderr.write_all(&buffer[..n]);
                        captured.extend_from_slice(&buffer[..n]);
                    }
                }
            }
            captured
        })
    });

    let status = child.wait().map_err(spawn_error)?;
    let captured = tee
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    debug!(status = %status, stderr_bytes = captured.len(), "program finished");

    Ok(ProgramRun {
        status,
        stderr: String::from_utf8_lossy(&captured).into_owned(),
    })
}

/// Exit code to forward for `status`. Runs without a code, such as signal deaths, map to 1.
#[must_use]
pub fn exit_code(status: ExitStatus) -> u8 {
    status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}
