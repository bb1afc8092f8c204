//! In-process panic capture.
//!
//! [`install`] chains a hook in front of the current one. Outside a [`finite`] scope the hook
//! only forwards to the previous hook. Inside a scope it records the panic with a forced
//! backtrace and prints nothing. The panic that escapes the scope is shown once, through the
//! report. Panics caught inside the scope are printed as soon as it is clear they were handled.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, UnwindSafe};
use std::sync::Once;
use std::thread;

use chat_session::{Interface, Responder};
use tracing::{debug, warn};

use crate::backtrace::{PanicLocation, PanicReport};
use crate::config::ReportOptions;
use crate::display::PlainTextInterface;
use crate::error::FincantatemError;
use crate::report::Reporter;

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicReport>> = const { RefCell::new(None) };
    static SCOPE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

static INSTALL: Once = Once::new();

/// Installs the capturing hook. Only the first call has an effect.
pub fn install() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if SCOPE_DEPTH.with(Cell::get) == 0 {
                previous(info);
                return;
            }

            let location = info.location().map(|location| PanicLocation {
                file: location.file().to_string(),
                line: location.line() as usize,
                column: location.column() as usize,
            });
            let report = PanicReport::new(
                thread::current().name().unwrap_or("<unnamed>"),
                payload_message(info.payload()),
                location,
                Backtrace::force_capture().to_string(),
            );
            // A record still in the slot belongs to a panic that was caught before this one.
            if let Some(handled) = LAST_PANIC.with(|slot| slot.replace(Some(report))) {
                forward_handled(&handled);
            }
        }));
    });
}

/// Takes the panic recorded on this thread by the hook, if any.
pub fn take_last_panic() -> Option<PanicReport> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Prints a panic the scoped code caught itself, since the hook kept it off stderr.
fn forward_handled(report: &PanicReport) {
    debug!(message = %report.message, "forwarding handled panic");
    eprintln!("{}", report.text);
}

fn flush_handled() {
    if let Some(handled) = take_last_panic() {
        forward_handled(&handled);
    }
}

struct Scope;

impl Scope {
    fn enter() -> Self {
        flush_handled();
        SCOPE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Scope
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        SCOPE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// A panic that escaped a scope: its payload and, when the hook saw it, its report.
struct Escaped {
    payload: Box<dyn Any + Send>,
    report: Option<PanicReport>,
}

fn run_scoped<F, T>(f: F) -> Result<T, Escaped>
where
    F: FnOnce() -> T + UnwindSafe,
{
    install();
    let outcome = {
        let _scope = Scope::enter();
        panic::catch_unwind(f)
    };

    match outcome {
        Ok(value) => {
            flush_handled();
            Ok(value)
        }
        Err(payload) => Err(Escaped {
            payload,
            report: take_last_panic(),
        }),
    }
}

/// Runs `f`; if it panics, reports the panic with `options` and then resumes unwinding.
///
/// The report replaces the default panic message. If reporting fails, the error and the
/// original panic text are printed to stderr instead.
pub fn finite<F, T>(options: &ReportOptions, f: F) -> T
where
    F: FnOnce() -> T + UnwindSafe,
{
    match run_scoped(f) {
        Ok(value) => value,
        Err(Escaped { payload, report }) => {
            if let Some(report) = report {
                let outcome = Reporter::from_options(options.clone()).and_then(|reporter| {
                    reporter.report_panic(&report, &mut PlainTextInterface::stdio())
                });
                print_on_failure(outcome, &report);
            }
            panic::resume_unwind(payload)
        }
    }
}

/// [`finite`] with a prepared reporter and display.
pub fn finite_with<R, I, F, T>(reporter: &Reporter<R>, interface: &mut I, f: F) -> T
where
    R: Responder,
    I: Interface + ?Sized,
    F: FnOnce() -> T + UnwindSafe,
{
    match run_scoped(f) {
        Ok(value) => value,
        Err(Escaped { payload, report }) => {
            if let Some(report) = report {
                print_on_failure(reporter.report_panic(&report, interface), &report);
            }
            panic::resume_unwind(payload)
        }
    }
}

fn print_on_failure<T>(outcome: Result<T, FincantatemError>, report: &PanicReport) {
    if let Err(error) = outcome {
        warn!(error = %error, "panic report failed");
        eprintln!("fincantatem: could not analyze the panic: {error}");
        eprintln!("{}", report.text);
    }
}
