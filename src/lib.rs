//! Explains Rust panics with a language model.
//!
//! The reporting cycle turns a panic into a [`failure_context::FailureContext`], renders it
//! into a prompt, streams the model's analysis to the display and, when enabled, continues as a
//! chat about the failure.
//!
//! # Entry points
//! - [`finite`] wraps a closure and reports any panic it raises before unwinding continues.
//! - The `fincantatem` binary runs another program and reports the panic found in its stderr.
//! - [`Reporter::report`] accepts frames from any host that can supply them.

pub mod backtrace;
pub mod cli;
pub mod config;
pub mod display;
mod error;
pub mod hook;
pub mod logging;
pub mod report;

pub use backtrace::{parse_backtrace, parse_panic_report, PanicLocation, PanicReport};
pub use config::{resolve_settings, ConfigError, ReportOptions};
pub use display::PlainTextInterface;
pub use error::FincantatemError;
pub use failure_context::framework::announce_loaded;
pub use hook::{finite, finite_with, install};
pub use prompt_renderer::RenderMode;
pub use report::{build_options, default_frameworks, runtime_version, Report, Reporter};
