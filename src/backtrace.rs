//! Turns Rust panic output into frames the failure-context builder understands.

use std::fmt;
use std::sync::OnceLock;

use failure_context::{AttributeMap, CapturedFrame, RaisedFailure};
use regex::Regex;

/// Failure type reported for every panic.
pub const PANIC_TYPE_NAME: &str = "panic";
const BACKTRACE_MARKER: &str = "stack backtrace:";
const UNKNOWN_FUNCTION: &str = "<panic site>";

fn location_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"^\s+at\s+(?P<path>.+?):(?P<line>\d+)(?::\d+)?\s*$")
            .expect("location regex must compile")
    })
}

fn symbol_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"^(?:\s*\d+:\s+|\s{2,})(?P<symbol>\S.*?)\s*$")
            .expect("symbol regex must compile")
    })
}

fn hash_suffix_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"::h[0-9a-f]{16}$").expect("hash regex must compile"))
}

fn header_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(
            r"^thread '(?P<thread>[^']*)'(?: \(\d+\))? panicked at (?:'(?P<message>.*)', )?(?P<file>.+?):(?P<line>\d+):(?P<column>\d+)(?P<colon>:)?$",
        )
        .expect("panic header regex must compile")
    })
}

/// Frames of a rendered backtrace, outermost caller first.
///
/// Accepts the text of `std::backtrace::Backtrace` as printed in panic output: numbered symbol
/// lines, unnumbered inlined symbols, and indented `at path:line:column` lines. Symbol hashes are
/// stripped and symbols without a source location are dropped.
#[must_use]
pub fn parse_backtrace(text: &str) -> Vec<CapturedFrame> {
    let mut frames = Vec::new();
    let mut pending: Option<String> = None;

    for line in text.lines() {
        if let Some(location) = location_regex().captures(line) {
            let Some(symbol) = pending.take() else {
                continue;
            };
            let Ok(line_number) = location["line"].parse::<usize>() else {
                continue;
            };
            frames.push(CapturedFrame::new(symbol, &location["path"], line_number));
        } else if let Some(symbol) = symbol_regex().captures(line) {
            pending = Some(hash_suffix_regex().replace(&symbol["symbol"], "").into_owned());
        } else {
            pending = None;
        }
    }

    frames.reverse();
    frames
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for PanicLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// One panic: where it happened, what it said, and the backtrace printed with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicReport {
    pub thread: String,
    pub message: String,
    pub location: Option<PanicLocation>,
    /// Backtrace text, empty when none was captured.
    pub backtrace: String,
    /// The report as it would be printed by the default hook.
    pub text: String,
}

impl PanicReport {
    #[must_use]
    pub fn new(
        thread: impl Into<String>,
        message: impl Into<String>,
        location: Option<PanicLocation>,
        backtrace: impl Into<String>,
    ) -> Self {
        let thread = thread.into();
        let message = message.into();
        let backtrace = backtrace.into();

        let mut text = match &location {
            Some(location) => format!("thread '{thread}' panicked at {location}:\n{message}"),
            None => format!("thread '{thread}' panicked:\n{message}"),
        };
        if !backtrace.trim().is_empty() {
            text.push('\n');
            text.push_str(BACKTRACE_MARKER);
            text.push('\n');
            text.push_str(backtrace.trim_end());
        }

        Self {
            thread,
            message,
            location,
            backtrace,
            text,
        }
    }

    /// Backtrace frames, or just the panic location when the backtrace has none.
    #[must_use]
    pub fn frames(&self) -> Vec<CapturedFrame> {
        let frames = parse_backtrace(&self.backtrace);
        match (&self.location, frames.is_empty()) {
            (Some(location), true) => vec![CapturedFrame::new(
                UNKNOWN_FUNCTION,
                location.file.clone(),
                location.line,
            )],
            _ => frames,
        }
    }

    #[must_use]
    pub fn failure(&self) -> RaisedFailure {
        let mut attributes = AttributeMap::new();
        attributes.insert("thread".to_string(), self.thread.clone());
        if let Some(location) = &self.location {
            attributes.insert("location".to_string(), location.to_string());
        }

        RaisedFailure::new(PANIC_TYPE_NAME, self.message.clone())
            .with_traceback(self.text.clone())
            .with_attributes(attributes)
    }
}

/// The last panic reported in captured stderr output, if any.
///
/// Understands the current two-line header (`panicked at file:line:col:` followed by the message)
/// and the older single-line form (`panicked at 'message', file:line:col`).
#[must_use]
pub fn parse_panic_report(output: &str) -> Option<PanicReport> {
    let lines = output.lines().collect::<Vec<_>>();
    let (start, header) = lines
        .iter()
        .enumerate()
        .rev()
        .find_map(|(index, line)| header_regex().captures(line).map(|caps| (index, caps)))?;

    let location = Some(PanicLocation {
        file: header["file"].to_string(),
        line: header["line"].parse().ok()?,
        column: header["column"].parse().ok()?,
    });

    let mut cursor = start + 1;
    let message = match header.name("message") {
        Some(message) if header.name("colon").is_none() => message.as_str().to_string(),
        _ => {
            let mut message_lines = Vec::new();
            while let Some(line) = lines.get(cursor) {
                if *line == BACKTRACE_MARKER || line.starts_with("note: ") {
                    break;
                }
                message_lines.push(*line);
                cursor += 1;
            }
            message_lines.join("\n").trim_end().to_string()
        }
    };

    let mut backtrace_lines = Vec::new();
    if lines.get(cursor) == Some(&BACKTRACE_MARKER) {
        cursor += 1;
        while let Some(line) = lines.get(cursor) {
            if !line.starts_with(char::is_whitespace) {
                break;
            }
            backtrace_lines.push(*line);
            cursor += 1;
        }
    }

    Some(PanicReport::new(
        &header["thread"],
        message,
        location,
        backtrace_lines.join("\n"),
    ))
}

#[cfg(test)]
mod tests {
    use failure_context::FrameReference;

    use super::parse_backtrace;

    #[test]
    fn inlined_symbols_share_the_frame_and_keep_order() {
        let text = "\
   3: app::helper::inner::h0123456789abcdef
             at ./src/helper.rs:7:9
      app::helper::outer
             at ./src/helper.rs:20:5
   4: app::main
             at ./src/main.rs:4:5";

        let frames = parse_backtrace(text);
        let functions = frames
            .iter()
            .map(|frame| frame.function_name())
            .collect::<Vec<_>>();
        assert_eq!(functions, vec!["app::main", "app::helper::outer", "app::helper::inner"]);
        assert_eq!(frames[2].file_path(), "./src/helper.rs");
        assert_eq!(frames[2].line_number(), 7);
    }

    #[test]
    fn symbols_without_location_are_dropped() {
        let text = "\
   0: __libc_start_main
   1: app::run
             at src/lib.rs:12
   2: <unknown>";
        let frames = parse_backtrace(text);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].function_name(), "app::run");
        assert_eq!(frames[0].line_number(), 12);
    }
}
