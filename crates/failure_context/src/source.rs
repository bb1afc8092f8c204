use std::io;
use std::path::Path;

use tracing::debug;

use crate::builder::{SNIPPET_AFTER, SNIPPET_BEFORE};
use crate::error::FailureContextError;
use crate::frame::{EmbeddedSource, FrameReference};
use crate::model::SourceCodeBundle;

/// A window of source lines with the line number of its first line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub text: String,
    pub start_line: usize,
}

/// File-access collaborator used by the fetcher.
///
/// Only `read_file` is required. The snippet and embedded-source methods have defaults built on
/// [`extract_snippet`] and [`FrameReference::embedded_source`].
pub trait SourceAccess {
    fn read_file(&self, path: &Path) -> io::Result<String>;

    fn read_snippet(
        &self,
        path: &Path,
        line: usize,
        before: usize,
        after: usize,
    ) -> io::Result<Snippet> {
        let text = self.read_file(path)?;
        Ok(extract_snippet(&text, 1, line, before, after))
    }

    fn read_embedded(&self, frame: &dyn FrameReference) -> io::Result<EmbeddedSource> {
        frame.embedded_source().cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no embedded source for {}", frame.function_name()),
            )
        })
    }

    fn read_embedded_snippet(
        &self,
        frame: &dyn FrameReference,
        before: usize,
        after: usize,
    ) -> io::Result<Snippet> {
        let source = self.read_embedded(frame)?;
        Ok(extract_snippet(
            &source.text,
            source.start_line,
            frame.line_number(),
            before,
            after,
        ))
    }
}

/// Reads source straight from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystem;

impl SourceAccess for FileSystem {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Cuts the window `[line - before, line + after]` out of `text`, clamped to its bounds.
///
/// `first_line` is the line number of the first line of `text`. The result always contains at
/// least one line unless `text` is empty, and every line keeps its terminating newline.
#[must_use]
pub fn extract_snippet(
    text: &str,
    first_line: usize,
    line: usize,
    before: usize,
    after: usize,
) -> Snippet {
    let first_line = first_line.max(1);
    let lines = text.lines().collect::<Vec<_>>();
    if lines.is_empty() {
        return Snippet {
            text: String::new(),
            start_line: first_line,
        };
    }

    let last_line = first_line + lines.len() - 1;
    let start = line.saturating_sub(before).clamp(first_line, last_line);
    let end = line.saturating_add(after).clamp(start, last_line);

    let mut out = String::new();
    for source_line in &lines[start - first_line..=end - first_line] {
        out.push_str(source_line);
        out.push('\n');
    }

    Snippet {
        text: out,
        start_line: start,
    }
}

/// Produces the [`SourceCodeBundle`] for one frame.
///
/// The path is tried first; when either the full read or the snippet read fails, the frame's
/// embedded source is used instead. Both failing yields `SourceUnavailable`.
pub fn fetch_bundle(
    access: &dyn SourceAccess,
    frame: &dyn FrameReference,
    capture_locals: bool,
) -> Result<SourceCodeBundle, FailureContextError> {
    let path = Path::new(frame.file_path());
    let line = frame.line_number();

    let (code, code_start_line, snippet) = match read_from_path(access, path, line) {
        Ok((code, snippet)) => (code, 1, snippet),
        Err(primary) => {
            debug!(
                path = %path.display(),
                error = %primary,
                "path read failed; falling back to embedded source"
            );
            let fallback = access.read_embedded(frame).and_then(|source| {
                let snippet = access.read_embedded_snippet(frame, SNIPPET_BEFORE, SNIPPET_AFTER)?;
                Ok((source, snippet))
            });
            match fallback {
                Ok((source, snippet)) => (source.text, source.start_line, snippet),
                Err(source) => {
                    return Err(FailureContextError::source_unavailable(
                        path,
                        frame.function_name(),
                        &primary,
                        source,
                    ));
                }
            }
        }
    };

    Ok(SourceCodeBundle {
        path: frame.file_path().to_string(),
        code,
        snippet: snippet.text,
        line_number: line,
        snippet_start_line: snippet.start_line,
        code_start_line,
        function_name: frame.function_name().to_string(),
        local_vars: if capture_locals {
            frame.locals().cloned()
        } else {
            None
        },
    })
}

fn read_from_path(
    access: &dyn SourceAccess,
    path: &Path,
    line: usize,
) -> io::Result<(String, Snippet)> {
    let code = access.read_file(path)?;
    let snippet = access.read_snippet(path, line, SNIPPET_BEFORE, SNIPPET_AFTER)?;
    Ok((code, snippet))
}
