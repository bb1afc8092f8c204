use std::fmt::Write as _;
use std::path::Path;

use failure_context::{FailureContext, Locals, SourceCodeBundle};
use tracing::debug;

use crate::error::PromptError;
use crate::template::{fill_placeholders, TemplateRegistry};

/// Longest local-value representation shown before truncation, in characters.
pub const LOCAL_REPR_LIMIT: usize = 200;
/// Shown in place of an empty or absent binding set.
pub const NO_LOCALS_LINE: &str = "No local variables captured";

const MARKER: &str = ">>> ";
const BLANK_MARKER: &str = "    ";
const ELLIPSIS: &str = "...";

/// Which source text each frame's code block shows. Chosen once per failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Snippet,
    FullSource,
}

/// Renders `context` with the built-in templates.
pub fn render(
    context: &FailureContext,
    template: &str,
    mode: RenderMode,
) -> Result<String, PromptError> {
    TemplateRegistry::new().render(context, template, mode)
}

impl TemplateRegistry {
    /// Renders `context` with the template called `name`. Deterministic for identical inputs.
    pub fn render(
        &self,
        context: &FailureContext,
        name: &str,
        mode: RenderMode,
    ) -> Result<String, PromptError> {
        let template = self.get(name)?;
        let immediate = context.immediate();

        let line_number = immediate.line_number.to_string();
        let code = render_code_block(immediate, mode);
        let local_vars = format_locals(immediate.local_vars.as_ref());
        let framework_info = context
            .framework_text(context.immediate_index())
            .unwrap_or_default();
        let immediate_text = fill_placeholders(
            &template.immediate,
            &[
                ("function_name", immediate.function_name.as_str()),
                ("path", immediate.path.as_str()),
                ("line_number", line_number.as_str()),
                ("code", code.as_str()),
                ("local_vars", local_vars.as_str()),
                ("framework_info", framework_info.as_str()),
            ],
        );

        let attributes = context
            .attributes()
            .and_then(|attributes| serde_json::to_string_pretty(attributes).ok())
            .unwrap_or_default();
        let chained_section = chained_section(context);
        let call_stack_section = self.call_stack_section(context, &template.call_stack_frame, mode);

        debug!(template = name, frames = context.frame_count(), "rendering prompt");
        Ok(fill_placeholders(
            &template.document,
            &[
                ("runtime_version", context.runtime_version()),
                ("failure_type_name", context.type_name()),
                ("failure_message", context.message()),
                ("failure_attributes", attributes.as_str()),
                ("chained_section", chained_section.as_str()),
                ("immediate", immediate_text.as_str()),
                ("traceback", context.traceback()),
                ("call_stack_section", call_stack_section.as_str()),
            ],
        ))
    }

    /// Outer frames innermost first. Empty when there are no outer frames.
    fn call_stack_section(
        &self,
        context: &FailureContext,
        frame_template: &str,
        mode: RenderMode,
    ) -> String {
        let outer = context.outer();
        if outer.is_empty() {
            return String::new();
        }

        let frames = outer
            .iter()
            .enumerate()
            .rev()
            .enumerate()
            .map(|(display_index, (original, bundle))| {
                let index = display_index.to_string();
                let code = render_code_block(bundle, mode);
                let local_vars = format_locals(bundle.local_vars.as_ref());
                let framework_info = context.framework_text(original).unwrap_or_default();
                fill_placeholders(
                    frame_template,
                    &[
                        ("i", index.as_str()),
                        ("function_name", bundle.function_name.as_str()),
                        ("path", bundle.path.as_str()),
                        ("code", code.as_str()),
                        ("local_vars", local_vars.as_str()),
                        ("framework_info", framework_info.as_str()),
                    ],
                )
            })
            .collect::<Vec<_>>();

        format!(
            "\n<call_stack_context>\n{}\n</call_stack_context>\n",
            frames.join("\n")
        )
    }
}

/// Position in the unpartitioned chain of the outer frame shown at `display_index`, or `None`
/// when `display_index` is not below `outer_len`.
#[must_use]
pub fn original_frame_index(display_index: usize, outer_len: usize) -> Option<usize> {
    outer_len.checked_sub(1)?.checked_sub(display_index)
}

fn chained_section(context: &FailureContext) -> String {
    let mut lines = Vec::new();
    if let Some(cause) = context.cause() {
        lines.push(format!("    Caused by: {cause}"));
    }
    if let Some(during) = context.context() {
        lines.push(format!("    Raised while handling: {during}"));
    }
    if lines.is_empty() {
        return String::new();
    }
    format!("\n<chained_failures>\n{}\n</chained_failures>\n", lines.join("\n"))
}

/// Fenced code block for one frame, with line numbers and the failing-line marker.
#[must_use]
pub fn render_code_block(bundle: &SourceCodeBundle, mode: RenderMode) -> String {
    let (code, start_line) = match mode {
        RenderMode::Snippet => (&bundle.snippet, bundle.snippet_start_line),
        RenderMode::FullSource => (&bundle.code, bundle.code_start_line),
    };

    let mut out = format!(
        "{}:{} ({})\n```{}\n",
        bundle.path,
        bundle.line_number,
        bundle.function_name,
        fence_language(&bundle.path)
    );
    for (offset, line) in code.lines().enumerate() {
        let line_no = start_line + offset;
        let marker = if line_no == bundle.line_number {
            MARKER
        } else {
            BLANK_MARKER
        };
        let _ = writeln!(out, "{marker}{line_no:4}: {line}");
    }
    out.push_str("```\n");
    out
}

/// Code-fence language for a source path, empty when unknown.
#[must_use]
pub fn fence_language(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("rs") => "rust",
        Some("py") => "python",
        Some("c" | "h") => "c",
        Some("cc" | "cpp" | "hpp") => "cpp",
        Some("toml") => "toml",
        _ => "",
    }
}

/// One `  name = repr` line per binding, or [`NO_LOCALS_LINE`] when there are none.
#[must_use]
pub fn format_locals(locals: Option<&Locals>) -> String {
    let Some(locals) = locals.filter(|locals| !locals.is_empty()) else {
        return NO_LOCALS_LINE.to_string();
    };

    locals
        .iter()
        .map(|(name, value)| format!("  {name} = {}", truncate_repr(value.repr())))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_repr(repr: &str) -> String {
    match repr.char_indices().nth(LOCAL_REPR_LIMIT) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &repr[..cut]),
        None => repr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use failure_context::{LocalValue, Locals};

    use super::{fence_language, format_locals, original_frame_index, NO_LOCALS_LINE};

    #[test]
    fn empty_or_absent_locals_render_one_line() {
        assert_eq!(format_locals(None), NO_LOCALS_LINE);
        assert_eq!(format_locals(Some(&Locals::new())), NO_LOCALS_LINE);
    }

    #[test]
    fn long_repr_is_cut_at_limit_with_ellipsis() {
        let mut locals = Locals::new();
        locals.insert("big".to_string(), LocalValue::new("é".repeat(250)));
        locals.insert("small".to_string(), LocalValue::new("x".repeat(200)));

        let rendered = format_locals(Some(&locals));
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], format!("  big = {}...", "é".repeat(200)));
        assert_eq!(lines[1], format!("  small = {}", "x".repeat(200)));
    }

    #[test]
    fn display_index_mapping_is_an_involution() {
        let n = 5;
        for display in 0..n {
            let original = original_frame_index(display, n).expect("index in range");
            assert_eq!(original, n - 1 - display);
            assert_eq!(original_frame_index(original, n), Some(display));
        }
    }

    #[test]
    fn display_index_outside_the_stack_has_no_original() {
        assert_eq!(original_frame_index(0, 0), None);
        assert_eq!(original_frame_index(3, 3), None);
        assert_eq!(original_frame_index(usize::MAX, 2), None);
        assert_eq!(original_frame_index(0, 1), Some(0));
    }

    #[test]
    fn locals_render_in_capture_order() {
        let mut locals = Locals::new();
        locals.insert("zeta", LocalValue::new("1"));
        locals.insert("alpha", LocalValue::new("2"));
        assert_eq!(format_locals(Some(&locals)), "  zeta = 1\n  alpha = 2");
    }

    #[test]
    fn fence_language_follows_extension() {
        assert_eq!(fence_language("src/main.rs"), "rust");
        assert_eq!(fence_language("model.py"), "python");
        assert_eq!(fence_language("<generated>"), "");
    }
}
