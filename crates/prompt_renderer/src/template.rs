use std::collections::BTreeMap;

use crate::error::PromptError;

/// Name of the built-in template.
pub const DEFAULT_TEMPLATE: &str = "default";

const DEFAULT_DOCUMENT: &str = r#"
Please analyze the following Rust failure and help me understand what went wrong.

<environment>
    {runtime_version}
</environment>

<failure>
    Type: {failure_type_name}
    Message: {failure_message}
    Attributes: {failure_attributes}
</failure>
{chained_section}
<immediate_failure>
{immediate}
</immediate_failure>

<full_backtrace>
{traceback}
</full_backtrace>

{call_stack_section}

Your response should begin with a TL;DR section that provides the most concise summary of the failure and the fix, and then be followed by your detailed analysis.
"#;

const DEFAULT_IMMEDIATE: &str = r#"
The failure occurred in function: {function_name}, at {path}:{line_number}

{code}

<local_variables>
{local_vars}
</local_variables>
{framework_info}
"#;

const DEFAULT_CALL_STACK_FRAME: &str = r#"
<frame>
# Frame {i}: {function_name} in {path}

{code}

<local_variables>
{local_vars}
</local_variables>
{framework_info}
</frame>
"#;

/// The three text pieces a prompt is assembled from.
///
/// `document` receives `runtime_version`, `failure_type_name`, `failure_message`,
/// `failure_attributes`, `chained_section`, `immediate`, `traceback` and `call_stack_section`.
/// `immediate` receives `function_name`, `path`, `line_number`, `code`, `local_vars` and
/// `framework_info`; `call_stack_frame` receives the same plus the display index `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub document: String,
    pub immediate: String,
    pub call_stack_frame: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            document: DEFAULT_DOCUMENT.to_string(),
            immediate: DEFAULT_IMMEDIATE.to_string(),
            call_stack_frame: DEFAULT_CALL_STACK_FRAME.to_string(),
        }
    }
}

/// Named prompt templates. `default` is always present.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, PromptTemplate>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        let mut templates = BTreeMap::new();
        templates.insert(DEFAULT_TEMPLATE.to_string(), PromptTemplate::default());
        Self { templates }
    }
}

impl TemplateRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the template called `name`.
    pub fn register(&mut self, name: impl Into<String>, template: PromptTemplate) {
        self.templates.insert(name.into(), template);
    }

    pub fn get(&self, name: &str) -> Result<&PromptTemplate, PromptError> {
        self.templates
            .get(name)
            .ok_or_else(|| PromptError::UnknownTemplate(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

/// Replaces every `{name}` whose name is in `values` in a single left-to-right pass.
///
/// Substituted text is never rescanned, and braces that do not form a known placeholder are
/// copied through unchanged.
#[must_use]
pub fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match replacement {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
