use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use crate::error::FailureContextError;
use crate::frame::Locals;
use crate::framework::FrameworkContext;

/// Structured attributes of a failure value, name to display representation.
pub type AttributeMap = BTreeMap<String, String>;

/// Source material for one observed stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCodeBundle {
    pub path: String,
    pub code: String,
    pub snippet: String,
    /// 1-based failing line.
    pub line_number: usize,
    /// Line number of the first line of `snippet`.
    pub snippet_start_line: usize,
    /// Line number of the first line of `code`.
    pub code_start_line: usize,
    pub function_name: String,
    pub local_vars: Option<Locals>,
}

/// Optional capability of a failure value to expose its fields for the report.
pub trait AttributeSource {
    fn public_fields(&self) -> Option<AttributeMap> {
        None
    }

    fn named_slots(&self) -> Option<AttributeMap> {
        None
    }
}

/// Snapshot of a failure's attributes: public fields win over named slots, and an empty
/// snapshot is reported as absent.
#[must_use]
pub fn attributes_of(source: &dyn AttributeSource) -> Option<AttributeMap> {
    source
        .public_fields()
        .or_else(|| source.named_slots())
        .filter(|attributes| !attributes.is_empty())
}

/// Failure metadata as handed over by the host, before frames are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaisedFailure {
    pub runtime_version: String,
    pub type_name: String,
    pub message: String,
    pub attributes: Option<AttributeMap>,
    pub traceback: String,
    pub cause: Option<String>,
    pub context: Option<String>,
}

impl RaisedFailure {
    #[must_use]
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Describes a Rust error value. The direct `source()` becomes the cause; the chain is
    /// not walked further.
    #[must_use]
    pub fn from_error<E: Error + 'static>(error: &E) -> Self {
        let full = std::any::type_name::<E>();
        let type_name = full
            .split('<')
            .next()
            .and_then(|path| path.rsplit("::").next())
            .unwrap_or(full);

        Self {
            cause: error.source().map(|source| source.to_string()),
            ..Self::new(type_name, error.to_string())
        }
    }

    #[must_use]
    pub fn with_runtime_version(mut self, runtime_version: impl Into<String>) -> Self {
        self.runtime_version = runtime_version.into();
        self
    }

    #[must_use]
    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = traceback.into();
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeMap) -> Self {
        self.attributes = Some(attributes).filter(|attributes| !attributes.is_empty());
        self
    }

    #[must_use]
    pub fn with_attributes_from(mut self, source: &dyn AttributeSource) -> Self {
        self.attributes = attributes_of(source);
        self
    }
}

/// Everything known about one analyzed failure.
///
/// The innermost frame is held apart from the outer frames; together they are the full captured
/// chain in unwind order (outermost caller first). Construction fails on an empty chain.
pub struct FailureContext {
    runtime_version: String,
    type_name: String,
    message: String,
    attributes: Option<AttributeMap>,
    traceback: String,
    cause: Option<String>,
    context: Option<String>,
    immediate: SourceCodeBundle,
    outer: Vec<SourceCodeBundle>,
    frameworks: Vec<Box<dyn FrameworkContext>>,
}

impl FailureContext {
    pub fn assemble(
        failure: RaisedFailure,
        mut chain: Vec<SourceCodeBundle>,
        frameworks: Vec<Box<dyn FrameworkContext>>,
    ) -> Result<Self, FailureContextError> {
        let immediate = chain.pop().ok_or(FailureContextError::EmptyFrameChain)?;

        Ok(Self {
            runtime_version: failure.runtime_version,
            type_name: failure.type_name,
            message: failure.message,
            attributes: failure.attributes.filter(|attributes| !attributes.is_empty()),
            traceback: failure.traceback,
            cause: failure.cause,
            context: failure.context,
            immediate,
            outer: chain,
            frameworks,
        })
    }

    #[must_use]
    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn attributes(&self) -> Option<&AttributeMap> {
        self.attributes.as_ref()
    }

    #[must_use]
    pub fn traceback(&self) -> &str {
        &self.traceback
    }

    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// The innermost frame, where the failure was raised.
    #[must_use]
    pub fn immediate(&self) -> &SourceCodeBundle {
        &self.immediate
    }

    /// All frames except the innermost, outermost caller first.
    #[must_use]
    pub fn outer(&self) -> &[SourceCodeBundle] {
        &self.outer
    }

    /// Position of the immediate frame in the unpartitioned chain.
    #[must_use]
    pub fn immediate_index(&self) -> usize {
        self.outer.len()
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.outer.len() + 1
    }

    /// The full chain in unwind order, immediate frame last.
    pub fn chain(&self) -> impl Iterator<Item = &SourceCodeBundle> {
        self.outer.iter().chain(std::iter::once(&self.immediate))
    }

    #[must_use]
    pub fn frameworks(&self) -> &[Box<dyn FrameworkContext>] {
        &self.frameworks
    }

    /// Concatenated framework text for a frame index of the unpartitioned chain.
    #[must_use]
    pub fn framework_text(&self, index: usize) -> Option<String> {
        let parts = self
            .frameworks
            .iter()
            .filter_map(|framework| framework.frame_context_string(index))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

impl fmt::Debug for FailureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureContext")
            .field("type_name", &self.type_name)
            .field("message", &self.message)
            .field("frames", &self.frame_count())
            .field("frameworks", &self.frameworks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{attributes_of, AttributeMap, AttributeSource, RaisedFailure};

    struct Fields(AttributeMap);

    impl AttributeSource for Fields {
        fn public_fields(&self) -> Option<AttributeMap> {
            Some(self.0.clone())
        }

        fn named_slots(&self) -> Option<AttributeMap> {
            Some(AttributeMap::from([("slot".to_string(), "1".to_string())]))
        }
    }

    struct SlotsOnly;

    impl AttributeSource for SlotsOnly {
        fn named_slots(&self) -> Option<AttributeMap> {
            Some(AttributeMap::from([("code".to_string(), "7".to_string())]))
        }
    }

    struct Nothing;

    impl AttributeSource for Nothing {}

    #[test]
    fn public_fields_take_precedence_over_slots() {
        let fields = Fields(AttributeMap::from([("path".to_string(), "a.txt".to_string())]));
        let attributes = attributes_of(&fields).expect("fields present");
        assert_eq!(attributes.get("path").map(String::as_str), Some("a.txt"));
        assert!(!attributes.contains_key("slot"));
    }

    #[test]
    fn empty_public_fields_normalize_to_none() {
        assert_eq!(attributes_of(&Fields(AttributeMap::new())), None);
    }

    #[test]
    fn slots_used_when_no_public_fields() {
        let attributes = attributes_of(&SlotsOnly).expect("slots present");
        assert_eq!(attributes.get("code").map(String::as_str), Some("7"));
        assert_eq!(attributes_of(&Nothing), None);
    }

    #[test]
    fn from_error_uses_short_type_name_and_direct_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let failure = RaisedFailure::from_error(&inner);
        assert_eq!(failure.type_name, "Error");
        assert_eq!(failure.message, "missing");
        assert_eq!(failure.cause, None);
    }
}
