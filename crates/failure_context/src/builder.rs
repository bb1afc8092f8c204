use tracing::debug;

use crate::error::FailureContextError;
use crate::frame::FrameReference;
use crate::framework::FrameworkRegistry;
use crate::model::{FailureContext, RaisedFailure, SourceCodeBundle};
use crate::redact::Redactor;
use crate::source::{fetch_bundle, FileSystem, SourceAccess};

/// Lines shown before the failing line in a snippet.
pub const SNIPPET_BEFORE: usize = 3;
/// Lines shown after the failing line in a snippet.
pub const SNIPPET_AFTER: usize = 3;

const RUNTIME_FUNCTION_PREFIXES: &[&str] = &[
    "std::panicking",
    "core::panicking",
    "std::rt",
    "std::sys",
    "std::backtrace",
    "std::panic",
    "core::ops::function",
    "__rust_",
    "rust_begin_unwind",
];

const RUNTIME_PATH_FRAGMENTS: &[&str] = &["/rustc/"];

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub capture_locals: bool,
    /// Mask secrets and e-mail addresses in everything copied into the context.
    pub cautious: bool,
    /// Frames whose function starts with one of these belong to the host shell or to the
    /// reporting layer and never appear in the context.
    pub skip_function_prefixes: Vec<String>,
    pub skip_path_fragments: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            capture_locals: true,
            cautious: false,
            skip_function_prefixes: RUNTIME_FUNCTION_PREFIXES
                .iter()
                .map(|prefix| (*prefix).to_string())
                .collect(),
            skip_path_fragments: RUNTIME_PATH_FRAGMENTS
                .iter()
                .map(|fragment| (*fragment).to_string())
                .collect(),
        }
    }
}

impl BuildOptions {
    #[must_use]
    pub fn with_capture_locals(mut self, capture_locals: bool) -> Self {
        self.capture_locals = capture_locals;
        self
    }

    #[must_use]
    pub fn with_cautious(mut self, cautious: bool) -> Self {
        self.cautious = cautious;
        self
    }

    #[must_use]
    pub fn skip_function_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.skip_function_prefixes.push(prefix.into());
        self
    }

    #[must_use]
    pub fn skip_path_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.skip_path_fragments.push(fragment.into());
        self
    }

    /// Whether `frame` is infrastructure rather than user code.
    ///
    /// Trait-impl symbols such as `<std::rt::X as Y>::f` are matched without the leading `<`.
    #[must_use]
    pub fn is_infrastructure(&self, frame: &dyn FrameReference) -> bool {
        let function = frame.function_name().trim_start_matches('<');
        self.skip_function_prefixes
            .iter()
            .any(|prefix| function.starts_with(prefix.as_str()))
            || self
                .skip_path_fragments
                .iter()
                .any(|fragment| frame.file_path().contains(fragment.as_str()))
    }
}

/// Turns a raised failure and its frame chain into a [`FailureContext`].
pub struct ContextBuilder<S = FileSystem> {
    access: S,
    options: BuildOptions,
    frameworks: FrameworkRegistry,
}

impl ContextBuilder<FileSystem> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_access(FileSystem)
    }
}

impl Default for ContextBuilder<FileSystem> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SourceAccess> ContextBuilder<S> {
    #[must_use]
    pub fn with_access(access: S) -> Self {
        Self {
            access,
            options: BuildOptions::default(),
            frameworks: FrameworkRegistry::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_frameworks(mut self, frameworks: FrameworkRegistry) -> Self {
        self.frameworks = frameworks;
        self
    }

    #[must_use]
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Builds the context from `frames`, ordered outermost caller first.
    ///
    /// Any frame whose source cannot be retrieved aborts the whole build.
    pub fn build<F: FrameReference>(
        &self,
        failure: RaisedFailure,
        frames: &[F],
    ) -> Result<FailureContext, FailureContextError> {
        let mut chain = Vec::with_capacity(frames.len());
        for frame in frames {
            if self.options.is_infrastructure(frame) {
                debug!(function = frame.function_name(), "skipping infrastructure frame");
                continue;
            }
            let bundle = fetch_bundle(&self.access, frame, self.options.capture_locals)?;
            chain.push(if self.options.cautious {
                redact_bundle(bundle)
            } else {
                bundle
            });
        }

        if chain.is_empty() {
            return Err(FailureContextError::EmptyFrameChain);
        }

        let failure = if self.options.cautious {
            redact_failure(failure)
        } else {
            failure
        };

        let frameworks = self.frameworks.extract_all(&chain);
        debug!(
            frames = chain.len(),
            frameworks = frameworks.len(),
            "failure context assembled"
        );
        FailureContext::assemble(failure, chain, frameworks)
    }
}

fn redact_bundle(bundle: SourceCodeBundle) -> SourceCodeBundle {
    let redact = |text: &str| Redactor.redact(text);
    SourceCodeBundle {
        code: redact(&bundle.code),
        snippet: redact(&bundle.snippet),
        local_vars: bundle.local_vars.map(|locals| {
            locals
                .into_iter()
                .map(|(name, value)| (name, value.map_repr(&redact)))
                .collect()
        }),
        ..bundle
    }
}

fn redact_failure(failure: RaisedFailure) -> RaisedFailure {
    let redact = |text: &str| Redactor.redact(text);
    RaisedFailure {
        message: redact(&failure.message),
        traceback: redact(&failure.traceback),
        cause: failure.cause.as_deref().map(redact),
        context: failure.context.as_deref().map(redact),
        attributes: failure.attributes.map(|attributes| {
            attributes
                .into_iter()
                .map(|(name, value)| (name, redact(&value)))
                .collect()
        }),
        ..failure
    }
}
