//! Failure context assembly.
//!
//! Turns a raised failure plus the host's captured frame chain into one immutable
//! [`FailureContext`]: per-frame source bundles, failure metadata, and the output of every
//! detected framework plugin.
//!
//! The crate never inspects the live process on its own. Frames arrive through
//! [`FrameReference`], source text through [`SourceAccess`], and framework presence through
//! the explicit [`framework`] registry.

mod builder;
mod error;
mod frame;
pub mod framework;
mod model;
mod redact;
mod source;

pub use builder::{BuildOptions, ContextBuilder, SNIPPET_AFTER, SNIPPET_BEFORE};
pub use error::FailureContextError;
pub use frame::{CapturedFrame, EmbeddedSource, FrameReference, LocalValue, Locals};
pub use framework::{Framework, FrameworkContext, FrameworkRegistry};
pub use model::{
    attributes_of, AttributeMap, AttributeSource, FailureContext, RaisedFailure, SourceCodeBundle,
};
pub use redact::Redactor;
pub use source::{extract_snippet, fetch_bundle, FileSystem, Snippet, SourceAccess};
