//! Client for OpenAI-compatible chat-completion endpoints.
//!
//! Two operations are offered: a single non-streaming `call`, and `call_stream`, which yields
//! incremental content fragments decoded from a server-sent-event body. Both exist as async
//! methods on [`InferenceClient`] and as blocking methods on [`BlockingInferenceClient`].
//! No request is ever retried.

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod sse;

pub use blocking::{BlockingFragments, BlockingInferenceClient};
pub use client::{FragmentStream, InferenceClient};
pub use config::{preset, InferenceSettings, Preset, DEFAULT_PRESET, PRESETS};
pub use error::InferenceApiError;
pub use payload::{ChatMessage, ChatRequest, Role};
pub use sse::SseLineParser;
