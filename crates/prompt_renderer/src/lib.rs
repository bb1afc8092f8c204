//! Renders a [`failure_context::FailureContext`] into the user prompt sent to the model, and
//! provides the fixed system prompt.

mod error;
mod render;
mod system;
mod template;

pub use error::PromptError;
pub use render::{
    fence_language, format_locals, original_frame_index, render, render_code_block, RenderMode,
    LOCAL_REPR_LIMIT, NO_LOCALS_LINE,
};
pub use system::{system_prompt, NO_MARKDOWN_SUFFIX, SYSTEM_PROMPT};
pub use template::{fill_placeholders, PromptTemplate, TemplateRegistry, DEFAULT_TEMPLATE};
