use std::path::PathBuf;

use chat_session::ChatError;
use failure_context::FailureContextError;
use inference_api::InferenceApiError;
use prompt_renderer::PromptError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum FincantatemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build the failure context: {0}")]
    Context(#[from] FailureContextError),

    #[error("failed to render the prompt: {0}")]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Inference(#[from] InferenceApiError),

    #[error("chat failed: {0}")]
    Chat(#[from] ChatError),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no program given to run")]
    MissingProgram,
}
