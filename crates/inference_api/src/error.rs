use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceApiError {
    #[error("no model configured for inference endpoint `{identifier}`")]
    MissingModel { identifier: String },

    #[error("invalid inference endpoint URL `{url}`")]
    InvalidEndpoint { url: String },

    #[error("API key contains characters that cannot be sent in a header")]
    InvalidCredential,

    #[error("failed to start the inference runtime")]
    Runtime(#[source] std::io::Error),

    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference API HTTP error {status}: {}", body_or_placeholder(.body))]
    Status { status: StatusCode, body: String },

    #[error("inference response has no message content: {}", body_or_placeholder(.body))]
    MissingContent { body: String },
}

impl InferenceApiError {
    /// Whether the error was raised before any request left the process.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingModel { .. } | Self::InvalidEndpoint { .. } | Self::InvalidCredential
        )
    }
}

fn body_or_placeholder(body: &str) -> &str {
    if body.trim().is_empty() {
        "<no body>"
    } else {
        body
    }
}
