use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("unknown prompt template: {0}")]
    UnknownTemplate(String),
}
