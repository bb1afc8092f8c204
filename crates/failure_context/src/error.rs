use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FailureContextError {
    #[error(
        "source unavailable for {function} at {path}: {primary}; embedded fallback failed: {source}"
    )]
    SourceUnavailable {
        path: PathBuf,
        function: String,
        /// Error from the path-based read, kept as text because only the fallback is chained.
        primary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no eligible frames were captured for the failure")]
    EmptyFrameChain,
}

impl FailureContextError {
    #[must_use]
    pub fn source_unavailable(
        path: impl Into<PathBuf>,
        function: impl Into<String>,
        primary: &std::io::Error,
        source: std::io::Error,
    ) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            function: function.into(),
            primary: primary.to_string(),
            source,
        }
    }
}
