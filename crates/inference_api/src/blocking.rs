use tokio::runtime::{Builder, Runtime};

use crate::client::{FragmentStream, InferenceClient};
use crate::config::InferenceSettings;
use crate::error::InferenceApiError;
use crate::payload::ChatMessage;

/// Synchronous front of [`InferenceClient`] backed by a private current-thread runtime.
///
/// Must not be used from inside another async runtime.
#[derive(Debug)]
pub struct BlockingInferenceClient {
    runtime: Runtime,
    client: InferenceClient,
}

impl BlockingInferenceClient {
    pub fn new(settings: InferenceSettings) -> Result<Self, InferenceApiError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(InferenceApiError::Runtime)?;
        let client = InferenceClient::new(settings)?;
        Ok(Self { runtime, client })
    }

    pub fn settings(&self) -> &InferenceSettings {
        self.client.settings()
    }

    pub fn call(&self, prompt: &str) -> Result<String, InferenceApiError> {
        self.runtime.block_on(self.client.call(prompt))
    }

    /// Opens the stream and returns an iterator that performs one network read per step.
    pub fn call_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<BlockingFragments<'_>, InferenceApiError> {
        let stream = self.runtime.block_on(self.client.call_stream(messages))?;
        Ok(BlockingFragments {
            runtime: &self.runtime,
            stream,
        })
    }
}

/// Pull-based fragment iterator over an open response.
#[derive(Debug)]
pub struct BlockingFragments<'a> {
    runtime: &'a Runtime,
    stream: FragmentStream,
}

impl Iterator for BlockingFragments<'_> {
    type Item = Result<String, InferenceApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.stream.next_fragment())
    }
}
