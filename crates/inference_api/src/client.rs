use std::collections::VecDeque;

use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, Url};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::InferenceSettings;
use crate::error::InferenceApiError;
use crate::headers::build_headers;
use crate::payload::{message_content, ChatMessage, ChatRequest};
use crate::sse::SseLineParser;

#[derive(Debug)]
pub struct InferenceClient {
    http: Client,
    settings: InferenceSettings,
    endpoint: Url,
}

impl InferenceClient {
    pub fn new(settings: InferenceSettings) -> Result<Self, InferenceApiError> {
        let endpoint =
            Url::parse(settings.url.trim()).map_err(|_| InferenceApiError::InvalidEndpoint {
                url: settings.url.clone(),
            })?;

        let mut builder = Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        info!(
            endpoint = %endpoint,
            identifier = %settings.identifier,
            model = settings.model.as_deref().unwrap_or("<none>"),
            "inference client ready"
        );
        Ok(Self {
            http,
            settings,
            endpoint,
        })
    }

    pub fn settings(&self) -> &InferenceSettings {
        &self.settings
    }

    pub fn build_headers(&self, streaming: bool) -> Result<HeaderMap, InferenceApiError> {
        let mut out = HeaderMap::new();
        for (key, value) in build_headers(&self.settings, streaming) {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| InferenceApiError::InvalidCredential)?;
            let value =
                HeaderValue::from_str(&value).map_err(|_| InferenceApiError::InvalidCredential)?;
            out.insert(name, value);
        }
        Ok(out)
    }

    fn model(&self) -> Result<&str, InferenceApiError> {
        self.settings
            .model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .ok_or_else(|| InferenceApiError::MissingModel {
                identifier: self.settings.identifier.clone(),
            })
    }

    async fn send(&self, request: &ChatRequest) -> Result<Response, InferenceApiError> {
        let streaming = request.stream.unwrap_or(false);
        let response = self
            .http
            .post(self.endpoint.clone())
            .headers(self.build_headers(streaming)?)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(InferenceApiError::Status { status, body })
    }

    /// Sends `prompt` as the only user message and returns the complete reply.
    pub async fn call(&self, prompt: &str) -> Result<String, InferenceApiError> {
        let request = ChatRequest::single(self.model()?, prompt);
        let body = self.send(&request).await?.text().await?;

        let content = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| message_content(&value).map(ToOwned::to_owned));
        content.ok_or(InferenceApiError::MissingContent { body })
    }

    /// Sends the full history with streaming enabled.
    ///
    /// Only connection and status failures surface here; the returned stream yields fragments
    /// as they arrive.
    pub async fn call_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<FragmentStream, InferenceApiError> {
        let request = ChatRequest::streaming(self.model()?, messages.to_vec());
        let response = self.send(&request).await?;
        debug!(messages = messages.len(), "inference stream opened");

        Ok(FragmentStream::from_byte_stream(
            response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(InferenceApiError::from)),
        ))
    }
}

/// Forward-only sequence of content fragments from one streamed response.
///
/// The underlying connection is dropped as soon as the sentinel, the end of the body, or a
/// transport error is reached, and also when the stream itself is dropped early.
pub struct FragmentStream {
    bytes: BoxStream<'static, Result<Vec<u8>, InferenceApiError>>,
    parser: SseLineParser,
    pending: VecDeque<String>,
    finished: bool,
}

impl FragmentStream {
    pub fn from_byte_stream<S>(bytes: S) -> Self
    where
        S: Stream<Item = Result<Vec<u8>, InferenceApiError>> + Send + 'static,
    {
        Self {
            bytes: bytes.boxed(),
            parser: SseLineParser::default(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Next fragment, or `None` once the response is exhausted. A transport error is yielded
    /// once and ends the stream.
    pub async fn next_fragment(&mut self) -> Option<Result<String, InferenceApiError>> {
        loop {
            if let Some(fragment) = self.pending.pop_front() {
                return Some(Ok(fragment));
            }
            if self.finished {
                return None;
            }

            match self.bytes.next().await {
                Some(Ok(chunk)) => {
                    self.pending.extend(self.parser.feed(&chunk));
                    if self.parser.is_done() {
                        self.release();
                    }
                }
                Some(Err(error)) => {
                    self.release();
                    return Some(Err(error));
                }
                None => {
                    self.pending.extend(self.parser.finish());
                    self.release();
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_empty()
    }

    fn release(&mut self) {
        self.finished = true;
        self.bytes = stream::empty().boxed();
    }
}

impl std::fmt::Debug for FragmentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentStream")
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
