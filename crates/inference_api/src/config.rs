use std::fmt;
use std::time::Duration;

/// A named endpoint with its default model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub identifier: &'static str,
    pub url: &'static str,
    pub model: &'static str,
}

pub const DEFAULT_PRESET: &str = "openrouter";

pub const PRESETS: &[Preset] = &[
    Preset {
        identifier: "openrouter",
        url: "https://openrouter.ai/api/v1/chat/completions",
        model: "google/gemini-2.5-flash",
    },
    Preset {
        identifier: "openai",
        url: "https://api.openai.com/v1/chat/completions",
        model: "gpt-4o-mini",
    },
];

/// Looks up a built-in preset, case-insensitively.
pub fn preset(identifier: &str) -> Option<&'static Preset> {
    PRESETS
        .iter()
        .find(|preset| preset.identifier.eq_ignore_ascii_case(identifier.trim()))
}

/// Endpoint configuration for one client.
#[derive(Clone, PartialEq, Eq)]
pub struct InferenceSettings {
    /// Label of the endpoint, the preset name for built-in ones.
    pub identifier: String,
    pub url: String,
    pub model: Option<String>,
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    /// Optional whole-request timeout.
    pub timeout: Option<Duration>,
}

impl InferenceSettings {
    pub fn new(identifier: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            url: url.into(),
            model: None,
            api_key: None,
            timeout: None,
        }
    }

    pub fn from_preset(preset: &Preset) -> Self {
        Self::new(preset.identifier, preset.url).with_model(preset.model)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for InferenceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceSettings")
            .field("identifier", &self.identifier)
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{preset, InferenceSettings};

    #[test]
    fn presets_resolve_case_insensitively() {
        let openai = preset(" OpenAI ").expect("openai preset exists");
        assert_eq!(openai.model, "gpt-4o-mini");
        assert!(preset("anthropic").is_none());
    }

    #[test]
    fn debug_output_hides_the_key() {
        let settings =
            InferenceSettings::new("custom", "http://localhost").with_api_key("sk-secret");
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<set>"));
    }
}
