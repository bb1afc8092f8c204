//! Environment configuration.

use std::env;
use std::path::PathBuf;

use inference_api::{preset, InferenceSettings, DEFAULT_PRESET};
use prompt_renderer::RenderMode;
use thiserror::Error;

pub const PRESET_ENV: &str = "FI_PRESET";
pub const API_URL_ENV: &str = "FI_API_URL";
pub const MODEL_ENV: &str = "FI_MODEL";
pub const API_KEY_ENV: &str = "FI_API_KEY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("preset `{preset}` is not built in; set {API_URL_ENV} to use it as a custom endpoint")]
    CustomPresetWithoutUrl { preset: String },
}

/// Resolves the inference endpoint.
///
/// The preset comes from `preset_arg`, then `FI_PRESET`, then the default. `FI_API_URL` and
/// `FI_MODEL` override the preset's values and `FI_API_KEY` supplies the credential. A name that is
/// not a built-in preset labels a custom endpoint, which needs `FI_API_URL`.
pub fn resolve_settings(preset_arg: Option<&str>) -> Result<InferenceSettings, ConfigError> {
    let name = preset_arg
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| env_string_opt(PRESET_ENV))
        .unwrap_or_else(|| DEFAULT_PRESET.to_string());
    let url = env_string_opt(API_URL_ENV);

    let mut settings = match preset(&name) {
        Some(preset) => {
            let settings = InferenceSettings::from_preset(preset);
            match url {
                Some(url) => settings.with_url(url),
                None => settings,
            }
        }
        None => {
            let url = url.ok_or_else(|| ConfigError::CustomPresetWithoutUrl {
                preset: name.clone(),
            })?;
            InferenceSettings::new(name, url)
        }
    };

    if let Some(model) = env_string_opt(MODEL_ENV) {
        settings = settings.with_model(model);
    }
    if let Some(api_key) = env_string_opt(API_KEY_ENV) {
        settings = settings.with_api_key(api_key);
    }
    Ok(settings)
}

/// Per-failure switches for one reporting cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Overrides `FI_PRESET` when set.
    pub preset: Option<String>,
    pub render_mode: RenderMode,
    pub capture_locals: bool,
    /// Continue with an interactive chat after the analysis.
    pub chat: bool,
    /// Redact likely secrets and e-mail addresses before anything leaves the process.
    pub cautious: bool,
    /// Whether the display renders markdown. When false the model is asked not to use it.
    pub markdown: bool,
    /// Where `/save` writes chat exports.
    pub export_dir: PathBuf,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            preset: None,
            render_mode: RenderMode::Snippet,
            capture_locals: true,
            chat: false,
            cautious: false,
            markdown: true,
            export_dir: PathBuf::from("."),
        }
    }
}

impl ReportOptions {
    #[must_use]
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    #[must_use]
    pub fn with_render_mode(mut self, render_mode: RenderMode) -> Self {
        self.render_mode = render_mode;
        self
    }

    #[must_use]
    pub fn with_capture_locals(mut self, capture_locals: bool) -> Self {
        self.capture_locals = capture_locals;
        self
    }

    #[must_use]
    pub fn with_chat(mut self, chat: bool) -> Self {
        self.chat = chat;
        self
    }

    #[must_use]
    pub fn with_cautious(mut self, cautious: bool) -> Self {
        self.cautious = cautious;
        self
    }

    #[must_use]
    pub fn with_markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }

    #[must_use]
    pub fn with_export_dir(mut self, export_dir: impl Into<PathBuf>) -> Self {
        self.export_dir = export_dir.into();
        self
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{resolve_settings, ConfigError, API_KEY_ENV, API_URL_ENV, MODEL_ENV, PRESET_ENV};
    use std::env;
    use std::sync::{Mutex, OnceLock};

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    fn clear_all() -> [EnvGuard; 4] {
        [
            set_env_guard(PRESET_ENV, None),
            set_env_guard(API_URL_ENV, None),
            set_env_guard(MODEL_ENV, None),
            set_env_guard(API_KEY_ENV, None),
        ]
    }

    #[test]
    fn defaults_to_openrouter_without_key() {
        let _lock = env_lock();
        let _guards = clear_all();

        let settings = resolve_settings(None).expect("default preset resolves");
        assert_eq!(settings.identifier, "openrouter");
        assert_eq!(settings.url, "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(settings.model.as_deref(), Some("google/gemini-2.5-flash"));
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn explicit_preset_beats_environment() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _preset = set_env_guard(PRESET_ENV, Some("openrouter"));

        let settings = resolve_settings(Some("OpenAI")).expect("openai resolves");
        assert_eq!(settings.identifier, "openai");
        assert_eq!(settings.model.as_deref(), Some("gpt-4o-mini"));

        let settings = resolve_settings(Some("  ")).expect("blank argument falls back to env");
        assert_eq!(settings.identifier, "openrouter");
    }

    #[test]
    fn environment_overrides_preset_values() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _url = set_env_guard(API_URL_ENV, Some("http://localhost:8080/v1/chat/completions"));
        let _model = set_env_guard(MODEL_ENV, Some("local-model"));
        let _key = set_env_guard(API_KEY_ENV, Some(" sk-local "));

        let settings = resolve_settings(Some("openai")).expect("openai resolves");
        assert_eq!(settings.identifier, "openai");
        assert_eq!(settings.url, "http://localhost:8080/v1/chat/completions");
        assert_eq!(settings.model.as_deref(), Some("local-model"));
        assert_eq!(settings.api_key.as_deref(), Some("sk-local"));
    }

    #[test]
    fn custom_preset_needs_url_and_has_no_default_model() {
        let _lock = env_lock();
        let _guards = clear_all();

        assert_eq!(
            resolve_settings(Some("ollama")).err(),
            Some(ConfigError::CustomPresetWithoutUrl {
                preset: "ollama".to_string()
            })
        );

        let _url = set_env_guard(API_URL_ENV, Some("http://localhost:11434/v1/chat/completions"));
        let settings = resolve_settings(Some("ollama")).expect("custom endpoint resolves");
        assert_eq!(settings.identifier, "ollama");
        assert!(settings.model.is_none());
    }
}
