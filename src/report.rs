//! One reporting cycle: build the context, render the prompt, stream the analysis, then
//! optionally chat.

use std::env;

use chat_session::{stream_reply, ChatSession, FailureSummary, Interface, Responder, Style};
use failure_context::framework::{ArrayFramework, FrameworkProfile};
use failure_context::{
    BuildOptions, ContextBuilder, FailureContext, FrameReference, FrameworkRegistry, RaisedFailure,
};
use inference_api::{BlockingInferenceClient, ChatMessage};
use prompt_renderer::{system_prompt, PromptTemplate, TemplateRegistry, DEFAULT_TEMPLATE};
use tracing::{debug, info};

use crate::backtrace::PanicReport;
use crate::config::{resolve_settings, ReportOptions};
use crate::error::FincantatemError;

/// Function prefixes of this crate's own wrapping layer, never shown as user frames.
pub const WRAPPER_PREFIXES: &[&str] = &["fincantatem::hook", "fincantatem::report"];

const HEADER: &str = "✦ F. Incantatem ✦";
const CHAT_HINT: &str =
    "  Ask a follow-up question, or type /help for commands and /quit to leave.";

/// `rust <os>-<arch>` for the running binary.
#[must_use]
pub fn runtime_version() -> String {
    format!("rust {}-{}", env::consts::OS, env::consts::ARCH)
}

/// Array frameworks known to the reporter. Each is only consulted once the host announces it
/// through [`failure_context::framework::announce_loaded`].
#[must_use]
pub fn default_frameworks() -> FrameworkRegistry {
    FrameworkRegistry::new()
        .with_framework(ArrayFramework::new(FrameworkProfile::new("candle", "candle_core")))
        .with_framework(ArrayFramework::new(
            FrameworkProfile::new("burn", "burn_tensor").with_default_backend("ndarray"),
        ))
}

/// Builder options for `options`, with this crate's wrapper frames filtered out.
#[must_use]
pub fn build_options(options: &ReportOptions) -> BuildOptions {
    WRAPPER_PREFIXES.iter().fold(
        BuildOptions::default()
            .with_capture_locals(options.capture_locals)
            .with_cautious(options.cautious),
        |build, prefix| build.skip_function_prefix(*prefix),
    )
}

/// Prompt and analysis of a finished cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub prompt: String,
    pub analysis: String,
}

pub struct Reporter<R = BlockingInferenceClient> {
    options: ReportOptions,
    responder: R,
    builder: ContextBuilder,
    templates: TemplateRegistry,
    template: String,
    echo_traceback: bool,
}

impl Reporter<BlockingInferenceClient> {
    /// Resolves the endpoint from the options and the environment.
    pub fn from_options(options: ReportOptions) -> Result<Self, FincantatemError> {
        let settings = resolve_settings(options.preset.as_deref())?;
        let client = BlockingInferenceClient::new(settings)?;
        Ok(Self::with_responder(options, client))
    }
}

impl<R: Responder> Reporter<R> {
    pub fn with_responder(options: ReportOptions, responder: R) -> Self {
        let builder = ContextBuilder::new()
            .with_options(build_options(&options))
            .with_frameworks(default_frameworks());
        Self {
            options,
            responder,
            builder,
            templates: TemplateRegistry::new(),
            template: DEFAULT_TEMPLATE.to_string(),
            echo_traceback: true,
        }
    }

    #[must_use]
    pub fn with_frameworks(mut self, frameworks: FrameworkRegistry) -> Self {
        self.builder = ContextBuilder::new()
            .with_options(build_options(&self.options))
            .with_frameworks(frameworks);
        self
    }

    /// Registers `template` under `name` and renders with it from now on.
    #[must_use]
    pub fn with_template(mut self, name: impl Into<String>, template: PromptTemplate) -> Self {
        let name = name.into();
        self.templates.register(name.clone(), template);
        self.template = name;
        self
    }

    /// Skip showing the traceback, for hosts that already printed it.
    #[must_use]
    pub fn without_traceback_echo(mut self) -> Self {
        self.echo_traceback = false;
        self
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    pub fn build_context<F: FrameReference>(
        &self,
        failure: RaisedFailure,
        frames: &[F],
    ) -> Result<FailureContext, FincantatemError> {
        let failure = if failure.runtime_version.is_empty() {
            failure.with_runtime_version(runtime_version())
        } else {
            failure
        };
        Ok(self.builder.build(failure, frames)?)
    }

    /// Runs the full cycle for `failure`, whose frames are ordered outermost caller first.
    pub fn report<F, I>(
        &self,
        failure: RaisedFailure,
        frames: &[F],
        interface: &mut I,
    ) -> Result<Report, FincantatemError>
    where
        F: FrameReference,
        I: Interface + ?Sized,
    {
        let context = self.build_context(failure, frames)?;
        let prompt = self
            .templates
            .render(&context, &self.template, self.options.render_mode)?;
        let system = system_prompt(self.options.markdown);
        debug!(prompt_len = prompt.len(), "prompt rendered");

        interface.show(HEADER, Style::Header);
        if self.echo_traceback {
            interface.show(context.traceback(), Style::Traceback);
        }

        let messages = [
            ChatMessage::system(system.clone()),
            ChatMessage::user(prompt.clone()),
        ];
        let analysis = stream_reply(&self.responder, &messages, interface, Style::Analysis)?;
        info!(
            failure = context.type_name(),
            analysis_len = analysis.len(),
            "failure analyzed"
        );

        if self.options.chat {
            interface.show(CHAT_HINT, Style::Info);
            interface.show("", Style::Plain);
            ChatSession::new(&self.responder, system, prompt.clone(), analysis.clone())
                .with_failure(FailureSummary::from_context(&context))
                .with_export_dir(self.options.export_dir.clone())
                .run(interface)?;
        }

        Ok(Report { prompt, analysis })
    }

    pub fn report_panic<I: Interface + ?Sized>(
        &self,
        panic: &PanicReport,
        interface: &mut I,
    ) -> Result<Report, FincantatemError> {
        self.report(panic.failure(), &panic.frames(), interface)
    }
}

impl<R> std::fmt::Debug for Reporter<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("options", &self.options)
            .field("template", &self.template)
            .field("echo_traceback", &self.echo_traceback)
            .finish_non_exhaustive()
    }
}
