use std::path::{Path, PathBuf};

use inference_api::{BlockingInferenceClient, ChatMessage, InferenceApiError};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::command::{parse_chat_command, ChatCommand, ParsedInput, HELP_TEXT};
use crate::error::ChatError;
use crate::export::{ExportDocument, FailureSummary};
use crate::interface::{Interface, Style};

pub type Fragments<'a> = Box<dyn Iterator<Item = Result<String, InferenceApiError>> + 'a>;

/// Produces the streamed assistant reply to a conversation.
pub trait Responder {
    fn respond(&self, messages: &[ChatMessage]) -> Result<Fragments<'_>, InferenceApiError>;
}

impl Responder for BlockingInferenceClient {
    fn respond(&self, messages: &[ChatMessage]) -> Result<Fragments<'_>, InferenceApiError> {
        Ok(Box::new(self.call_stream(messages)?))
    }
}

impl<R: Responder + ?Sized> Responder for &R {
    fn respond(&self, messages: &[ChatMessage]) -> Result<Fragments<'_>, InferenceApiError> {
        (**self).respond(messages)
    }
}

/// Streams the reply to `messages` into `interface` and returns the full text.
///
/// A failure while the reply is streaming ends the display and is returned after it.
pub fn stream_reply<R, I>(
    responder: &R,
    messages: &[ChatMessage],
    interface: &mut I,
    style: Style,
) -> Result<String, InferenceApiError>
where
    R: Responder + ?Sized,
    I: Interface + ?Sized,
{
    let mut fragments = UntilError {
        inner: responder.respond(messages)?,
        error: None,
    };
    let reply = interface.show_stream(&mut fragments, style);
    match fragments.error.take() {
        Some(error) => Err(error),
        None => Ok(reply),
    }
}

struct UntilError<'a> {
    inner: Fragments<'a>,
    error: Option<InferenceApiError>,
}

impl Iterator for UntilError<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.error.is_some() {
            return None;
        }
        match self.inner.next()? {
            Ok(fragment) => Some(fragment),
            Err(error) => {
                self.error = Some(error);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Terminated,
}

/// Multi-turn chat seeded with `[system, user(prompt), assistant(analysis)]`.
///
/// History only grows. Commands never enter it.
pub struct ChatSession<R> {
    responder: R,
    messages: Vec<ChatMessage>,
    failure: Option<FailureSummary>,
    export_dir: PathBuf,
    state: SessionState,
}

impl<R: Responder> ChatSession<R> {
    pub fn new(
        responder: R,
        system_prompt: impl Into<String>,
        initial_prompt: impl Into<String>,
        analysis: impl Into<String>,
    ) -> Self {
        Self {
            responder,
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(initial_prompt),
                ChatMessage::assistant(analysis),
            ],
            failure: None,
            export_dir: PathBuf::from("."),
            state: SessionState::AwaitingInput,
        }
    }

    #[must_use]
    pub fn with_failure(mut self, failure: FailureSummary) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Directory `/save` writes into. Defaults to the current directory.
    #[must_use]
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn failure(&self) -> Option<&FailureSummary> {
        self.failure.as_ref()
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Prompts and handles input until the session terminates.
    pub fn run<I: Interface + ?Sized>(&mut self, interface: &mut I) -> Result<(), ChatError> {
        while self.state == SessionState::AwaitingInput {
            let input = interface.prompt("", Style::UserPrompt);
            self.handle_input(input.as_deref(), interface)?;
        }
        Ok(())
    }

    /// Applies one line of input. `None` means input is exhausted.
    pub fn handle_input<I: Interface + ?Sized>(
        &mut self,
        input: Option<&str>,
        interface: &mut I,
    ) -> Result<SessionState, ChatError> {
        if self.state == SessionState::Terminated {
            return Ok(self.state);
        }
        let Some(input) = input else {
            debug!("chat input exhausted");
            self.state = SessionState::Terminated;
            return Ok(self.state);
        };

        match parse_chat_command(input) {
            Some(ParsedInput::Known(ChatCommand::Quit)) => self.state = SessionState::Terminated,
            Some(ParsedInput::Known(ChatCommand::Help)) => interface.show(HELP_TEXT, Style::Help),
            Some(ParsedInput::Known(ChatCommand::Save)) => match self.save() {
                Ok(path) => interface.show(
                    &format!("  ✧ Chat saved to: {}", path.display()),
                    Style::Info,
                ),
                Err(error) => {
                    warn!(error = %error, "chat export failed");
                    interface.show(&format!("  ! Failed to save: {error}"), Style::Info);
                }
            },
            Some(ParsedInput::Unknown(command)) => interface.show(
                &format!("  ! Unknown command: {command}. Type /help for available commands."),
                Style::Info,
            ),
            None if input.trim().is_empty() => {}
            None => self.ask(input, interface)?,
        }
        Ok(self.state)
    }

    fn ask<I: Interface + ?Sized>(
        &mut self,
        question: &str,
        interface: &mut I,
    ) -> Result<(), ChatError> {
        self.messages.push(ChatMessage::user(question));
        let reply = stream_reply(&self.responder, &self.messages, interface, Style::Analysis)?;
        self.messages.push(ChatMessage::assistant(reply));
        Ok(())
    }

    #[must_use]
    pub fn export(&self, now: OffsetDateTime) -> ExportDocument {
        ExportDocument::new(&self.messages, self.failure.as_ref(), now)
    }

    pub fn save(&self) -> Result<PathBuf, ChatError> {
        self.save_at(OffsetDateTime::now_utc())
    }

    pub fn save_at(&self, now: OffsetDateTime) -> Result<PathBuf, ChatError> {
        let path = self.export(now).write_to(&self.export_dir, now)?;
        info!(path = %path.display(), messages = self.messages.len() - 1, "chat exported");
        Ok(path)
    }
}

impl<R> std::fmt::Debug for ChatSession<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("messages", &self.messages.len())
            .field("failure", &self.failure)
            .field("export_dir", &self.export_dir)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
