#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use chat_session::{Fragments, Interface, Responder, Style};
use inference_api::{ChatMessage, InferenceApiError};

/// Replies with canned fragments in order and keeps every history it was asked about.
#[derive(Default)]
pub struct ScriptedResponder {
    pub replies: RefCell<VecDeque<Vec<&'static str>>>,
    pub seen: RefCell<Vec<Vec<ChatMessage>>>,
}

impl ScriptedResponder {
    pub fn replying(replies: &[&[&'static str]]) -> Self {
        Self {
            replies: RefCell::new(replies.iter().map(|reply| reply.to_vec()).collect()),
            seen: RefCell::default(),
        }
    }
}

impl Responder for ScriptedResponder {
    fn respond(&self, messages: &[ChatMessage]) -> Result<Fragments<'_>, InferenceApiError> {
        self.seen.borrow_mut().push(messages.to_vec());
        let reply = self.replies.borrow_mut().pop_front().unwrap_or_default();
        Ok(Box::new(
            reply
                .into_iter()
                .map(|fragment| Ok::<_, InferenceApiError>(fragment.to_string())),
        ))
    }
}

/// Records everything shown and answers prompts from a queue.
#[derive(Default)]
pub struct RecordingInterface {
    pub inputs: VecDeque<String>,
    pub shown: Vec<(String, Style)>,
}

impl RecordingInterface {
    pub fn with_inputs(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|input| (*input).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn styled(&self, style: Style) -> Vec<&str> {
        self.shown
            .iter()
            .filter(|(_, shown_style)| *shown_style == style)
            .map(|(text, _)| text.as_str())
            .collect()
    }
}

impl Interface for RecordingInterface {
    fn show(&mut self, text: &str, style: Style) {
        self.shown.push((text.to_string(), style));
    }

    fn show_stream(
        &mut self,
        fragments: &mut dyn Iterator<Item = String>,
        style: Style,
    ) -> String {
        let full = fragments.collect::<String>();
        self.shown.push((full.clone(), style));
        full
    }

    fn prompt(&mut self, _label: &str, _style: Style) -> Option<String> {
        self.inputs.pop_front()
    }
}
