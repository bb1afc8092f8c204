use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Request body for the chat-completions endpoint. `stream` is omitted unless set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatRequest {
    /// One user message, answered in a single response.
    pub fn single(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(prompt)],
            stream: None,
        }
    }

    /// Full history, answered as an event stream.
    pub fn streaming(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: Some(true),
        }
    }
}

/// `choices[0].message.content` of a non-streaming response.
pub fn message_content(body: &Value) -> Option<&str> {
    body.pointer("/choices/0/message/content")?.as_str()
}

/// `choices[0].delta.content` of one streamed chunk.
pub fn delta_content(chunk: &Value) -> Option<&str> {
    chunk.pointer("/choices/0/delta/content")?.as_str()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{delta_content, message_content, ChatMessage, ChatRequest};

    #[test]
    fn single_request_omits_stream_flag() {
        let body = serde_json::to_value(ChatRequest::single("m", "hi")).expect("serializes");
        assert_eq!(
            body,
            json!({"model": "m", "messages": [{"role": "user", "content": "hi"}]})
        );
    }

    #[test]
    fn streaming_request_carries_history_and_flag() {
        let request = ChatRequest::streaming(
            "m",
            vec![ChatMessage::system("s"), ChatMessage::assistant("a")],
        );
        let body = serde_json::to_value(request).expect("serializes");
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["messages"][0]["role"], json!("system"));
        assert_eq!(body["messages"][1]["role"], json!("assistant"));
    }

    #[test]
    fn content_paths_tolerate_missing_fields() {
        let full = json!({"choices": [{"message": {"content": "done"}}]});
        assert_eq!(message_content(&full), Some("done"));
        assert_eq!(message_content(&json!({"choices": []})), None);
        assert_eq!(message_content(&json!({"choices": [{"message": {"content": null}}]})), None);
        assert_eq!(delta_content(&json!({"choices": [{"delta": {}}]})), None);
    }
}
