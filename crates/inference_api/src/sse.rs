use serde_json::Value;
use tracing::debug;

use crate::payload::delta_content;

const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder for a chat-completion event stream.
///
/// Bytes are split on `\n` before decoding, so a multi-byte character cut across two chunks is
/// reassembled. Each complete line is either ignored, the `[DONE]` sentinel, or a `data:` JSON
/// payload whose `choices[0].delta.content` becomes a fragment. Malformed payloads are skipped.
#[derive(Debug, Default)]
pub struct SseLineParser {
    buffer: Vec<u8>,
    done: bool,
}

impl SseLineParser {
    /// Feed arbitrary bytes and drain the fragments of every completed line.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(bytes);

        let mut fragments = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.drain(..=newline).collect::<Vec<_>>();
            self.process_line(&line, &mut fragments);
            if self.done {
                self.buffer.clear();
                break;
            }
        }

        fragments
    }

    /// Flush a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Vec<String> {
        let mut fragments = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.process_line(&line, &mut fragments);
        }
        self.done = true;
        fragments
    }

    /// Whether the terminal sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Parse a complete body in one shot.
    pub fn parse_body(input: &str) -> Vec<String> {
        let mut parser = Self::default();
        let mut fragments = parser.feed(input.as_bytes());
        fragments.extend(parser.finish());
        fragments
    }

    fn process_line(&mut self, raw: &[u8], fragments: &mut Vec<String>) {
        let line = String::from_utf8_lossy(raw);
        let Some(payload) = line.trim().strip_prefix("data:").map(str::trim_start) else {
            return;
        };

        if payload == DONE_SENTINEL {
            self.done = true;
            return;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(chunk) => {
                if let Some(content) = delta_content(&chunk).filter(|content| !content.is_empty()) {
                    fragments.push(content.to_owned());
                }
            }
            Err(error) => debug!(%error, "skipping malformed stream chunk"),
        }
    }
}
