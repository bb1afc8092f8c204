use std::fs;
use std::path::{Path, PathBuf};

use failure_context::FailureContext;
use inference_api::{ChatMessage, Role};
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::error::ChatError;

pub const EXPORT_VERSION: &str = "1.0";

/// The parts of a [`FailureContext`] a chat keeps for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureSummary {
    pub type_name: String,
    pub message: String,
    pub runtime_version: String,
}

impl FailureSummary {
    #[must_use]
    pub fn from_context(context: &FailureContext) -> Self {
        Self {
            type_name: context.type_name().to_string(),
            message: context.message().to_string(),
            runtime_version: context.runtime_version().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFailure {
    #[serde(rename = "type")]
    pub type_name: String,
    pub message: String,
}

/// Saved conversation. The runtime version keeps the `python_version` key of the shared format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub timestamp: i64,
    pub version: String,
    #[serde(
        rename = "python_version",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub runtime_version: Option<String>,
    #[serde(rename = "exception", default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ExportedFailure>,
    pub messages: Vec<ChatMessage>,
}

impl ExportDocument {
    /// Snapshot of `messages` without the system prompt.
    #[must_use]
    pub fn new(
        messages: &[ChatMessage],
        failure: Option<&FailureSummary>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            timestamp: now.unix_timestamp(),
            version: EXPORT_VERSION.to_string(),
            runtime_version: failure.map(|failure| failure.runtime_version.clone()),
            failure: failure.map(|failure| ExportedFailure {
                type_name: failure.type_name.clone(),
                message: failure.message.clone(),
            }),
            messages: messages
                .iter()
                .filter(|message| message.role != Role::System)
                .cloned()
                .collect(),
        }
    }

    /// Writes the document as pretty JSON to `dir`, named after `now`, and returns the path.
    pub fn write_to(&self, dir: &Path, now: OffsetDateTime) -> Result<PathBuf, ChatError> {
        let path = dir.join(export_file_name(now)?);
        let json = serde_json::to_string_pretty(self)
            .map_err(|source| ChatError::json_serialize(&path, source))?;
        fs::write(&path, json)
            .map_err(|source| ChatError::io("writing chat export", &path, source))?;
        Ok(path)
    }
}

/// `fincantatem_chat_YYYY-MM-DD_HH-MM.json` for the UTC minute of `now`.
pub fn export_file_name(now: OffsetDateTime) -> Result<String, ChatError> {
    let stamp = now
        .to_offset(UtcOffset::UTC)
        .format(format_description!("[year]-[month]-[day]_[hour]-[minute]"))
        .map_err(ChatError::ClockFormat)?;
    Ok(format!("fincantatem_chat_{stamp}.json"))
}

#[cfg(test)]
mod tests {
    use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

    use super::export_file_name;

    fn at(hour: u8, minute: u8, offset: UtcOffset) -> OffsetDateTime {
        let date = Date::from_calendar_date(2026, Month::March, 7).expect("valid date");
        let time = Time::from_hms(hour, minute, 59).expect("valid time");
        PrimitiveDateTime::new(date, time).assume_offset(offset)
    }

    #[test]
    fn file_name_uses_utc_minute() {
        assert_eq!(
            export_file_name(at(9, 5, UtcOffset::UTC)).expect("formats"),
            "fincantatem_chat_2026-03-07_09-05.json"
        );
        let plus_two = UtcOffset::from_hms(2, 0, 0).expect("valid offset");
        assert_eq!(
            export_file_name(at(1, 30, plus_two)).expect("formats"),
            "fincantatem_chat_2026-03-06_23-30.json"
        );
    }
}
