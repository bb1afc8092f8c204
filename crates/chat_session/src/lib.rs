//! Follow-up conversation about an analyzed failure.
//!
//! A [`ChatSession`] starts from the prompt and analysis of one reporting cycle and keeps
//! answering questions through a [`Responder`] until the user quits or input runs out.

mod command;
mod error;
mod export;
mod interface;
mod session;

pub use command::{parse_chat_command, ChatCommand, ParsedInput, HELP_TEXT};
pub use error::ChatError;
pub use export::{
    export_file_name, ExportDocument, ExportedFailure, FailureSummary, EXPORT_VERSION,
};
pub use interface::{Interface, Style};
pub use session::{stream_reply, ChatSession, Fragments, Responder, SessionState};
