/// Shown for `/help`.
pub const HELP_TEXT: &str = "\
  Ask a follow-up question about the failure, or use a command:
    /help   show this message
    /save   write the conversation to a JSON file in the export directory
    /quit   end the chat (also /q)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    Save,
    Quit,
}

/// A line starting with `/` after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    Known(ChatCommand),
    /// The trimmed command text, as typed.
    Unknown(String),
}

/// `None` for plain text. Matching ignores case and surrounding whitespace.
#[must_use]
pub fn parse_chat_command(input: &str) -> Option<ParsedInput> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let command = match trimmed.to_lowercase().as_str() {
        "/help" => ChatCommand::Help,
        "/save" => ChatCommand::Save,
        "/quit" | "/q" => ChatCommand::Quit,
        _ => return Some(ParsedInput::Unknown(trimmed.to_string())),
    };
    Some(ParsedInput::Known(command))
}

#[cfg(test)]
mod tests {
    use super::{parse_chat_command, ChatCommand, ParsedInput};

    #[test]
    fn commands_ignore_case_and_padding() {
        assert_eq!(
            parse_chat_command("  /Q  "),
            Some(ParsedInput::Known(ChatCommand::Quit))
        );
        assert_eq!(
            parse_chat_command("/QUIT"),
            Some(ParsedInput::Known(ChatCommand::Quit))
        );
        assert_eq!(
            parse_chat_command("\t/Help\n"),
            Some(ParsedInput::Known(ChatCommand::Help))
        );
        assert_eq!(
            parse_chat_command("/save"),
            Some(ParsedInput::Known(ChatCommand::Save))
        );
    }

    #[test]
    fn unknown_commands_keep_their_text() {
        assert_eq!(
            parse_chat_command(" /Bogus "),
            Some(ParsedInput::Unknown("/Bogus".to_string()))
        );
        assert_eq!(
            parse_chat_command("/save now"),
            Some(ParsedInput::Unknown("/save now".to_string()))
        );
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_chat_command("why?"), None);
        assert_eq!(parse_chat_command("what does a/b mean"), None);
        assert_eq!(parse_chat_command(""), None);
    }
}
