//! Line-oriented terminal display.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

use chat_session::{Interface, Style};

const USER_PROMPT_LABEL: &str = "> ";

/// Writes plain text to `output` and reads lines from `input`. Styles only affect prompt labels.
#[derive(Debug)]
pub struct PlainTextInterface<R, W> {
    input: R,
    output: W,
}

impl PlainTextInterface<StdinLock<'static>, Stdout> {
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> PlainTextInterface<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: BufRead, W: Write> Interface for PlainTextInterface<R, W> {
    fn show(&mut self, text: &str, _style: Style) {
        let _ = writeln!(self.output, "{text}");
        let _ = self.output.flush();
    }

    fn show_stream(
        &mut self,
        fragments: &mut dyn Iterator<Item = String>,
        _style: Style,
    ) -> String {
        let mut full = String::new();
        for fragment in fragments {
            let _ = self.output.write_all(fragment.as_bytes());
            let _ = self.output.flush();
            full.push_str(&fragment);
        }
        let _ = writeln!(self.output);
        let _ = self.output.flush();
        full
    }

    fn prompt(&mut self, label: &str, style: Style) -> Option<String> {
        let label = if label.is_empty() && style == Style::UserPrompt {
            USER_PROMPT_LABEL
        } else {
            label
        };
        let _ = write!(self.output, "{label}");
        let _ = self.output.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chat_session::{Interface, Style};

    use super::PlainTextInterface;

    fn interface(input: &str) -> PlainTextInterface<Cursor<Vec<u8>>, Vec<u8>> {
        PlainTextInterface::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn written(interface: PlainTextInterface<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(interface.into_parts().1).expect("output is UTF-8")
    }

    #[test]
    fn stream_is_written_as_it_arrives_and_returned_whole() {
        let mut ui = interface("");
        let mut fragments = vec!["Hel".to_string(), "lo".to_string()].into_iter();

        let full = ui.show_stream(&mut fragments, Style::Analysis);
        assert_eq!(full, "Hello");
        assert_eq!(written(ui), "Hello\n");
    }

    #[test]
    fn prompt_strips_line_endings_and_reports_end_of_input() {
        let mut ui = interface("why?\r\n/q\n");
        assert_eq!(ui.prompt("", Style::UserPrompt).as_deref(), Some("why?"));
        assert_eq!(ui.prompt("", Style::UserPrompt).as_deref(), Some("/q"));
        assert_eq!(ui.prompt("", Style::UserPrompt), None);
        assert_eq!(written(ui), "> > > ");
    }

    #[test]
    fn show_writes_one_line() {
        let mut ui = interface("");
        ui.show("  ✧ Chat saved to: x.json", Style::Info);
        assert_eq!(written(ui), "  ✧ Chat saved to: x.json\n");
    }
}
