/// Presentation hint attached to everything shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Style {
    #[default]
    Plain,
    Header,
    Traceback,
    Analysis,
    Info,
    Help,
    UserPrompt,
}

/// Where the session and the reporting cycle write to and read from.
pub trait Interface {
    fn show(&mut self, text: &str, style: Style);

    /// Shows each fragment as soon as it is pulled and returns their concatenation.
    fn show_stream(&mut self, fragments: &mut dyn Iterator<Item = String>, style: Style) -> String;

    /// One line of user input, or `None` once input is exhausted.
    fn prompt(&mut self, label: &str, style: Style) -> Option<String>;
}
