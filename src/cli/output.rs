//! Terminal output for CLI commands.
//!
//! Commands write through [`UserInterface`] so tests can capture what a
//! command printed with [`MockUI`].

use console::Style;

/// Output sink used by commands.
pub trait UserInterface {
    /// Plain output on stdout. Never suppressed, so JSON goes here.
    fn message(&mut self, msg: &str);

    /// A completed action.
    fn success(&mut self, msg: &str);

    /// Something the user should look at.
    fn warning(&mut self, msg: &str);

    /// A failure.
    fn error(&mut self, msg: &str);
}

/// Styles for status lines.
#[derive(Debug, Clone)]
pub struct Theme {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
}

impl Theme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
        }
    }

    /// No colors, for non-TTY output.
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    console::Term::stdout().is_term()
}

/// Writes to the real terminal.
#[derive(Debug)]
pub struct TerminalUI {
    theme: Theme,
    quiet: bool,
}

impl TerminalUI {
    /// `quiet` hides success and warning lines; errors always print.
    pub fn new(quiet: bool) -> Self {
        let theme = if should_use_colors() {
            Theme::new()
        } else {
            Theme::plain()
        };
        Self { theme, quiet }
    }
}

impl UserInterface for TerminalUI {
    fn message(&mut self, msg: &str) {
        println!("{}", msg);
    }

    fn success(&mut self, msg: &str) {
        if !self.quiet {
            println!("{}", self.theme.format_success(msg));
        }
    }

    fn warning(&mut self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", self.theme.format_warning(msg));
        }
    }

    fn error(&mut self, msg: &str) {
        eprintln!("{}", self.theme.format_error(msg));
    }
}

/// Captures output for assertions.
#[derive(Debug, Default)]
pub struct MockUI {
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl MockUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

impl UserInterface for MockUI {
    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_adds_icons() {
        let theme = Theme::plain();
        assert_eq!(theme.format_success("done"), "✓ done");
        assert_eq!(theme.format_warning("hmm"), "⚠ hmm");
        assert_eq!(theme.format_error("bad"), "✗ bad");
    }

    #[test]
    fn mock_captures_by_kind() {
        let mut ui = MockUI::new();
        ui.message("plain");
        ui.success("ok");
        ui.warning("careful");
        ui.error("broken");

        assert_eq!(ui.messages(), ["plain"]);
        assert_eq!(ui.successes(), ["ok"]);
        assert_eq!(ui.warnings(), ["careful"]);
        assert_eq!(ui.errors(), ["broken"]);
    }
}
