//! Formatting and output helpers.
//!
//! We try to handle both textual output and interactive output (output to a
//! "TTY"). In the case of interactive output, we render with colors, using
//! shell-specific escape codes.

use console::Style;

/// Line printed above and below banners.
pub const SEPARATOR: &str = "-----------------------------------------------------------";

/// Marker printed before a command which is about to be run.
pub const COMMAND_PROMPT: &str = "$>";

/// Marker printed before lines which only describe what will happen.
pub const COMMENT_MARKER: &str = "#";

/// Decides how user-facing text is decorated.
#[derive(Clone, Debug)]
pub struct Glyphs {
    /// Whether or not ANSI escape codes should be emitted (e.g. to render
    /// color).
    pub should_write_ansi_escape_codes: bool,
}

impl Glyphs {
    /// Make the `Glyphs` object appropriate for `stdout`.
    pub fn detect() -> Self {
        if console::user_attended() {
            Glyphs::pretty()
        } else {
            Glyphs::text()
        }
    }

    /// Glyphs used for output to a text file or non-TTY.
    pub fn text() -> Self {
        Glyphs {
            should_write_ansi_escape_codes: false,
        }
    }

    /// Glyphs used for output to a TTY.
    pub fn pretty() -> Self {
        Glyphs {
            should_write_ansi_escape_codes: true,
        }
    }

    fn apply(&self, style: Style, text: &str) -> String {
        if self.should_write_ansi_escape_codes {
            style.force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Render an error message.
    pub fn render_error(&self, text: &str) -> String {
        self.apply(Style::new().red().bold(), text)
    }

    /// Render a line announcing a failure.
    pub fn render_failure(&self, text: &str) -> String {
        self.apply(Style::new().red(), text)
    }

    /// Render a command line echoed before running it.
    pub fn render_command(&self, text: &str) -> String {
        self.apply(Style::new().bold(), text)
    }
}
