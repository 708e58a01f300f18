//! Output rendering for the chat widget.
//!
//! [`ChatView`](crate::ChatView) decides *when* something must be drawn; a [`Renderer`]
//! decides *how*.  The plain-text implementation here draws the widget as a transcript on a
//! terminal, printing only the new suffix of a reply as it grows.

use std::io::{self, Stdout, Write};

use time::format_description::FormatItem;
use time::macros::format_description;

use crate::chat::{ConversationMessage, MessageRole, Visibility};
use crate::persona;

/// ANSI escape code for dim text (used for the typing indicator and timestamps).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text (used for the typing indicator).
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant's name).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the visitor's name).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Return to column zero and clear the line.
const ANSI_CLEAR_LINE: &str = "\r\x1b[2K";

const TIMESTAMP: &[FormatItem<'static>] = format_description!("[hour]:[minute]");

/// Trait for drawing the chat widget.
///
/// Every call is made only while the widget is open, except [`Renderer::visibility_changed`]
/// which reports both transitions.
pub trait Renderer: Send {
    /// Draw the whole conversation from scratch.
    fn render_all(&mut self, messages: &[ConversationMessage]);

    /// A message was added at `index`.
    fn message_appended(&mut self, index: usize, message: &ConversationMessage);

    /// The message at `index` has new text.
    ///
    /// Called after every reply fragment with the full text so far.
    fn message_updated(&mut self, index: usize, message: &ConversationMessage);

    /// Show or hide the typing indicator.
    fn typing(&mut self, active: bool);

    /// Bring the newest message into view.
    fn scroll_to_latest(&mut self);

    /// The widget was opened or closed.
    fn visibility_changed(&mut self, _visibility: Visibility) {}

    /// The host is exiting; leave the terminal on a fresh line.
    fn finish(&mut self) {}

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);
}

/// The reply line currently on screen: its header and the text printed after it.
#[derive(Debug)]
struct Live {
    index: usize,
    header: String,
    printed: String,
}

/// Plain text renderer with optional ANSI styling.
///
/// Writes to stdout unless constructed with [`PlainTextRenderer::with_writer`].  Errors go to
/// stderr.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
    line_start: bool,
    typing: bool,
    live: Option<Live>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer writing to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            line_start: true,
            typing: false,
            live: None,
        }
    }

    /// The underlying writer.
    pub fn writer(&self) -> &W {
        &self.out
    }

    fn emit(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = self.out.write_all(text.as_bytes());
        self.line_start = text.ends_with('\n');
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }

    /// Finish the current line; whatever was live on it can no longer be extended.
    fn end_line(&mut self) {
        if !self.line_start {
            self.emit("\n");
        }
        self.live = None;
    }

    fn header(&self, message: &ConversationMessage) -> String {
        let time = message.created_at.format(TIMESTAMP).unwrap_or_default();
        let (name, color) = match message.role {
            MessageRole::User => ("you", ANSI_GREEN),
            MessageRole::Assistant => (persona::ASSISTANT_NAME, ANSI_CYAN),
        };
        if self.use_color {
            format!("{ANSI_DIM}[{time}]{ANSI_RESET} {color}{name}:{ANSI_RESET} ")
        } else {
            format!("[{time}] {name}: ")
        }
    }

    fn write_message(&mut self, index: usize, message: &ConversationMessage) {
        self.end_line();
        let header = self.header(message);
        self.emit(&header);
        self.emit(&message.text);
        self.live = Some(Live {
            index,
            header,
            printed: message.text.clone(),
        });
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn render_all(&mut self, messages: &[ConversationMessage]) {
        self.end_line();
        self.typing = false;
        for (index, message) in messages.iter().enumerate() {
            self.write_message(index, message);
        }
        self.flush();
    }

    fn message_appended(&mut self, index: usize, message: &ConversationMessage) {
        self.write_message(index, message);
        self.flush();
    }

    fn message_updated(&mut self, index: usize, message: &ConversationMessage) {
        let suffix = self
            .live
            .as_ref()
            .filter(|live| live.index == index)
            .and_then(|live| message.text.strip_prefix(live.printed.as_str()))
            .map(str::to_string);
        match suffix {
            Some(suffix) => {
                self.emit(&suffix);
                if let Some(live) = &mut self.live {
                    live.printed.clone_from(&message.text);
                }
            }
            // The text was replaced rather than extended; print it again in full.
            None => self.write_message(index, message),
        }
        self.flush();
    }

    fn typing(&mut self, active: bool) {
        if active == self.typing {
            return;
        }
        self.typing = active;
        match (self.use_color, active) {
            (true, true) => {
                let indicator = format!(
                    "{ANSI_DIM}{ANSI_ITALIC}{}{ANSI_RESET}",
                    persona::TYPING_INDICATOR
                );
                let _ = self.out.write_all(indicator.as_bytes());
            }
            (true, false) => {
                let _ = self.out.write_all(ANSI_CLEAR_LINE.as_bytes());
                let restore = self
                    .live
                    .as_ref()
                    .map(|live| format!("{}{}", live.header, live.printed));
                self.line_start = true;
                if let Some(restore) = restore {
                    self.emit(&restore);
                }
            }
            (false, true) => {
                self.end_line();
                self.emit(&format!("({})\n", persona::TYPING_INDICATOR));
            }
            (false, false) => {}
        }
        self.flush();
    }

    fn scroll_to_latest(&mut self) {
        self.flush();
    }

    fn visibility_changed(&mut self, visibility: Visibility) {
        self.end_line();
        self.typing = false;
        match visibility {
            Visibility::Open => self.emit("--- chat opened ---\n"),
            Visibility::Closed => self.emit("--- chat closed (/open to reopen) ---\n"),
        }
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        self.end_line();
        self.emit(info);
        self.end_line();
        self.flush();
    }

    fn finish(&mut self) {
        self.end_line();
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.end_line();
        self.flush();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(renderer: &PlainTextRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.writer().clone()).unwrap()
    }

    fn assistant(text: &str) -> ConversationMessage {
        ConversationMessage::assistant(text)
    }

    #[test]
    fn growing_reply_prints_only_the_suffix() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.message_appended(2, &assistant(""));
        renderer.message_updated(2, &assistant("Hel"));
        renderer.message_updated(2, &assistant("Hello"));
        let out = output(&renderer);
        assert!(out.ends_with("Aiden: Hello"), "{out:?}");
        assert_eq!(out.matches("Aiden:").count(), 1);
    }

    #[test]
    fn replaced_reply_is_printed_again() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.message_appended(2, &assistant("Partial"));
        renderer.message_updated(2, &assistant(persona::APOLOGY));
        let out = output(&renderer);
        assert_eq!(out.matches("Aiden:").count(), 2);
        assert!(out.ends_with(persona::APOLOGY));
    }

    #[test]
    fn typing_indicator_without_color() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.message_appended(2, &assistant(""));
        renderer.typing(true);
        renderer.typing(true);
        renderer.typing(false);
        renderer.message_updated(2, &assistant("Hi"));
        let out = output(&renderer);
        assert_eq!(out.matches(persona::TYPING_INDICATOR).count(), 1);
        assert!(out.ends_with("Aiden: Hi"), "{out:?}");
    }

    #[test]
    fn typing_indicator_with_color_is_erased() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), true);
        renderer.message_appended(2, &assistant(""));
        renderer.typing(true);
        renderer.typing(false);
        renderer.message_updated(2, &assistant("Hi"));
        let out = output(&renderer);
        assert!(out.contains(persona::TYPING_INDICATOR));
        assert!(out.contains(ANSI_CLEAR_LINE));
        assert!(out.ends_with("Hi"));
    }

    #[test]
    fn render_all_prints_every_message() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.render_all(&[
            assistant("Hello!"),
            ConversationMessage::user("What are your skills?"),
            assistant("SEO."),
        ]);
        let out = output(&renderer);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("Aiden: Hello!"));
        assert!(lines[1].ends_with("you: What are your skills?"));
        assert!(lines[2].ends_with("Aiden: SEO."));
    }

    #[test]
    fn finish_ends_the_last_line() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.message_appended(2, &assistant("WordPress, SEO."));
        renderer.finish();
        renderer.finish();
        assert!(output(&renderer).ends_with("Aiden: WordPress, SEO.\n"));
    }

    #[test]
    fn info_lines_end_cleanly() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.message_appended(0, &assistant("Hi"));
        renderer.print_info("note");
        assert!(output(&renderer).ends_with("Hi\nnote\n"));
    }
}
