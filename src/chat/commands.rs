//! Slash command parsing for the chat host.
//!
//! Lines starting with `/` drive the widget itself (opening it, closing it, inspecting the
//! conversation) and are never sent to the model.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Show the widget.
    Open,

    /// Hide the widget.
    Close,

    /// Flip the widget between shown and hidden.
    Toggle,

    /// Print every message again.
    History,

    /// Display session statistics (turns, model, state).
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input starts with `/`, or `None` if it should be treated
/// as a chat message.
///
/// # Examples
///
/// ```
/// # use portfolio_assistant::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/open"), Some(ChatCommand::Open));
/// assert!(parse_command("What are your skills?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "open" => ChatCommand::Open,
        "close" => ChatCommand::Close,
        "toggle" => ChatCommand::Toggle,
        "history" => ChatCommand::History,
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "" => return Some(ChatCommand::Invalid("empty command; try /help".to_string())),
        other => return Some(ChatCommand::Invalid(format!("unknown command: /{other}"))),
    };

    match argument {
        Some(_) => Some(ChatCommand::Invalid(format!("/{command} takes no arguments"))),
        None => Some(result),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /open                  Show the chat
  /close                 Hide the chat (a reply in progress keeps arriving)
  /toggle                Show or hide the chat
  /history               Print the whole conversation again
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat
Anything else is sent to the assistant."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_visibility_commands() {
        assert_eq!(parse_command("/open"), Some(ChatCommand::Open));
        assert_eq!(parse_command("/CLOSE"), Some(ChatCommand::Close));
        assert_eq!(parse_command("/toggle"), Some(ChatCommand::Toggle));
    }

    #[test]
    fn parse_history_stats_help() {
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/status"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn invalid_commands() {
        assert_eq!(
            parse_command("/model gemini-2.5-pro"),
            Some(ChatCommand::Invalid("unknown command: /model".to_string()))
        );
        assert_eq!(
            parse_command("/open now"),
            Some(ChatCommand::Invalid("/open takes no arguments".to_string()))
        );
        assert!(matches!(parse_command("/"), Some(ChatCommand::Invalid(_))));
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("What are your skills?"), None);
        assert_eq!(parse_command("and/or"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_lists_commands() {
        let help = help_text();
        for command in ["/open", "/close", "/toggle", "/history", "/stats", "/quit"] {
            assert!(help.contains(command), "{command} missing from help");
        }
    }
}
