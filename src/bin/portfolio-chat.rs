//! Terminal host for the portfolio chat widget.
//!
//! Stands in for the page the widget is embedded in: the widget starts closed, `/open` shows
//! it, and every other line is a message to the assistant.  Replies stream in while the
//! prompt stays usable, so the widget can be closed and reopened mid-reply.
//!
//! # Usage
//!
//! ```bash
//! # Key read from API_KEY
//! portfolio-chat
//!
//! # Key read from another variable, different model
//! portfolio-chat --api-key-env GEMINI_API_KEY --model gemini-2.5-pro
//!
//! # Disable colors (useful for piping output)
//! portfolio-chat --no-color
//! ```
//!
//! Set `RUST_LOG=portfolio_assistant=debug` to see request and stream logging on stderr.

use std::thread;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use portfolio_assistant::chat::{
    ActiveTurn, AssistantConfig, ChatArgs, ChatCommand, ChatView, PlainTextRenderer,
    ReplyFragment, Renderer, SessionManager, TurnStart, help_text, parse_command,
};

/// What the line reader thread hands to the event loop.
enum Input {
    Line(String),
    Eof,
    Failed(String),
}

enum Event {
    Input(Option<Input>),
    Fragment(Option<ReplyFragment>),
}

/// Main entry point for the portfolio-chat application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("portfolio-chat [OPTIONS]");
    let config = AssistantConfig::try_from(args)?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut view = ChatView::with_greeting(config.greeting.clone());
    let manager = SessionManager::new(config);

    println!("Portfolio chat (model: {})", manager.config().model);
    println!("Type /open to start chatting, /help for commands, /quit to exit\n");

    let (tx, mut lines) = mpsc::unbounded_channel();
    thread::spawn(move || read_lines(tx));

    let mut active: Option<ActiveTurn> = None;
    let mut said_goodbye = false;
    loop {
        let event = tokio::select! {
            input = lines.recv() => Event::Input(input),
            fragment = next_fragment(&mut active) => Event::Fragment(fragment),
        };

        match event {
            Event::Input(None) | Event::Input(Some(Input::Eof)) => break,
            Event::Input(Some(Input::Failed(err))) => {
                renderer.print_error(&err);
                break;
            }
            Event::Input(Some(Input::Line(line))) => {
                if let Some(cmd) = parse_command(&line) {
                    if !handle_command(cmd, &mut view, &manager, &mut renderer) {
                        said_goodbye = true;
                        break;
                    }
                    continue;
                }
                if line.trim().is_empty() {
                    continue;
                }
                if !view.is_open() {
                    renderer.print_info("The chat is closed. Type /open to talk to the assistant.");
                    continue;
                }
                view.set_input(line);
                match view.begin(&manager, &mut renderer) {
                    TurnStart::Streaming(turn) => active = Some(turn),
                    TurnStart::Abandoned(err) => renderer.print_error(&err.to_string()),
                    TurnStart::Rejected => {
                        renderer.print_info("Still replying; wait for the answer to finish.")
                    }
                }
            }
            Event::Fragment(Some(fragment)) => {
                if let Some(turn) = active.as_mut() {
                    view.apply_fragment(&mut turn.pending, fragment, &mut renderer);
                }
            }
            Event::Fragment(None) => {
                if let Some(turn) = active.take() {
                    view.finish_turn(turn.pending, &mut renderer);
                }
            }
        }
    }

    // A started reply always runs to completion, even when input ends first.
    if let Some(turn) = active.take() {
        view.complete(turn, &mut renderer).await;
    }
    renderer.finish();
    if said_goodbye {
        println!("Goodbye!");
    }

    Ok(())
}

/// The next fragment of the active reply; never resolves while idle.
async fn next_fragment(active: &mut Option<ActiveTurn>) -> Option<ReplyFragment> {
    match active {
        Some(turn) => turn.next_fragment().await,
        None => std::future::pending().await,
    }
}

/// Reads lines on a dedicated thread so replies keep streaming while the prompt waits.
fn read_lines(tx: mpsc::UnboundedSender<Input>) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            let _ = tx.send(Input::Failed(format!("cannot read input: {err}")));
            return;
        }
    };
    loop {
        let input = match rl.readline("> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                Input::Line(line)
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Input::Eof,
            Err(err) => Input::Failed(format!("input error: {err}")),
        };
        let last = !matches!(input, Input::Line(_));
        if tx.send(input).is_err() || last {
            break;
        }
    }
}

/// Executes a slash command.  Returns false when the host should exit.
fn handle_command(
    cmd: ChatCommand,
    view: &mut ChatView,
    manager: &SessionManager,
    renderer: &mut dyn Renderer,
) -> bool {
    match cmd {
        ChatCommand::Quit => return false,
        ChatCommand::Open => view.open(renderer),
        ChatCommand::Close => view.close(renderer),
        ChatCommand::Toggle => {
            view.toggle(renderer);
        }
        ChatCommand::History => {
            if view.is_open() {
                view.redraw(renderer);
            } else {
                renderer.print_info("The chat is closed. Type /open to show it.");
            }
        }
        ChatCommand::Stats => print_stats(view, manager, renderer),
        ChatCommand::Help => {
            for line in help_text().lines() {
                renderer.print_info(&format!("    {line}"));
            }
        }
        ChatCommand::Invalid(message) => renderer.print_error(&message),
    }
    true
}

fn print_stats(view: &ChatView, manager: &SessionManager, renderer: &mut dyn Renderer) {
    let config = manager.config();
    renderer.print_info(&format!("Model: {}", config.model));
    renderer.print_info(&format!("Temperature: {:.2}", config.temperature));
    match manager.session() {
        Some(session) => {
            renderer.print_info(&format!("Completed exchanges: {}", session.turn_count()))
        }
        None => renderer.print_info("Session: not started"),
    }
    renderer.print_info(&format!("Messages shown: {}", view.messages().len()));
    renderer.print_info(&format!(
        "Widget: {:?}, {:?}",
        view.visibility(),
        view.turn_state()
    ));
}
