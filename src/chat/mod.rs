//! The portfolio chat widget.
//!
//! This module holds everything between the page and the model:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: the lazily created, memoized model session and its fail-soft reply stream
//! - [`view`]: the widget's message list, visibility and turn state
//! - [`commands`]: slash commands understood by the terminal host
//!
//! A host creates one [`SessionManager`] and one [`ChatView`], then calls
//! [`ChatView::send`] (or drives [`ChatView::begin`] itself) for every submission.

mod commands;
mod config;
mod session;
mod view;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{AssistantConfig, ChatArgs, DEFAULT_API_KEY_ENV};
pub use session::{ChatSession, Connector, ReplyFragment, ReplyStream, SessionManager};
pub use view::{
    ActiveTurn, ChatView, ConversationMessage, MessageRole, PendingTurn, TurnOutcome, TurnStart,
    TurnState, Visibility,
};
