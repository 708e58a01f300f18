//! The chat widget's state machine.
//!
//! [`ChatView`] owns the message list, the open/closed state of the widget and the
//! idle/awaiting-reply state of the conversation.  It never talks to the network directly:
//! replies come from a [`SessionManager`] and are folded into the newest assistant message
//! one fragment at a time, with a render after each.
//!
//! Submission is split in two so a host event loop can keep handling UI events while a reply
//! streams: [`ChatView::begin`] performs the synchronous part and hands back an
//! [`ActiveTurn`]; the host then feeds its fragments to [`ChatView::apply_fragment`] and calls
//! [`ChatView::finish_turn`] when they run out.  [`ChatView::send`] does all of it in one call.

use std::fmt;

use futures::stream::StreamExt;
use time::OffsetDateTime;

use crate::chat::session::{ReplyFragment, ReplyStream, SessionManager};
use crate::error::Error;
use crate::observability::{TURNS_ABANDONED, TURNS_REJECTED, TURNS_SUBMITTED};
use crate::persona;
use crate::render::Renderer;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageRole {
    /// The visitor.
    User,
    /// The assistant.
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => f.write_str("user"),
            MessageRole::Assistant => f.write_str("assistant"),
        }
    }
}

/// A message shown in the chat widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationMessage {
    /// The author.
    pub role: MessageRole,
    /// The text.  Rewritten in place while the newest assistant reply streams.
    pub text: String,
    /// When the message was appended.
    pub created_at: OffsetDateTime,
}

impl ConversationMessage {
    /// A visitor message stamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
            created_at: now(),
        }
    }

    /// An assistant message stamped now.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
            created_at: now(),
        }
    }
}

/// The current local time, or UTC when the local offset cannot be determined.
fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Whether the widget is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    /// Hidden.  State keeps changing, nothing is rendered.
    #[default]
    Closed,
    /// Shown.
    Open,
}

/// Whether a reply is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnState {
    /// Ready for the next submission.
    #[default]
    Idle,
    /// A reply is streaming; submissions are rejected.
    AwaitingReply,
}

/// The bookkeeping for a submitted message whose reply has not finished.
#[derive(Debug)]
pub struct PendingTurn {
    prompt: String,
    placeholder: usize,
    accumulated: String,
}

impl PendingTurn {
    /// The submitted (trimmed) text.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The reply accumulated so far.
    pub fn reply(&self) -> &str {
        &self.accumulated
    }
}

/// A pending turn together with the reply stream feeding it.
pub struct ActiveTurn {
    /// The turn being filled.
    pub pending: PendingTurn,
    /// The fragments still to come.
    pub replies: ReplyStream,
}

impl ActiveTurn {
    /// Wait for the next fragment of the reply.
    pub async fn next_fragment(&mut self) -> Option<ReplyFragment> {
        self.replies.next().await
    }
}

/// How [`ChatView::begin`] went.
pub enum TurnStart {
    /// The input was blank or a reply is already streaming.  Nothing changed.
    Rejected,
    /// The messages were appended but no session could be created.  The placeholder stays
    /// empty and the view is idle again.
    Abandoned(Error),
    /// The reply is streaming.
    Streaming(ActiveTurn),
}

/// How [`ChatView::send`] went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing was submitted.
    Rejected,
    /// Session creation failed; see [`TurnStart::Abandoned`].
    Abandoned,
    /// The reply stream ran to its end.
    Completed,
}

/// The chat widget.
#[derive(Debug)]
pub struct ChatView {
    messages: Vec<ConversationMessage>,
    visibility: Visibility,
    turn: TurnState,
    input: String,
}

impl ChatView {
    /// A closed, idle view seeded with the assistant's greeting.
    pub fn new() -> Self {
        Self::with_greeting(persona::GREETING)
    }

    /// A closed, idle view seeded with `greeting`.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![ConversationMessage::assistant(greeting)],
            visibility: Visibility::Closed,
            turn: TurnState::Idle,
            input: String::new(),
        }
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// The current visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// The current turn state.
    pub fn turn_state(&self) -> TurnState {
        self.turn
    }

    /// The input buffer.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Returns true if the widget is shown.
    pub fn is_open(&self) -> bool {
        self.visibility == Visibility::Open
    }

    /// Returns true while a reply streams.
    pub fn is_awaiting_reply(&self) -> bool {
        self.turn == TurnState::AwaitingReply
    }

    /// Returns true while waiting for the first fragment of a reply.
    pub fn show_typing_indicator(&self) -> bool {
        self.is_awaiting_reply()
            && self
                .messages
                .last()
                .is_some_and(|last| last.role == MessageRole::Assistant && last.text.is_empty())
    }

    /// Replace the input buffer.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Show the widget, bringing it up to date with anything that changed while hidden.
    pub fn open(&mut self, renderer: &mut dyn Renderer) {
        if self.is_open() {
            return;
        }
        self.visibility = Visibility::Open;
        renderer.visibility_changed(self.visibility);
        self.redraw(renderer);
    }

    /// Hide the widget.  A streaming reply keeps streaming.
    pub fn close(&mut self, renderer: &mut dyn Renderer) {
        if !self.is_open() {
            return;
        }
        self.visibility = Visibility::Closed;
        renderer.visibility_changed(self.visibility);
    }

    /// Flip between open and closed, returning the new visibility.
    pub fn toggle(&mut self, renderer: &mut dyn Renderer) -> Visibility {
        if self.is_open() {
            self.close(renderer);
        } else {
            self.open(renderer);
        }
        self.visibility
    }

    /// Render every message again, if open.
    pub fn redraw(&self, renderer: &mut dyn Renderer) {
        if !self.is_open() {
            return;
        }
        renderer.render_all(&self.messages);
        if self.show_typing_indicator() {
            renderer.typing(true);
        }
        renderer.scroll_to_latest();
    }

    /// Submit the input buffer.
    ///
    /// Returns `None`, changing nothing, when the trimmed input is empty or a reply is
    /// already streaming.  Otherwise appends the user message, clears the input, enters
    /// [`TurnState::AwaitingReply`] and appends an empty assistant placeholder, in that order.
    pub fn submit(&mut self, renderer: &mut dyn Renderer) -> Option<PendingTurn> {
        if self.is_awaiting_reply() {
            TURNS_REJECTED.click();
            tracing::debug!("submission ignored while a reply is streaming");
            return None;
        }
        let prompt = self.input.trim();
        if prompt.is_empty() {
            return None;
        }
        let prompt = prompt.to_string();

        self.push(ConversationMessage::user(prompt.clone()), renderer);
        self.input.clear();
        self.turn = TurnState::AwaitingReply;
        let placeholder = self.push(ConversationMessage::assistant(String::new()), renderer);
        if self.is_open() {
            renderer.typing(true);
        }
        TURNS_SUBMITTED.click();

        Some(PendingTurn {
            prompt,
            placeholder,
            accumulated: String::new(),
        })
    }

    /// Submit the input and start streaming its reply from `manager`.
    pub fn begin(&mut self, manager: &SessionManager, renderer: &mut dyn Renderer) -> TurnStart {
        let Some(pending) = self.submit(renderer) else {
            return TurnStart::Rejected;
        };
        match manager.stream_reply(pending.prompt()) {
            Ok(replies) => TurnStart::Streaming(ActiveTurn { pending, replies }),
            Err(err) => {
                self.abandon_turn(pending, &err, renderer);
                TurnStart::Abandoned(err)
            }
        }
    }

    /// Fold one fragment into the placeholder and render it.
    pub fn apply_fragment(
        &mut self,
        turn: &mut PendingTurn,
        fragment: ReplyFragment,
        renderer: &mut dyn Renderer,
    ) {
        let was_typing = self.show_typing_indicator();
        fragment.apply(&mut turn.accumulated);
        let Some(message) = self.messages.get_mut(turn.placeholder) else {
            return;
        };
        message.text.clone_from(&turn.accumulated);
        if self.is_open() {
            if was_typing {
                renderer.typing(false);
            }
            renderer.message_updated(turn.placeholder, &self.messages[turn.placeholder]);
            renderer.scroll_to_latest();
        }
    }

    /// The reply stream is exhausted; accept submissions again.
    pub fn finish_turn(&mut self, turn: PendingTurn, renderer: &mut dyn Renderer) {
        let was_typing = self.show_typing_indicator();
        self.turn = TurnState::Idle;
        if self.is_open() && was_typing {
            renderer.typing(false);
        }
        tracing::debug!(chars = turn.accumulated.len(), "turn finished");
    }

    /// No session could be created; leave the placeholder empty and go idle.
    pub fn abandon_turn(&mut self, turn: PendingTurn, error: &Error, renderer: &mut dyn Renderer) {
        TURNS_ABANDONED.click();
        tracing::error!(error = %error, prompt = turn.prompt(), "no reply possible");
        let was_typing = self.show_typing_indicator();
        self.turn = TurnState::Idle;
        if self.is_open() && was_typing {
            renderer.typing(false);
        }
    }

    /// Submit the input and stream the whole reply into the view.
    pub async fn send(
        &mut self,
        manager: &SessionManager,
        renderer: &mut dyn Renderer,
    ) -> TurnOutcome {
        match self.begin(manager, renderer) {
            TurnStart::Rejected => TurnOutcome::Rejected,
            TurnStart::Abandoned(_) => TurnOutcome::Abandoned,
            TurnStart::Streaming(active) => {
                self.complete(active, renderer).await;
                TurnOutcome::Completed
            }
        }
    }

    /// Apply every fragment still to come from `active`, then finish the turn.
    pub async fn complete(&mut self, mut active: ActiveTurn, renderer: &mut dyn Renderer) {
        while let Some(fragment) = active.next_fragment().await {
            self.apply_fragment(&mut active.pending, fragment, renderer);
        }
        self.finish_turn(active.pending, renderer);
    }

    fn push(&mut self, message: ConversationMessage, renderer: &mut dyn Renderer) -> usize {
        let index = self.messages.len();
        self.messages.push(message);
        if self.is_open() {
            renderer.message_appended(index, &self.messages[index]);
            renderer.scroll_to_latest();
        }
        index
    }
}

impl Default for ChatView {
    fn default() -> Self {
        Self::new()
    }
}
