//! Conversation session management.
//!
//! A [`SessionManager`] lazily creates exactly one [`ChatSession`] and hands out the same
//! handle on every later call.  The session turns a user message into a lazy stream of
//! [`ReplyFragment`]s.  Provider failures never escape that stream: they become one final
//! apology fragment.

use std::env;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Instant;

use futures::stream::{self, Stream, StreamExt};

use crate::chat::config::AssistantConfig;
use crate::client::Gemini;
use crate::error::{Error, Result};
use crate::observability::{
    REPLY_COMPLETED, REPLY_DURATION, REPLY_FALLBACKS, REPLY_FIRST_FRAGMENT, REPLY_FRAGMENTS,
    SESSION_CREATE_ERRORS, SESSIONS_CREATED,
};
use crate::persona;
use crate::provider::{ChunkStream, Provider};
use crate::types::{Content, GenerateContentRequest, GenerationConfig, Model};

/// One item of a streamed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyFragment {
    /// The next piece of reply text, in provider emission order.
    Text(String),
    /// The provider failed; this replaces whatever arrived before and ends the reply.
    Apology(String),
}

impl ReplyFragment {
    /// Fold this fragment into the reply accumulated so far.
    pub fn apply(&self, accumulated: &mut String) {
        match self {
            ReplyFragment::Text(text) => accumulated.push_str(text),
            ReplyFragment::Apology(text) => accumulated.clone_from(text),
        }
    }

    /// The fragment's text.
    pub fn as_str(&self) -> &str {
        match self {
            ReplyFragment::Text(text) | ReplyFragment::Apology(text) => text,
        }
    }

    /// Returns true for the fail-soft sentinel.
    pub fn is_apology(&self) -> bool {
        matches!(self, ReplyFragment::Apology(_))
    }
}

/// A lazy, finite, non-restartable reply.
pub type ReplyStream = Pin<Box<dyn Stream<Item = ReplyFragment> + Send>>;

/// Builds the provider for a new session from the config and the resolved API key.
pub type Connector = dyn Fn(&AssistantConfig, String) -> Result<Arc<dyn Provider>> + Send + Sync;

/// The conversation context shared with the provider.
///
/// The Gemini API is stateless, so the session keeps the turn history and resends it with
/// every message.  Only turns whose reply streamed to completion are recorded.
pub struct ChatSession {
    provider: Arc<dyn Provider>,
    model: Model,
    system_instruction: Content,
    generation_config: GenerationConfig,
    history: Mutex<Vec<Content>>,
}

impl ChatSession {
    fn new(provider: Arc<dyn Provider>, config: &AssistantConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            system_instruction: Content::instruction(config.system_instruction.clone()),
            generation_config: GenerationConfig::default().with_temperature(config.temperature),
            history: Mutex::new(Vec::new()),
        }
    }

    /// The model this session talks to.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The sampling temperature fixed at creation.
    pub fn temperature(&self) -> Option<f32> {
        self.generation_config.temperature
    }

    /// The system instruction fixed at creation.
    pub fn system_instruction(&self) -> String {
        self.system_instruction.text()
    }

    /// A snapshot of the completed turns.
    pub fn history(&self) -> Vec<Content> {
        self.lock_history().clone()
    }

    /// Number of completed exchanges.
    pub fn turn_count(&self) -> usize {
        self.lock_history().len() / 2
    }

    /// Send `user_text` and stream the reply.
    ///
    /// Nothing is sent until the stream is first polled.  Fragments are yielded one at a time
    /// in the order the provider emits them.  If the provider fails at any point the stream
    /// yields a single [`ReplyFragment::Apology`] and ends.
    pub fn stream_reply(self: &Arc<Self>, user_text: &str) -> ReplyStream {
        let state = ReplyState::Pending {
            session: Arc::clone(self),
            user: Content::user(user_text),
        };
        Box::pin(stream::unfold(state, |mut state| async move {
            loop {
                state = match state {
                    ReplyState::Pending { session, user } => {
                        let request = session.request_for(&user);
                        let started = Instant::now();
                        match session
                            .provider
                            .stream_generate_content(&session.model, request)
                            .await
                        {
                            Ok(chunks) => ReplyState::Streaming(Box::new(Streaming {
                                session,
                                user,
                                chunks,
                                reply: String::new(),
                                started,
                                fragments: 0,
                            })),
                            Err(err) => return Some(fall_back(err)),
                        }
                    }
                    ReplyState::Streaming(mut streaming) => match streaming.chunks.next().await {
                        Some(Ok(chunk)) => match chunk.text() {
                            Some(text) => {
                                if streaming.fragments == 0 {
                                    REPLY_FIRST_FRAGMENT
                                        .add(streaming.started.elapsed().as_secs_f64());
                                }
                                streaming.fragments += 1;
                                streaming.reply.push_str(&text);
                                REPLY_FRAGMENTS.click();
                                return Some((
                                    ReplyFragment::Text(text),
                                    ReplyState::Streaming(streaming),
                                ));
                            }
                            None => {
                                if let Some(reason) = chunk.finish_reason() {
                                    tracing::debug!(reason, "reply finished");
                                }
                                ReplyState::Streaming(streaming)
                            }
                        },
                        Some(Err(err)) => return Some(fall_back(err)),
                        None => {
                            let Streaming {
                                session,
                                user,
                                reply,
                                started,
                                fragments,
                                ..
                            } = *streaming;
                            REPLY_COMPLETED.click();
                            REPLY_DURATION.add(started.elapsed().as_secs_f64());
                            tracing::debug!(fragments, chars = reply.len(), "reply complete");
                            session.record_turn(user, reply);
                            return None;
                        }
                    },
                    ReplyState::Done => return None,
                };
            }
        }))
    }

    fn request_for(&self, user: &Content) -> GenerateContentRequest {
        let mut contents = self.history();
        contents.push(user.clone());
        GenerateContentRequest::new(contents)
            .with_system_instruction(self.system_instruction.clone())
            .with_generation_config(self.generation_config.clone())
    }

    fn record_turn(&self, user: Content, reply: String) {
        let mut history = self.lock_history();
        history.push(user);
        history.push(Content::model(reply));
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, Vec<Content>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("model", &self.model)
            .field("generation_config", &self.generation_config)
            .field("turns", &self.turn_count())
            .finish_non_exhaustive()
    }
}

enum ReplyState {
    Pending {
        session: Arc<ChatSession>,
        user: Content,
    },
    Streaming(Box<Streaming>),
    Done,
}

struct Streaming {
    session: Arc<ChatSession>,
    user: Content,
    chunks: ChunkStream,
    reply: String,
    started: Instant,
    fragments: u64,
}

fn fall_back(err: Error) -> (ReplyFragment, ReplyState) {
    tracing::error!(error = %err, "Gemini API error; replying with apology");
    REPLY_FALLBACKS.click();
    (
        ReplyFragment::Apology(persona::APOLOGY.to_string()),
        ReplyState::Done,
    )
}

/// Owns the lazily created session.
///
/// Create one per application and pass it by reference to whatever needs to talk to the
/// model.  The session it creates is fixed for the manager's lifetime.
pub struct SessionManager {
    config: AssistantConfig,
    connect: Box<Connector>,
    session: OnceLock<Arc<ChatSession>>,
}

impl SessionManager {
    /// Creates a manager whose session talks to the Gemini API.
    pub fn new(config: AssistantConfig) -> Self {
        Self::with_connector(config, |config, api_key| {
            let client = Gemini::with_options(api_key, config.base_url.as_deref(), None)?;
            Ok(Arc::new(client) as Arc<dyn Provider>)
        })
    }

    /// Creates a manager that builds its provider with `connect`.
    pub fn with_connector<F>(config: AssistantConfig, connect: F) -> Self
    where
        F: Fn(&AssistantConfig, String) -> Result<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        Self {
            config,
            connect: Box::new(connect),
            session: OnceLock::new(),
        }
    }

    /// The configuration sessions are created from.
    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// The session, if it has been created.
    pub fn session(&self) -> Option<Arc<ChatSession>> {
        self.session.get().cloned()
    }

    /// Return the session, creating it on first use.
    ///
    /// Every successful call returns the same `Arc`.  Fails with [`Error::Configuration`]
    /// when no API key is configured; a failed attempt is not remembered, so a later call
    /// looks at the environment again.
    pub fn get_or_create_session(&self) -> Result<Arc<ChatSession>> {
        if let Some(session) = self.session.get() {
            return Ok(Arc::clone(session));
        }

        let provider = self
            .resolve_api_key()
            .and_then(|api_key| (self.connect)(&self.config, api_key))
            .inspect_err(|err| {
                SESSION_CREATE_ERRORS.click();
                tracing::error!(error = %err, "cannot create chat session");
            })?;

        let session = self
            .session
            .get_or_init(|| {
                SESSIONS_CREATED.click();
                tracing::info!(
                    model = %self.config.model,
                    temperature = self.config.temperature,
                    "chat session created"
                );
                Arc::new(ChatSession::new(provider, &self.config))
            });
        Ok(Arc::clone(session))
    }

    /// Obtain the session and stream the reply to `user_text`.
    ///
    /// Only session creation can fail here; the returned stream itself is fail-soft.
    pub fn stream_reply(&self, user_text: &str) -> Result<ReplyStream> {
        Ok(self.get_or_create_session()?.stream_reply(user_text))
    }

    fn resolve_api_key(&self) -> Result<String> {
        let api_key = match &self.config.api_key {
            Some(key) => Some(key.clone()),
            None => env::var(&self.config.api_key_env).ok(),
        };
        api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration(format!(
                    "{} is missing from environment variables",
                    self.config.api_key_env
                ))
            })
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("model", &self.config.model)
            .field("session", &self.session.get())
            .finish_non_exhaustive()
    }
}
