// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod persona;
pub mod provider;
pub mod render;
pub mod sse;
pub mod types;

// Re-exports
pub use chat::{
    AssistantConfig, ChatSession, ChatView, ConversationMessage, ReplyFragment, SessionManager,
};
pub use client::Gemini;
pub use client_logger::ClientLogger;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use provider::{ChunkStream, Provider};
pub use render::{PlainTextRenderer, Renderer};
pub use types::*;
