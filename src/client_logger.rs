//! Logging trait for Gemini client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log all API interactions passing through the [`Gemini`](crate::Gemini) client.

use crate::types::{GenerateContentRequest, GenerateContentResponse, Model};

/// A trait for logging Gemini client operations.
///
/// Implement this trait to capture every request sent and every decoded chunk received.
///
/// # Example
///
/// ```rust,ignore
/// use portfolio_assistant::{ClientLogger, GenerateContentRequest, GenerateContentResponse, Model};
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, model: &Model, request: &GenerateContentRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "{model}: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_stream_chunk(&self, chunk: &GenerateContentResponse) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "chunk: {}", serde_json::to_string(chunk).unwrap()).unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request just before it is sent.
    fn log_request(&self, model: &Model, request: &GenerateContentRequest);

    /// Log an individual decoded streaming chunk.
    ///
    /// Called once per chunk, in arrival order, including chunks that carry no text.
    fn log_stream_chunk(&self, chunk: &GenerateContentResponse);
}
