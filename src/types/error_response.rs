use serde::{Deserialize, Serialize};

use crate::Error;

/// Error payload returned by the API, either as an HTTP error body or mid-stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// The error details.
    pub error: ErrorDetail,
}

/// Details of an API error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// HTTP-equivalent status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,

    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Canonical status string, e.g. `RESOURCE_EXHAUSTED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ErrorResponse {
    /// Convert into an [`Error`], falling back to `status_code` when the body has no code.
    pub fn into_error(self, status_code: u16, retry_after: Option<u64>) -> Error {
        let code = self.error.code.unwrap_or(status_code);
        let message = self
            .error
            .message
            .unwrap_or_else(|| "no error message provided".to_string());
        Error::from_status(code, self.error.status, message, retry_after)
    }
}
