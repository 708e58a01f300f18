use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_BYTES, STREAM_CHUNKS, STREAM_ERRORS,
};
use crate::provider::{ChunkStream, Provider};
use crate::sse::process_sse;
use crate::types::{ErrorResponse, GenerateContentRequest, Model};

/// Base URL of the Generative Language API.
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Gemini API.
///
/// Only a connect timeout is configured: a streamed reply may legitimately take longer than
/// any fixed request timeout.
#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    client: ReqwestClient,
    base_url: Url,
    connect_timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl Gemini {
    /// Create a new Gemini client for the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `base_url` must point at the API version root, e.g. `https://host/v1beta/`; a missing
    /// trailing slash is added.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: Option<&str>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::configuration("API key is empty"));
        }
        HeaderValue::from_str(&api_key)
            .map_err(|_| Error::configuration("API key contains characters not allowed in a header"))?;

        let base_url = base_url.unwrap_or(DEFAULT_API_URL);
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };

        let connect_timeout = connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            connect_timeout,
            logger: None,
        })
    }

    /// Attach a logger that sees every request and decoded chunk.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The API root this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The URL of the streaming endpoint for `model`.
    pub fn stream_url(&self, model: &Model) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("models/{model}:streamGenerateContent"))?;
        url.set_query(Some("alt=sse"));
        Ok(url)
    }

    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::configuration("API key contains characters not allowed in a header"))?;
        headers.insert("x-goog-api-key", key);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        match serde_json::from_str::<ErrorResponse>(&error_body) {
            Ok(parsed) => parsed.into_error(status_code, retry_after),
            Err(_) => Error::from_status(status_code, None, error_body, retry_after),
        }
    }

    /// Send a request and stream the response chunks.
    ///
    /// Errors before the first byte (connection, HTTP status) are returned directly; errors
    /// after that arrive as items of the stream.
    pub async fn stream(&self, model: &Model, request: GenerateContentRequest) -> Result<ChunkStream> {
        let url = self.stream_url(model)?;
        if let Some(logger) = &self.logger {
            logger.log_request(model, &request);
        }
        tracing::debug!(%model, turns = request.contents.len(), "starting streamGenerateContent");
        CLIENT_REQUESTS.click();

        let response = self
            .client
            .post(url)
            .headers(self.default_headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(self.connect_timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let bytes = response.bytes_stream().inspect(|chunk| {
            if let Ok(bytes) = chunk {
                STREAM_BYTES.count(bytes.len() as u64);
            }
        });

        let logger = self.logger.clone();
        let chunks = process_sse(bytes).inspect(move |chunk| match chunk {
            Ok(chunk) => {
                STREAM_CHUNKS.click();
                if let Some(logger) = &logger {
                    logger.log_stream_chunk(chunk);
                }
            }
            Err(err) => {
                STREAM_ERRORS.click();
                tracing::warn!(error = %err, "error in response stream");
            }
        });

        Ok(Box::pin(chunks))
    }
}

impl fmt::Debug for Gemini {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gemini")
            .field("base_url", &self.base_url.as_str())
            .field("connect_timeout", &self.connect_timeout)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Provider for Gemini {
    async fn stream_generate_content(
        &self,
        model: &Model,
        request: GenerateContentRequest,
    ) -> Result<ChunkStream> {
        self.stream(model, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    #[test]
    fn client_creation() {
        let client = Gemini::new("test-key").unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.base_url.as_str(), DEFAULT_API_URL);
        assert_eq!(client.connect_timeout, DEFAULT_CONNECT_TIMEOUT);

        let client = Gemini::with_options(
            "test-key",
            Some("https://proxy.example.com/v1beta"),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.base_url.as_str(), "https://proxy.example.com/v1beta/");
        assert_eq!(client.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn empty_or_invalid_key_is_configuration_error() {
        assert!(Gemini::new("  ").unwrap_err().is_configuration());
        assert!(Gemini::new("bad\nkey").unwrap_err().is_configuration());
    }

    #[test]
    fn bad_base_url() {
        let err = Gemini::with_options("k", Some("not a url"), None).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn stream_url_for_model() {
        let client = Gemini::new("test-key").unwrap();
        let url = client
            .stream_url(&Model::Known(KnownModel::Gemini25Flash))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn debug_hides_key() {
        let client = Gemini::new("super-secret").unwrap();
        assert!(!format!("{client:?}").contains("super-secret"));
    }
}
