//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! `streamGenerateContent?alt=sse` answers with one event per response chunk.  Each event
//! carries a `data:` line holding a JSON `GenerateContentResponse`, or an error object if the
//! request failed after the stream started.  Events are separated by a blank line; the API
//! uses `\r\n` line endings but plain `\n` is accepted too.

use std::error;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::types::{ErrorResponse, GenerateContentResponse};
use crate::{Error, Result};

/// Process a stream of bytes into a stream of response chunks.
///
/// Bytes are buffered until a complete event is available, so events (and UTF-8 sequences)
/// split across network reads decode correctly.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<GenerateContentResponse>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: error::Error + Send + Sync + 'static,
{
    let stream = Box::pin(byte_stream.map(|result| {
        result.map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    }));

    stream::unfold(
        (stream, Vec::<u8>::new(), false),
        move |(mut stream, mut buffer, mut exhausted)| async move {
            loop {
                // First check if we have a complete event in the buffer
                if let Some((end, rest)) = find_event_boundary(&buffer) {
                    let event: Vec<u8> = buffer.drain(..rest).take(end).collect();
                    match decode_event(&event) {
                        Some(item) => return Some((item, (stream, buffer, exhausted))),
                        None => continue,
                    }
                }

                if exhausted {
                    // A final event may arrive without its trailing blank line.
                    if buffer.iter().all(u8::is_ascii_whitespace) {
                        return None;
                    }
                    let event = std::mem::take(&mut buffer);
                    return decode_event(&event).map(|item| (item, (stream, buffer, exhausted)));
                }

                match stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => return Some((Err(e), (stream, buffer, exhausted))),
                    None => exhausted = true,
                }
            }
        },
    )
}

/// Find the end of the first event and the start of whatever follows it.
fn find_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buffer, b"\n\n").map(|at| (at, at + 2));
    let crlf = find(buffer, b"\r\n\r\n").map(|at| (at, at + 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Decode one event.  Returns `None` for events that carry no data (comments, keep-alives).
fn decode_event(event: &[u8]) -> Option<Result<GenerateContentResponse>> {
    let event = match std::str::from_utf8(event) {
        Ok(event) => event,
        Err(e) => return Some(Err(e.into())),
    };

    let mut data = Vec::new();
    for line in event.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }
    if data.is_empty() {
        return None;
    }
    let data = data.join("\n");
    if data.trim() == "[DONE]" {
        return None;
    }

    Some(parse_payload(&data))
}

fn parse_payload(data: &str) -> Result<GenerateContentResponse> {
    let value: serde_json::Value = serde_json::from_str(data).map_err(|e| {
        Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )
    })?;
    if value.get("error").is_some() {
        let response: ErrorResponse = serde_json::from_value(value)?;
        return Err(response.into_error(500, None));
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn chunk(text: &str) -> String {
        format!(
            "data: {{\"candidates\": [{{\"content\": {{\"parts\": [{{\"text\": \"{text}\"}}],\"role\": \"model\"}}}}]}}\r\n\r\n"
        )
    }

    fn bytes_stream(
        parts: Vec<Vec<u8>>,
    ) -> impl Stream<Item = std::result::Result<Bytes, io::Error>> + Send + 'static {
        stream::iter(parts.into_iter().map(|part| Ok(Bytes::from(part))))
    }

    async fn texts(parts: Vec<Vec<u8>>) -> Vec<Result<Option<String>>> {
        process_sse(bytes_stream(parts))
            .map(|item| item.map(|chunk| chunk.text()))
            .collect()
            .await
    }

    #[tokio::test]
    async fn parse_multiple_events() {
        let body = format!("{}{}", chunk("Hel"), chunk("lo"));
        let items = texts(vec![body.into_bytes()]).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().as_deref(), Some("Hel"));
        assert_eq!(items[1].as_ref().unwrap().as_deref(), Some("lo"));
    }

    #[tokio::test]
    async fn handle_split_event() {
        let body = chunk("split").into_bytes();
        let (a, b) = body.split_at(17);
        let items = texts(vec![a.to_vec(), b.to_vec()]).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().as_deref(), Some("split"));
    }

    #[tokio::test]
    async fn handle_split_utf8_sequence() {
        let body = chunk("café").into_bytes();
        let at = body.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let (a, b) = body.split_at(at);
        let items = texts(vec![a.to_vec(), b.to_vec()]).await;
        assert_eq!(items[0].as_ref().unwrap().as_deref(), Some("café"));
    }

    #[tokio::test]
    async fn accepts_lf_delimiters_and_trailing_event() {
        let body = "data: {\"candidates\": []}\n\ndata: {\"candidates\": []}";
        let items = texts(vec![body.as_bytes().to_vec()]).await;
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| matches!(item, Ok(None))));
    }

    #[tokio::test]
    async fn skips_comments_and_blank_events() {
        let body = format!(": keep-alive\r\n\r\n{}", chunk("x"));
        let items = texts(vec![body.into_bytes()]).await;
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn error_event_becomes_error() {
        let body = "data: {\"error\": {\"code\": 503, \"message\": \"The model is overloaded.\", \"status\": \"UNAVAILABLE\"}}\r\n\r\n";
        let items = texts(vec![body.as_bytes().to_vec()]).await;
        assert_eq!(items.len(), 1);
        let err = items.into_iter().next().unwrap().unwrap_err();
        assert!(err.is_server_error());
    }

    #[tokio::test]
    async fn malformed_json_is_an_error() {
        let items = texts(vec![b"data: {not json\n\n".to_vec()]).await;
        assert!(matches!(items[0], Err(Error::Serialization { .. })));
    }

    #[tokio::test]
    async fn transport_error_is_forwarded() {
        let parts: Vec<std::result::Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from(chunk("ok"))),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let items: Vec<_> = process_sse(stream::iter(parts)).collect().await;
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(Error::Streaming { .. })));
    }
}
