//! ndjson line streaming helpers.
//!
//! The API streams discrete events as newline-delimited JSON over a single
//! chunked response body. This module splits the byte stream into trimmed,
//! non-empty lines, produced lazily as chunks arrive, and decodes lines into
//! [`ConversationEvent`]s for the conversation endpoints.
//!
//! A [`CancelHandle`] is observed while waiting for the next chunk and again
//! before every yielded line, so a consumer can abort promptly without
//! waiting for a natural end-of-stream.

use std::pin::Pin;

use bytes::BytesMut;
use futures_util::{Stream, StreamExt};

use crate::cancel::CancelHandle;
use crate::error::AmigoError;
use crate::types::ConversationEvent;

/// Lazy sequence of trimmed, non-empty response lines.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, AmigoError>> + Send>>;

/// Lazy sequence of decoded conversation events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ConversationEvent, AmigoError>> + Send>>;

/// Split a confirmed-2xx response body into ndjson lines.
pub fn stream_ndjson_lines(response: reqwest::Response, cancel: Option<CancelHandle>) -> LineStream {
    let bytes = response.bytes_stream().map(|chunk| chunk.map_err(AmigoError::from));
    split_lines(bytes, cancel)
}

/// Split any byte stream into trimmed, non-empty lines.
///
/// A trailing line without a final newline is flushed at end-of-stream. A
/// transport error terminates the stream after yielding the error.
pub fn split_lines<S, B>(byte_stream: S, cancel: Option<CancelHandle>) -> LineStream
where
    S: Stream<Item = Result<B, AmigoError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let out = async_stream::stream! {
        let mut body = Box::pin(byte_stream);
        let mut buffer = BytesMut::new();

        'read: loop {
            let chunk = match &cancel {
                Some(cancel) => tokio::select! {
                    _ = cancel.cancelled() => break 'read,
                    chunk = body.next() => chunk,
                },
                None => body.next().await,
            };
            let Some(chunk) = chunk else { break };
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            buffer.extend_from_slice(chunk.as_ref());
            while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                let raw = buffer.split_to(newline + 1);
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if cancel.as_ref().is_some_and(CancelHandle::is_cancelled) {
                    break 'read;
                }
                yield Ok(line);
            }
        }

        if cancel.as_ref().is_some_and(CancelHandle::is_cancelled) {
            return;
        }
        let tail = String::from_utf8_lossy(&buffer).trim().to_string();
        if !tail.is_empty() {
            yield Ok(tail);
        }
    };
    Box::pin(out)
}

/// Decode each line of a [`LineStream`] into a [`ConversationEvent`].
pub fn decode_events(lines: LineStream) -> EventStream {
    Box::pin(lines.map(|item| item.and_then(|line| ConversationEvent::from_json_line(&line))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_stream(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = Result<&'static [u8], AmigoError>> + Send {
        futures_util::stream::iter(chunks.into_iter().map(Ok))
    }

    async fn collect(stream: LineStream) -> Vec<String> {
        stream
            .map(|item| item.expect("line"))
            .collect::<Vec<_>>()
            .await
    }

    #[tokio::test]
    async fn trims_lines_and_drops_empties() {
        let chunks: Vec<&[u8]> = vec![b" line1 \n\nline2\n \n"];
        let lines = collect(split_lines(byte_stream(chunks), None)).await;
        assert_eq!(lines, vec!["line1", "line2"]);
    }

    #[tokio::test]
    async fn reassembles_lines_across_chunk_boundaries() {
        let chunks: Vec<&[u8]> = vec![b"{\"a\":", b"1}\n{\"b\"", b":2}\n"];
        let lines = collect(split_lines(byte_stream(chunks), None)).await;
        assert_eq!(lines, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[tokio::test]
    async fn flushes_unterminated_tail_at_end_of_stream() {
        let chunks: Vec<&[u8]> = vec![b"first\nlast-without-newline"];
        let lines = collect(split_lines(byte_stream(chunks), None)).await;
        assert_eq!(lines, vec!["first", "last-without-newline"]);
    }

    #[tokio::test]
    async fn cancellation_stops_the_stream_before_the_next_line() {
        let cancel = CancelHandle::new();
        cancel.cancel();
        let chunks: Vec<&[u8]> = vec![b"line1\nline2\n"];
        let lines: Vec<_> = split_lines(byte_stream(chunks), Some(cancel))
            .collect::<Vec<_>>()
            .await;
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn transport_error_terminates_after_yielding() {
        let chunks: Vec<Result<&[u8], AmigoError>> = vec![
            Ok(b"ok\n".as_slice()),
            Err(AmigoError::Network("reset".into())),
        ];
        let mut stream = split_lines(futures_util::stream::iter(chunks), None);
        assert_eq!(stream.next().await.unwrap().unwrap(), "ok");
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(AmigoError::Network(_))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn decode_events_maps_lines_to_typed_events() {
        let chunks: Vec<&[u8]> =
            vec![b"{\"type\":\"new-message\",\"message\":\"hi\"}\n"];
        let mut events = decode_events(split_lines(byte_stream(chunks), None));
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(
            event,
            ConversationEvent::NewMessage {
                message: "hi".to_string()
            }
        );
    }
}
