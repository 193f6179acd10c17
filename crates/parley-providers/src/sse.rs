// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw SSE re-parsing for OpenAI-compatible streaming responses.
//!
//! The chat-completions stream is `data:`-only SSE: records separated by a
//! blank line, a `[DONE]` sentinel at the end, each payload a JSON chunk
//! with the token at `choices[0].delta.content`. Malformed payloads are
//! skipped without aborting the stream; vendors ship keep-alive comments and
//! the occasional garbage line.

use futures::StreamExt;
use futures::stream;
use tracing::trace;

use parley_core::{DeltaStream, ParleyError};

const DONE_SENTINEL: &str = "[DONE]";

/// Incremental record splitter. Bytes go in, complete `data:` payloads come
/// out once their blank-line terminator has arrived.
#[derive(Default)]
struct RecordBuffer {
    buf: Vec<u8>,
}

impl RecordBuffer {
    /// Absorb one network chunk and return the deltas it completed.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut deltas = Vec::new();
        while let Some(end) = find_record_end(&self.buf) {
            let record: Vec<u8> = self.buf.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&record);
            for delta in parse_record(&text) {
                deltas.push(delta);
            }
        }
        deltas
    }
}

/// Byte offset of the first `\n\n` record terminator, ignoring `\r`.
fn find_record_end(buf: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && (buf[i + 1] == b'\n' || (buf[i + 1] == b'\r' && buf.get(i + 2) == Some(&b'\n'))) {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Extract token deltas from one complete SSE record.
fn parse_record(record: &str) -> Vec<String> {
    let mut deltas = Vec::new();
    for line in record.lines() {
        let Some(payload) = line.strip_prefix("data:") else {
            continue;
        };
        let payload = payload.trim();
        if payload.is_empty() || payload == DONE_SENTINEL {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(value) => {
                if let Some(content) = value
                    .pointer("/choices/0/delta/content")
                    .and_then(|v| v.as_str())
                {
                    if !content.is_empty() {
                        deltas.push(content.to_string());
                    }
                }
            }
            // Malformed chunk; drop it, keep the stream alive.
            Err(_) => trace!(payload = %payload, "skipping malformed SSE chunk"),
        }
    }
    deltas
}

/// Turn a streaming chat-completions response into a stream of token deltas.
///
/// Dropping the returned stream drops the underlying HTTP response, which
/// aborts the request and stops consuming upstream tokens.
pub fn parse_compat_stream(response: reqwest::Response) -> DeltaStream {
    let deltas = response
        .bytes_stream()
        .scan(RecordBuffer::default(), |state, chunk| {
            let out: Vec<Result<String, ParleyError>> = match chunk {
                Ok(bytes) => state.push(&bytes).into_iter().map(Ok).collect(),
                Err(e) => vec![Err(ParleyError::upstream(format!(
                    "stream read failed: {e}"
                )))],
            };
            futures::future::ready(Some(stream::iter(out)))
        })
        .flatten();
    Box::pin(deltas)
}
