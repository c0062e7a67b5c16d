//! This module folds a server-sent event stream into a single text result. It expects
//! a byte stream, as produced by [`reqwest::Response::bytes_stream`], and consumes it
//! line by line.
//!
//! Only lines starting with the literal prefix `data: ` are considered. The payload
//! is either the sentinel `[DONE]`, which ends aggregation, or a JSON object whose
//! `content` field is appended to the result. Payloads which are not JSON objects
//! are skipped rather than treated as fatal. Other SSE fields (`event:`, `id:`,
//! comments) are ignored.
//!
//! Chunk boundaries are not line boundaries. Bytes after the last newline of a
//! chunk are carried forward and completed by the next chunk, so a `data:` line
//! split across two reads is reassembled before it is decoded. A trailing line
//! without a newline is processed at end-of-stream.

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::Deserialize;
use std::marker::Unpin;
use thiserror::Error;
use tracing::debug;

use super::TransportError;

const DATA_PREFIX: &[u8] = b"data: ";
const DONE_SENTINEL: &[u8] = b"[DONE]";

trait RemoveFirstN {
    fn remove_first(&mut self, n: usize);
}

impl<T: std::marker::Copy> RemoveFirstN for Vec<T> {
    fn remove_first(&mut self, n: usize) {
        self.copy_within(n.., 0);
        self.truncate(self.len() - n);
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// A single line outgrew the buffer, which could indicate a malicious server
    #[error("a streamed line exceeded {0} bytes")]
    ResponseExceededBuffer(usize),
    #[error("the source stream failed: {0}")]
    StreamFailed(#[source] TransportError),
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug)]
pub struct EventStreamAggregator {
    buf: Vec<u8>,
    max_line: usize,
    text: String,
    done: bool,
}

impl Default for EventStreamAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStreamAggregator {
    pub fn new() -> EventStreamAggregator {
        Self::with_max_line(1 << 24) // 16 MiB
    }

    pub fn with_max_line(max_line: usize) -> EventStreamAggregator {
        EventStreamAggregator {
            buf: Vec::with_capacity(1 << 10),
            max_line,
            text: String::new(),
            done: false,
        }
    }

    /// True once the `[DONE]` sentinel was seen. Further input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Feed one chunk of the body, processing every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), Error> {
        if self.done {
            return Ok(());
        }

        let mut scanned = self.buf.len();

        self.buf.extend_from_slice(chunk);

        while let Some(offset) = self.buf[scanned..].iter().position(|b| *b == b'\n') {
            let i = scanned + offset;

            let done = Self::accumulate(&mut self.text, Self::striped_line(&self.buf[..i]));

            self.buf.remove_first(i + 1);
            scanned = 0;

            if done {
                self.done = true;
                self.buf.clear();
                return Ok(());
            }
        }

        if self.buf.len() > self.max_line {
            return Err(Error::ResponseExceededBuffer(self.max_line));
        }

        Ok(())
    }

    /// End of stream: process an unterminated final line and return the result.
    pub fn finish(mut self) -> String {
        if !self.done && !self.buf.is_empty() {
            let line = std::mem::take(&mut self.buf);

            Self::accumulate(&mut self.text, Self::striped_line(&line));
        }

        self.text
    }

    // Line without the trailing \r
    fn striped_line(line: &[u8]) -> &[u8] {
        line.strip_suffix(b"\r").unwrap_or(line)
    }

    // Returns true when the line is the terminal sentinel
    fn accumulate(text: &mut String, line: &[u8]) -> bool {
        let payload = match line.strip_prefix(DATA_PREFIX) {
            Some(payload) => payload,
            None => return false,
        };

        if payload == DONE_SENTINEL {
            return true;
        }

        match serde_json::from_slice::<StreamEvent>(payload) {
            Ok(StreamEvent {
                content: Some(content),
            }) => text.push_str(&content),
            Ok(_) => {}
            Err(err) => debug!(%err, "skipping undecodable event stream line"),
        }

        false
    }
}

/// Drive `stream` to completion (or to `[DONE]`) and return the accumulated text.
pub async fn aggregate<S>(mut stream: S) -> Result<String, Error>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Unpin,
{
    let mut aggregator = EventStreamAggregator::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Error::StreamFailed)?;

        aggregator.push(&chunk)?;

        if aggregator.is_done() {
            break;
        }
    }

    Ok(aggregator.finish())
}
