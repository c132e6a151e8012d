//! Server-sent-events parser for chat-completion streams.
//!
//! Buffers raw bytes, splits on blank-line event boundaries, and yields the
//! delta content of each chunk. A transport failure or a close before the
//! terminal `[DONE]` marker surfaces as a stream error; the invoker treats
//! mid-stream failures as final for the invocation.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use super::error::classify_transport;
use crate::domain::ports::{OracleError, TokenStream};

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    content: Option<String>,
}

struct ParserState {
    buffer: String,
    done: bool,
}

/// Adapts a raw byte stream of SSE events into a token stream.
pub fn sse_token_stream<S>(source: S) -> TokenStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    // The trailing None marks end-of-transport so a close without [DONE]
    // can be distinguished from normal completion.
    let terminated = source.map(Some).chain(futures::stream::iter([None]));

    let stream = terminated
        .scan(ParserState { buffer: String::new(), done: false }, |state, item| {
            let out: Vec<Result<String, OracleError>> = if state.done {
                Vec::new()
            } else {
                match item {
                    Some(Ok(bytes)) => {
                        state.buffer.push_str(&String::from_utf8_lossy(&bytes));
                        drain_events(state)
                    }
                    Some(Err(err)) => {
                        state.done = true;
                        vec![Err(classify_transport(&err))]
                    }
                    None => {
                        state.done = true;
                        vec![Err(OracleError::Transient(
                            "premature close: stream ended before [DONE]".to_string(),
                        ))]
                    }
                }
            };
            futures::future::ready(Some(out))
        })
        .flat_map(futures::stream::iter);

    Box::pin(stream)
}

fn drain_events(state: &mut ParserState) -> Vec<Result<String, OracleError>> {
    let mut out = Vec::new();
    while let Some(pos) = state.buffer.find("\n\n") {
        let event = state.buffer[..pos].to_string();
        state.buffer.drain(..pos + 2);

        for line in event.lines() {
            let Some(data) = line.strip_prefix("data:") else { continue };
            let data = data.trim();
            if data == "[DONE]" {
                state.done = true;
                return out;
            }
            match serde_json::from_str::<ChatChunk>(data) {
                Ok(chunk) => {
                    let content =
                        chunk.choices.into_iter().next().and_then(|c| c.delta.content);
                    if let Some(content) = content {
                        if !content.is_empty() {
                            out.push(Ok(content));
                        }
                    }
                }
                Err(err) => debug!(%err, "skipping unparseable SSE data line"),
            }
        }
    }
    out
}
