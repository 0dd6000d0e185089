//! Server-Sent-Events decoding for `streamGenerateContent?alt=sse`.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use super::{GenerateContentResponse, GeminiError, LlmError, TextStream};

/// Splits a byte stream into SSE `data:` payloads. Lines may be cut anywhere
/// across network chunks, including inside a multi-byte character.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feeds a chunk and returns every complete `data:` payload it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flushes a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload.is_empty() || payload == "[DONE]" {
        None
    } else {
        Some(payload.to_string())
    }
}

/// Decodes one event payload. `Ok(None)` for events that carry no text.
fn parse_event(payload: &str) -> Result<Option<String>, LlmError> {
    if let Ok(err) = serde_json::from_str::<GeminiError>(payload) {
        return Err(err.error.into());
    }
    let response: GenerateContentResponse = serde_json::from_str(payload)?;
    Ok(response.text().filter(|t| !t.is_empty()))
}

struct DecodeState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, LlmError>>,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn queue(&mut self, payload: &str) {
        match parse_event(payload) {
            Ok(Some(text)) => self.pending.push_back(Ok(text)),
            Ok(None) => {}
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, err: LlmError) {
        self.pending.push_back(Err(err));
        self.finished = true;
    }
}

/// Turns the raw response body into a stream of text fragments.
/// The stream ends after the first error.
pub fn text_fragments<S>(bytes: S) -> TextStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    let state = DecodeState {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    state.pending.clear();
                }
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for payload in state.decoder.push(&chunk) {
                        if state.finished {
                            break;
                        }
                        state.queue(&payload);
                    }
                }
                Some(Err(e)) => state.fail(LlmError::Stream(e.to_string())),
                None => {
                    if let Some(payload) = state.decoder.finish() {
                        state.queue(&payload);
                    }
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}
