//! Incremental `text/event-stream` decoding for streamed completions.

use std::{collections::VecDeque, fmt::Display, pin::Pin};

use futures::{
    stream::{self, LocalBoxStream},
    Stream, StreamExt,
};
use platform_host::GenerationError;

const DATA_FIELD: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded server-sent event relevant to completion streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload of a `data:` line.
    Data(String),
    /// The `data: [DONE]` terminator.
    Done,
}

/// Line-buffered decoder that tolerates events split across network chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Appends `chunk` and returns every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.drain(..=newline).collect::<Vec<_>>();
            if let Some(event) = decode_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes a trailing line left without a newline terminator.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&rest))
            .into_iter()
            .collect()
    }
}

fn decode_line(line: &str) -> Option<SseEvent> {
    let line = line.trim();
    let payload = line.strip_prefix(DATA_FIELD)?.trim_start();
    if payload == DONE_SENTINEL {
        Some(SseEvent::Done)
    } else if payload.is_empty() {
        None
    } else {
        Some(SseEvent::Data(payload.to_string()))
    }
}

struct FragmentState<'a, F> {
    bytes: Pin<Box<dyn Stream<Item = Result<Vec<u8>, String>> + 'a>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
    extract: F,
}

impl<F> FragmentState<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn enqueue(&mut self, events: Vec<SseEvent>) {
        for event in events {
            match event {
                SseEvent::Data(payload) => {
                    if let Some(text) = (self.extract)(&payload).filter(|text| !text.is_empty()) {
                        self.pending.push_back(text);
                    }
                }
                SseEvent::Done => {
                    self.finished = true;
                    return;
                }
            }
        }
    }
}

/// Turns a raw byte stream into text fragments.
///
/// Each `data:` payload is passed to `extract`; `None` or empty results are skipped. The stream
/// ends at `[DONE]` or when the body ends, and a transport error becomes a terminal
/// [`GenerationError::Generation`] item.
pub fn sse_fragments<'a, S, B, E, F>(
    bytes: S,
    extract: F,
) -> LocalBoxStream<'a, Result<String, GenerationError>>
where
    S: Stream<Item = Result<B, E>> + 'a,
    B: AsRef<[u8]> + 'a,
    E: Display + 'a,
    F: Fn(&str) -> Option<String> + 'a,
{
    let bytes = bytes.map(|chunk| {
        chunk
            .map(|chunk| chunk.as_ref().to_vec())
            .map_err(|err| err.to_string())
    });
    let state = FragmentState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
        extract,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(&chunk);
                    state.enqueue(events);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    state.pending.clear();
                    return Some((Err(GenerationError::Generation(err)), state));
                }
                None => {
                    let events = state.decoder.finish();
                    state.enqueue(events);
                    state.finished = true;
                }
            }
        }
    })
    .boxed_local()
}
