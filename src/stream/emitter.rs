//! Streaming emitter: translation steps to `chat.completion.chunk` frames.
use std::collections::VecDeque;

use bytes::Bytes;
use futures_util::Stream;
use serde::Serialize;

use super::sse::{done_frame, json_sse_frame};
use super::translation::{Step, Translation};
use crate::error::GatewayError;
use crate::protocol::dify::DifyEvent;
use crate::protocol::openai_chat::response_encoder::{encode_content_chunk, encode_stop_chunk};
use crate::util::unix_now_secs;

/// Reported in-band when the upstream closes before a terminal event.
pub const UNEXPECTED_END_MESSAGE: &str = "Unexpected stream end";
/// Reported in-band when reading the upstream body fails.
pub const INTERRUPTED_MESSAGE: &str = "Upstream stream interrupted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Content,
    Stop,
    Error,
    Done,
}

/// One SSE frame ready to be written to the client.
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    pub bytes: Bytes,
}

/// Turns translation steps into client frames and tracks closure.
///
/// Once a terminal frame pair (stop or error, then `[DONE]`) has been
/// produced the emitter is closed and produces nothing further.
#[derive(Debug)]
pub struct ChunkEmitter {
    id: String,
    model: String,
    closed: bool,
}

#[derive(Serialize)]
struct ErrorFrame<'a> {
    error: &'a str,
}

impl ChunkEmitter {
    #[must_use]
    pub fn new(id: String, model: String) -> Self {
        Self {
            id,
            model,
            closed: false,
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Emit the frames for one step. `created` is the upstream timestamp of
    /// the event that produced it.
    pub fn emit(&mut self, step: Step, created: i64, out: &mut VecDeque<Frame>) {
        if self.closed {
            return;
        }
        match step {
            Step::Content(text) => {
                let chunk = encode_content_chunk(&self.id, &self.model, created, text);
                self.push_json(FrameKind::Content, &chunk, out);
            }
            Step::Finished => {
                let chunk = encode_stop_chunk(&self.id, &self.model, created);
                self.push_json(FrameKind::Stop, &chunk, out);
                self.close(out);
            }
            Step::Failed { message } => self.abort(&message, out),
            Step::Accumulated | Step::Ignored => {}
        }
    }

    /// Emit an error frame followed by `[DONE]` and close.
    pub fn abort(&mut self, message: &str, out: &mut VecDeque<Frame>) {
        if self.closed {
            return;
        }
        self.push_json(FrameKind::Error, &ErrorFrame { error: message }, out);
        self.close(out);
    }

    fn close(&mut self, out: &mut VecDeque<Frame>) {
        out.push_back(Frame {
            kind: FrameKind::Done,
            bytes: done_frame(),
        });
        self.closed = true;
    }

    fn push_json<T: Serialize>(&self, kind: FrameKind, value: &T, out: &mut VecDeque<Frame>) {
        match json_sse_frame(value) {
            Ok(bytes) => out.push_back(Frame { kind, bytes }),
            Err(err) => tracing::error!("failed to encode {kind:?} frame: {err}"),
        }
    }
}

/// Runs the close callback exactly once: when the emitter closes, or when the
/// frame stream is dropped first (client disconnect).
struct CloseGuard<F>
where
    F: FnOnce(&Translation),
{
    translation: Translation,
    on_close: Option<F>,
}

impl<F> CloseGuard<F>
where
    F: FnOnce(&Translation),
{
    fn fire(&mut self) {
        if let Some(on_close) = self.on_close.take() {
            on_close(&self.translation);
        }
    }
}

impl<F> Drop for CloseGuard<F>
where
    F: FnOnce(&Translation),
{
    fn drop(&mut self) {
        if self.on_close.is_some() {
            tracing::info!("client disconnected before the stream completed");
            self.fire();
        }
    }
}

/// Drive classified events through a streaming-mode [`Translation`] and
/// produce client frames.
///
/// The stream ends right after the `[DONE]` frame; the upstream event stream
/// is dropped at that point. `on_close` runs once with the final state, either
/// when the emitter closes or when the frame stream is dropped early.
pub fn translate_stream<S, F>(
    events: S,
    translation: Translation,
    emitter: ChunkEmitter,
    on_close: F,
) -> impl Stream<Item = Frame> + Send
where
    S: Stream<Item = Result<DifyEvent, GatewayError>> + Send + 'static,
    F: FnOnce(&Translation) + Send + 'static,
{
    use futures_util::StreamExt;

    futures_util::stream::unfold(
        (
            Box::pin(events),
            CloseGuard {
                translation,
                on_close: Some(on_close),
            },
            emitter,
            VecDeque::<Frame>::with_capacity(4),
        ),
        |(mut events, mut guard, mut emitter, mut pending)| async move {
            loop {
                if let Some(frame) = pending.pop_front() {
                    return Some((frame, (events, guard, emitter, pending)));
                }
                if emitter.is_closed() {
                    guard.fire();
                    return None;
                }

                match events.as_mut().next().await {
                    Some(Ok(event)) => {
                        let created = event
                            .created_at()
                            .unwrap_or_else(|| i64::try_from(unix_now_secs()).unwrap_or(i64::MAX));
                        let step = guard.translation.apply(event);
                        emitter.emit(step, created, &mut pending);
                    }
                    Some(Err(err)) => {
                        tracing::warn!("streaming response aborted: {err}");
                        emitter.abort(INTERRUPTED_MESSAGE, &mut pending);
                    }
                    None => {
                        tracing::warn!("upstream stream ended without a terminal event");
                        emitter.abort(UNEXPECTED_END_MESSAGE, &mut pending);
                    }
                }
            }
        },
    )
}
