//! Per-request translation state machine.
//!
//! A [`Translation`] is advanced once per classified upstream event, in
//! arrival order. It starts `Active` and moves at most once into `Ended` or
//! `Errored`; both are terminal and every later event is ignored.
use serde_json::Value;

use crate::protocol::dify::DifyEvent;
use crate::protocol::{JsonMap, Usage};

/// How the client asked to receive the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Forward every content delta as it arrives.
    Streaming,
    /// Accumulate content and answer once.
    Buffered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    Ended,
    Errored,
}

/// Failure reported by an upstream `error` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    pub code: Option<String>,
    pub message: String,
    pub status: Option<u16>,
}

/// Outcome of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Streaming mode: a delta to forward now.
    Content(String),
    /// Buffered mode: content was appended to the accumulated text.
    Accumulated,
    /// The request reached `Ended`.
    Finished,
    /// The request reached `Errored`.
    Failed { message: String },
    /// No state change.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Translation {
    mode: ResponseMode,
    output_variable: Option<String>,
    is_first_content_chunk: bool,
    accumulated_text: String,
    usage: Option<Usage>,
    phase: Phase,
    failure: Option<UpstreamFailure>,
}

impl Translation {
    #[must_use]
    pub fn new(mode: ResponseMode, output_variable: Option<&str>) -> Self {
        Self {
            mode,
            output_variable: output_variable.map(ToString::to_string),
            is_first_content_chunk: true,
            accumulated_text: String::new(),
            usage: None,
            phase: Phase::Active,
            failure: None,
        }
    }

    /// Advance the state machine by one event.
    pub fn apply(&mut self, event: DifyEvent) -> Step {
        if self.phase != Phase::Active {
            tracing::trace!("ignoring '{}' after terminal event", event.kind());
            return Step::Ignored;
        }

        match event {
            DifyEvent::Message { answer, .. } | DifyEvent::AgentMessage { answer, .. } => {
                self.take_content(answer)
            }
            DifyEvent::TextChunk { text, .. } => self.take_content(text),
            DifyEvent::MessageEnd { usage, .. } => {
                self.usage = usage;
                self.phase = Phase::Ended;
                Step::Finished
            }
            DifyEvent::WorkflowFinished { outputs, usage, .. } => {
                self.accumulated_text = self.workflow_answer(outputs);
                self.usage = Some(usage.unwrap_or_else(Usage::workflow_default));
                self.phase = Phase::Ended;
                Step::Finished
            }
            DifyEvent::Error {
                code,
                message,
                status,
            } => {
                tracing::error!(
                    code = code.as_deref().unwrap_or(""),
                    status = status.unwrap_or(0),
                    "upstream reported error: {message}"
                );
                self.phase = Phase::Errored;
                self.failure = Some(UpstreamFailure {
                    code,
                    message: message.clone(),
                    status,
                });
                Step::Failed { message }
            }
            DifyEvent::Unknown { event } => {
                tracing::trace!("ignoring upstream event '{event}'");
                Step::Ignored
            }
        }
    }

    fn take_content(&mut self, mut text: String) -> Step {
        if self.is_first_content_chunk {
            self.is_first_content_chunk = false;
            let leading = text.len() - text.trim_start().len();
            text.drain(..leading);
        }
        match self.mode {
            ResponseMode::Streaming => Step::Content(text),
            ResponseMode::Buffered => {
                self.accumulated_text.push_str(&text);
                Step::Accumulated
            }
        }
    }

    fn workflow_answer(&self, mut outputs: JsonMap) -> String {
        let Some(name) = self.output_variable.as_deref() else {
            return Value::Object(outputs).to_string();
        };
        match outputs.remove(name) {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => {
                tracing::warn!("workflow outputs have no '{name}' variable");
                String::new()
            }
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.phase != Phase::Active
    }

    #[must_use]
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    #[must_use]
    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    #[must_use]
    pub fn failure(&self) -> Option<&UpstreamFailure> {
        self.failure.as_ref()
    }

    /// Consume the state, returning the accumulated text and captured usage.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<Usage>) {
        (self.accumulated_text, self.usage)
    }
}
