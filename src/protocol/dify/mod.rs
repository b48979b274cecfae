//! Dify application API: the upstream side of the gateway.
//!
//! Dify streams `data: {json}` lines whose `event` field names the event
//! kind. [`decoder::classify_line`] turns one such line into a [`DifyEvent`];
//! [`encoder::encode_dify_request`] builds the body sent to the app.

pub mod decoder;
pub mod encoder;

use serde::Serialize;

use super::{JsonMap, Usage};

/// Request body for `/chat-messages`, `/completion-messages` and `/workflows/run`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifyRequest {
    pub inputs: JsonMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub response_mode: &'static str,
    pub conversation_id: String,
    pub user: String,
    pub auto_generate_name: bool,
}

/// One classified upstream event.
#[derive(Debug, Clone, PartialEq)]
pub enum DifyEvent {
    Message {
        answer: String,
        created_at: Option<i64>,
    },
    AgentMessage {
        answer: String,
        created_at: Option<i64>,
    },
    TextChunk {
        text: String,
        created_at: Option<i64>,
    },
    WorkflowFinished {
        outputs: JsonMap,
        usage: Option<Usage>,
        created_at: Option<i64>,
    },
    MessageEnd {
        usage: Option<Usage>,
        created_at: Option<i64>,
    },
    Error {
        code: Option<String>,
        message: String,
        status: Option<u16>,
    },
    Unknown {
        event: String,
    },
}

impl DifyEvent {
    /// Upstream timestamp of the event, when Dify sent one.
    #[must_use]
    pub fn created_at(&self) -> Option<i64> {
        match self {
            DifyEvent::Message { created_at, .. }
            | DifyEvent::AgentMessage { created_at, .. }
            | DifyEvent::TextChunk { created_at, .. }
            | DifyEvent::WorkflowFinished { created_at, .. }
            | DifyEvent::MessageEnd { created_at, .. } => *created_at,
            DifyEvent::Error { .. } | DifyEvent::Unknown { .. } => None,
        }
    }

    /// Wire name of the event kind, for logging.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            DifyEvent::Message { .. } => "message",
            DifyEvent::AgentMessage { .. } => "agent_message",
            DifyEvent::TextChunk { .. } => "text_chunk",
            DifyEvent::WorkflowFinished { .. } => "workflow_finished",
            DifyEvent::MessageEnd { .. } => "message_end",
            DifyEvent::Error { .. } => "error",
            DifyEvent::Unknown { event } => event,
        }
    }
}
