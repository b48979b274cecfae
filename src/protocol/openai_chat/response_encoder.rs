use crate::protocol::Usage;

use super::{
    OpenAiChatChunk, OpenAiChatResponse, OpenAiChoice, OpenAiChunkChoice, OpenAiDelta,
    OpenAiModel, OpenAiModelList, OpenAiResponseMessage,
};

const CHAT_COMPLETION_OBJECT: &str = "chat.completion";
const CHAT_COMPLETION_CHUNK_OBJECT: &str = "chat.completion.chunk";
const SYSTEM_FINGERPRINT: &str = "fp_2f57f81c11";
const FINISH_REASON_STOP: &str = "stop";

/// Build a content-bearing stream chunk.
#[must_use]
pub fn encode_content_chunk(id: &str, model: &str, created: i64, content: String) -> OpenAiChatChunk {
    encode_chunk(
        id,
        model,
        created,
        OpenAiDelta {
            content: Some(content),
        },
        None,
    )
}

/// Build the terminal stream chunk: empty delta, `finish_reason: "stop"`.
#[must_use]
pub fn encode_stop_chunk(id: &str, model: &str, created: i64) -> OpenAiChatChunk {
    encode_chunk(
        id,
        model,
        created,
        OpenAiDelta::default(),
        Some(FINISH_REASON_STOP.to_string()),
    )
}

fn encode_chunk(
    id: &str,
    model: &str,
    created: i64,
    delta: OpenAiDelta,
    finish_reason: Option<String>,
) -> OpenAiChatChunk {
    OpenAiChatChunk {
        id: id.to_string(),
        object: CHAT_COMPLETION_CHUNK_OBJECT.to_string(),
        created,
        model: model.to_string(),
        choices: vec![OpenAiChunkChoice {
            index: 0,
            delta,
            finish_reason,
        }],
    }
}

/// Build the buffered-mode `chat.completion` response.
#[must_use]
pub fn encode_chat_response(
    id: String,
    model: &str,
    created: u64,
    content: String,
    usage: Option<Usage>,
) -> OpenAiChatResponse {
    OpenAiChatResponse {
        id,
        object: CHAT_COMPLETION_OBJECT.to_string(),
        created,
        model: model.to_string(),
        choices: vec![OpenAiChoice {
            index: 0,
            message: OpenAiResponseMessage {
                role: "assistant".to_string(),
                content,
            },
            finish_reason: FINISH_REASON_STOP.to_string(),
        }],
        usage,
        system_fingerprint: SYSTEM_FINGERPRINT.to_string(),
    }
}

/// Build the single-entry `/v1/models` listing.
#[must_use]
pub fn encode_model_list(model_name: &str) -> OpenAiModelList {
    OpenAiModelList {
        object: "list".to_string(),
        data: vec![OpenAiModel {
            id: model_name.to_string(),
            object: "model".to_string(),
            owned_by: "dify".to_string(),
            permission: None,
        }],
    }
}
