pub mod response_encoder;

use serde::{Deserialize, Serialize};

use super::Usage;

/// `OpenAI` Chat Completion request wire type.
///
/// Only the fields the gateway acts on are typed; sampling parameters and
/// tools are accepted and ignored since Dify apps carry their own settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiChatRequest {
    #[serde(default)]
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiMessage {
    pub role: String,
    #[serde(default)]
    pub content: OpenAiContent,
}

/// Message content: a plain string or an array of typed parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
    Null(()),
}

impl Default for OpenAiContent {
    fn default() -> Self {
        OpenAiContent::Text(String::new())
    }
}

/// One element of an array-form `content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiContentPart {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OpenAiContent {
    /// Flatten the content to text. Text parts are joined with newlines,
    /// non-text parts (images, audio) are dropped.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            OpenAiContent::Text(text) => text.clone(),
            OpenAiContent::Parts(parts) => parts
                .iter()
                .filter(|part| part.type_ == "text")
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
            OpenAiContent::Null(()) => String::new(),
        }
    }
}

/// Non-streaming `chat.completion` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiChatResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<OpenAiChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub system_fingerprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiChoice {
    pub index: u32,
    pub message: OpenAiResponseMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiResponseMessage {
    pub role: String,
    pub content: String,
}

/// Streaming `chat.completion.chunk` frame payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiChatChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<OpenAiChunkChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiChunkChoice {
    pub index: u32,
    pub delta: OpenAiDelta,
    /// Serialized as `null` until the terminal chunk.
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// `/v1/models` list entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiModel {
    pub id: String,
    pub object: String,
    pub owned_by: String,
    pub permission: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiModelList {
    pub object: String,
    pub data: Vec<OpenAiModel>,
}
