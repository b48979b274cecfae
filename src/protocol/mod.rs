pub mod dify;
pub mod openai_chat;

use serde::{Deserialize, Serialize};

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Token usage as reported by Dify and re-emitted to the client.
///
/// Dify attaches pricing and latency fields next to the token counts; those
/// are carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl Usage {
    #[must_use]
    pub fn new(prompt_tokens: u64, completion_tokens: u64, total_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
            extra: JsonMap::new(),
        }
    }

    /// Substituted when a `workflow_finished` event carries no usage.
    #[must_use]
    pub fn workflow_default() -> Self {
        Self::new(100, 10, 110)
    }
}
