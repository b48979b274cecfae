use std::fmt::Write as _;

use crate::config::{BotType, DifyConfig};
use crate::error::GatewayError;
use crate::protocol::openai_chat::{OpenAiChatRequest, OpenAiMessage};
use crate::protocol::JsonMap;

use super::DifyRequest;

/// The gateway always streams from Dify; buffering happens locally.
const RESPONSE_MODE_STREAMING: &str = "streaming";

/// Render the conversation as the single query string Dify receives.
///
/// Chat apps get the earlier turns as a transcript preamble followed by the
/// last message; completion apps and workflows get only the last message.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] when `messages` is empty.
pub fn build_query(bot_type: BotType, messages: &[OpenAiMessage]) -> Result<String, GatewayError> {
    let Some((last, history)) = messages.split_last() else {
        return Err(GatewayError::InvalidRequest(
            "messages must contain at least one message".to_string(),
        ));
    };
    let question = last.content.to_text();

    match bot_type {
        BotType::Chat => {
            let mut query = String::from("here is our talk history:\n'''\n");
            for (index, message) in history.iter().enumerate() {
                if index > 0 {
                    query.push('\n');
                }
                let _ = write!(query, "{}: {}", message.role, message.content.to_text());
            }
            query.push_str("\n'''\n\nhere is my question:\n");
            query.push_str(&question);
            Ok(query)
        }
        BotType::Completion | BotType::Workflow => Ok(question),
    }
}

/// Translate a client chat request into the Dify request body.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] when the request has no messages.
pub fn encode_dify_request(
    config: &DifyConfig,
    request: &OpenAiChatRequest,
) -> Result<DifyRequest, GatewayError> {
    let query = build_query(config.bot_type, &request.messages)?;

    let (inputs, query) = match config.input_variable.as_deref() {
        Some(input_variable) => {
            let mut inputs = JsonMap::new();
            inputs.insert(input_variable.to_string(), serde_json::Value::String(query));
            (inputs, None)
        }
        None => (JsonMap::new(), Some(query)),
    };

    Ok(DifyRequest {
        inputs,
        query,
        response_mode: RESPONSE_MODE_STREAMING,
        conversation_id: String::new(),
        user: config.user.clone(),
        auto_generate_name: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::openai_chat::OpenAiContent;
    use serde_json::json;

    fn msg(role: &str, content: &str) -> OpenAiMessage {
        OpenAiMessage {
            role: role.to_string(),
            content: OpenAiContent::Text(content.to_string()),
        }
    }

    fn request(messages: Vec<OpenAiMessage>) -> OpenAiChatRequest {
        OpenAiChatRequest {
            model: "dify".to_string(),
            messages,
            stream: false,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_chat_query_renders_history() {
        let messages = vec![
            msg("system", "be brief"),
            msg("user", "hi"),
            msg("assistant", "hello"),
            msg("user", "what is rust?"),
        ];
        let query = build_query(BotType::Chat, &messages).unwrap();
        assert_eq!(
            query,
            "here is our talk history:\n'''\nsystem: be brief\nuser: hi\nassistant: hello\n'''\n\nhere is my question:\nwhat is rust?"
        );
    }

    #[test]
    fn test_chat_query_single_message() {
        let query = build_query(BotType::Chat, &[msg("user", "only")]).unwrap();
        assert_eq!(
            query,
            "here is our talk history:\n'''\n\n'''\n\nhere is my question:\nonly"
        );
    }

    #[test]
    fn test_workflow_and_completion_use_last_message() {
        let messages = vec![msg("user", "first"), msg("user", "second")];
        assert_eq!(build_query(BotType::Workflow, &messages).unwrap(), "second");
        assert_eq!(build_query(BotType::Completion, &messages).unwrap(), "second");
    }

    #[test]
    fn test_empty_messages_rejected() {
        let err = build_query(BotType::Workflow, &[]).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[test]
    fn test_body_without_input_variable() {
        let config = DifyConfig::default();
        let body = encode_dify_request(&config, &request(vec![msg("user", "ping")])).unwrap();
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "inputs": {},
                "query": "ping",
                "response_mode": "streaming",
                "conversation_id": "",
                "user": "apiuser",
                "auto_generate_name": false
            })
        );
    }

    #[test]
    fn test_body_with_input_variable() {
        let config = DifyConfig {
            input_variable: Some("question".to_string()),
            ..DifyConfig::default()
        };
        let body = encode_dify_request(&config, &request(vec![msg("user", "ping")])).unwrap();
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["inputs"], json!({ "question": "ping" }));
        assert!(value.get("query").is_none());
        assert_eq!(value["response_mode"], "streaming");
    }
}
