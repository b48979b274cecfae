use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderMap;
use axum::response::Response;

use super::non_streaming::handle_non_streaming;
use super::streaming::handle_streaming;
use crate::auth::extract_bearer_token;
use crate::error::GatewayError;
use crate::protocol::dify::encoder::encode_dify_request;
use crate::protocol::openai_chat::OpenAiChatRequest;
use crate::state::AppState;
use crate::stream::dify_event_stream;

pub(super) async fn handler_inner(
    state: Arc<AppState>,
    headers: HeaderMap,
    body: bytes::Bytes,
) -> Result<Response, GatewayError> {
    let start_time = Instant::now();
    let token = extract_bearer_token(&headers)?;

    let request: OpenAiChatRequest = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid JSON body: {e}")))?;
    let dify_request = encode_dify_request(&state.config.dify, &request)?;
    let upstream_body = serde_json::to_vec(&dify_request)
        .map(bytes::Bytes::from)
        .map_err(|e| GatewayError::Internal(format!("Serialization error: {e}")))?;

    tracing::debug!(
        model = %request.model,
        stream = request.stream,
        bot_type = %state.config.dify.bot_type,
        messages = request.messages.len(),
        "forwarding chat completion"
    );

    let response = state
        .transport
        .send_stream(state.upstream_url(), token, upstream_body)
        .await?;
    let events = dify_event_stream(response.bytes_stream());

    let id = state.completion_id();
    let output_variable = state.config.dify.output_variable.as_deref();
    if request.stream {
        handle_streaming(events, id, request.model, output_variable, start_time).await
    } else {
        handle_non_streaming(events, id, request.model, output_variable, start_time).await
    }
}
