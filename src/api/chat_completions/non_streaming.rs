use std::time::Instant;

use axum::response::{IntoResponse, Json, Response};
use futures_util::Stream;

use crate::error::GatewayError;
use crate::observability::log_request_complete;
use crate::protocol::dify::DifyEvent;
use crate::protocol::openai_chat::response_encoder::encode_chat_response;
use crate::stream::{aggregate, ResponseMode, Translation};
use crate::util::unix_now_secs;

pub(super) async fn handle_non_streaming<S>(
    events: S,
    id: String,
    model: String,
    output_variable: Option<&str>,
    start_time: Instant,
) -> Result<Response, GatewayError>
where
    S: Stream<Item = Result<DifyEvent, GatewayError>>,
{
    let translation = Translation::new(ResponseMode::Buffered, output_variable);
    let completion = aggregate(events, translation).await?;

    log_request_complete(&model, false, completion.usage.as_ref(), start_time);

    let response = encode_chat_response(
        id,
        &model,
        unix_now_secs(),
        completion.content,
        completion.usage,
    );
    Ok(Json(response).into_response())
}
