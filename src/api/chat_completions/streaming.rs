use std::time::Instant;

use axum::body::Body;
use axum::response::Response;
use futures_util::{Stream, StreamExt};

use crate::error::GatewayError;
use crate::observability::log_request_complete;
use crate::protocol::dify::DifyEvent;
use crate::stream::{translate_stream, ChunkEmitter, FrameKind, ResponseMode, Translation};

pub(super) async fn handle_streaming<S>(
    events: S,
    id: String,
    model: String,
    output_variable: Option<&str>,
    start_time: Instant,
) -> Result<Response, GatewayError>
where
    S: Stream<Item = Result<DifyEvent, GatewayError>> + Send + 'static,
{
    let translation = Translation::new(ResponseMode::Streaming, output_variable);
    let emitter = ChunkEmitter::new(id, model.clone());
    let mut frames = Box::pin(translate_stream(
        events,
        translation,
        emitter,
        move |translation: &Translation| {
            log_request_complete(&model, true, translation.usage(), start_time);
        },
    ));

    // The status line goes out with the first frame, so wait for it.
    let first = frames.next().await.ok_or_else(|| {
        GatewayError::Internal("stream closed without a frame".to_string())
    })?;
    let status = if first.kind == FrameKind::Error {
        http::StatusCode::INTERNAL_SERVER_ERROR
    } else {
        http::StatusCode::OK
    };

    let output = futures_util::stream::iter([first])
        .chain(frames)
        .map(|frame| Ok::<bytes::Bytes, std::convert::Infallible>(frame.bytes));
    Ok(sse_response(status, Body::from_stream(output)))
}

#[inline]
fn sse_response(status: http::StatusCode, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache"),
    );
    headers.insert(
        http::header::CONNECTION,
        http::HeaderValue::from_static("keep-alive"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(
        items: Vec<Result<DifyEvent, GatewayError>>,
    ) -> impl Stream<Item = Result<DifyEvent, GatewayError>> + Send + 'static {
        futures_util::stream::iter(items)
    }

    #[tokio::test]
    async fn test_first_frame_error_sets_500() {
        let response = handle_streaming(
            events(vec![Ok(DifyEvent::Error {
                code: None,
                message: "boom".into(),
                status: None,
            })]),
            "chatcmpl-x".into(),
            "dify".into(),
            None,
            Instant::now(),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            body.as_ref(),
            b"data: {\"error\":\"boom\"}\n\ndata: [DONE]\n\n"
        );
    }

    #[tokio::test]
    async fn test_content_then_stop_is_200() {
        let response = handle_streaming(
            events(vec![
                Ok(DifyEvent::TextChunk {
                    text: "Hi".into(),
                    created_at: Some(7),
                }),
                Ok(DifyEvent::MessageEnd {
                    usage: None,
                    created_at: Some(8),
                }),
            ]),
            "chatcmpl-x".into(),
            "dify".into(),
            None,
            Instant::now(),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(
            response.headers()[http::header::CONTENT_TYPE],
            "text/event-stream"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.ends_with("data: [DONE]\n\n"));
        assert_eq!(text.matches("data: ").count(), 3);
    }
}
