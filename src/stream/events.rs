use std::collections::VecDeque;
use std::fmt::Display;

use bytes::Bytes;
use futures_util::Stream;

use super::line_decoder::{DecodedLines, LineDecoder};
use crate::error::GatewayError;
use crate::protocol::dify::decoder::classify_line;
use crate::protocol::dify::DifyEvent;

/// Decode and classify an upstream byte stream.
///
/// Yields events in arrival order. Lines that fail to parse are logged and
/// skipped. A transport error is yielded once as [`GatewayError::Transport`]
/// and ends the stream. At natural end the non-blank buffered tail is
/// classified like any other line.
pub fn dify_event_stream<S, E>(
    byte_stream: S,
) -> impl Stream<Item = Result<DifyEvent, GatewayError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    use futures_util::StreamExt;

    futures_util::stream::unfold(
        (
            Box::pin(byte_stream),
            LineDecoder::new(),
            DecodedLines::new(),
            VecDeque::<DifyEvent>::with_capacity(8),
            false,
        ),
        |(mut stream, mut decoder, mut lines, mut pending, mut finished)| async move {
            loop {
                if let Some(event) = pending.pop_front() {
                    return Some((Ok(event), (stream, decoder, lines, pending, finished)));
                }
                if finished {
                    return None;
                }

                match stream.as_mut().next().await {
                    Some(Ok(chunk)) => {
                        decoder.feed_into(&chunk, &mut lines);
                        classify_into(lines.drain(..), &mut pending);
                    }
                    Some(Err(err)) => {
                        finished = true;
                        let err = GatewayError::Transport(format!(
                            "upstream stream interrupted: {err}"
                        ));
                        return Some((Err(err), (stream, decoder, lines, pending, finished)));
                    }
                    None => {
                        finished = true;
                        classify_into(decoder.finish(), &mut pending);
                    }
                }
            }
        },
    )
}

fn classify_into<I>(lines: I, pending: &mut VecDeque<DifyEvent>)
where
    I: IntoIterator<Item = String>,
{
    for line in lines {
        match classify_line(&line) {
            Ok(Some(event)) => pending.push_back(event),
            Ok(None) => {}
            Err(err) => tracing::warn!("skipping upstream line: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn chunks(parts: &[&str]) -> Vec<Result<Bytes, String>> {
        parts
            .iter()
            .map(|part| Ok(Bytes::copy_from_slice(part.as_bytes())))
            .collect()
    }

    async fn collect(items: Vec<Result<Bytes, String>>) -> Vec<Result<DifyEvent, GatewayError>> {
        dify_event_stream(futures_util::stream::iter(items))
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_events_across_chunk_boundaries() {
        let events = collect(chunks(&[
            "data: {\"event\":\"mess",
            "age\",\"answer\":\"Hi\"}\n\ndata: {\"event\":\"message_end\"",
            ",\"metadata\":{}}\n",
        ]))
        .await;
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Ok(DifyEvent::Message { answer, .. }) if answer == "Hi"));
        assert!(matches!(&events[1], Ok(DifyEvent::MessageEnd { usage: None, .. })));
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_stop_processing() {
        let events = collect(chunks(&[
            "data: {not json}\ndata: {\"event\":\"message\",\"answer\":\"ok\"}\n",
        ]))
        .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Ok(DifyEvent::Message { answer, .. }) if answer == "ok"));
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_classified_at_end() {
        let events = collect(chunks(&["data: {\"event\":\"message_end\"}"])).await;
        assert!(matches!(&events[..], [Ok(DifyEvent::MessageEnd { .. })]));
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let items = vec![
            Ok(Bytes::from_static(b"data: {\"event\":\"message\",\"answer\":\"a\"}\n")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"data: {\"event\":\"message_end\"}\n")),
        ];
        let events = collect(items).await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(matches!(&events[1], Err(GatewayError::Transport(_))));
    }
}
