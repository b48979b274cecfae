//! Buffered mode: fold the whole upstream stream into one answer.
use futures_util::{Stream, StreamExt};

use super::translation::{Phase, Translation};
use crate::error::GatewayError;
use crate::protocol::dify::DifyEvent;
use crate::protocol::Usage;

/// Final buffered answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Consume `events` through a buffered-mode [`Translation`] and resolve the
/// outcome once the stream reaches a terminal event or ends.
///
/// # Errors
///
/// Returns [`GatewayError::Transport`] when the upstream body fails, and the
/// errors of [`finalize`] otherwise.
pub async fn aggregate<S>(events: S, mut translation: Translation) -> Result<Completion, GatewayError>
where
    S: Stream<Item = Result<DifyEvent, GatewayError>>,
{
    let mut events = std::pin::pin!(events);
    while let Some(event) = events.next().await {
        translation.apply(event?);
        if translation.is_terminal() {
            break;
        }
    }
    finalize(translation)
}

/// Resolve a finished translation into the buffered response.
///
/// | phase | outcome |
/// |---|---|
/// | `Errored` | [`GatewayError::Processing`] |
/// | `Ended` | [`Completion`] with trimmed text |
/// | `Active` | [`GatewayError::UnexpectedTermination`] |
///
/// # Errors
///
/// See the table above.
pub fn finalize(translation: Translation) -> Result<Completion, GatewayError> {
    match translation.phase() {
        Phase::Errored => {
            let (code, message) = translation
                .failure()
                .map(|failure| {
                    (
                        failure.code.clone().unwrap_or_default(),
                        failure.message.clone(),
                    )
                })
                .unwrap_or_default();
            Err(GatewayError::Processing { code, message })
        }
        Phase::Ended => {
            let (text, usage) = translation.into_parts();
            Ok(Completion {
                content: text.trim().to_string(),
                usage,
            })
        }
        Phase::Active => Err(GatewayError::UnexpectedTermination),
    }
}
