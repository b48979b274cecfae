use serde::Deserialize;
use serde_json::Value;

use crate::error::GatewayError;
use crate::protocol::{JsonMap, Usage};

use super::DifyEvent;

/// Loose wire shape shared by every Dify stream event.
#[derive(Debug, Default, Deserialize)]
struct DifyEventWire {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    created_at: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<u16>,
}

/// Strip framing from one decoded line and return the JSON payload.
///
/// Returns `None` for blank lines, SSE comments and non-data SSE fields
/// (`event:`, `id:`, `retry:`). Lines without a `data:` prefix are treated as
/// bare JSON.
#[must_use]
pub fn extract_data_payload(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }
    if let Some(rest) = trimmed.strip_prefix("data:") {
        let payload = rest.trim();
        return (!payload.is_empty()).then_some(payload);
    }
    if ["event:", "id:", "retry:"]
        .iter()
        .any(|field| trimmed.starts_with(field))
    {
        return None;
    }
    Some(trimmed)
}

/// Classify one upstream line.
///
/// Returns `Ok(None)` for lines that carry no event.
///
/// # Errors
///
/// Returns [`GatewayError::FrameParse`] when the payload is not a JSON event
/// object. Callers log and skip such lines.
pub fn classify_line(line: &str) -> Result<Option<DifyEvent>, GatewayError> {
    let Some(payload) = extract_data_payload(line) else {
        return Ok(None);
    };
    let wire: DifyEventWire = serde_json::from_str(payload)
        .map_err(|err| GatewayError::FrameParse(format!("{err}: {}", preview(payload))))?;
    Ok(Some(classify_wire(wire)))
}

fn classify_wire(wire: DifyEventWire) -> DifyEvent {
    let created_at = wire.created_at.as_ref().and_then(timestamp_secs);
    let event = wire.event.unwrap_or_default();
    match event.as_str() {
        "message" => DifyEvent::Message {
            answer: wire.answer.unwrap_or_default(),
            created_at,
        },
        "agent_message" => DifyEvent::AgentMessage {
            answer: wire.answer.unwrap_or_default(),
            created_at,
        },
        "text_chunk" => DifyEvent::TextChunk {
            text: wire
                .data
                .as_ref()
                .and_then(|data| data.get("text"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            created_at,
        },
        "workflow_finished" => DifyEvent::WorkflowFinished {
            outputs: match wire.data {
                Some(Value::Object(mut data)) => match data.remove("outputs") {
                    Some(Value::Object(outputs)) => outputs,
                    _ => JsonMap::new(),
                },
                _ => JsonMap::new(),
            },
            usage: metadata_usage(wire.metadata),
            created_at,
        },
        "message_end" => DifyEvent::MessageEnd {
            usage: metadata_usage(wire.metadata),
            created_at,
        },
        "error" => DifyEvent::Error {
            code: wire.code.map(|code| match code {
                Value::String(code) => code,
                other => other.to_string(),
            }),
            message: wire.message.unwrap_or_default(),
            status: wire.status,
        },
        _ => DifyEvent::Unknown { event },
    }
}

/// Unix seconds from an integer, float or numeric string timestamp.
#[allow(clippy::cast_possible_truncation)]
fn timestamp_secs(value: &Value) -> Option<i64> {
    let secs = match value {
        Value::Number(number) => {
            if let Some(secs) = number.as_i64() {
                return Some(secs);
            }
            number.as_f64()?
        }
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    secs.is_finite().then_some(secs as i64)
}

fn metadata_usage(metadata: Option<Value>) -> Option<Usage> {
    let usage = match metadata? {
        Value::Object(mut metadata) => metadata.remove("usage")?,
        _ => return None,
    };
    match serde_json::from_value(usage) {
        Ok(usage) => Some(usage),
        Err(err) => {
            tracing::debug!("ignoring malformed usage metadata: {err}");
            None
        }
    }
}

fn preview(payload: &str) -> &str {
    const MAX_PREVIEW_BYTES: usize = 120;
    if payload.len() <= MAX_PREVIEW_BYTES {
        return payload;
    }
    let mut end = MAX_PREVIEW_BYTES;
    while !payload.is_char_boundary(end) {
        end -= 1;
    }
    &payload[..end]
}
