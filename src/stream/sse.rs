//! SSE wire encoding for client-facing frames.
use bytes::Bytes;
use serde::Serialize;

/// Terminal sentinel frame of an `OpenAI` stream.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Format an OpenAI-style SSE frame (no event type, just data).
#[must_use]
pub fn openai_sse_frame(json: &str) -> String {
    let mut out = String::with_capacity(8 + json.len());
    out.push_str("data: ");
    out.push_str(json);
    out.push_str("\n\n");
    out
}

/// Serialize `value` and wrap it as a `data:` frame.
///
/// # Errors
///
/// Returns the serializer error when `value` cannot be encoded as JSON.
pub fn json_sse_frame<T: Serialize>(value: &T) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    Ok(Bytes::from(openai_sse_frame(&json)))
}

#[must_use]
pub fn done_frame() -> Bytes {
    Bytes::from_static(DONE_FRAME.as_bytes())
}
