use serde_json::json;

/// Error type shared by every request path of the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Auth error: {0}")]
    Auth(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// A single upstream line that is not valid JSON. Never surfaces to the client.
    #[error("Frame parse error: {0}")]
    FrameParse(String),
    /// The upstream reported an `error` event.
    #[error("Upstream processing error: code={code}, message={message}")]
    Processing { code: String, message: String },
    #[error("Upstream stream ended without a terminal event")]
    UnexpectedTermination,
    #[error("Upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            GatewayError::Auth(_) => http::StatusCode::UNAUTHORIZED,
            GatewayError::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            GatewayError::Config(_)
            | GatewayError::FrameParse(_)
            | GatewayError::Processing { .. }
            | GatewayError::UnexpectedTermination
            | GatewayError::Upstream { .. }
            | GatewayError::Transport(_)
            | GatewayError::Internal(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing JSON body for this error.
    ///
    /// Internal details stay in the server log; only upstream status
    /// failures and request validation messages are echoed.
    #[must_use]
    pub fn client_body(&self) -> serde_json::Value {
        match self {
            GatewayError::Auth(_) => json!({ "code": 401, "errmsg": "Unauthorized." }),
            GatewayError::InvalidRequest(message) => json!({ "error": message }),
            GatewayError::Processing { .. } => json!({ "error": "Processing error" }),
            GatewayError::UnexpectedTermination => json!({ "error": "Unexpected stream end" }),
            GatewayError::Upstream { .. } | GatewayError::Transport(_) => {
                json!({ "error": self.to_string() })
            }
            GatewayError::Config(_) | GatewayError::FrameParse(_) | GatewayError::Internal(_) => {
                json!({ "error": "Internal server error" })
            }
        }
    }
}

/// Format an error as `(status_code, JSON body)`.
#[must_use]
pub fn format_error(err: &GatewayError) -> (http::StatusCode, serde_json::Value) {
    (err.status_code(), err.client_body())
}

/// Convert a `GatewayError` into an axum response, logging server-side failures.
#[must_use]
pub fn into_axum_response(err: &GatewayError) -> axum::response::Response {
    use axum::response::IntoResponse;
    let (status, body) = format_error(err);
    if status.is_server_error() {
        tracing::error!("request failed: {err}");
    } else {
        tracing::debug!("request rejected: {err}");
    }
    (status, axum::Json(body)).into_response()
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        into_axum_response(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_shape() {
        let (status, body) = format_error(&GatewayError::Auth("Missing bearer token".into()));
        assert_eq!(status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "code": 401, "errmsg": "Unauthorized." }));
    }

    #[test]
    fn test_terminal_error_bodies() {
        let (status, body) = format_error(&GatewayError::Processing {
            code: "invalid_param".into(),
            message: "bad".into(),
        });
        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Processing error" }));

        let (status, body) = format_error(&GatewayError::UnexpectedTermination);
        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Unexpected stream end" }));
    }

    #[test]
    fn test_internal_error_hides_details() {
        let (_, body) = format_error(&GatewayError::Internal("secret detail".into()));
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[test]
    fn test_invalid_request_is_400() {
        let (status, body) = format_error(&GatewayError::InvalidRequest("messages is empty".into()));
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "messages is empty");
    }
}
