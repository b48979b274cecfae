use std::time::Duration;

use http::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::config::ServerConfig;
use crate::error::GatewayError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_UPSTREAM_ERROR_LEN: usize = 500;

fn build_reqwest_client(config: &ServerConfig) -> Result<reqwest::Client, GatewayError> {
    let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
        None
    } else {
        Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
    };

    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(config.http_pool_max_idle_per_host.max(1))
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(config.timeout));

    if !config.http_use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| GatewayError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// HTTP client for the Dify upstream.
///
/// One pooled client is shared by every request; `timeout` bounds each call
/// from connect to the last body byte.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new transport with connection pooling and timeouts from the given server config.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the TLS backend cannot be initialised.
    pub fn new(config: &ServerConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_reqwest_client(config)?,
        })
    }

    /// POST a JSON body upstream and return the response with its body unread.
    ///
    /// `bearer_token` is the client's credential, forwarded as-is.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the request cannot be sent and
    /// [`GatewayError::Upstream`] when the upstream answers with a non-2xx status.
    pub async fn send_stream(
        &self,
        url: &url::Url,
        bearer_token: &str,
        body: bytes::Bytes,
    ) -> Result<reqwest::Response, GatewayError> {
        let authorization = HeaderValue::from_str(&format!("Bearer {bearer_token}"))
            .map_err(|_| GatewayError::Auth("Malformed bearer token".to_string()))?;

        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(AUTHORIZATION, authorization)
            .body(body)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(format!("Upstream request failed: {err}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        Err(GatewayError::Upstream {
            status: status.as_u16(),
            message: sanitize_upstream_error(&body),
        })
    }
}

/// Extract a short, loggable message from an upstream error body.
///
/// Dify answers `{"code": "...", "message": "...", "status": 400}`; anything
/// else is returned as truncated text.
#[must_use]
pub(crate) fn sanitize_upstream_error(body: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        let message = json
            .get("message")
            .and_then(serde_json::Value::as_str)
            .or_else(|| {
                json.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(serde_json::Value::as_str)
            });
        if let Some(message) = message {
            return truncate(message);
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "empty response body".to_string();
    }
    truncate(text)
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_UPSTREAM_ERROR_LEN {
        return text.to_string();
    }
    let mut end = MAX_UPSTREAM_ERROR_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_dify_error() {
        let body = br#"{"code":"unauthorized","message":"Access token is invalid","status":401}"#;
        assert_eq!(sanitize_upstream_error(body), "Access token is invalid");
    }

    #[test]
    fn test_sanitize_openai_style_error() {
        let body = br#"{"error":{"message":"nope"}}"#;
        assert_eq!(sanitize_upstream_error(body), "nope");
    }

    #[test]
    fn test_sanitize_plain_text_truncates() {
        let body = "é".repeat(400);
        let message = sanitize_upstream_error(body.as_bytes());
        assert!(message.ends_with("..."));
        assert!(message.len() <= MAX_UPSTREAM_ERROR_LEN + 3);
    }

    #[test]
    fn test_sanitize_empty_body() {
        assert_eq!(sanitize_upstream_error(b""), "empty response body");
    }

    #[test]
    fn test_new_transport() {
        assert!(HttpTransport::new(&ServerConfig::default()).is_ok());
    }
}
