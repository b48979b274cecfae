use crate::error::GatewayError;
use http::header::AUTHORIZATION;

/// Extract the client credential from `Authorization: Bearer <token>`.
///
/// The credential is the second space-separated token of the header value;
/// it is not checked against any key list, only required to be present and
/// non-empty. The same token is forwarded to the upstream.
///
/// # Errors
///
/// Returns `GatewayError::Auth` when the header is missing, not valid
/// ASCII, or carries no token.
pub fn extract_bearer_token(headers: &http::HeaderMap) -> Result<&str, GatewayError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| GatewayError::Auth("Missing Authorization header".to_string()))?;
    let value = value
        .to_str()
        .map_err(|_| GatewayError::Auth("Malformed Authorization header".to_string()))?;

    value
        .split(' ')
        .nth(1)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| GatewayError::Auth("Missing bearer token".to_string()))
}
