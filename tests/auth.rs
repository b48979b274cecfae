use dify2openai::auth::extract_bearer_token;
use dify2openai::error::{format_error, GatewayError};
use http::HeaderMap;

fn headers_with(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("authorization", value.parse().expect("header"));
    headers
}

#[test]
fn test_auth_bearer_success() {
    let headers = headers_with("Bearer app-abc123");
    assert_eq!(extract_bearer_token(&headers).expect("token"), "app-abc123");
}

#[test]
fn test_auth_any_scheme_word_is_accepted() {
    // Only the second token matters.
    let headers = headers_with("Token app-abc123");
    assert_eq!(extract_bearer_token(&headers).expect("token"), "app-abc123");
}

#[test]
fn test_auth_missing_key_is_error() {
    let err = extract_bearer_token(&HeaderMap::new()).expect_err("auth should fail");
    assert!(matches!(err, GatewayError::Auth(_)));
}

#[test]
fn test_auth_scheme_only_is_error() {
    for value in ["Bearer", "Bearer ", "app-abc123"] {
        let err = extract_bearer_token(&headers_with(value)).expect_err("auth should fail");
        let (status, body) = format_error(&err);
        assert_eq!(status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(body["errmsg"], "Unauthorized.");
    }
}
