use axum::response::{Html, IntoResponse, Response};

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>DIFY2OPENAI</title>
</head>
<body>
  <h1>Dify2OpenAI</h1>
  <p>Congratulations! Your project has been successfully deployed.</p>
</body>
</html>
"#;

/// Static landing page served on `GET /`.
#[must_use]
pub fn handler() -> Response {
    Html(LANDING_PAGE).into_response()
}
