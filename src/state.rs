mod request_id;

use bytes::Bytes;

use crate::config::AppConfig;
use crate::error::GatewayError;
use crate::protocol::openai_chat::response_encoder::encode_model_list;
use crate::transport::HttpTransport;

use request_id::RequestIdGenerator;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub transport: HttpTransport,
    upstream_url: url::Url,
    models_response_body: Bytes,
    request_ids: RequestIdGenerator,
}

impl AppState {
    /// Build the state from a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] when the Dify endpoint is not a valid URL.
    pub fn new(config: AppConfig, transport: HttpTransport) -> Result<Self, GatewayError> {
        let endpoint = config.dify.endpoint_url();
        let upstream_url = url::Url::parse(&endpoint)
            .map_err(|err| GatewayError::Config(format!("invalid Dify endpoint '{endpoint}': {err}")))?;
        let models_response_body = serde_json::to_vec(&encode_model_list(config.models.display_name()))
            .map(Bytes::from)
            .map_err(|err| GatewayError::Internal(format!("failed to encode model list: {err}")))?;

        Ok(Self {
            config,
            transport,
            upstream_url,
            models_response_body,
            request_ids: RequestIdGenerator::new(),
        })
    }

    /// Dify endpoint for the configured bot type.
    #[must_use]
    pub fn upstream_url(&self) -> &url::Url {
        &self.upstream_url
    }

    #[must_use]
    pub fn models_response_body(&self) -> Bytes {
        self.models_response_body.clone()
    }

    /// Fresh id shared by every chunk of one response.
    #[must_use]
    pub fn completion_id(&self) -> String {
        self.request_ids.completion_id()
    }
}
