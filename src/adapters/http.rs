use crate::config::ClientConfig;
use crate::domain::ports::Transport;
use crate::utils::error::{Result, ShippingError, TransportError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

/// [`Transport`] over reqwest.
///
/// The body is returned whatever the status code: the carrier puts its
/// `<error>` envelopes in the body and a non-2xx status carries no extra
/// information for the codec.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();

        // 設定超時
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.api.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().map_err(|e| ShippingError::ConfigError {
            message: format!("failed to build HTTP client: {}", e),
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: Vec<u8>) -> std::result::Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/xml")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("📡 API response status: {}", status);
        if !status.is_success() {
            tracing::warn!("⚠️ Carrier answered with HTTP {}, reading body anyway", status);
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
