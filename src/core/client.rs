use crate::adapters::http::HttpTransport;
use crate::config::ClientConfig;
use crate::core::batch::ShipmentBatch;
use crate::core::codec;
use crate::domain::model::{Credentials, LabelDocument, ShipmentRecord};
use crate::domain::ports::Transport;
use crate::utils::error::{Result, ShippingError};

pub const DEFAULT_BASE_URL: &str = "https://iseteenindus.smartpost.ee/api/";

/// Carrier API operations. All share one base URL and differ only in the
/// `request` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Shipment,
    Tracking,
    Labels,
}

impl Endpoint {
    pub fn request_name(&self) -> &'static str {
        match self {
            Endpoint::Shipment => "shipment",
            Endpoint::Tracking => "tracking",
            Endpoint::Labels => "labels",
        }
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}?request={}", base_url, self.request_name())
    }
}

/// Client for the carrier's HTTP+XML API.
///
/// Each public operation is one POST: encode, send, then check the body for an
/// error envelope before decoding it. A failure at any step ends the call and
/// is returned, and its message is also kept for [`last_error`](Self::last_error).
/// Nothing is retried.
///
/// A client is not meant to be shared between tasks; use one per task.
pub struct CarrierClient<T: Transport> {
    transport: T,
    base_url: String,
    credentials: Credentials,
    batch: ShipmentBatch,
    last_error: Option<String>,
}

impl<T: Transport> CarrierClient<T> {
    pub fn new(transport: T, credentials: Credentials) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials,
            batch: ShipmentBatch::new(),
            last_error: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Queue a shipment for the next create or track call.
    pub fn add_shipment(&mut self, record: ShipmentRecord) {
        self.batch.add(record);
    }

    /// Drop all queued shipments. Not done automatically after a send.
    pub fn clear_shipments(&mut self) {
        self.batch.clear();
    }

    pub fn batch(&self) -> &ShipmentBatch {
        &self.batch
    }

    /// Register the queued shipments with the carrier.
    ///
    /// The returned records carry the carrier-assigned tracking numbers and
    /// door codes, in the order the carrier listed them.
    pub async fn create_shipments(&mut self) -> Result<Vec<ShipmentRecord>> {
        let outcome = self.submit(Endpoint::Shipment).await;
        self.remember(outcome)
    }

    /// Query tracking information for the queued shipments.
    pub async fn track_shipments(&mut self) -> Result<Vec<ShipmentRecord>> {
        let outcome = self.submit(Endpoint::Tracking).await;
        self.remember(outcome)
    }

    /// Fetch the printable labels for the given tracking codes.
    pub async fn fetch_labels<S: AsRef<str>>(
        &mut self,
        tracking_codes: &[S],
        format: &str,
    ) -> Result<LabelDocument> {
        let outcome = self.request_labels(tracking_codes, format).await;
        self.remember(outcome)
    }

    /// Message of the most recent failed call. Successful calls leave it as is.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    async fn submit(&self, endpoint: Endpoint) -> Result<Vec<ShipmentRecord>> {
        let body = self.batch.serialize(&self.credentials)?;
        tracing::debug!(
            "📦 Sending {} shipment(s) to {} endpoint",
            self.batch.len(),
            endpoint.request_name()
        );

        let response = self.exchange(endpoint, body).await?;
        codec::detect_error(&response)?;
        let records = codec::decode_shipment_results(&response)?;

        tracing::info!(
            "✅ {} request returned {} of {} shipment(s)",
            endpoint.request_name(),
            records.len(),
            self.batch.len()
        );
        Ok(records)
    }

    async fn request_labels<S: AsRef<str>>(
        &self,
        tracking_codes: &[S],
        format: &str,
    ) -> Result<LabelDocument> {
        let body = codec::encode_label_request(tracking_codes, format, &self.credentials)?;
        tracing::debug!(
            "🏷️ Requesting {} label(s) in format {}",
            tracking_codes.len(),
            format
        );

        let response = self.exchange(Endpoint::Labels, body).await?;
        let document = codec::decode_label_response(response)?;

        tracing::info!("✅ Received label document ({} bytes)", document.len());
        Ok(document)
    }

    async fn exchange(&self, endpoint: Endpoint, body: String) -> Result<Vec<u8>> {
        let url = endpoint.url(&self.base_url);
        tracing::debug!("📡 POST {} ({} bytes)", url, body.len());

        let response = self.transport.post(&url, body.into_bytes()).await?;
        tracing::debug!("📡 Response from {}: {} bytes", url, response.len());
        Ok(response)
    }

    fn remember<V>(&mut self, outcome: Result<V>) -> Result<V> {
        if let Err(e) = &outcome {
            let message = match e {
                ShippingError::Carrier(carrier) => carrier.message.clone(),
                other => other.to_string(),
            };
            tracing::warn!("❌ Carrier call failed: {}", message);
            self.last_error = Some(message);
        }
        outcome
    }
}

impl CarrierClient<HttpTransport> {
    /// HTTP client configured from a [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(transport, config.credentials()).with_base_url(config.base_url()))
    }
}

impl<T: Transport> std::fmt::Debug for CarrierClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarrierClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("pending", &self.batch.len())
            .field("last_error", &self.last_error)
            .finish()
    }
}
