use crate::utils::error::TransportError;
use async_trait::async_trait;

/// The one network capability the client needs: POST a body, get a body back.
///
/// Implementations return the response body whatever the HTTP status is, since
/// the carrier reports failures inside the body. Timeouts and TLS are theirs to
/// handle.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, TransportError>;
}
