//! BMC provider abstraction layer.
//!
//! The driver never talks HTTP directly. It goes through the `BmcApi` trait,
//! whose operations mirror the provider's server endpoints one to one and
//! hand back the raw status code and body. Interpreting those codes is the
//! driver's job, not the client's.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │ CredentialResolver │  ← explicit id/secret or ~/.pnap/config.yaml
//! └─────────┬──────────┘
//!           │ Connector::connect
//!           ▼
//! ┌────────────────────┐
//! │    dyn BmcApi      │  ← create / get / shutdown / power-on / reboot / delete
//! └─────────┬──────────┘
//!           ▼
//! ┌────────────────────┐
//! │   HttpBmcClient    │  ← reqwest + OAuth2 client credentials
//! └────────────────────┘
//! ```

pub mod credentials;
pub mod dto;
pub mod error;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;

pub use credentials::{CredentialResolver, Credentials};
pub use dto::{ErrorMessage, LongServer, ProvisionedServer};
pub use error::{ProviderError, ProviderResult};
pub use http::HttpConnector;

/// Status code the BMC API uses for every successful call.
pub const STATUS_OK: u16 = 200;

/// Raw answer of a provider call: status code plus undecoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decode the body as an error payload.
    ///
    /// A body that is empty or not the documented shape yields an empty
    /// message rather than a second error, so the status code is never lost.
    pub fn error_message(&self) -> ErrorMessage {
        serde_json::from_str(&self.body).unwrap_or_else(|e| {
            tracing::debug!("Unparseable error body (HTTP {}): {}", self.status, e);
            ErrorMessage {
                message: self.body.trim().to_string(),
                validation_errors: Vec::new(),
            }
        })
    }

    /// Turn this response into a `ProviderError::Api`.
    pub fn into_error(self) -> ProviderError {
        let payload = self.error_message();
        ProviderError::api(self.status, payload.message, payload.validation_errors)
    }
}

/// Server operations exposed by the BMC API.
///
/// Implementations return `Err` only when no HTTP answer was obtained at all.
/// Any answer, whatever its status, comes back as `Ok(ApiResponse)`.
#[async_trait]
pub trait BmcApi: Send + Sync {
    /// `POST /servers`
    async fn create_server(&self, request: &ProvisionedServer) -> ProviderResult<ApiResponse>;

    /// `GET /servers/{id}`
    async fn get_server(&self, id: &str) -> ProviderResult<ApiResponse>;

    /// `POST /servers/{id}/actions/shutdown`
    async fn shut_down(&self, id: &str) -> ProviderResult<ApiResponse>;

    /// `POST /servers/{id}/actions/power-on`
    async fn power_on(&self, id: &str) -> ProviderResult<ApiResponse>;

    /// `POST /servers/{id}/actions/reboot`
    async fn reboot(&self, id: &str) -> ProviderResult<ApiResponse>;

    /// `DELETE /servers/{id}`
    async fn delete_server(&self, id: &str) -> ProviderResult<ApiResponse>;
}

/// Builds an authenticated `BmcApi` handle from resolved credentials.
pub trait Connector: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> ProviderResult<Arc<dyn BmcApi>>;
}
