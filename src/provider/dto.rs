//! Wire types for the BMC servers API.

use serde::{Deserialize, Serialize};

/// Body of `POST /servers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedServer {
    pub name: String,
    pub description: String,
    pub os: String,
    #[serde(rename = "type")]
    pub server_type: String,
    pub location: String,
    pub ssh_keys: Vec<String>,
}

/// Server representation returned by create and get.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LongServer {
    pub id: String,
    pub status: String,
    #[serde(alias = "hostname")]
    pub name: String,
    pub description: String,
    pub os: String,
    #[serde(rename = "type")]
    pub server_type: String,
    pub location: String,
    pub cpu: String,
    pub ram: String,
    pub storage: String,
    #[serde(alias = "privateIPAddresses")]
    pub private_ip_addresses: Vec<String>,
    #[serde(alias = "publicIPAddresses")]
    pub public_ip_addresses: Vec<String>,
}

/// Error payload returned with any non-success status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorMessage {
    pub message: String,
    pub validation_errors: Vec<String>,
}

/// OAuth2 token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
