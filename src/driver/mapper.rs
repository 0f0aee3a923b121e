//! Translation between driver configuration and BMC wire types.
//!
//! Success is decided by status code alone: `200` is the only accepted code
//! for create and query, so `201`/`202` are treated as failures too.

use crate::provider::{
    ApiResponse, LongServer, ProviderError, ProviderResult, ProvisionedServer, STATUS_OK,
};

use super::config::{DriverConfig, InstanceRecord};

/// Codes accepted by a delete: a server that is already gone counts as deleted.
pub const DELETE_ACCEPTED: &[u16] = &[STATUS_OK, 404];

/// Codes accepted by every other operation.
pub const DEFAULT_ACCEPTED: &[u16] = &[STATUS_OK];

/// Build the `POST /servers` body.
pub fn build_create_request(
    config: &DriverConfig,
    name: &str,
    public_key: &str,
) -> ProvisionedServer {
    ProvisionedServer {
        name: name.to_string(),
        description: config.server_description.clone(),
        os: config.server_os.clone(),
        server_type: config.server_type.clone(),
        location: config.server_location.clone(),
        ssh_keys: vec![public_key.trim().to_string()],
    }
}

/// Check a response against an allow-list of status codes.
pub fn accept(response: ApiResponse, allowed: &[u16]) -> ProviderResult<ApiResponse> {
    if allowed.contains(&response.status) {
        Ok(response)
    } else {
        Err(response.into_error())
    }
}

/// Decode a create or get answer into an `InstanceRecord`.
pub fn parse_server_response(response: ApiResponse) -> ProviderResult<InstanceRecord> {
    parse_server(response).map(InstanceRecord::from)
}

/// Decode a create or get answer into the provider's server payload.
pub fn parse_server(response: ApiResponse) -> ProviderResult<LongServer> {
    let response = accept(response, DEFAULT_ACCEPTED)?;
    serde_json::from_str(&response.body).map_err(|source| ProviderError::Decode {
        what: "server",
        source,
    })
}
