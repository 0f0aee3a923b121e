//! Connection details derived from the instance record.

use super::config::{InstanceRecord, DOCKER_PORT};

/// OS families with a well-known login account, checked in order.
const LOGIN_ACCOUNTS: &[(&str, &str)] = &[("ubuntu", "ubuntu"), ("centos", "centos")];

/// First public address, or `None` while the server has none yet.
pub fn resolve_address(record: &InstanceRecord) -> Option<&str> {
    if !record.is_provisioned() {
        return None;
    }
    record
        .public_ip_addresses
        .first()
        .map(String::as_str)
        .filter(|ip| !ip.is_empty())
}

/// Default SSH account for an OS image.
///
/// The first family contained in `os` wins. Unknown images keep `current`.
pub fn login_account<'a>(os: &str, current: &'a str) -> &'a str {
    LOGIN_ACCOUNTS
        .iter()
        .find(|(family, _)| os.contains(family))
        .map(|(_, account)| *account)
        .unwrap_or(current)
}

/// Docker URL for an address; empty when there is no address.
pub fn docker_url(address: &str) -> String {
    if address.is_empty() {
        return String::new();
    }
    format!("tcp://{}:{}", address, DOCKER_PORT)
}
