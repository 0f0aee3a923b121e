//! Driver configuration and the persisted instance record.
//!
//! `HostIdentity` is the generic part every machine has regardless of
//! provider. `DriverConfig` holds the BMC-specific settings and is composed
//! next to it inside the driver.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider::LongServer;

pub const DEFAULT_OS: &str = "ubuntu/bionic";
pub const DEFAULT_TYPE: &str = "s1.c1.medium";
pub const DEFAULT_LOCATION: &str = "PHX";

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_SSH_USER: &str = "root";

/// Docker daemon port advertised in the machine URL.
pub const DOCKER_PORT: u16 = 2376;

/// Provider-agnostic host data owned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    pub machine_name: String,
    pub store_path: PathBuf,
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    /// Overrides the key location derived from the store path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<PathBuf>,
    #[serde(default)]
    pub ip_address: String,
}

fn default_ssh_user() -> String {
    DEFAULT_SSH_USER.to_string()
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl HostIdentity {
    pub fn new(machine_name: impl Into<String>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            machine_name: machine_name.into(),
            store_path: store_path.into(),
            ssh_user: default_ssh_user(),
            ssh_port: DEFAULT_SSH_PORT,
            ssh_key_path: None,
            ip_address: String::new(),
        }
    }

    /// Directory holding this machine's files.
    pub fn machine_dir(&self) -> PathBuf {
        self.store_path.join("machines").join(&self.machine_name)
    }

    /// Private key path; the public half lives next to it with `.pub`.
    pub fn ssh_key_path(&self) -> PathBuf {
        self.ssh_key_path
            .clone()
            .unwrap_or_else(|| self.machine_dir().join("id_ed25519"))
    }
}

/// BMC settings declared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub server_os: String,
    pub server_type: String,
    pub server_location: String,
    pub server_description: String,
    /// Name given to the server; the machine name is used when empty.
    pub server_hostname: String,
    pub client_identifier: String,
    pub client_secret: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            server_os: DEFAULT_OS.to_string(),
            server_type: DEFAULT_TYPE.to_string(),
            server_location: DEFAULT_LOCATION.to_string(),
            server_description: String::new(),
            server_hostname: String::new(),
            client_identifier: String::new(),
            client_secret: String::new(),
        }
    }
}

impl DriverConfig {
    /// Fill empty OS, type and location from the defaults.
    pub fn apply_defaults(&mut self) {
        if self.server_location.is_empty() {
            tracing::info!(
                "Location has not been set, will be used {} as default location.",
                DEFAULT_LOCATION
            );
            self.server_location = DEFAULT_LOCATION.to_string();
        }
        if self.server_type.is_empty() {
            tracing::info!(
                "Type has not been set, will be used {} as default type.",
                DEFAULT_TYPE
            );
            self.server_type = DEFAULT_TYPE.to_string();
        }
        if self.server_os.is_empty() {
            tracing::info!(
                "OS has not been set, will be used {} as default OS.",
                DEFAULT_OS
            );
            self.server_os = DEFAULT_OS.to_string();
        }
    }
}

/// The driver's view of a provisioned server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceRecord {
    pub id: String,
    pub name: String,
    pub status: String,
    pub private_ip_addresses: Vec<String>,
    pub public_ip_addresses: Vec<String>,
    pub cpu: String,
    pub ram: String,
    pub storage: String,
}

impl InstanceRecord {
    pub fn is_provisioned(&self) -> bool {
        !self.id.is_empty()
    }

    /// Overwrite with a fresh provider answer.
    ///
    /// Fields the provider left empty keep their previous value so a sparse
    /// status payload does not wipe addresses learnt at creation.
    pub fn update_from(&mut self, server: LongServer) {
        if !server.id.is_empty() {
            self.id = server.id;
        }
        if !server.name.is_empty() {
            self.name = server.name;
        }
        self.status = server.status;
        if !server.private_ip_addresses.is_empty() {
            self.private_ip_addresses = server.private_ip_addresses;
        }
        if !server.public_ip_addresses.is_empty() {
            self.public_ip_addresses = server.public_ip_addresses;
        }
        if !server.cpu.is_empty() {
            self.cpu = server.cpu;
        }
        if !server.ram.is_empty() {
            self.ram = server.ram;
        }
        if !server.storage.is_empty() {
            self.storage = server.storage;
        }
    }

    /// Forget the server after it has been deleted.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl From<LongServer> for InstanceRecord {
    fn from(server: LongServer) -> Self {
        Self {
            id: server.id,
            name: server.name,
            status: server.status,
            private_ip_addresses: server.private_ip_addresses,
            public_ip_addresses: server.public_ip_addresses,
            cpu: server.cpu,
            ram: server.ram,
            storage: server.storage,
        }
    }
}

/// Timing knobs for convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverTimeouts {
    /// Interval between status polls
    pub poll_interval: Duration,

    /// Give up waiting for a state after this long; `None` waits forever
    pub converge: Option<Duration>,
}

impl Default for DriverTimeouts {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            converge: Some(Duration::from_secs(30 * 60)),
        }
    }
}
