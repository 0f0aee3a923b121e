//! The pnap machine driver.
//!
//! `Driver` exposes the lifecycle verbs an orchestrator calls. Each verb
//! resolves a client handle, issues the provider call through `Lifecycle`,
//! and blocks until the server converges on the verb's target state.
//!
//! ```text
//! verb ──▶ CredentialResolver ──▶ mapper ──▶ Lifecycle ──▶ identity
//!              (cached handle)   (requests)  (poll loop)   (ip, url, user)
//! ```

pub mod config;
pub mod flags;
pub mod identity;
pub mod lifecycle;
pub mod mapper;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

pub use config::{DriverConfig, DriverTimeouts, HostIdentity, InstanceRecord};
pub use flags::{CreateFlag, DriverOptions};
pub use lifecycle::{Lifecycle, Operation};
pub use state::MachineState;

use crate::error::{DriverError, Result};
use crate::provider::{BmcApi, Connector, CredentialResolver};
use crate::ssh;

pub const DRIVER_NAME: &str = "pnap";

/// A single BMC server managed on behalf of the orchestrator.
#[derive(Debug)]
pub struct Driver {
    pub host: HostIdentity,
    pub config: DriverConfig,
    pub instance: InstanceRecord,
    timeouts: DriverTimeouts,
    credentials: CredentialResolver,
}

impl Driver {
    pub fn new(host: HostIdentity, connector: Arc<dyn Connector>) -> Self {
        Self {
            host,
            config: DriverConfig::default(),
            instance: InstanceRecord::default(),
            timeouts: DriverTimeouts::default(),
            credentials: CredentialResolver::new(connector),
        }
    }

    pub fn with_timeouts(mut self, timeouts: DriverTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[allow(dead_code)]
    pub fn with_credential_resolver(mut self, credentials: CredentialResolver) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn driver_name(&self) -> &'static str {
        DRIVER_NAME
    }

    pub fn create_flags() -> &'static [CreateFlag] {
        flags::create_flags()
    }

    /// Copy create options into the configuration, verbatim.
    pub fn set_config_from_flags(&mut self, options: &DriverOptions) -> Result<()> {
        self.config.server_hostname = options.string(flags::FLAG_SERVER_HOSTNAME);
        self.config.server_location = options.string(flags::FLAG_SERVER_LOCATION);
        self.config.server_os = options.string(flags::FLAG_SERVER_OS);
        self.config.server_type = options.string(flags::FLAG_SERVER_TYPE);
        self.config.server_description = options.string(flags::FLAG_SERVER_DESCRIPTION);
        self.config.client_identifier = options.string(flags::FLAG_CLIENT_IDENTIFIER);
        self.config.client_secret = options.string(flags::FLAG_CLIENT_SECRET);
        Ok(())
    }

    /// Normalise the configuration before Create. Never fails.
    pub fn pre_create_check(&mut self) -> Result<()> {
        self.config.apply_defaults();
        Ok(())
    }

    /// Name sent to the provider.
    pub fn server_name(&self) -> &str {
        if self.config.server_hostname.is_empty() {
            &self.host.machine_name
        } else {
            &self.config.server_hostname
        }
    }

    fn client(&mut self) -> Result<Arc<dyn BmcApi>> {
        self.credentials
            .resolve(&self.config.client_identifier, &self.config.client_secret)
            .map_err(DriverError::Auth)
    }

    fn require_instance(&self, verb: &'static str) -> Result<()> {
        if self.instance.is_provisioned() {
            Ok(())
        } else {
            Err(DriverError::NoInstance { verb })
        }
    }

    fn refresh_ip(&mut self) {
        if let Some(ip) = identity::resolve_address(&self.instance) {
            self.host.ip_address = ip.to_string();
        }
    }

    /// Provision the server, wait until it is running, then settle the
    /// login account for its OS.
    ///
    /// A failure after the provider accepted the request leaves the record
    /// in place; nothing is rolled back.
    pub async fn create(&mut self) -> Result<()> {
        self.create_server().await.map_err(|e| e.during("create"))
    }

    async fn create_server(&mut self) -> Result<()> {
        tracing::info!("Creating pnap machine instance...");
        tracing::info!(
            "Driver params host:{} clientID:{} type:{} os:{}",
            self.server_name(),
            self.config.client_identifier,
            self.config.server_type,
            self.config.server_os
        );

        let key_path = self.host.ssh_key_path();
        ssh::generate_key_pair(&key_path)?;
        let public_key = ssh::read_public_key(&key_path)?;

        let api = self.client()?;

        let request = mapper::build_create_request(&self.config, self.server_name(), &public_key);
        let response = api.create_server(&request).await?;
        let mut record = mapper::parse_server_response(response)?;
        if record.name.is_empty() {
            record.name = request.name;
        }
        self.instance = record;
        self.refresh_ip();

        tracing::info!("Server {} accepted, status {}", self.instance.id, self.instance.status);

        Lifecycle::new(api.as_ref(), &mut self.instance, self.timeouts)
            .await_state(MachineState::Running)
            .await?;
        self.refresh_ip();
        self.ssh_username();
        Ok(())
    }

    async fn run(&mut self, verb: &'static str, operation: Operation) -> Result<()> {
        self.require_instance(verb)?;
        let api = self.client()?;
        Lifecycle::new(api.as_ref(), &mut self.instance, self.timeouts)
            .execute(operation)
            .await?;
        self.refresh_ip();
        Ok(())
    }

    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("Starting pnap machine instance...");
        self.run("start", Operation::PowerOn)
            .await
            .map_err(|e| e.during("start"))
    }

    /// Stop gracefully.
    pub async fn stop(&mut self) -> Result<()> {
        tracing::info!("Stopping pnap machine instance...");
        self.run("stop", Operation::ShutDown)
            .await
            .map_err(|e| e.during("stop"))
    }

    /// Stop forcefully. BMC has no separate power-off action, so this is a shutdown too.
    pub async fn kill(&mut self) -> Result<()> {
        tracing::info!("Killing pnap machine instance...");
        self.run("kill", Operation::ShutDown)
            .await
            .map_err(|e| e.during("kill"))
    }

    pub async fn restart(&mut self) -> Result<()> {
        tracing::info!("Rebooting pnap machine instance...");
        self.run("restart", Operation::Reboot)
            .await
            .map_err(|e| e.during("restart"))
    }

    /// Delete the server. Succeeds without any provider call when nothing
    /// was created, and treats an already-deleted server as success.
    pub async fn remove(&mut self) -> Result<()> {
        tracing::info!("Removing pnap machine instance with id {}", self.instance.id);
        if !self.instance.is_provisioned() {
            return Ok(());
        }

        self.run("remove", Operation::Delete)
            .await
            .map_err(|e| e.during("remove"))?;
        self.host.ip_address.clear();
        Ok(())
    }

    /// Query the provider for the current state.
    pub async fn state(&mut self) -> Result<MachineState> {
        self.query_state().await.map_err(|e| e.during("get state"))
    }

    async fn query_state(&mut self) -> Result<MachineState> {
        self.require_instance("get state")?;
        let api = self.client()?;
        let state = Lifecycle::new(api.as_ref(), &mut self.instance, self.timeouts)
            .query()
            .await?;
        self.refresh_ip();
        Ok(state)
    }

    /// Like `state`, but a failed query reads as `MachineState::Error`.
    pub async fn current_state(&mut self) -> MachineState {
        if !self.instance.is_provisioned() {
            return MachineState::None;
        }
        match self.state().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Could not get state of {}: {}", self.host.machine_name, e);
                MachineState::Error
            }
        }
    }

    /// Public address, or `None` before one has been assigned.
    pub fn ip(&self) -> Option<&str> {
        identity::resolve_address(&self.instance).or_else(|| {
            Some(self.host.ip_address.as_str()).filter(|ip| !ip.is_empty())
        })
    }

    pub fn ssh_hostname(&self) -> Option<&str> {
        self.ip()
    }

    pub fn ssh_port(&self) -> u16 {
        self.host.ssh_port
    }

    /// Docker URL, e.g. `tcp://1.2.3.4:2376`; empty without an address.
    pub fn url(&self) -> String {
        identity::docker_url(self.ip().unwrap_or_default())
    }

    /// SSH user for the configured OS image.
    pub fn ssh_username(&mut self) -> &str {
        let user = identity::login_account(&self.config.server_os, &self.host.ssh_user).to_string();
        self.host.ssh_user = user;
        &self.host.ssh_user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testing::{fast_timeouts, server, Call, ScriptedApi, ScriptedConnector};
    use crate::provider::ApiResponse;

    fn driver(api: &Arc<ScriptedApi>, store: &std::path::Path) -> (Driver, Arc<ScriptedConnector>) {
        let connector = ScriptedConnector::new(api.clone());
        let mut driver = Driver::new(HostIdentity::new("node-1", store), connector.clone())
            .with_timeouts(fast_timeouts());
        driver.config.client_identifier = "id".to_string();
        driver.config.client_secret = "secret".to_string();
        (driver, connector)
    }

    fn provisioned(api: &Arc<ScriptedApi>, store: &std::path::Path) -> Driver {
        let (mut d, _) = driver(api, store);
        d.instance.id = "abc".to_string();
        d
    }

    #[tokio::test]
    async fn test_create_converges_to_running() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        api.on_create(ApiResponse::new(
            200,
            r#"{"id":"abc","status":"creating","publicIpAddresses":[]}"#,
        ))
        .on_get(server("abc", "creating"))
        .on_get(ApiResponse::new(
            200,
            r#"{"id":"abc","status":"powered-on","publicIpAddresses":["198.51.100.7"]}"#,
        ));

        let (mut d, _) = driver(&api, dir.path());
        d.config.server_os = "ubuntu/bionic".to_string();
        d.config.server_type = "s1.c1.medium".to_string();
        d.config.server_location = "PHX".to_string();

        d.create().await.unwrap();

        assert_eq!(d.instance.id, "abc");
        assert_eq!(d.instance.status, "powered-on");
        assert_eq!(d.ip(), Some("198.51.100.7"));
        assert_eq!(d.url(), "tcp://198.51.100.7:2376");
        assert_eq!(d.host.ssh_user, "ubuntu");

        let calls = api.calls();
        assert_eq!(calls.len(), 3);
        match &calls[0] {
            Call::Create(request) => {
                assert_eq!(request.name, "node-1");
                assert_eq!(request.os, "ubuntu/bionic");
                assert_eq!(request.ssh_keys.len(), 1);
                assert!(request.ssh_keys[0].starts_with("ssh-ed25519 "));
                assert_eq!(request.ssh_keys[0], request.ssh_keys[0].trim());
            }
            other => panic!("expected create, got {other:?}"),
        }
        assert!(d.host.ssh_key_path().exists());
    }

    #[tokio::test]
    async fn test_create_rejected_status_is_provider_error() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        api.on_create(ApiResponse::new(
            400,
            r#"{"message":"Invalid","validationErrors":["location not supported"]}"#,
        ));

        let (mut d, _) = driver(&api, dir.path());
        let err = d.create().await.unwrap_err();

        assert_eq!(err.provider_status(), Some(400));
        assert!(err.to_string().starts_with("create failed:"));
        assert!(err.to_string().contains("location not supported"));
        assert!(!d.instance.is_provisioned());
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_create_keeps_record_when_wait_fails() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        api.on_create(server("abc", "creating"))
            .on_get(ApiResponse::new(500, ""));

        let (mut d, _) = driver(&api, dir.path());
        let err = d.create().await.unwrap_err();

        assert!(matches!(err.root(), DriverError::Provider(_)));
        // No rollback: the record still points at the server.
        assert_eq!(d.instance.id, "abc");
        assert!(!api.calls().iter().any(|c| matches!(c, Call::Delete(_))));
    }

    #[tokio::test]
    async fn test_create_without_credentials_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        let (d, connector) = driver(&api, dir.path());
        let mut d = d.with_credential_resolver(
            CredentialResolver::new(connector).with_ambient_path(dir.path().join("missing.yaml")),
        );
        d.config.client_secret.clear();

        let err = d.create().await.unwrap_err();
        assert!(matches!(err.root(), DriverError::Auth(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_credentials_resolved_once_across_verbs() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        api.on_get(server("abc", "powered-on"))
            .on_get(server("abc", "powered-off"));

        let (mut d, connector) = driver(&api, dir.path());
        d.instance.id = "abc".to_string();

        d.state().await.unwrap();
        d.state().await.unwrap();

        assert_eq!(connector.connects.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_start_stop_restart_targets() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        api.on_action(ApiResponse::new(200, "{}"))
            .on_get(server("abc", "powered-on"))
            .on_action(ApiResponse::new(200, "{}"))
            .on_get(server("abc", "powered-off"))
            .on_action(ApiResponse::new(200, "{}"))
            .on_get(server("abc", "rebooting"))
            .on_get(server("abc", "powered-on"));

        let mut d = provisioned(&api, dir.path());
        d.start().await.unwrap();
        d.stop().await.unwrap();
        d.restart().await.unwrap();

        assert_eq!(
            api.calls(),
            vec![
                Call::PowerOn("abc".to_string()),
                Call::Get("abc".to_string()),
                Call::ShutDown("abc".to_string()),
                Call::Get("abc".to_string()),
                Call::Reboot("abc".to_string()),
                Call::Get("abc".to_string()),
                Call::Get("abc".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_kill_waits_for_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        api.on_action(ApiResponse::new(200, "{}"))
            .on_get(server("abc", "powered-off"));

        let mut d = provisioned(&api, dir.path());
        d.kill().await.unwrap();
        assert_eq!(d.instance.status, "powered-off");
    }

    #[tokio::test]
    async fn test_verbs_fail_fast_without_instance() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        let (mut d, connector) = driver(&api, dir.path());

        let err = d.start().await.unwrap_err();
        assert!(matches!(err.root(), DriverError::NoInstance { verb: "start" }));
        assert!(d.stop().await.is_err());
        assert!(d.restart().await.is_err());
        assert!(d.state().await.is_err());

        assert!(api.calls().is_empty());
        assert!(connector.connects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        api.on_delete(ApiResponse::new(404, ""));

        let mut d = provisioned(&api, dir.path());
        d.host.ip_address = "198.51.100.7".to_string();

        d.remove().await.unwrap();
        assert!(!d.instance.is_provisioned());
        assert_eq!(d.ip(), None);

        d.remove().await.unwrap();
        assert_eq!(api.calls(), vec![Call::Delete("abc".to_string())]);
    }

    #[tokio::test]
    async fn test_remove_without_instance_makes_no_call() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        let (mut d, connector) = driver(&api, dir.path());

        d.remove().await.unwrap();
        assert!(api.calls().is_empty());
        assert!(connector.connects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_rejected_status() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        api.on_delete(ApiResponse::new(
            409,
            r#"{"message":"Server is locked","validationErrors":[]}"#,
        ));

        let mut d = provisioned(&api, dir.path());
        let err = d.remove().await.unwrap_err();

        assert_eq!(err.provider_status(), Some(409));
        assert_eq!(d.instance.id, "abc");
    }

    #[tokio::test]
    async fn test_state_error_status_raises() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        api.on_get(ApiResponse::new(500, r#"{"message":"oops"}"#))
            .on_get(ApiResponse::new(500, r#"{"message":"oops"}"#));

        let mut d = provisioned(&api, dir.path());
        let err = d.state().await.unwrap_err();
        assert_eq!(err.provider_status(), Some(500));
        assert!(err.to_string().starts_with("get state failed:"));

        assert_eq!(d.current_state().await, MachineState::Error);
    }

    #[tokio::test]
    async fn test_current_state_of_uncreated_machine() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        let (mut d, _) = driver(&api, dir.path());
        assert_eq!(d.current_state().await, MachineState::None);
    }

    #[test]
    fn test_flags_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        let (mut d, _) = driver(&api, dir.path());

        let options: DriverOptions = [
            (flags::FLAG_SERVER_OS, "centos/centos7"),
            (flags::FLAG_SERVER_LOCATION, "ASH"),
            (flags::FLAG_SERVER_TYPE, "s2.c1.medium"),
            (flags::FLAG_SERVER_DESCRIPTION, "build box"),
            (flags::FLAG_SERVER_HOSTNAME, "builder-01"),
            (flags::FLAG_CLIENT_IDENTIFIER, "client-id"),
            (flags::FLAG_CLIENT_SECRET, "client-secret"),
        ]
        .into_iter()
        .collect();

        d.set_config_from_flags(&options).unwrap();

        assert_eq!(d.config.server_os, "centos/centos7");
        assert_eq!(d.config.server_location, "ASH");
        assert_eq!(d.config.server_type, "s2.c1.medium");
        assert_eq!(d.config.server_description, "build box");
        assert_eq!(d.config.server_hostname, "builder-01");
        assert_eq!(d.config.client_identifier, "client-id");
        assert_eq!(d.config.client_secret, "client-secret");
        assert_eq!(d.server_name(), "builder-01");
        assert_eq!(d.ssh_username(), "centos");
    }

    #[test]
    fn test_pre_create_check_restores_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        let (mut d, _) = driver(&api, dir.path());

        d.set_config_from_flags(&DriverOptions::default()).unwrap();
        assert!(d.config.server_os.is_empty());

        d.pre_create_check().unwrap();
        assert_eq!(d.config.server_os, config::DEFAULT_OS);
        assert_eq!(d.config.server_type, config::DEFAULT_TYPE);
        assert_eq!(d.config.server_location, config::DEFAULT_LOCATION);
        assert_eq!(d.server_name(), "node-1");
    }

    #[test]
    fn test_url_empty_without_address() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        let (d, _) = driver(&api, dir.path());
        assert_eq!(d.url(), "");
        assert_eq!(d.ssh_hostname(), None);
        assert_eq!(d.driver_name(), "pnap");
        assert_eq!(Driver::create_flags().len(), 7);
    }

    #[test]
    fn test_ssh_username_keeps_previous_for_unknown_os() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new();
        let (mut d, _) = driver(&api, dir.path());
        d.config.server_os = "windows/srv2019std".to_string();
        d.host.ssh_user = "Admin".to_string();
        assert_eq!(d.ssh_username(), "Admin");
    }
}
