//! Credential resolution and client handle caching.
//!
//! Explicit client id/secret win when both are set. Otherwise the ambient
//! configuration file is used, the same one the phoenixNAP CLI reads:
//! `~/.pnap/config.yaml`, or whatever `PNAP_CONFIG` points at.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use super::error::{ProviderError, ProviderResult};
use super::{BmcApi, Connector};

/// Environment variable overriding the ambient config file location.
pub const CONFIG_PATH_ENV: &str = "PNAP_CONFIG";

/// OAuth2 application credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AmbientConfig {
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Default location of the ambient config file.
    pub fn ambient_path() -> ProviderResult<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(shellexpand::tilde(&path).as_ref()));
            }
        }

        let home = dirs::home_dir()
            .ok_or_else(|| ProviderError::auth("cannot determine home directory"))?;
        Ok(home.join(".pnap").join("config.yaml"))
    }

    /// Load credentials from a YAML file with `clientId` / `clientSecret` keys.
    pub fn from_file(path: &Path) -> ProviderResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::auth_with(format!("cannot read {}", path.display()), e)
        })?;

        let ambient: AmbientConfig = serde_yaml::from_str(&content).map_err(|e| {
            ProviderError::auth_with(format!("invalid config file {}", path.display()), e)
        })?;

        if ambient.client_id.trim().is_empty() || ambient.client_secret.trim().is_empty() {
            return Err(ProviderError::auth(format!(
                "clientId and clientSecret must be set in {}",
                path.display()
            )));
        }

        Ok(Self::new(
            ambient.client_id.trim(),
            ambient.client_secret.trim(),
        ))
    }
}

/// Produces the API handle once and hands out the cached copy afterwards.
pub struct CredentialResolver {
    connector: Arc<dyn Connector>,
    ambient_path: Option<PathBuf>,
    cached: Option<Arc<dyn BmcApi>>,
}

impl CredentialResolver {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            ambient_path: None,
            cached: None,
        }
    }

    /// Read ambient credentials from `path` instead of the default location.
    #[allow(dead_code)]
    pub fn with_ambient_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ambient_path = Some(path.into());
        self
    }

    /// Whether a handle has already been resolved.
    pub fn is_resolved(&self) -> bool {
        self.cached.is_some()
    }

    /// Resolve a client handle.
    ///
    /// Explicit values are used only when both are non-empty. A failure to
    /// build the handle from ambient configuration is returned with its cause.
    pub fn resolve(&mut self, client_id: &str, client_secret: &str) -> ProviderResult<Arc<dyn BmcApi>> {
        if let Some(client) = &self.cached {
            return Ok(Arc::clone(client));
        }

        let credentials = if !client_id.is_empty() && !client_secret.is_empty() {
            Credentials::new(client_id, client_secret)
        } else {
            let path = match &self.ambient_path {
                Some(path) => path.clone(),
                None => Credentials::ambient_path()?,
            };
            tracing::debug!("Loading PNAP credentials from {}", path.display());
            Credentials::from_file(&path)?
        };

        let client = self.connector.connect(&credentials)?;
        self.cached = Some(Arc::clone(&client));
        Ok(client)
    }
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("ambient_path", &self.ambient_path)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
