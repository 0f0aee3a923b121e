//! On-disk machine records.
//!
//! Each machine lives in `<root>/machines/<name>/`, next to its SSH key, with
//! the driver state in `config.json`. The credential handle is never stored.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::driver::{Driver, DriverConfig, HostIdentity, InstanceRecord, DRIVER_NAME};
use crate::error::{DriverError, Result};
use crate::provider::Connector;

/// Environment variable overriding the store root.
pub const STORAGE_PATH_ENV: &str = "PNAP_MACHINE_STORAGE_PATH";

const CONFIG_FILE: &str = "config.json";

/// Everything needed to rebuild a driver between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachineRecord {
    pub driver_name: String,
    pub host: HostIdentity,
    pub config: DriverConfig,
    #[serde(default)]
    pub instance: InstanceRecord,
}

impl MachineRecord {
    pub fn from_driver(driver: &Driver) -> Self {
        Self {
            driver_name: driver.driver_name().to_string(),
            host: driver.host.clone(),
            config: driver.config.clone(),
            instance: driver.instance.clone(),
        }
    }

    pub fn into_driver(self, connector: Arc<dyn Connector>) -> Driver {
        let mut driver = Driver::new(self.host, connector);
        driver.config = self.config;
        driver.instance = self.instance;
        driver
    }
}

#[derive(Debug, Clone)]
pub struct MachineStore {
    root: PathBuf,
}

impl MachineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `~/.pnap-machine`.
    pub fn default_root() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DriverError::Config("Could not determine home directory".to_string()))?;
        Ok(home.join(".pnap-machine"))
    }

    /// Expand `~` and environment variables in a user-supplied root.
    pub fn expand_root(raw: &str) -> Result<PathBuf> {
        let expanded = shellexpand::full(raw)
            .map_err(|e| DriverError::Config(format!("Invalid storage path {}: {}", raw, e)))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn host(&self, name: &str) -> HostIdentity {
        HostIdentity::new(name, &self.root)
    }

    pub fn machine_dir(&self, name: &str) -> PathBuf {
        self.root.join("machines").join(name)
    }

    pub fn config_path(&self, name: &str) -> PathBuf {
        self.machine_dir(name).join(CONFIG_FILE)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.config_path(name).exists()
    }

    pub fn load(&self, name: &str) -> Result<MachineRecord> {
        let path = self.config_path(name);

        if !path.exists() {
            return Err(DriverError::Store(format!(
                "Machine {} does not exist. Run 'pnap-machine create {}' first.",
                name, name
            )));
        }

        let content = std::fs::read_to_string(&path)?;
        let record: MachineRecord = serde_json::from_str(&content)
            .map_err(|e| DriverError::Store(format!("Invalid record {}: {}", path.display(), e)))?;

        if record.driver_name != DRIVER_NAME {
            return Err(DriverError::Store(format!(
                "Machine {} belongs to driver {:?}",
                name, record.driver_name
            )));
        }

        Ok(record)
    }

    /// Write the record with owner-only permissions; it holds the client secret.
    pub fn save(&self, record: &MachineRecord) -> Result<()> {
        let path = self.config_path(&record.host.machine_name);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        tracing::debug!("Saved machine record {}", path.display());
        Ok(())
    }

    /// Delete the machine directory, keys included. Missing machines are fine.
    pub fn remove(&self, name: &str) -> Result<()> {
        let dir = self.machine_dir(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Names of stored machines, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let dir = self.root.join("machines");
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().join(CONFIG_FILE).exists() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
