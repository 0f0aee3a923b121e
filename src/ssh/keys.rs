//! SSH key pair provisioning for new machines.
//!
//! Keys are generated in pure Rust (ed25519) and written in OpenSSH format:
//! the private half at `path`, the public half at `path.pub`.

use std::path::{Path, PathBuf};

use ssh_key::{Algorithm, LineEnding, PrivateKey};

use crate::error::{DriverError, Result};

/// Path of the public half for a private key path.
pub fn public_key_path(path: &Path) -> PathBuf {
    let mut public = path.as_os_str().to_owned();
    public.push(".pub");
    PathBuf::from(public)
}

/// Generate an ed25519 key pair at `path` with no passphrase.
///
/// Parent directories are created. Existing files are overwritten.
pub fn generate_key_pair(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            DriverError::Ssh(format!("Failed to create key directory: {}", e))
        })?;
    }

    let private_key = PrivateKey::random(&mut rand::thread_rng(), Algorithm::Ed25519)
        .map_err(|e| DriverError::Ssh(format!("Failed to generate SSH key: {}", e)))?;

    let private_openssh = private_key
        .to_openssh(LineEnding::LF)
        .map_err(|e| DriverError::Ssh(format!("Failed to encode private key: {}", e)))?;

    std::fs::write(path, private_openssh.as_bytes())
        .map_err(|e| DriverError::Ssh(format!("Failed to write private key: {}", e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| DriverError::Ssh(format!("Failed to set key permissions: {}", e)))?;
    }

    let public_openssh = private_key
        .public_key()
        .to_openssh()
        .map_err(|e| DriverError::Ssh(format!("Failed to encode public key: {}", e)))?;

    std::fs::write(public_key_path(path), format!("{}\n", public_openssh))
        .map_err(|e| DriverError::Ssh(format!("Failed to write public key: {}", e)))?;

    tracing::debug!("Generated SSH key pair at {}", path.display());

    Ok(())
}

/// Read the public half of the key pair at `path`, untrimmed.
pub fn read_public_key(path: &Path) -> Result<String> {
    let public = public_key_path(path);
    std::fs::read_to_string(&public).map_err(|e| {
        DriverError::Ssh(format!(
            "Failed to read public key {}: {}",
            public.display(),
            e
        ))
    })
}
