//! Off-site backup of the serialized vault document.
//!
//! The vault only needs an opaque store keyed by name that can upload,
//! download and delete a file.  Every operation reports a plain `bool`:
//! backups are best-effort and a failed transfer never touches the
//! in-memory vault.
//!
//! Transport settings live inside the vault itself, in the reserved
//! credentials container, as JSON tagged by `kind`:
//!
//! ```text
//! {"kind": "directory", "path": "/mnt/nas/securebox"}
//! {"kind": "http", "endpoint": "https://backup.example.com/securebox"}
//! ```
//!
//! The reserved token container holds an opaque session token that the
//! HTTP backend sends as a bearer token.

pub mod directory;
#[cfg(feature = "http-backup")]
pub mod http;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SecureBoxError};

pub use directory::DirectoryBackup;
#[cfg(feature = "http-backup")]
pub use http::HttpBackup;

/// Suffix appended to the local file name to form the remote backup name.
pub const BACKUP_SUFFIX: &str = ".BAK";

/// An opaque remote object store.
pub trait CloudBackup {
    /// Copy the local file at `local` to the remote object `remote`.
    fn upload(&self, local: &Path, remote: &str) -> bool;

    /// Fetch the remote object `remote` into the local file `local`.
    fn download(&self, remote: &str, local: &Path) -> bool;

    /// Remove the remote object `remote`.
    fn delete(&self, remote: &str) -> bool;

    /// A session token to persist back into the vault, if the transport
    /// obtained or refreshed one while connecting.
    fn session_token(&self) -> Option<String> {
        None
    }
}

/// Transport settings stored in the reserved credentials container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackupCredentials {
    /// Copy backups into a local or mounted directory.
    Directory { path: String },
    /// PUT/GET/DELETE backups under an HTTP endpoint.
    Http { endpoint: String },
}

impl BackupCredentials {
    /// Parse credentials from a reserved container payload.
    ///
    /// An empty (or whitespace-only) payload means "not configured" and
    /// returns `Ok(None)`.
    pub fn parse(payload: &[u8]) -> Result<Option<Self>> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| SecureBoxError::Cloud("credentials are not valid UTF-8".into()))?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(text)
            .map(Some)
            .map_err(|e| SecureBoxError::Cloud(format!("invalid credentials: {e}")))
    }
}

/// Remote object name for a backup of the local file at `path`.
pub fn backup_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    Some(format!("{name}{BACKUP_SUFFIX}"))
}

/// Build a transport from stored credentials and an optional session token.
pub fn connect(
    credentials: &BackupCredentials,
    token: Option<&str>,
) -> Result<Box<dyn CloudBackup>> {
    match credentials {
        BackupCredentials::Directory { path } => {
            let _ = token;
            Ok(Box::new(DirectoryBackup::new(path)))
        }
        BackupCredentials::Http { endpoint } => connect_http(endpoint, token),
    }
}

#[cfg(feature = "http-backup")]
fn connect_http(endpoint: &str, token: Option<&str>) -> Result<Box<dyn CloudBackup>> {
    Ok(Box::new(HttpBackup::new(endpoint, token)?))
}

#[cfg(not(feature = "http-backup"))]
fn connect_http(endpoint: &str, token: Option<&str>) -> Result<Box<dyn CloudBackup>> {
    let _ = (endpoint, token);
    Err(SecureBoxError::Cloud(
        "HTTP backup support not compiled — rebuild with `cargo build --features http-backup`"
            .into(),
    ))
}
