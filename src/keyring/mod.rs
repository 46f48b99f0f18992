//! OS keyring integration for password caching.
//!
//! Stores and retrieves the master password of a SecureBox vault from the
//! operating system's secure credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)
//!
//! All operations fail gracefully: if the keyring is unavailable, the
//! error is returned and the caller falls back to a password prompt.

use crate::errors::{Result, SecureBoxError};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "securebox";

/// Build a keyring entry key from a vault path.
///
/// Callers pass the canonical path, one entry per vault file.
fn entry_key(vault_path: &str) -> String {
    format!("securebox:{vault_path}")
}

fn open_entry(vault_path: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(SERVICE_NAME, &entry_key(vault_path))
        .map_err(|e| SecureBoxError::KeyringError(format!("failed to create keyring entry: {e}")))
}

/// Store a password in the OS keyring for a specific vault.
pub fn store_password(vault_path: &str, password: &str) -> Result<()> {
    let entry = open_entry(vault_path)?;

    entry.set_password(password).map_err(|e| {
        SecureBoxError::KeyringError(format!("failed to store password in keyring: {e}"))
    })?;

    Ok(())
}

/// Retrieve a password from the OS keyring for a specific vault.
///
/// Returns `None` if no password is stored (rather than an error).
pub fn get_password(vault_path: &str) -> Result<Option<String>> {
    let entry = open_entry(vault_path)?;

    match entry.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(SecureBoxError::KeyringError(format!(
            "failed to read from keyring: {e}"
        ))),
    }
}

/// Delete a stored password from the OS keyring.
pub fn delete_password(vault_path: &str) -> Result<()> {
    let entry = open_entry(vault_path)?;

    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()), // Already gone, that's fine.
        Err(e) => Err(SecureBoxError::KeyringError(format!(
            "failed to delete from keyring: {e}"
        ))),
    }
}
