use std::path::PathBuf;
use thiserror::Error;

use crate::vault::ContainerId;

/// All errors that can occur in SecureBox.
#[derive(Debug, Error)]
pub enum SecureBoxError {
    // --- Integrity and decoding errors ---
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Integrity error: invalid MAC for container {id} — it may have been tampered with")]
    ContainerIntegrity { id: ContainerId },

    #[error("Container {id} is corrupted: {reason}")]
    Corruption { id: ContainerId, reason: String },

    #[error("Integrity error: invalid vault MAC — the vault may have been tampered with")]
    VaultIntegrity,

    #[error("Invalid vault document: {0}")]
    Format(String),

    #[error("Container with ID {0} not found")]
    NotFound(ContainerId),

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    // --- Vault file errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    // --- Cloud backup errors ---
    #[error("Cloud backup error: {0}")]
    Cloud(String),

    // --- Keyring errors ---
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl SecureBoxError {
    /// Returns `true` for failures that mean "wrong password or tampered data".
    ///
    /// `Session::login` re-prompts for the master password on these.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::ContainerIntegrity { .. } | Self::VaultIntegrity | Self::Corruption { .. }
        )
    }
}

/// Convenience type alias for SecureBox results.
pub type Result<T> = std::result::Result<T, SecureBoxError>;
