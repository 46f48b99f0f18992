//! JSON vault document format.
//!
//! A vault file is a single JSON object:
//!
//! ```text
//! {
//!   "containers": {
//!     "<id>": { "ciphertext": base64, "mac": hex, "key": {"salt": base64, "iv": base64} },
//!     ...
//!   },
//!   "key": {"salt": base64, "iv": base64},
//!   "mac": hex
//! }
//! ```
//!
//! - **containers**: keyed by the decimal id, reserved ids `-1`/`-2`
//!   included.  Stored in a `BTreeMap` so the keys are always in string
//!   order, which is also the order the vault MAC is computed in.
//! - **key**: the vault's own salt and IV.  An `iterations` field is only
//!   written when the PBKDF2 round count differs from the default.
//! - **mac**: HMAC-SHA256 over the concatenated container MAC strings.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::kdf::DEFAULT_ITERATIONS;
use crate::errors::{Result, SecureBoxError};

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

/// Persisted form of a `KeyMaterial` (never contains the derived key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDescriptor {
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub iv: Vec<u8>,

    /// PBKDF2 rounds, omitted when equal to the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
}

impl KeyDescriptor {
    /// Effective PBKDF2 round count.
    pub fn iterations(&self) -> u32 {
        self.iterations.unwrap_or(DEFAULT_ITERATIONS)
    }
}

/// One encrypted container as stored in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedContainer {
    /// AES-256-CBC output of the padded `{name, data}` record.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,

    /// Hex HMAC-SHA256 over `id || ciphertext`.
    pub mac: String,

    pub key: KeyDescriptor,
}

/// The whole persisted vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultDocument {
    pub containers: BTreeMap<String, EncryptedContainer>,
    pub key: KeyDescriptor,
    pub mac: String,
}

impl VaultDocument {
    /// Parse a document, failing with `Format` on anything that is not a
    /// structurally valid vault.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            SecureBoxError::Format(format!(
                "invalid JSON (file may be corrupted or empty): {e}"
            ))
        })
    }

    /// Render the document as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SecureBoxError::SerializationError(format!("vault document: {e}")))
    }

    /// Read and parse a document from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SecureBoxError::VaultNotFound(path.to_path_buf()),
            _ => SecureBoxError::Io(e),
        })?;
        Self::from_json(&text)
    }

    /// Container MAC strings in the order the vault MAC covers them.
    pub fn container_macs(&self) -> impl Iterator<Item = &str> {
        self.containers.values().map(|c| c.mac.as_str())
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> KeyDescriptor {
        KeyDescriptor {
            salt: vec![1u8; 32],
            iv: vec![2u8; 16],
            iterations: None,
        }
    }

    #[test]
    fn default_iterations_are_not_written() {
        let json = serde_json::to_string(&descriptor()).unwrap();
        assert!(!json.contains("iterations"));
        assert_eq!(descriptor().iterations(), DEFAULT_ITERATIONS);
    }

    #[test]
    fn custom_iterations_roundtrip() {
        let d = KeyDescriptor {
            iterations: Some(2_000),
            ..descriptor()
        };
        let json = serde_json::to_string(&d).unwrap();
        let back: KeyDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.iterations(), 2_000);
    }

    #[test]
    fn salt_and_iv_are_base64() {
        let json = serde_json::to_value(descriptor()).unwrap();
        assert_eq!(json["salt"], BASE64.encode([1u8; 32]));
        assert_eq!(json["iv"], BASE64.encode([2u8; 16]));
    }

    #[test]
    fn container_keys_are_string_sorted() {
        let mut containers = BTreeMap::new();
        for id in ["10", "2", "-1", "0", "-2", "1"] {
            containers.insert(
                id.to_string(),
                EncryptedContainer {
                    ciphertext: vec![],
                    mac: format!("mac{id}"),
                    key: descriptor(),
                },
            );
        }
        let doc = VaultDocument {
            containers,
            key: descriptor(),
            mac: String::new(),
        };
        let order: Vec<&str> = doc.container_macs().collect();
        assert_eq!(order, ["mac-1", "mac-2", "mac0", "mac1", "mac10", "mac2"]);
    }

    #[test]
    fn from_json_rejects_garbage() {
        let err = VaultDocument::from_json("invalid json").unwrap_err();
        assert!(matches!(err, SecureBoxError::Format(_)));
    }

    #[test]
    fn from_json_rejects_missing_fields() {
        let err = VaultDocument::from_json(r#"{"containers": {}}"#).unwrap_err();
        assert!(matches!(err, SecureBoxError::Format(_)));
    }

    #[test]
    fn from_json_rejects_bad_base64() {
        let text = r#"{"containers": {}, "key": {"salt": "!!", "iv": "AA=="}, "mac": ""}"#;
        let err = VaultDocument::from_json(text).unwrap_err();
        assert!(matches!(err, SecureBoxError::Format(_)));
    }

    #[test]
    fn read_missing_file_is_vault_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = VaultDocument::read(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, SecureBoxError::VaultNotFound(_)));
    }
}
