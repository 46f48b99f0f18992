//! A single named, independently keyed, encrypted record.
//!
//! Each container owns its own `KeyMaterial`, so every record has its own
//! salt and IV even though they all derive from the same master password.
//!
//! Encryption:
//!   1. Serialize `{format, name, data}` as a JSON record (`data`
//!      base64-encoded, so it may hold arbitrary bytes).
//!   2. Pad with PKCS#7 and encrypt with AES-256-CBC.
//!   3. Tag with `HMAC-SHA256(key, id || ciphertext)`.  Binding the id
//!      means a ciphertext cannot be re-labelled as another container.
//!
//! Decryption checks the tag first and only then touches the cipher.
//!
//! The tag does not cover the IV, and in CBC the IV only affects the first
//! plaintext block.  That block is always exactly `{"format":"sbx1"`, so
//! any change to the IV shows up as `Corruption` instead of a silently
//! altered name.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::kdf::{KeyMaterial, DEFAULT_ITERATIONS};
use crate::crypto::{compute_tag, decrypt, encrypt, tags_match};
use crate::errors::{Result, SecureBoxError};

use super::format::EncryptedContainer;
use super::ContainerId;

/// Marker filling the first cipher block of every record.
const RECORD_FORMAT: &str = "sbx1";

/// Plaintext layout inside the ciphertext.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(deny_unknown_fields)]
struct Record {
    format: String,
    name: String,
    /// Base64 of the raw payload bytes.
    data: String,
}

/// One decrypted container.
pub struct Container {
    id: ContainerId,
    name: String,
    data: Vec<u8>,
    key: KeyMaterial,
}

impl Container {
    /// An empty container with fresh key material.
    pub fn new(id: ContainerId) -> Self {
        Self::with_iterations(id, DEFAULT_ITERATIONS)
    }

    /// An empty container whose key material uses `iterations` PBKDF2 rounds.
    pub fn with_iterations(id: ContainerId, iterations: u32) -> Self {
        Self {
            id,
            name: String::new(),
            data: Vec::new(),
            key: KeyMaterial::with_iterations(iterations),
        }
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The payload as text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name.zeroize();
        self.name = name.into();
    }

    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        self.data.zeroize();
        self.data = data.into();
    }

    pub fn key_material(&self) -> &KeyMaterial {
        &self.key
    }

    /// Replace the key material with a fresh salt and IV.
    pub(crate) fn regenerate_key(&mut self, iterations: u32) {
        self.key = KeyMaterial::with_iterations(iterations);
    }

    /// Encrypt and authenticate this container under `password`.
    pub fn encrypt(&mut self, password: &str) -> Result<EncryptedContainer> {
        let record = Record {
            format: RECORD_FORMAT.to_string(),
            name: self.name.clone(),
            data: BASE64.encode(&self.data),
        };
        let plaintext = Zeroizing::new(serde_json::to_vec(&record).map_err(|e| {
            SecureBoxError::SerializationError(format!("container {}: {e}", self.id))
        })?);

        let key = self.key.derive(password);
        let ciphertext = encrypt(&key[..], self.key.iv(), &plaintext)?;
        let mac = compute_tag(&key[..], &[self.id.to_string().as_bytes(), &ciphertext[..]])?;

        Ok(EncryptedContainer {
            ciphertext,
            mac,
            key: self.key.describe(),
        })
    }

    /// Verify and decrypt a stored container.
    pub fn decrypt(
        password: &str,
        id: ContainerId,
        encrypted: &EncryptedContainer,
    ) -> Result<Self> {
        Self::decrypt_parts(
            password,
            id,
            &encrypted.ciphertext,
            &encrypted.mac,
            &encrypted.key.salt,
            &encrypted.key.iv,
            encrypted.key.iterations(),
        )
    }

    /// Verify and decrypt a container from its raw stored parts.
    ///
    /// Errors, in the order they are checked:
    /// - `MalformedInput` if the salt or IV has the wrong length.
    /// - `ContainerIntegrity` if the tag does not match.  No decryption or
    ///   unpadding happens before this check passes.
    /// - `Corruption` if the tag matched but the padding or record is bad.
    pub fn decrypt_parts(
        password: &str,
        id: ContainerId,
        ciphertext: &[u8],
        mac: &str,
        salt: &[u8],
        iv: &[u8],
        iterations: u32,
    ) -> Result<Self> {
        let mut key_material = KeyMaterial::restore(salt, iv, iterations)?;
        let key = key_material.derive(password);

        let expected = compute_tag(&key[..], &[id.to_string().as_bytes(), ciphertext])?;
        if !tags_match(&expected, mac) {
            tracing::warn!(container = id, "container MAC mismatch");
            return Err(SecureBoxError::ContainerIntegrity { id });
        }

        let plaintext = Zeroizing::new(
            decrypt(&key[..], key_material.iv(), ciphertext).map_err(|e| {
                SecureBoxError::Corruption {
                    id,
                    reason: e.to_string(),
                }
            })?,
        );

        let mut record: Record =
            serde_json::from_slice(&plaintext).map_err(|e| SecureBoxError::Corruption {
                id,
                reason: format!("invalid record: {e}"),
            })?;
        if record.format != RECORD_FORMAT {
            return Err(SecureBoxError::Corruption {
                id,
                reason: format!("unknown record format '{}'", record.format),
            });
        }
        let data = BASE64
            .decode(&record.data)
            .map_err(|e| SecureBoxError::Corruption {
                id,
                reason: format!("invalid payload encoding: {e}"),
            })?;

        Ok(Self {
            id,
            name: std::mem::take(&mut record.name),
            data,
            key: key_material,
        })
    }
}

impl PartialEq for Container {
    // Key material is not part of a container's identity.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name && self.data == other.data
    }
}

impl Eq for Container {}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("data_len", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        self.name.zeroize();
        self.data.zeroize();
    }
}
