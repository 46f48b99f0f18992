//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! Every encryption context (the vault itself and each container) owns a
//! `KeyMaterial`: a random salt, a random CBC IV and the iteration count.
//! The derived key is cached together with the password that produced it,
//! so re-encrypting under the same password does not pay for another
//! 500 000 rounds.

use std::fmt;

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::errors::{Result, SecureBoxError};
use crate::vault::format::KeyDescriptor;

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the CBC initialization vector (one AES block).
pub const IV_LEN: usize = 16;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// PBKDF2 rounds used unless configured otherwise.
pub const DEFAULT_ITERATIONS: u32 = 500_000;

/// Lowest iteration count accepted from config or a stored document.
pub const MIN_ITERATIONS: u32 = 1_000;

/// Highest iteration count accepted from config or a stored document.
///
/// Stored counts are used before any tag is checked.
pub const MAX_ITERATIONS: u32 = 10_000_000;

/// Derive a 32-byte key from `password` and `salt`.
///
/// The same password + salt + iterations always produce the same key.
pub fn derive_key(password: &[u8], salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key[..]);
    key
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Generate a cryptographically random 16-byte IV.
pub fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);
    iv
}

/// Check an iteration count coming from outside the process.
pub fn validate_iterations(iterations: u32) -> Result<()> {
    if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&iterations) {
        return Err(SecureBoxError::MalformedInput(format!(
            "PBKDF2 iterations must be between {MIN_ITERATIONS} and {MAX_ITERATIONS} (got {iterations})"
        )));
    }
    Ok(())
}

/// The last key derived by a `KeyMaterial`, and the password it came from.
#[derive(Clone)]
struct CachedKey {
    password: Zeroizing<String>,
    key: Zeroizing<[u8; KEY_LEN]>,
}

/// Salt, IV and cached derived key for one encryption context.
///
/// Salt and IV never change after construction.  Rotating a password
/// means building a fresh `KeyMaterial`, never mutating an old one.
#[derive(Clone)]
pub struct KeyMaterial {
    salt: [u8; SALT_LEN],
    iv: [u8; IV_LEN],
    iterations: u32,
    cached: Option<CachedKey>,
}

impl KeyMaterial {
    /// Fresh random salt and IV with the default iteration count.
    pub fn generate() -> Self {
        Self::with_iterations(DEFAULT_ITERATIONS)
    }

    /// Fresh random salt and IV with an explicit iteration count.
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            salt: generate_salt(),
            iv: generate_iv(),
            iterations,
            cached: None,
        }
    }

    /// Rebuild key material from stored parts.
    ///
    /// Fails with `MalformedInput` if the salt is not 32 bytes, the IV is
    /// not 16 bytes, or the iteration count is out of range.
    pub fn restore(salt: &[u8], iv: &[u8], iterations: u32) -> Result<Self> {
        let salt: [u8; SALT_LEN] = salt.try_into().map_err(|_| {
            SecureBoxError::MalformedInput(format!(
                "salt must be {SALT_LEN} bytes, got {}",
                salt.len()
            ))
        })?;
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| {
            SecureBoxError::MalformedInput(format!("iv must be {IV_LEN} bytes, got {}", iv.len()))
        })?;
        validate_iterations(iterations)?;

        Ok(Self {
            salt,
            iv,
            iterations,
            cached: None,
        })
    }

    /// Rebuild key material from a stored descriptor.
    pub fn from_descriptor(descriptor: &KeyDescriptor) -> Result<Self> {
        Self::restore(&descriptor.salt, &descriptor.iv, descriptor.iterations())
    }

    /// Derive (or return the cached) key for `password`.
    pub fn derive(&mut self, password: &str) -> Zeroizing<[u8; KEY_LEN]> {
        if let Some(cached) = &self.cached {
            if cached.password.as_str() == password {
                return cached.key.clone();
            }
        }

        tracing::debug!(iterations = self.iterations, "deriving key");
        let key = derive_key(password.as_bytes(), &self.salt, self.iterations);
        self.cached = Some(CachedKey {
            password: Zeroizing::new(password.to_string()),
            key: key.clone(),
        });
        key
    }

    /// Serializable description (salt, IV, iterations) for persistence.
    pub fn describe(&self) -> KeyDescriptor {
        KeyDescriptor {
            salt: self.salt.to_vec(),
            iv: self.iv.to_vec(),
            iterations: (self.iterations != DEFAULT_ITERATIONS).then_some(self.iterations),
        }
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

impl fmt::Debug for KeyMaterial {
    // Salt, IV and key stay out of debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("iterations", &self.iterations)
            .field("cached", &self.cached.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = MIN_ITERATIONS;

    #[test]
    fn generated_sizes() {
        let km = KeyMaterial::with_iterations(FAST);
        assert_eq!(km.salt().len(), 32);
        assert_eq!(km.iv().len(), 16);
    }

    #[test]
    fn generate_uses_default_iterations() {
        assert_eq!(KeyMaterial::generate().iterations(), 500_000);
    }

    #[test]
    fn two_generations_differ() {
        let a = KeyMaterial::with_iterations(FAST);
        let b = KeyMaterial::with_iterations(FAST);
        assert_ne!(a.salt(), b.salt());
        assert_ne!(a.iv(), b.iv());
    }

    #[test]
    fn derive_is_memoized_per_password() {
        let mut km = KeyMaterial::with_iterations(FAST);
        let k1 = km.derive("password");
        let k2 = km.derive("password");
        assert_eq!(*k1, *k2);

        let k3 = km.derive("new_password");
        assert_ne!(*k1, *k3);

        // Switching back recomputes and still agrees.
        let k4 = km.derive("password");
        assert_eq!(*k1, *k4);
    }

    #[test]
    fn derive_matches_free_function() {
        let mut km = KeyMaterial::with_iterations(FAST);
        let expected = derive_key(b"pw", km.salt(), FAST);
        assert_eq!(*km.derive("pw"), *expected);
    }

    #[test]
    fn pbkdf2_known_vector() {
        // RFC 7914 section 11, PBKDF2-HMAC-SHA256, c = 1, dkLen = 64 (first 32 bytes).
        let key = derive_key(b"passwd", b"salt", 1);
        assert_eq!(
            hex::encode(*key),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn iteration_bounds_are_inclusive() {
        assert!(validate_iterations(MIN_ITERATIONS).is_ok());
        assert!(validate_iterations(MAX_ITERATIONS).is_ok());
        assert!(validate_iterations(MIN_ITERATIONS - 1).is_err());
        assert!(validate_iterations(MAX_ITERATIONS + 1).is_err());
        assert!(matches!(
            KeyMaterial::restore(&[0u8; SALT_LEN], &[0u8; IV_LEN], u32::MAX),
            Err(SecureBoxError::MalformedInput(_))
        ));
    }

    #[test]
    fn restore_validates_lengths() {
        let km = KeyMaterial::with_iterations(FAST);
        assert!(KeyMaterial::restore(km.salt(), km.iv(), FAST).is_ok());

        let err = KeyMaterial::restore(b"invalid", km.iv(), FAST).unwrap_err();
        assert!(matches!(err, SecureBoxError::MalformedInput(_)));

        let err = KeyMaterial::restore(km.salt(), b"invalid", FAST).unwrap_err();
        assert!(matches!(err, SecureBoxError::MalformedInput(_)));
    }

    #[test]
    fn restore_rejects_weak_iterations() {
        let km = KeyMaterial::with_iterations(FAST);
        let err = KeyMaterial::restore(km.salt(), km.iv(), 10).unwrap_err();
        assert!(matches!(err, SecureBoxError::MalformedInput(_)));
    }

    #[test]
    fn describe_omits_default_iterations() {
        assert_eq!(KeyMaterial::generate().describe().iterations, None);
        assert_eq!(
            KeyMaterial::with_iterations(FAST).describe().iterations,
            Some(FAST)
        );
    }

    #[test]
    fn debug_does_not_leak_salt() {
        let km = KeyMaterial::with_iterations(FAST);
        let out = format!("{km:?}");
        assert!(out.contains("iterations"));
        assert!(!out.contains("salt"));
    }
}
