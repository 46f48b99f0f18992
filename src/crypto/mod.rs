//! Cryptographic primitives for SecureBox.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 key derivation and per-context `KeyMaterial` (`kdf`)
//! - AES-256-CBC encryption with PKCS#7 padding (`encryption`)
//! - Hex-encoded HMAC-SHA256 authentication tags (`mac`)

pub mod encryption;
pub mod kdf;
pub mod mac;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{KeyMaterial, encrypt, compute_tag, ...};
pub use encryption::{decrypt, encrypt, CipherError};
pub use kdf::{derive_key, KeyMaterial, DEFAULT_ITERATIONS};
pub use mac::{compute_tag, tags_match};
