//! AES-256-CBC encryption with PKCS#7 padding.
//!
//! CBC gives no integrity on its own.  Callers must authenticate the
//! ciphertext (see `crypto::mac`) and only call `decrypt` once the tag
//! has verified, otherwise unpadding failures become a padding oracle.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use thiserror::Error;

use crate::errors::{Result, SecureBoxError};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Low-level decryption failure.
///
/// The caller maps this onto `SecureBoxError` with the container id.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("invalid key or IV length")]
    InvalidLength,

    #[error("invalid padding or ciphertext length")]
    BadPadding,
}

/// Pad `plaintext` to the block size and encrypt it under `key` and `iv`.
pub fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|e| SecureBoxError::EncryptionFailed(format!("invalid key or IV length: {e}")))?;

    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypt `ciphertext` and strip the PKCS#7 padding.
pub fn decrypt(
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> std::result::Result<Vec<u8>, CipherError> {
    let cipher =
        Aes256CbcDec::new_from_slices(key, iv).map_err(|_| CipherError::InvalidLength)?;

    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CipherError::BadPadding)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x42; 32];
    const IV: [u8; 16] = [0x24; 16];

    #[test]
    fn ciphertext_is_padded_to_block_size() {
        let ct = encrypt(&KEY, &IV, b"sixteen byte msg").unwrap();
        // A full block of padding is appended when the input is aligned.
        assert_eq!(ct.len(), 32);

        let ct = encrypt(&KEY, &IV, b"").unwrap();
        assert_eq!(ct.len(), BLOCK_SIZE);
    }

    #[test]
    fn roundtrip() {
        let ct = encrypt(&KEY, &IV, b"hello world").unwrap();
        assert_eq!(decrypt(&KEY, &IV, &ct).unwrap(), b"hello world");
    }

    #[test]
    fn rejects_bad_lengths() {
        assert!(encrypt(&KEY[..16], &IV, b"x").is_err());
        assert_eq!(
            decrypt(&KEY, &IV[..8], &[0u8; 16]),
            Err(CipherError::InvalidLength)
        );
    }

    #[test]
    fn truncated_ciphertext_is_bad_padding() {
        let ct = encrypt(&KEY, &IV, b"some plaintext").unwrap();
        assert_eq!(
            decrypt(&KEY, &IV, &ct[..ct.len() - 3]),
            Err(CipherError::BadPadding)
        );
    }
}
