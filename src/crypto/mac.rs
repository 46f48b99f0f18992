//! HMAC-SHA256 authentication tags.
//!
//! Tags are lowercase hex strings, as stored in the vault document. The
//! vault-level tag is computed over the concatenation of those strings.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::errors::{Result, SecureBoxError};

type HmacSha256 = Hmac<Sha256>;

/// Compute `HMAC-SHA256(key, parts[0] || parts[1] || ...)` as hex.
pub fn compute_tag(key: &[u8], parts: &[&[u8]]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| SecureBoxError::EncryptionFailed(format!("invalid HMAC key: {e}")))?;

    for part in parts {
        mac.update(part);
    }

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Compare two hex tags in constant time.
///
/// The comparison is over the exact stored text, so a tag that differs
/// only in letter case is still rejected.
pub fn tags_match(expected: &str, actual: &str) -> bool {
    expected.as_bytes().ct_eq(actual.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_64_hex_chars() {
        let tag = compute_tag(b"key", &[b"message".as_slice()]).unwrap();
        assert_eq!(tag.len(), 64);
        assert!(tag.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn parts_are_concatenated() {
        let split = compute_tag(b"key", &[b"12".as_slice(), b"34".as_slice()]).unwrap();
        let joined = compute_tag(b"key", &[b"1234".as_slice()]).unwrap();
        assert_eq!(split, joined);
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2.
        let tag = compute_tag(b"Jefe", &[b"what do ya want for nothing?".as_slice()]).unwrap();
        assert_eq!(
            tag,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn tags_match_is_exact() {
        let tag = compute_tag(b"key", &[b"m".as_slice()]).unwrap();
        assert!(tags_match(&tag, &tag.clone()));
        assert!(!tags_match(&tag, &tag.to_uppercase()));
        assert!(!tags_match(&tag, &tag[..63]));
        assert!(!tags_match(&tag, "invalid"));
    }
}
