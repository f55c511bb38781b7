//! [`FieldKey`]: the process-wide symmetric key used for every field.
//!
//! The key is configured as an ASCII-safe string:
//!
//! ```text
//! base64url-no-pad( key[32] || sha256(key)[0..4] )
//! ```
//!
//! The trailing checksum catches truncated or mistyped keys at startup instead
//! of at the first decryption.

use aes_gcm_siv::aead::{rand_core::RngCore, OsRng};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of the checksum appended to the ASCII-safe encoding.
pub const CHECKSUM_LEN: usize = 4;

/// Errors produced while loading a key.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The string is not valid unpadded base64url.
    #[error("key is not valid base64url")]
    Encoding,

    /// The decoded material has an unexpected length.
    #[error("key has invalid length: expected {} bytes, got {0}", KEY_LEN + CHECKSUM_LEN)]
    InvalidLength(usize),

    /// The checksum does not match the key bytes.
    #[error("key checksum mismatch")]
    Checksum,
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// Overwritten with zeroes on drop. Shared read-only behind an `Arc`.
pub struct FieldKey(Box<[u8; KEY_LEN]>);

impl FieldKey {
    /// Generate a fresh random key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut buf = Box::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut buf[..]);
        Self(buf)
    }

    /// Parse a key from its ASCII-safe string form.
    ///
    /// Surrounding whitespace is ignored so keys pasted into environment files
    /// with a trailing newline still load.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] if the encoding, length or checksum is wrong.
    pub fn from_ascii_safe(encoded: &str) -> Result<Self, KeyError> {
        let mut raw = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|_| KeyError::Encoding)?;
        if raw.len() != KEY_LEN + CHECKSUM_LEN {
            let len = raw.len();
            raw.iter_mut().for_each(|b| *b = 0);
            return Err(KeyError::InvalidLength(len));
        }

        let (key_bytes, checksum) = raw.split_at(KEY_LEN);
        let valid = checksum_of(key_bytes)[..] == *checksum;

        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(key_bytes);
        raw.iter_mut().for_each(|b| *b = 0);

        if !valid {
            return Err(KeyError::Checksum);
        }
        Ok(Self(buf))
    }

    /// Encode this key in its ASCII-safe string form.
    pub fn to_ascii_safe(&self) -> String {
        let mut raw = Vec::with_capacity(KEY_LEN + CHECKSUM_LEN);
        raw.extend_from_slice(&self.0[..]);
        raw.extend_from_slice(&checksum_of(&self.0[..]));
        let encoded = URL_SAFE_NO_PAD.encode(&raw);
        raw.iter_mut().for_each(|b| *b = 0);
        encoded
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

fn checksum_of(key_bytes: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(key_bytes);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

impl Drop for FieldKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_safe_round_trip() {
        let key = FieldKey::generate();
        let encoded = key.to_ascii_safe();
        let parsed = FieldKey::from_ascii_safe(&encoded).unwrap();
        assert_eq!(parsed.as_bytes(), key.as_bytes());
    }

    #[test]
    fn tolerates_trailing_newline() {
        let key = FieldKey::generate();
        let encoded = format!("{}\n", key.to_ascii_safe());
        assert!(FieldKey::from_ascii_safe(&encoded).is_ok());
    }

    #[test]
    fn rejects_bad_encoding() {
        assert!(matches!(
            FieldKey::from_ascii_safe("not base64!!"),
            Err(KeyError::Encoding)
        ));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            FieldKey::from_ascii_safe(""),
            Err(KeyError::InvalidLength(0))
        ));
    }

    #[test]
    fn rejects_truncated_key() {
        let encoded = FieldKey::generate().to_ascii_safe();
        let truncated = &encoded[..encoded.len() - 8];
        assert!(FieldKey::from_ascii_safe(truncated).is_err());
    }

    #[test]
    fn rejects_checksum_mismatch() {
        let mut raw = vec![0x42u8; KEY_LEN];
        raw.extend_from_slice(&[0, 0, 0, 0]);
        let encoded = URL_SAFE_NO_PAD.encode(&raw);
        assert!(matches!(
            FieldKey::from_ascii_safe(&encoded),
            Err(KeyError::Checksum)
        ));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(
            FieldKey::generate().as_bytes(),
            FieldKey::generate().as_bytes()
        );
    }

    #[test]
    fn key_redacted_in_debug() {
        let key = FieldKey::generate();
        assert!(format!("{key:?}").contains("REDACTED"));
    }
}
