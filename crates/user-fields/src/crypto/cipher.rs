//! AES-256-GCM-SIV encryption and decryption of individual user fields.
//!
//! Every ciphertext is bound to its owner and field through the AEAD associated
//! data, so a value copied onto another user or another field fails
//! authentication instead of decrypting.

use aes_gcm_siv::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;

use super::key::FieldKey;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Prefix that appears at the start of every encrypted field value.
pub const VERSION_PREFIX: &str = "v1";

/// A parsed, encrypted field value.
///
/// The string representation is `v1.<base64url(nonce)>.<base64url(ciphertext+tag)>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedField {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

impl EncryptedField {
    /// Encode this value to its canonical string representation.
    pub fn to_string_repr(&self) -> String {
        format!(
            "{}.{}.{}",
            VERSION_PREFIX,
            URL_SAFE_NO_PAD.encode(self.nonce),
            URL_SAFE_NO_PAD.encode(&self.ciphertext),
        )
    }

    /// Parse the stored bytes of an encrypted field back into an [`EncryptedField`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidFormat`] if the bytes are not UTF-8 or do not
    /// match the `v1.<nonce>.<ciphertext>` structure.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CipherError> {
        let s = std::str::from_utf8(raw).map_err(|_| CipherError::InvalidFormat)?;
        let parts: Vec<&str> = s.splitn(3, '.').collect();
        if parts.len() != 3 || parts[0] != VERSION_PREFIX {
            return Err(CipherError::InvalidFormat);
        }
        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|_| CipherError::InvalidFormat)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CipherError::InvalidFormat);
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&nonce_bytes);

        let ciphertext = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|_| CipherError::InvalidFormat)?;

        Ok(Self { nonce, ciphertext })
    }
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// AES-GCM-SIV encryption or decryption failed.
    #[error("aead operation failed")]
    AeadFailure,

    /// The stored value does not match the expected envelope format.
    #[error("invalid encrypted field format")]
    InvalidFormat,
}

/// Encrypt a plaintext field value, binding it to `aad`.
///
/// A random 96-bit nonce is generated per call via the OS CSPRNG.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (unreachable
/// with a valid key and nonce).
pub fn encrypt_field(
    plaintext: &[u8],
    key: &FieldKey,
    aad: &[u8],
) -> Result<EncryptedField, CipherError> {
    let cipher = build_cipher(key)?;

    use aes_gcm_siv::aead::rand_core::RngCore;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|_| CipherError::AeadFailure)?;

    Ok(EncryptedField {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt an [`EncryptedField`] back to plaintext bytes.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] if authentication fails: wrong key,
/// wrong associated data, or tampered ciphertext.
pub fn decrypt_field(
    field: &EncryptedField,
    key: &FieldKey,
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    let nonce = Nonce::from_slice(&field.nonce);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: field.ciphertext.as_ref(),
                aad,
            },
        )
        .map_err(|_| CipherError::AeadFailure)
}

fn build_cipher(key: &FieldKey) -> Result<Aes256GcmSiv, CipherError> {
    Aes256GcmSiv::new_from_slice(key.as_bytes()).map_err(|_| CipherError::AeadFailure)
}
