//! The encrypted attribute store: validated, access-checked, encrypted-at-rest
//! user fields.
//!
//! # Write path
//!
//! policy check → empty-value shortcut → format validation → encrypt → one
//! `Backend::put`.
//!
//! # Read path
//!
//! policy check → `Backend::get` → decrypt.
//!
//! # Security invariants
//!
//! - No ciphertext is ever derived from input that failed validation.
//! - Nothing reaches the backend when a check fails.
//! - Plaintext values and key material are never logged; only user ids and
//!   field names are.
//! - Decryption failures are reported as one opaque error whatever the cause.
//!
//! An empty input is stored as an empty value without encryption. This is the
//! explicit "clear field" path, not a validation bypass.

pub mod backend;
pub mod file;

pub use backend::{Backend, BackendError, MemoryBackend};
pub use file::FileBackend;

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::crypto::cipher::{decrypt_field, encrypt_field, EncryptedField};
use crate::crypto::FieldKey;
use crate::fields::Field;
use crate::policy::{Access, AccessPolicy};

/// Opaque user identity.
pub type UserId = u64;

/// Errors returned by [`EncryptedAttributeStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The access policy denied the operation.
    #[error("access denied")]
    Unauthorized,

    /// The input does not satisfy the field's format rule.
    #[error("invalid format for field {0}")]
    InvalidFormat(Field),

    /// The stored value could not be decrypted with the current key.
    #[error("stored value could not be decrypted")]
    DecryptionFailed,

    /// The value could not be encrypted.
    #[error("value could not be encrypted")]
    EncryptionFailed,

    /// The backend failed.
    #[error("backend unavailable")]
    BackendUnavailable(#[source] BackendError),
}

/// Validates, encrypts, and persists sensitive user fields.
///
/// Cheap to clone; all collaborators are `Arc`-shared.
#[derive(Clone)]
pub struct EncryptedAttributeStore {
    key: Arc<FieldKey>,
    policy: Arc<dyn AccessPolicy>,
    backend: Arc<dyn Backend>,
}

impl EncryptedAttributeStore {
    pub fn new(
        key: Arc<FieldKey>,
        policy: Arc<dyn AccessPolicy>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            key,
            policy,
            backend,
        }
    }

    /// Validate, encrypt and store `raw` as `field` of `target`.
    ///
    /// An empty `raw` clears the field.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unauthorized`] if the policy denies the write.
    /// - [`StoreError::InvalidFormat`] if `raw` fails the field's rule.
    /// - [`StoreError::EncryptionFailed`] on an AEAD failure.
    /// - [`StoreError::BackendUnavailable`] if the backend write fails.
    pub fn write(
        &self,
        actor: UserId,
        target: UserId,
        field: Field,
        raw: &str,
    ) -> Result<(), StoreError> {
        if !self.policy.allows(actor, target, field, Access::Write) {
            debug!(actor, user_id = target, %field, "write denied");
            return Err(StoreError::Unauthorized);
        }

        let stored = if raw.is_empty() {
            Bytes::new()
        } else {
            let normalized = field
                .rule()
                .normalize(raw)
                .ok_or(StoreError::InvalidFormat(field))?;
            let encrypted = encrypt_field(normalized.as_bytes(), &self.key, &aad(target, field))
                .map_err(|e| {
                    warn!(user_id = target, %field, error = %e, "field encryption failed");
                    StoreError::EncryptionFailed
                })?;
            Bytes::from(encrypted.to_string_repr())
        };

        let cleared = stored.is_empty();
        self.backend
            .put(target, field.storage_key(), stored)
            .map_err(StoreError::BackendUnavailable)?;

        info!(actor, user_id = target, %field, cleared, "field written");
        Ok(())
    }

    /// Fetch and decrypt `field` of `target`. Unset fields read as `""`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unauthorized`] if the policy denies the read.
    /// - [`StoreError::BackendUnavailable`] if the backend read fails.
    /// - [`StoreError::DecryptionFailed`] if the stored value cannot be
    ///   authenticated and decrypted with the current key.
    pub fn read(&self, actor: UserId, target: UserId, field: Field) -> Result<String, StoreError> {
        if !self.policy.allows(actor, target, field, Access::Read) {
            debug!(actor, user_id = target, %field, "read denied");
            return Err(StoreError::Unauthorized);
        }

        let stored = match self
            .backend
            .get(target, field.storage_key())
            .map_err(StoreError::BackendUnavailable)?
        {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Ok(String::new()),
        };

        self.decrypt(target, field, &stored).map_err(|reason| {
            // The cause stays in the server log only.
            warn!(user_id = target, %field, reason, "stored field could not be decrypted");
            StoreError::DecryptionFailed
        })
    }

    /// Read every registered field of `target`, in [`Field::ALL`] order.
    ///
    /// Each field is read independently; one failure does not hide the others.
    pub fn read_row(
        &self,
        actor: UserId,
        target: UserId,
    ) -> Vec<(Field, Result<String, StoreError>)> {
        Field::ALL
            .into_iter()
            .map(|field| (field, self.read(actor, target, field)))
            .collect()
    }

    fn decrypt(&self, target: UserId, field: Field, stored: &[u8]) -> Result<String, &'static str> {
        let parsed = EncryptedField::from_bytes(stored).map_err(|_| "malformed envelope")?;
        let plaintext = decrypt_field(&parsed, &self.key, &aad(target, field))
            .map_err(|_| "authentication failed")?;
        String::from_utf8(plaintext).map_err(|_| "plaintext is not UTF-8")
    }
}

/// Associated data binding a ciphertext to its owner and field.
fn aad(owner: UserId, field: Field) -> Vec<u8> {
    format!("{owner}:{}", field.storage_key()).into_bytes()
}
