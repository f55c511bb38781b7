//! AES-256-GCM-SIV field encryption primitives and key loading.
//!
//! This module is intentionally free of storage and HTTP dependencies.
//!
//! # Ciphertext format
//!
//! ```text
//! v1.<base64url-no-pad(nonce)>.<base64url-no-pad(ciphertext+tag)>
//! ```
//!
//! The `v1` prefix enables future algorithm or key-version migration without
//! breaking existing ciphertext.

pub mod cipher;
pub mod key;

pub use key::FieldKey;
