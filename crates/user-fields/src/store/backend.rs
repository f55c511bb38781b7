//! [`Backend`]: the key-value persistence the store reads and writes through.

use std::{collections::HashMap, sync::RwLock};

use bytes::Bytes;
use thiserror::Error;

use super::UserId;

/// Errors produced by a storage backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Filesystem I/O failed.
    #[error("backend I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted document could not be (de)serialised.
    #[error("backend serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    /// A persisted value is not valid base64.
    #[error("backend holds a corrupt value for user {0}")]
    Corrupt(UserId),

    /// A previous writer panicked while holding the backend lock.
    #[error("backend lock poisoned")]
    Poisoned,
}

/// Opaque per-user key-value storage.
///
/// Implementations must return exactly the bytes that were put, and a single
/// `put` or `get` must be atomic with respect to other calls.
#[cfg_attr(test, mockall::automock)]
pub trait Backend: Send + Sync {
    /// Store `value` under (`owner`, `key`), replacing any previous value.
    fn put(&self, owner: UserId, key: &str, value: Bytes) -> Result<(), BackendError>;

    /// Fetch the value under (`owner`, `key`); `None` if it was never set.
    fn get(&self, owner: UserId, key: &str) -> Result<Option<Bytes>, BackendError>;
}

/// Process-local backend. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: RwLock<HashMap<(UserId, String), Bytes>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn put(&self, owner: UserId, key: &str, value: Bytes) -> Result<(), BackendError> {
        let mut map = self.inner.write().map_err(|_| BackendError::Poisoned)?;
        map.insert((owner, key.to_owned()), value);
        Ok(())
    }

    fn get(&self, owner: UserId, key: &str) -> Result<Option<Bytes>, BackendError> {
        let map = self.inner.read().map_err(|_| BackendError::Poisoned)?;
        Ok(map.get(&(owner, key.to_owned())).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_unset_returns_none() {
        let backend = MemoryBackend::new();
        assert!(backend.get(1, "personnummer").unwrap().is_none());
    }

    #[test]
    fn put_then_get() {
        let backend = MemoryBackend::new();
        backend
            .put(1, "personnummer", Bytes::from_static(b"\x00\xffblob"))
            .unwrap();
        let got = backend.get(1, "personnummer").unwrap().unwrap();
        assert_eq!(&got[..], b"\x00\xffblob");
    }

    #[test]
    fn keys_are_scoped_per_owner_and_field() {
        let backend = MemoryBackend::new();
        backend.put(1, "a", Bytes::from_static(b"one")).unwrap();
        backend.put(2, "a", Bytes::from_static(b"two")).unwrap();
        backend.put(1, "b", Bytes::from_static(b"three")).unwrap();
        assert_eq!(&backend.get(1, "a").unwrap().unwrap()[..], b"one");
        assert_eq!(&backend.get(2, "a").unwrap().unwrap()[..], b"two");
        assert_eq!(&backend.get(1, "b").unwrap().unwrap()[..], b"three");
    }

    #[test]
    fn put_replaces_previous_value() {
        let backend = MemoryBackend::new();
        backend.put(1, "a", Bytes::from_static(b"old")).unwrap();
        backend.put(1, "a", Bytes::new()).unwrap();
        assert!(backend.get(1, "a").unwrap().unwrap().is_empty());
    }
}
