//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::crypto::FieldKey;
use crate::policy::{GroupPolicy, MembershipDirectory};
use crate::store::{Backend, EncryptedAttributeStore, MemoryBackend};

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or already `Arc`-backed) so
/// that Axum can clone the state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// The encrypted attribute store; owns the key and the backend.
    pub store: EncryptedAttributeStore,
    /// Group policy, also consulted directly for results-grid access.
    pub policy: Arc<GroupPolicy<MembershipDirectory>>,
    /// Lock-free membership snapshot, reported by the health check.
    pub directory: MembershipDirectory,
    /// Name of the HTTP header carrying the actor's user id.
    pub actor_header_name: Arc<String>,
}

impl AppState {
    /// Wire the store, policy and directory together.
    pub fn new(
        key: Arc<FieldKey>,
        backend: Arc<dyn Backend>,
        directory: MembershipDirectory,
        active_group: String,
        actor_header_name: String,
    ) -> Self {
        let policy = Arc::new(GroupPolicy::new(active_group, directory.clone()));
        let store = EncryptedAttributeStore::new(key, policy.clone(), backend);
        Self {
            store,
            policy,
            directory,
            actor_header_name: Arc::new(actor_header_name),
        }
    }
}

impl Default for AppState {
    /// Creates an [`AppState`] with a fresh key, in-memory storage and an empty
    /// directory, suitable for tests.
    fn default() -> Self {
        Self::new(
            Arc::new(FieldKey::generate()),
            Arc::new(MemoryBackend::new()),
            MembershipDirectory::new(),
            "Sektionsaktiva".into(),
            "X-Actor-Id".into(),
        )
    }
}
