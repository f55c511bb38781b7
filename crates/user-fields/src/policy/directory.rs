//! In-memory snapshot of group memberships and user-editor capabilities.
//!
//! The snapshot is loaded at startup and refreshed on a configurable interval.
//! The directory uses `arc-swap` for lock-free reads on the hot path.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use arc_swap::ArcSwap;
use serde::Deserialize;

use super::MembershipProvider;
use crate::store::UserId;

/// On-disk membership document.
///
/// ```json
/// { "groups": { "Sektionsaktiva": [1, 2, 3] }, "editors": [1] }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembershipSnapshot {
    /// Group name to member ids.
    #[serde(default)]
    pub groups: HashMap<String, HashSet<UserId>>,
    /// Users allowed to edit other users' profiles.
    #[serde(default)]
    pub editors: HashSet<UserId>,
}

/// Shared, lock-free view of the current [`MembershipSnapshot`].
///
/// The background refresh task atomically swaps in a completely new snapshot;
/// readers never block.
#[derive(Clone, Debug)]
pub struct MembershipDirectory {
    inner: Arc<ArcSwap<MembershipSnapshot>>,
}

impl MembershipDirectory {
    /// Create a new, empty [`MembershipDirectory`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(MembershipSnapshot::default()))),
        }
    }

    /// Return the number of groups currently known.
    pub fn group_count(&self) -> usize {
        self.inner.load().groups.len()
    }

    /// Atomically replace the entire snapshot.
    pub fn replace_all(&self, snapshot: MembershipSnapshot) {
        self.inner.store(Arc::new(snapshot));
    }
}

impl Default for MembershipDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MembershipProvider for MembershipDirectory {
    fn is_member(&self, user: UserId, group: &str) -> bool {
        self.inner
            .load()
            .groups
            .get(group)
            .is_some_and(|members| members.contains(&user))
    }

    fn can_edit_users(&self, user: UserId) -> bool {
        self.inner.load().editors.contains(&user)
    }
}
