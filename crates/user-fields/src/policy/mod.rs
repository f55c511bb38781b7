//! Access control for encrypted fields.
//!
//! # Responsibilities
//!
//! - Define the [`AccessPolicy`] seam the store consults before every read and write.
//! - Provide [`GroupPolicy`], which grants access to members of one named group.
//! - Load the membership snapshot from disk and keep it fresh in the background.
//!
//! # Module invariants
//!
//! - **No crypto dependencies.** Policies decide on identities only and never see
//!   field values.

pub mod directory;

pub use directory::{MembershipDirectory, MembershipSnapshot};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::time;
use tracing::{info, warn};

use crate::fields::Field;
use crate::store::UserId;

/// Direction of an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Decides whether `actor` may access `field` of `target`.
#[cfg_attr(test, mockall::automock)]
pub trait AccessPolicy: Send + Sync {
    fn allows(&self, actor: UserId, target: UserId, field: Field, access: Access) -> bool;
}

/// Lookup of group memberships and capabilities for the current actor.
pub trait MembershipProvider: Send + Sync {
    /// Returns `true` if `user` is a member of the named group.
    fn is_member(&self, user: UserId, group: &str) -> bool;

    /// Returns `true` if `user` may edit other users' profiles.
    fn can_edit_users(&self, user: UserId) -> bool;
}

/// Grants access to members of a single named group.
///
/// A member may access their own fields; accessing another user's fields
/// additionally requires the user-editor capability. Reads and writes use the
/// same rule.
#[derive(Debug, Clone)]
pub struct GroupPolicy<M> {
    group: String,
    members: M,
}

impl<M: MembershipProvider> GroupPolicy<M> {
    pub fn new(group: impl Into<String>, members: M) -> Self {
        Self {
            group: group.into(),
            members,
        }
    }

    /// Whether `actor` may list other users' fields in the results grid.
    pub fn can_view_grid(&self, actor: UserId) -> bool {
        self.members.can_edit_users(actor)
    }
}

impl<M: MembershipProvider> AccessPolicy for GroupPolicy<M> {
    fn allows(&self, actor: UserId, target: UserId, _field: Field, _access: Access) -> bool {
        if !self.members.is_member(actor, &self.group) {
            return false;
        }
        actor == target || self.members.can_edit_users(actor)
    }
}

/// Read the membership document at `path` and atomically replace `directory`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid document.
pub async fn load_from_file(path: &Path, directory: &MembershipDirectory) -> Result<()> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read membership file {}", path.display()))?;
    let snapshot: MembershipSnapshot = serde_json::from_str(&text)
        .with_context(|| format!("membership file {} is not valid JSON", path.display()))?;

    let groups = snapshot.groups.len();
    let editors = snapshot.editors.len();
    directory.replace_all(snapshot);
    info!(groups, editors, "membership directory loaded");
    Ok(())
}

/// Spawn a background task that periodically reloads the membership file.
///
/// On refresh failure the previous snapshot is retained and a warning is
/// emitted; the service keeps answering with stale memberships.
pub fn refresh_task(
    path: PathBuf,
    interval_secs: u64,
    directory: MembershipDirectory,
) -> tokio::task::JoinHandle<()> {
    let interval = std::time::Duration::from_secs(interval_secs);
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        // First tick fires immediately; the startup load already ran.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = load_from_file(&path, &directory).await {
                warn!(error = %e, "membership refresh failed; retaining previous snapshot");
            }
        }
    })
}
