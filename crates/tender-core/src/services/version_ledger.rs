// ============================================================================
// Tender Core - Version Ledger
// File: crates/tender-core/src/services/version_ledger.rs
// ============================================================================
//! Append-only content history for tenders and bids.
//!
//! Appends for the same parent are serialized by an in-process keyed lock.
//! Writers in other processes are caught by the store's unique
//! `(parent, number)` constraint, which surfaces as a retryable conflict.

use std::sync::Arc;

use dashmap::DashMap;
use tender_shared::{constants::FIRST_VERSION, EntityId};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use super::retry::{retry_on_conflict, RetryPolicy};
use crate::domain::{EntityKind, Version, VersionContent};
use crate::error::DomainError;
use crate::repositories::VersionRepository;

type ParentKey = (EntityKind, EntityId);

pub struct VersionLedger<V: VersionRepository> {
    version_repo: Arc<V>,
    locks: DashMap<ParentKey, Arc<Mutex<()>>>,
    retry: RetryPolicy,
}

/// Holds the per-parent lock and drops the map entry once nobody else waits on it.
struct ParentLock<'a> {
    locks: &'a DashMap<ParentKey, Arc<Mutex<()>>>,
    key: ParentKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ParentLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl<V: VersionRepository> VersionLedger<V> {
    pub fn new(version_repo: Arc<V>, retry: RetryPolicy) -> Self {
        Self {
            version_repo,
            locks: DashMap::new(),
            retry,
        }
    }

    async fn lock_parent(&self, key: ParentKey) -> ParentLock<'_> {
        // Built before waiting so a cancelled waiter still prunes the entry.
        let mut parent = ParentLock {
            locks: &self.locks,
            key,
            guard: None,
        };
        let lock = Arc::clone(&self.locks.entry(key).or_default());
        parent.guard = Some(lock.lock_owned().await);
        parent
    }

    async fn ensure_parent(&self, kind: EntityKind, parent_id: EntityId) -> Result<(), DomainError> {
        if self.version_repo.parent_exists(kind, parent_id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found(kind, parent_id))
        }
    }

    /// Appends `content` as version `max + 1` (or 1 for an empty history).
    pub async fn append_version(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
        content: VersionContent,
    ) -> Result<Version, DomainError> {
        self.ensure_parent(kind, parent_id).await?;

        let _lock = self.lock_parent((kind, parent_id)).await;
        let version = retry_on_conflict(self.retry, "append_version", || {
            self.append_once(kind, parent_id, &content)
        })
        .await?;

        info!("Appended {} {} version {}", kind, parent_id, version.number);
        Ok(version)
    }

    /// Derives new content from the latest version and appends it, all under
    /// the parent lock. Returns the latest version untouched when `update`
    /// yields identical content.
    pub async fn update_with<F>(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
        update: F,
    ) -> Result<Version, DomainError>
    where
        F: Fn(&VersionContent) -> Result<VersionContent, DomainError>,
    {
        self.ensure_parent(kind, parent_id).await?;

        let _lock = self.lock_parent((kind, parent_id)).await;
        retry_on_conflict(self.retry, "update_version", || {
            self.update_once(kind, parent_id, &update)
        })
        .await
    }

    async fn update_once<F>(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
        update: &F,
    ) -> Result<Version, DomainError>
    where
        F: Fn(&VersionContent) -> Result<VersionContent, DomainError>,
    {
        let current = self.latest_version(kind, parent_id).await?;
        let content = update(&current.content)?;
        if content == current.content {
            debug!("{} {} unchanged at version {}", kind, parent_id, current.number);
            return Ok(current);
        }

        let version = Version::new(kind, parent_id, current.number + 1, content);
        self.version_repo.insert_version(&version).await?;
        info!("Appended {} {} version {}", kind, parent_id, version.number);
        Ok(version)
    }

    async fn append_once(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
        content: &VersionContent,
    ) -> Result<Version, DomainError> {
        let next = self
            .version_repo
            .max_version_number(kind, parent_id)
            .await?
            .map_or(FIRST_VERSION, |max| max + 1);

        let version = Version::new(kind, parent_id, next, content.clone());
        self.version_repo.insert_version(&version).await?;
        Ok(version)
    }

    pub async fn latest_version(&self, kind: EntityKind, parent_id: EntityId) -> Result<Version, DomainError> {
        match self.version_repo.latest_version(kind, parent_id).await? {
            Some(version) => Ok(version),
            None => {
                self.ensure_parent(kind, parent_id).await?;
                Err(DomainError::NoVersionsFound { kind, parent_id })
            }
        }
    }

    pub async fn version_by_number(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
        number: i32,
    ) -> Result<Version, DomainError> {
        if number >= FIRST_VERSION {
            if let Some(version) = self.version_repo.find_version(kind, parent_id, number).await? {
                return Ok(version);
            }
        }
        self.ensure_parent(kind, parent_id).await?;
        Err(DomainError::VersionNotFound {
            kind,
            parent_id,
            number,
        })
    }

    /// Re-appends the content of version `number`. History is never rewritten,
    /// so the result always carries a new, higher number.
    pub async fn rollback_to(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
        number: i32,
    ) -> Result<Version, DomainError> {
        let target = self.version_by_number(kind, parent_id, number).await?;
        debug!("Rolling back {} {} to version {}", kind, parent_id, number);
        self.append_version(kind, parent_id, target.content).await
    }

    /// All versions, ascending.
    pub async fn history(&self, kind: EntityKind, parent_id: EntityId) -> Result<Vec<Version>, DomainError> {
        let versions = self.version_repo.list_versions(kind, parent_id).await?;
        if versions.is_empty() {
            self.ensure_parent(kind, parent_id).await?;
        }
        Ok(versions)
    }

    #[cfg(test)]
    fn tracked_parents(&self) -> usize {
        self.locks.len()
    }
}
