//! Version ledger storage (port)

use async_trait::async_trait;
use tender_shared::EntityId;

use crate::domain::{EntityKind, Version};
use crate::error::DomainError;

#[async_trait]
pub trait VersionRepository: Send + Sync {
    async fn parent_exists(&self, kind: EntityKind, parent_id: EntityId) -> Result<bool, DomainError>;

    async fn max_version_number(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
    ) -> Result<Option<i32>, DomainError>;

    /// Inserts a version row. A taken `(parent, number)` pair is
    /// `ConcurrentModification`; a missing parent is the parent's not-found error.
    /// Tender versions also write their service type back to the tender row.
    async fn insert_version(&self, version: &Version) -> Result<(), DomainError>;

    async fn latest_version(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
    ) -> Result<Option<Version>, DomainError>;

    async fn find_version(
        &self,
        kind: EntityKind,
        parent_id: EntityId,
        number: i32,
    ) -> Result<Option<Version>, DomainError>;

    /// Every version of the parent, ascending by number.
    async fn list_versions(&self, kind: EntityKind, parent_id: EntityId) -> Result<Vec<Version>, DomainError>;
}
