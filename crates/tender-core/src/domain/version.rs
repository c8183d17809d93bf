//! Versioned content snapshots

use serde::{Deserialize, Serialize};
use tender_shared::{types::now, EntityId, Timestamp};
use validator::Validate;

use super::service_type::ServiceType;
use super::status::EntityKind;
use crate::error::DomainError;

/// The mutable part of a tender or bid. Every change to it is recorded as a
/// new [`Version`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct VersionContent {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 255))]
    pub description: String,

    /// Only tenders carry a service type.
    pub service_type: Option<ServiceType>,
}

impl VersionContent {
    pub fn for_tender(
        name: impl Into<String>,
        description: impl Into<String>,
        service_type: ServiceType,
    ) -> Result<Self, DomainError> {
        Self::build(name.into(), description.into(), Some(service_type))
    }

    pub fn for_bid(name: impl Into<String>, description: impl Into<String>) -> Result<Self, DomainError> {
        Self::build(name.into(), description.into(), None)
    }

    fn build(
        name: String,
        description: String,
        service_type: Option<ServiceType>,
    ) -> Result<Self, DomainError> {
        let content = Self {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            service_type,
        };
        content.validate()?;
        Ok(content)
    }

    /// Applies a partial update. Fields left as `None` keep their current value.
    pub fn merge(
        &self,
        name: Option<String>,
        description: Option<String>,
        service_type: Option<ServiceType>,
    ) -> Result<Self, DomainError> {
        Self::build(
            name.unwrap_or_else(|| self.name.clone()),
            description.unwrap_or_else(|| self.description.clone()),
            service_type.or(self.service_type),
        )
    }
}

/// Immutable, numbered snapshot of an entity's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub kind: EntityKind,
    pub parent_id: EntityId,
    pub number: i32,
    pub content: VersionContent,
    pub updated_at: Timestamp,
}

impl Version {
    pub fn new(kind: EntityKind, parent_id: EntityId, number: i32, content: VersionContent) -> Self {
        Self {
            kind,
            parent_id,
            number,
            content,
            updated_at: now(),
        }
    }
}
