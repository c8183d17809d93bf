//! Organization responsibility link

use serde::{Deserialize, Serialize};
use tender_shared::EntityId;

/// A user allowed to act on behalf of an organization. Read-only for this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationResponsibility {
    pub organization_id: EntityId,
    pub user_id: EntityId,
}
