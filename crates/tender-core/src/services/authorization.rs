//! Authorization gate: is a user responsible for an organization?

use std::sync::Arc;

use tender_shared::EntityId;
use tracing::warn;

use crate::error::DomainError;
use crate::repositories::OrganizationRepository;

pub struct AuthorizationGate<O: OrganizationRepository> {
    org_repo: Arc<O>,
}

impl<O: OrganizationRepository> AuthorizationGate<O> {
    pub fn new(org_repo: Arc<O>) -> Self {
        Self { org_repo }
    }

    /// Read-path check. Store failures count as "not responsible" and are logged.
    pub async fn is_responsible(&self, user_id: EntityId, organization_id: EntityId) -> bool {
        match self.check_responsible(user_id, organization_id).await {
            Ok(responsible) => responsible,
            Err(e) => {
                warn!(
                    user_id,
                    organization_id, "Responsibility lookup failed, denying: {}", e
                );
                false
            }
        }
    }

    /// Like [`Self::is_responsible`] but store failures are returned to the caller.
    pub async fn check_responsible(
        &self,
        user_id: EntityId,
        organization_id: EntityId,
    ) -> Result<bool, DomainError> {
        Ok(self
            .org_repo
            .find_responsibility(user_id, organization_id)
            .await?
            .is_some())
    }

    pub async fn ensure_responsible(
        &self,
        user_id: EntityId,
        organization_id: EntityId,
    ) -> Result<(), DomainError> {
        if self.check_responsible(user_id, organization_id).await? {
            Ok(())
        } else {
            warn!(
                "Unauthorized: user {} is not responsible for organization {}",
                user_id, organization_id
            );
            Err(DomainError::Unauthorized {
                user_id,
                organization_id,
            })
        }
    }

    /// Current responsible users of the organization, read fresh from the store.
    pub async fn responsibles(&self, organization_id: EntityId) -> Result<Vec<EntityId>, DomainError> {
        self.org_repo.list_responsibles(organization_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrganizationResponsibility;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        pub OrgRepo {}

        #[async_trait]
        impl OrganizationRepository for OrgRepo {
            async fn find_responsibility(
                &self,
                user_id: EntityId,
                organization_id: EntityId,
            ) -> Result<Option<OrganizationResponsibility>, DomainError>;

            async fn list_responsibles(&self, organization_id: EntityId) -> Result<Vec<EntityId>, DomainError>;
        }
    }

    fn failing_repo() -> MockOrgRepo {
        let mut repo = MockOrgRepo::new();
        repo.expect_find_responsibility()
            .returning(|_, _| Err(DomainError::StoreUnavailable("connection reset".into())));
        repo
    }

    #[tokio::test]
    async fn test_responsible_user_passes() {
        let mut repo = MockOrgRepo::new();
        repo.expect_find_responsibility()
            .with(eq(21), eq(2))
            .times(2)
            .returning(|user_id, organization_id| {
                Ok(Some(OrganizationResponsibility {
                    organization_id,
                    user_id,
                }))
            });
        let gate = AuthorizationGate::new(Arc::new(repo));

        assert!(gate.is_responsible(21, 2).await);
        assert!(gate.ensure_responsible(21, 2).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_user_is_unauthorized() {
        let mut repo = MockOrgRepo::new();
        repo.expect_find_responsibility().returning(|_, _| Ok(None));
        let gate = AuthorizationGate::new(Arc::new(repo));

        let err = gate.ensure_responsible(99, 2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(!gate.is_responsible(99, 2).await);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_on_read_path() {
        let gate = AuthorizationGate::new(Arc::new(failing_repo()));
        assert!(!gate.is_responsible(21, 2).await);
    }

    #[tokio::test]
    async fn test_store_failure_propagates_on_write_path() {
        let gate = AuthorizationGate::new(Arc::new(failing_repo()));

        let err = gate.check_responsible(21, 2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        let err = gate.ensure_responsible(21, 2).await.unwrap_err();
        assert!(matches!(err, DomainError::StoreUnavailable(_)));
    }
}
