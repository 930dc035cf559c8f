//! Leader provisioning workflow
//!
//! Appointing a leader touches three systems that share no transaction:
//!
//! 1. The identity provider creates the account (privileged path, or the
//!    client path as a fallback)
//! 2. The profile row is written, unless the privileged path already did
//! 3. The led node's `leader_id` is set, then the user's scope id
//!
//! Once the account exists the workflow never fails: the temporary password
//! must reach the caller. Later failures are reported in the
//! [`ProvisionReport`] and nothing is rolled back.
//!
//! # Example
//!
//! ```
//! use shepherd_shared::gateway::{memory::MemoryEntityStore, EntityStore};
//! use shepherd_shared::hierarchy::HierarchyIndex;
//! use shepherd_shared::identity::{local::LocalIdentityProvider, ProvisionRequest};
//! use shepherd_shared::models::role::Assignment;
//! use shepherd_shared::provisioning::provision_leader;
//! use shepherd_shared::testing::Fixture;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut f = Fixture::new();
//! let zone = f.zone("North");
//! let store = Arc::new(MemoryEntityStore::with_snapshot(f.snapshot()));
//! let identity = LocalIdentityProvider::new("a-secret-that-is-at-least-32-bytes-long");
//!
//! let index = HierarchyIndex::build(store.fetch_snapshot().await?);
//! let report = provision_leader(
//!     &Assignment::SuperAdmin,
//!     &index,
//!     store.as_ref(),
//!     &identity,
//!     ProvisionRequest {
//!         email: "grace@example.org".to_string(),
//!         name: "Grace".to_string(),
//!         phone: None,
//!         assignment: Assignment::ZoneLeader { zone_id: Some(zone) },
//!     },
//! )
//! .await?;
//!
//! assert!(report.primary_succeeded && report.linking_succeeded);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::{can_create_user, AuthzError};
use crate::gateway::{EntityStore, NewRecord, RecordPatch, StoreError};
use crate::hierarchy::HierarchyIndex;
use crate::identity::{IdentityError, IdentityProvider, ProvisionPath, ProvisionRequest};
use crate::models::node::NodeRef;
use crate::models::role::Assignment;
use crate::models::user::{CreateUser, UpdateUser};
use crate::models::{area::UpdateArea, cell::UpdateCell, zone::UpdateZone};

/// Outcome of a provisioning run whose account was created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionReport {
    pub user_id: Uuid,

    pub temporary_password: String,

    pub path: ProvisionPath,

    /// Whether the identity provider wrote the profile row itself
    pub profile_created: bool,

    /// The profile row exists
    pub primary_succeeded: bool,

    /// The node and the user point at each other
    pub linking_succeeded: bool,

    /// Why a step after account creation failed
    pub failure_reason: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Denied(#[from] AuthzError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Zone and area the target scope sits in, for the creation check
fn target_scope(
    index: &HierarchyIndex,
    assignment: &Assignment,
) -> Result<(Option<Uuid>, Option<Uuid>), ProvisionError> {
    let Some(scope) = assignment.scope() else {
        return Ok((None, None));
    };
    if scope == NodeRef::Organization {
        return Ok((None, None));
    }

    let ancestry = index
        .ancestry(scope)
        .ok_or_else(|| ProvisionError::Invalid(format!("{scope} does not exist")))?;
    Ok((ancestry.zone_id, ancestry.area_id))
}

/// Sets the node's leader, then the user's scope
async fn link(
    store: &dyn EntityStore,
    user_id: Uuid,
    assignment: &Assignment,
) -> Result<(), StoreError> {
    let leader = Some(Some(user_id));
    let node_patch = match *assignment {
        Assignment::ZoneLeader { zone_id: Some(id) } => Some((
            id,
            RecordPatch::Zone(UpdateZone {
                leader_id: leader,
                ..Default::default()
            }),
        )),
        Assignment::AreaLeader { area_id: Some(id) } => Some((
            id,
            RecordPatch::Area(UpdateArea {
                leader_id: leader,
                ..Default::default()
            }),
        )),
        Assignment::CellLeader { cell_id: Some(id) } => Some((
            id,
            RecordPatch::Cell(UpdateCell {
                leader_id: leader,
                ..Default::default()
            }),
        )),
        _ => None,
    };

    let Some((node_id, patch)) = node_patch else {
        return Ok(());
    };

    store.update(node_id, patch).await?;
    store
        .update(
            user_id,
            RecordPatch::User(UpdateUser {
                assignment: Some(assignment.clone()),
                ..Default::default()
            }),
        )
        .await?;

    Ok(())
}

/// Creates a leader account and links it into the hierarchy
///
/// `index` must be built from the store's current snapshot; it is used for
/// the authorization check only.
///
/// # Errors
///
/// Fails before anything is written when the request is invalid, the actor
/// may not create the role in that scope, or the identity provider refuses.
pub async fn provision_leader(
    actor: &Assignment,
    index: &HierarchyIndex,
    store: &dyn EntityStore,
    identity: &dyn IdentityProvider,
    request: ProvisionRequest,
) -> Result<ProvisionReport, ProvisionError> {
    request
        .validate()
        .map_err(|e| ProvisionError::Invalid(e.to_string()))?;

    let (target_zone, target_area) = target_scope(index, &request.assignment)?;
    can_create_user(actor, request.assignment.role(), target_zone, target_area)?;

    let account = identity.provision_user(&request).await?;
    let mut report = ProvisionReport {
        user_id: account.user_id,
        temporary_password: account.temporary_password,
        path: account.path,
        profile_created: account.profile_created,
        primary_succeeded: account.profile_created,
        linking_succeeded: false,
        failure_reason: None,
    };

    if !report.primary_succeeded {
        let profile = NewRecord::User(CreateUser {
            id: account.user_id,
            email: request.email.clone(),
            name: request.name.clone(),
            phone: request.phone.clone(),
            assignment: Assignment::new(request.assignment.role(), None),
        });

        match store.create(profile).await {
            Ok(_) => report.primary_succeeded = true,
            Err(e) => {
                tracing::warn!(user_id = %account.user_id, error = %e, "Profile row was not created");
                report.failure_reason = Some(e.to_string());
                return Ok(report);
            }
        }
    }

    match link(store, account.user_id, &request.assignment).await {
        Ok(()) => report.linking_succeeded = true,
        Err(e) => {
            tracing::warn!(user_id = %account.user_id, error = %e, "Hierarchy linking failed");
            report.failure_reason = Some(e.to_string());
        }
    }

    tracing::info!(
        user_id = %report.user_id,
        role = %request.assignment.role(),
        path = %report.path,
        linked = report.linking_succeeded,
        "Provisioned leader"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryEntityStore;
    use crate::gateway::EntityKind;
    use crate::identity::local::LocalIdentityProvider;
    use crate::testing::Fixture;
    use std::sync::Arc;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn request(assignment: Assignment) -> ProvisionRequest {
        ProvisionRequest {
            email: "martha@example.org".to_string(),
            name: "Martha".to_string(),
            phone: Some("555-0100".to_string()),
            assignment,
        }
    }

    struct Setup {
        store: Arc<MemoryEntityStore>,
        identity: LocalIdentityProvider,
        index: HierarchyIndex,
        zone: Uuid,
        area: Uuid,
        other_area: Uuid,
        cell: Uuid,
    }

    async fn setup() -> Setup {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let other_area = f.area(zone, "A2");
        let cell = f.cell(area, "C1");
        let store = Arc::new(MemoryEntityStore::with_snapshot(f.snapshot()));
        let identity = LocalIdentityProvider::new(SECRET).with_profile_store(store.clone());
        let index = HierarchyIndex::build(store.fetch_snapshot().await.unwrap());

        Setup {
            store,
            identity,
            index,
            zone,
            area,
            other_area,
            cell,
        }
    }

    #[tokio::test]
    async fn test_privileged_provisioning_links_node() {
        let s = setup().await;
        let report = provision_leader(
            &Assignment::ZoneLeader { zone_id: Some(s.zone) },
            &s.index,
            s.store.as_ref(),
            &s.identity,
            request(Assignment::CellLeader { cell_id: Some(s.cell) }),
        )
        .await
        .unwrap();

        assert_eq!(report.path, ProvisionPath::Privileged);
        assert!(report.primary_succeeded);
        assert!(report.linking_succeeded);
        assert!(report.failure_reason.is_none());

        let index = HierarchyIndex::build(s.store.fetch_snapshot().await.unwrap());
        assert_eq!(index.cell(s.cell).unwrap().leader_id, Some(report.user_id));
        assert_eq!(
            index.user(report.user_id).unwrap().assignment,
            Assignment::CellLeader { cell_id: Some(s.cell) }
        );
    }

    #[tokio::test]
    async fn test_client_fallback_writes_profile_then_links() {
        let s = setup().await;
        s.identity.set_privileged_enabled(false);

        let report = provision_leader(
            &Assignment::SuperAdmin,
            &s.index,
            s.store.as_ref(),
            &s.identity,
            request(Assignment::AreaLeader { area_id: Some(s.area) }),
        )
        .await
        .unwrap();

        assert_eq!(report.path, ProvisionPath::Client);
        assert!(!report.profile_created);
        assert!(report.primary_succeeded);
        assert!(report.linking_succeeded);

        let index = HierarchyIndex::build(s.store.fetch_snapshot().await.unwrap());
        assert_eq!(index.area(s.area).unwrap().leader_id, Some(report.user_id));
        assert_eq!(index.user(report.user_id).unwrap().assignment.area_id(), Some(s.area));
    }

    #[tokio::test]
    async fn test_linking_failure_keeps_user() {
        let s = setup().await;
        s.store.reject_writes_to(EntityKind::Cell).await;

        let report = provision_leader(
            &Assignment::SuperAdmin,
            &s.index,
            s.store.as_ref(),
            &s.identity,
            request(Assignment::CellLeader { cell_id: Some(s.cell) }),
        )
        .await
        .unwrap();

        assert!(report.primary_succeeded);
        assert!(!report.linking_succeeded);
        assert!(report.failure_reason.is_some());
        assert!(!report.temporary_password.is_empty());

        let index = HierarchyIndex::build(s.store.fetch_snapshot().await.unwrap());
        assert!(index.user(report.user_id).is_some());
        assert_eq!(index.cell(s.cell).unwrap().leader_id, None);
    }

    #[tokio::test]
    async fn test_profile_failure_after_fallback_is_reported() {
        let s = setup().await;
        s.identity.set_privileged_enabled(false);
        s.store.reject_writes_to(EntityKind::User).await;

        let report = provision_leader(
            &Assignment::SuperAdmin,
            &s.index,
            s.store.as_ref(),
            &s.identity,
            request(Assignment::SuperAdmin),
        )
        .await
        .unwrap();

        assert!(!report.primary_succeeded);
        assert!(!report.linking_succeeded);
        assert!(report.failure_reason.is_some());
    }

    #[tokio::test]
    async fn test_denied_before_any_write() {
        let s = setup().await;
        let result = provision_leader(
            &Assignment::AreaLeader { area_id: Some(s.area) },
            &s.index,
            s.store.as_ref(),
            &s.identity,
            request(Assignment::AreaLeader { area_id: Some(s.other_area) }),
        )
        .await;
        assert!(matches!(
            result,
            Err(ProvisionError::Denied(AuthzError::AreaLeaderRoleDenied))
        ));

        let result = provision_leader(
            &Assignment::CellLeader { cell_id: Some(s.cell) },
            &s.index,
            s.store.as_ref(),
            &s.identity,
            request(Assignment::CellLeader { cell_id: Some(s.cell) }),
        )
        .await;
        assert!(matches!(
            result,
            Err(ProvisionError::Denied(AuthzError::CellLeaderCannotCreate))
        ));

        assert!(s.store.fetch_snapshot().await.unwrap().users.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_scope_is_invalid() {
        let s = setup().await;
        let result = provision_leader(
            &Assignment::SuperAdmin,
            &s.index,
            s.store.as_ref(),
            &s.identity,
            request(Assignment::ZoneLeader {
                zone_id: Some(Uuid::new_v4()),
            }),
        )
        .await;
        assert!(matches!(result, Err(ProvisionError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let s = setup().await;
        let mut req = request(Assignment::SuperAdmin);
        req.email = "nope".to_string();

        let result = provision_leader(
            &Assignment::SuperAdmin,
            &s.index,
            s.store.as_ref(),
            &s.identity,
            req,
        )
        .await;
        assert!(matches!(result, Err(ProvisionError::Invalid(_))));
    }
}
