/// Role-scoped authorization policy
///
/// Pure decision functions over an actor's [`Assignment`] and a
/// [`HierarchyIndex`]. Nothing here performs I/O; callers load the snapshot
/// first and ask afterwards.
///
/// # Permission Model
///
/// Visibility follows containment in the tree:
///
/// 1. **Super admins** see every node, including the organization root
/// 2. **Zone leaders** see their zone and everything under it
/// 3. **Area leaders** see their area and everything under it
/// 4. **Cell leaders** see their cell, its members and its meetings
///
/// A leader without an assignment sees nothing and creates nothing.
///
/// User creation only descends:
///
/// | actor | may create | scope |
/// |---|---|---|
/// | super admin | every role | any |
/// | zone leader | area and cell leaders | own zone |
/// | area leader | cell leaders | own area |
/// | cell leader | nobody | |
///
/// # Example
///
/// ```
/// use shepherd_shared::auth::authorization::{can_create_user, can_view};
/// use shepherd_shared::models::node::NodeRef;
/// use shepherd_shared::models::role::{Assignment, Role};
/// use shepherd_shared::testing::Fixture;
///
/// let mut f = Fixture::new();
/// let zone = f.zone("North");
/// let area = f.area(zone, "A1");
/// let index = f.build();
///
/// let actor = Assignment::AreaLeader { area_id: Some(area) };
/// assert!(can_view(&actor, &index, NodeRef::Area(area)));
/// assert!(!can_view(&actor, &index, NodeRef::Zone(zone)));
/// assert!(can_create_user(&actor, Role::CellLeader, None, Some(area)).is_ok());
/// ```

use uuid::Uuid;

use crate::hierarchy::HierarchyIndex;
use crate::models::node::NodeRef;
use crate::models::role::{Assignment, Role};

/// Denial returned by the policy
///
/// The `Display` text is the user-facing reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("Zone leaders cannot create super admins or other zone leaders")]
    ZoneLeaderRoleDenied,

    #[error("Zone leaders can only create leaders in their own zone")]
    OutsideOwnZone,

    #[error("Area leaders can only create cell leaders")]
    AreaLeaderRoleDenied,

    #[error("Area leaders can only create cell leaders in their own area")]
    OutsideOwnArea,

    #[error("Cell leaders cannot create users")]
    CellLeaderCannotCreate,

    /// Leader whose scope id is unset
    #[error("{} has no hierarchy assignment", .0.label())]
    Unassigned(Role),

    #[error("Not authorized to view {0}")]
    NotVisible(NodeRef),

    #[error("Not authorized to modify {0}")]
    NotManageable(NodeRef),

    #[error("Only super admins can broadcast alerts")]
    BroadcastDenied,
}

/// Returns whether `actor` may see `node`
///
/// Unknown nodes are invisible to everyone but super admins.
pub fn can_view(actor: &Assignment, index: &HierarchyIndex, node: NodeRef) -> bool {
    if let Assignment::SuperAdmin = actor {
        return true;
    }

    let Some(ancestry) = index.ancestry(node) else {
        return false;
    };

    match *actor {
        Assignment::SuperAdmin => true,
        Assignment::ZoneLeader { zone_id: Some(id) } => ancestry.zone_id == Some(id),
        Assignment::AreaLeader { area_id: Some(id) } => ancestry.area_id == Some(id),
        Assignment::CellLeader { cell_id: Some(id) } => ancestry.cell_id == Some(id),
        _ => false,
    }
}

/// [`can_view`] as a `Result`
pub fn require_view(
    actor: &Assignment,
    index: &HierarchyIndex,
    node: NodeRef,
) -> Result<(), AuthzError> {
    if can_view(actor, index, node) {
        Ok(())
    } else {
        Err(AuthzError::NotVisible(node))
    }
}

/// Checks whether `actor` may create a user with `target_role`
///
/// `target_zone_id` and `target_area_id` are the scope the new user will be
/// placed in; `None` means the caller has not chosen one yet and is accepted.
pub fn can_create_user(
    actor: &Assignment,
    target_role: Role,
    target_zone_id: Option<Uuid>,
    target_area_id: Option<Uuid>,
) -> Result<(), AuthzError> {
    match *actor {
        Assignment::SuperAdmin => Ok(()),

        Assignment::ZoneLeader { zone_id } => {
            if matches!(target_role, Role::SuperAdmin | Role::ZoneLeader) {
                return Err(AuthzError::ZoneLeaderRoleDenied);
            }
            let own = zone_id.ok_or(AuthzError::Unassigned(Role::ZoneLeader))?;
            match target_zone_id {
                Some(target) if target != own => Err(AuthzError::OutsideOwnZone),
                _ => Ok(()),
            }
        }

        Assignment::AreaLeader { area_id } => {
            if target_role != Role::CellLeader {
                return Err(AuthzError::AreaLeaderRoleDenied);
            }
            let own = area_id.ok_or(AuthzError::Unassigned(Role::AreaLeader))?;
            match target_area_id {
                Some(target) if target != own => Err(AuthzError::OutsideOwnArea),
                _ => Ok(()),
            }
        }

        Assignment::CellLeader { .. } => Err(AuthzError::CellLeaderCannotCreate),
    }
}

/// Roles a user with `role` may create
pub fn allowed_roles(role: Role) -> &'static [Role] {
    role.creatable_roles()
}

/// Returns whether `actor` may modify `node`
///
/// Leaders manage what sits strictly below their own node; their own node and
/// everything above it is read-only to them. Super admins manage everything.
pub fn can_manage_node(actor: &Assignment, index: &HierarchyIndex, node: NodeRef) -> bool {
    match actor {
        Assignment::SuperAdmin => true,
        _ => actor.scope() != Some(node) && can_view(actor, index, node),
    }
}

pub fn require_manage(
    actor: &Assignment,
    index: &HierarchyIndex,
    node: NodeRef,
) -> Result<(), AuthzError> {
    if can_manage_node(actor, index, node) {
        Ok(())
    } else {
        Err(AuthzError::NotManageable(node))
    }
}

/// Only super admins broadcast alerts
pub fn can_broadcast_alert(actor: &Assignment) -> bool {
    matches!(actor, Assignment::SuperAdmin)
}

pub fn require_broadcast(actor: &Assignment) -> Result<(), AuthzError> {
    if can_broadcast_alert(actor) {
        Ok(())
    } else {
        Err(AuthzError::BroadcastDenied)
    }
}
