//! Leadership roles and hierarchy assignments
//!
//! Every user holds exactly one role. Leaders are assigned to the single node
//! they lead; the assignment is a tagged union so that each role carries only
//! the scope field that makes sense for it.
//!
//! # Role ordering
//!
//! ```text
//! super-admin > zone-leader > area-leader > cell-leader
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::node::{NodeKind, NodeRef};

/// Leadership role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Leads a single cell
    CellLeader,

    /// Leads an area and every cell in it
    AreaLeader,

    /// Leads a zone and everything below it
    ZoneLeader,

    /// Administers the whole organization
    SuperAdmin,
}

impl Role {
    /// All roles, lowest first
    pub const ALL: [Role; 4] = [
        Role::CellLeader,
        Role::AreaLeader,
        Role::ZoneLeader,
        Role::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::CellLeader => "cell-leader",
            Role::AreaLeader => "area-leader",
            Role::ZoneLeader => "zone-leader",
            Role::SuperAdmin => "super-admin",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Role::CellLeader => "Cell Leader",
            Role::AreaLeader => "Area Leader",
            Role::ZoneLeader => "Zone Leader",
            Role::SuperAdmin => "Super Admin",
        }
    }

    /// Returns true if this role sits strictly above `other`
    pub fn outranks(&self, other: &Role) -> bool {
        self.rank() > other.rank()
    }

    /// Roles this role may provision
    ///
    /// Creation only ever descends; super admins are the one exception and may
    /// also create other super admins.
    pub fn creatable_roles(&self) -> &'static [Role] {
        match self {
            Role::SuperAdmin => &[
                Role::ZoneLeader,
                Role::AreaLeader,
                Role::CellLeader,
                Role::SuperAdmin,
            ],
            Role::ZoneLeader => &[Role::AreaLeader, Role::CellLeader],
            Role::AreaLeader => &[Role::CellLeader],
            Role::CellLeader => &[],
        }
    }

    /// Kind of node a leader of this role is assigned to
    pub fn scope_kind(&self) -> NodeKind {
        match self {
            Role::SuperAdmin => NodeKind::Organization,
            Role::ZoneLeader => NodeKind::Zone,
            Role::AreaLeader => NodeKind::Area,
            Role::CellLeader => NodeKind::Cell,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Role::SuperAdmin => 4,
            Role::ZoneLeader => 3,
            Role::AreaLeader => 2,
            Role::CellLeader => 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role tag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "cell-leader" => Ok(Role::CellLeader),
            "area-leader" => Ok(Role::AreaLeader),
            "zone-leader" => Ok(Role::ZoneLeader),
            "super-admin" => Ok(Role::SuperAdmin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// A user's role together with the node they lead
///
/// A leader whose scope id is `None` is unassigned and can neither view nor
/// create anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "kebab-case")]
pub enum Assignment {
    SuperAdmin,
    ZoneLeader { zone_id: Option<Uuid> },
    AreaLeader { area_id: Option<Uuid> },
    CellLeader { cell_id: Option<Uuid> },
}

impl Assignment {
    /// An assignment for `role` with its scope id set to `scope_id`
    pub fn new(role: Role, scope_id: Option<Uuid>) -> Self {
        match role {
            Role::SuperAdmin => Assignment::SuperAdmin,
            Role::ZoneLeader => Assignment::ZoneLeader { zone_id: scope_id },
            Role::AreaLeader => Assignment::AreaLeader { area_id: scope_id },
            Role::CellLeader => Assignment::CellLeader { cell_id: scope_id },
        }
    }

    /// Rebuilds an assignment from flat storage columns
    ///
    /// Only the column belonging to `role` is read; stray ids in the other
    /// columns are dropped.
    pub fn from_columns(
        role: Role,
        zone_id: Option<Uuid>,
        area_id: Option<Uuid>,
        cell_id: Option<Uuid>,
    ) -> Self {
        match role {
            Role::SuperAdmin => Assignment::SuperAdmin,
            Role::ZoneLeader => Assignment::ZoneLeader { zone_id },
            Role::AreaLeader => Assignment::AreaLeader { area_id },
            Role::CellLeader => Assignment::CellLeader { cell_id },
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Assignment::SuperAdmin => Role::SuperAdmin,
            Assignment::ZoneLeader { .. } => Role::ZoneLeader,
            Assignment::AreaLeader { .. } => Role::AreaLeader,
            Assignment::CellLeader { .. } => Role::CellLeader,
        }
    }

    /// The node this assignment is rooted at, if any
    pub fn scope(&self) -> Option<NodeRef> {
        match *self {
            Assignment::SuperAdmin => Some(NodeRef::Organization),
            Assignment::ZoneLeader { zone_id } => zone_id.map(NodeRef::Zone),
            Assignment::AreaLeader { area_id } => area_id.map(NodeRef::Area),
            Assignment::CellLeader { cell_id } => cell_id.map(NodeRef::Cell),
        }
    }

    pub fn zone_id(&self) -> Option<Uuid> {
        match *self {
            Assignment::ZoneLeader { zone_id } => zone_id,
            _ => None,
        }
    }

    pub fn area_id(&self) -> Option<Uuid> {
        match *self {
            Assignment::AreaLeader { area_id } => area_id,
            _ => None,
        }
    }

    pub fn cell_id(&self) -> Option<Uuid> {
        match *self {
            Assignment::CellLeader { cell_id } => cell_id,
            _ => None,
        }
    }
}
