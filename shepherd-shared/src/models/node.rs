//! Hierarchy node addressing
//!
//! The organization is a strict tree:
//!
//! ```text
//! Organization
//! └── Zone
//!     └── Area
//!         └── Cell
//!             ├── Member
//!             └── Meeting
//! ```
//!
//! [`NodeRef`] names one node of that tree. The `Organization` root is the
//! whole snapshot and is only addressable by super admins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of a node in the organization tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Organization,
    Zone,
    Area,
    Cell,
    Member,
    Meeting,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Organization => "organization",
            NodeKind::Zone => "zone",
            NodeKind::Area => "area",
            NodeKind::Cell => "cell",
            NodeKind::Member => "member",
            NodeKind::Meeting => "meeting",
        }
    }

    /// The kind of the rows a performance breakdown produces for this kind
    ///
    /// Cells, members and meetings have no reportable children.
    pub fn report_child(&self) -> Option<NodeKind> {
        match self {
            NodeKind::Organization => Some(NodeKind::Zone),
            NodeKind::Zone => Some(NodeKind::Area),
            NodeKind::Area => Some(NodeKind::Cell),
            NodeKind::Cell | NodeKind::Member | NodeKind::Meeting => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown node kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown node kind: {0}")]
pub struct UnknownNodeKind(pub String);

impl FromStr for NodeKind {
    type Err = UnknownNodeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "organization" | "org" => Ok(NodeKind::Organization),
            "zone" | "zones" => Ok(NodeKind::Zone),
            "area" | "areas" => Ok(NodeKind::Area),
            "cell" | "cells" => Ok(NodeKind::Cell),
            "member" | "members" => Ok(NodeKind::Member),
            "meeting" | "meetings" => Ok(NodeKind::Meeting),
            _ => Err(UnknownNodeKind(s.to_string())),
        }
    }
}

/// Reference to a single node of the organization tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum NodeRef {
    Organization,
    Zone(Uuid),
    Area(Uuid),
    Cell(Uuid),
    Member(Uuid),
    Meeting(Uuid),
}

impl NodeRef {
    /// Builds a reference from a kind and an id
    ///
    /// The id is ignored for `Organization`.
    pub fn new(kind: NodeKind, id: Uuid) -> Self {
        match kind {
            NodeKind::Organization => NodeRef::Organization,
            NodeKind::Zone => NodeRef::Zone(id),
            NodeKind::Area => NodeRef::Area(id),
            NodeKind::Cell => NodeRef::Cell(id),
            NodeKind::Member => NodeRef::Member(id),
            NodeKind::Meeting => NodeRef::Meeting(id),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Organization => NodeKind::Organization,
            NodeRef::Zone(_) => NodeKind::Zone,
            NodeRef::Area(_) => NodeKind::Area,
            NodeRef::Cell(_) => NodeKind::Cell,
            NodeRef::Member(_) => NodeKind::Member,
            NodeRef::Meeting(_) => NodeKind::Meeting,
        }
    }

    /// The node id (nil for the organization root)
    pub fn id(&self) -> Uuid {
        match self {
            NodeRef::Organization => Uuid::nil(),
            NodeRef::Zone(id)
            | NodeRef::Area(id)
            | NodeRef::Cell(id)
            | NodeRef::Member(id)
            | NodeRef::Meeting(id) => *id,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Organization => f.write_str("organization"),
            other => write!(f, "{}:{}", other.kind(), other.id()),
        }
    }
}

/// Lifecycle status shared by zones, areas and cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "node_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Active,
    Inactive,
}
