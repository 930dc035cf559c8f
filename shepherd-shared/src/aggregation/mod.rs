//! Aggregation engine
//!
//! Derived statistics for any node of the organization tree. Every function is
//! pure and total: an unknown node or an empty subtree yields zeros, never an
//! error.
//!
//! What a node aggregates over:
//!
//! | node | members | meetings |
//! |---|---|---|
//! | organization, zone, area, cell | all members of the cells below | all meetings of the cells below |
//! | member | itself | none |
//! | meeting | none | itself |
//!
//! # Example
//!
//! ```
//! use shepherd_shared::aggregation::{average_attendance, member_count, total_offerings};
//! use shepherd_shared::models::node::NodeRef;
//! use shepherd_shared::testing::Fixture;
//!
//! let mut f = Fixture::new();
//! let zone = f.zone("North");
//! let area = f.area(zone, "A1");
//! let cell = f.cell(area, "C1");
//! f.members(cell, 3);
//! f.meeting(cell, "2024-03-06", 10, "20.00");
//! f.meeting(cell, "2024-03-13", 11, "5.50");
//! let index = f.build();
//!
//! assert_eq!(member_count(&index, NodeRef::Zone(zone)), 3);
//! assert_eq!(average_attendance(&index, NodeRef::Cell(cell)), 11);
//! assert_eq!(total_offerings(&index, NodeRef::Area(area)).to_string(), "25.50");
//! ```

pub mod breakdown;
pub mod weekly;

pub use breakdown::{performance_breakdown, BreakdownRow};
pub use weekly::{weekly_growth, WeekBucket};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::hierarchy::{HierarchyIndex, Subtree};
use crate::models::node::NodeRef;

/// Headline numbers for a dashboard card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub node: NodeRef,

    /// `None` when the node is not in the snapshot
    pub name: Option<String>,

    pub member_count: u64,

    pub active_member_count: u64,

    pub meeting_count: u64,

    pub average_attendance: u64,

    pub total_offerings: Decimal,
}

/// Mean of `sum / count`, rounded half up; 0 when `count` is 0
pub fn rounded_average(sum: u64, count: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    (2 * sum + count) / (2 * count)
}

pub(crate) fn subtree_average_attendance(tree: &Subtree<'_>) -> u64 {
    let sum: u64 = tree.meetings.iter().map(|m| m.attendance()).sum();
    rounded_average(sum, tree.meetings.len() as u64)
}

pub(crate) fn subtree_total_offerings(tree: &Subtree<'_>) -> Decimal {
    tree.meetings.iter().map(|m| m.offering_amount).sum()
}

pub fn member_count(index: &HierarchyIndex, node: NodeRef) -> u64 {
    index.subtree(node).members.len() as u64
}

/// Members whose status is active
pub fn active_member_count(index: &HierarchyIndex, node: NodeRef) -> u64 {
    index
        .subtree(node)
        .members
        .iter()
        .filter(|m| m.is_active())
        .count() as u64
}

pub fn meeting_count(index: &HierarchyIndex, node: NodeRef) -> u64 {
    index.subtree(node).meetings.len() as u64
}

/// Average attendance per meeting, rounded half up
pub fn average_attendance(index: &HierarchyIndex, node: NodeRef) -> u64 {
    subtree_average_attendance(&index.subtree(node))
}

/// Sum of meeting offerings
pub fn total_offerings(index: &HierarchyIndex, node: NodeRef) -> Decimal {
    subtree_total_offerings(&index.subtree(node))
}

/// All headline numbers for `node` from a single subtree walk
pub fn summary(index: &HierarchyIndex, node: NodeRef) -> NodeSummary {
    let tree = index.subtree(node);

    NodeSummary {
        node,
        name: index.node(node).map(|n| n.name()),
        member_count: tree.members.len() as u64,
        active_member_count: tree.members.iter().filter(|m| m.is_active()).count() as u64,
        meeting_count: tree.meetings.len() as u64,
        average_attendance: subtree_average_attendance(&tree),
        total_offerings: subtree_total_offerings(&tree),
    }
}
