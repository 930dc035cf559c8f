//! Performance breakdown
//!
//! One row per immediate child of a node: zones under the organization, areas
//! under a zone, cells under an area. Cells, members and meetings have no
//! reportable children and produce an empty breakdown.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{subtree_average_attendance, subtree_total_offerings};
use crate::hierarchy::{HierarchyIndex, Node};
use crate::models::node::NodeRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub child: NodeRef,

    pub child_name: String,

    /// Name of the child's active leader
    pub leader_name: Option<String>,

    pub member_count: u64,

    pub meeting_count: u64,

    pub total_offerings: Decimal,

    pub average_attendance: u64,
}

/// Rows for the immediate children of `node`, in snapshot order
pub fn performance_breakdown(index: &HierarchyIndex, node: NodeRef) -> Vec<BreakdownRow> {
    if node.kind().report_child().is_none() {
        return Vec::new();
    }

    index
        .children_of(node)
        .iter()
        .map(|child| row(index, child))
        .collect()
}

fn row(index: &HierarchyIndex, child: &Node<'_>) -> BreakdownRow {
    let child_ref = child.node_ref();
    let tree = index.subtree(child_ref);

    BreakdownRow {
        child: child_ref,
        child_name: child.name(),
        leader_name: index.leader_name(child).map(str::to_string),
        member_count: tree.members.len() as u64,
        meeting_count: tree.meetings.len() as u64,
        total_offerings: subtree_total_offerings(&tree),
        average_attendance: subtree_average_attendance(&tree),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[test]
    fn test_zone_breakdown_has_a_row_per_area() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let a1 = f.area(zone, "A1");
        let a2 = f.area(zone, "A2");
        f.area_leader(a1, "Deborah");
        let c1 = f.cell(a1, "C1");
        let c2 = f.cell(a2, "C2");
        f.members(c1, 4);
        f.members(c2, 2);
        f.meeting(c1, "2024-03-06", 4, "10.00");
        f.meeting(c1, "2024-03-13", 3, "5.00");
        let index = f.build();

        let rows = performance_breakdown(&index, NodeRef::Zone(zone));
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].child, NodeRef::Area(a1));
        assert_eq!(rows[0].child_name, "A1");
        assert_eq!(rows[0].leader_name.as_deref(), Some("Deborah"));
        assert_eq!(rows[0].member_count, 4);
        assert_eq!(rows[0].meeting_count, 2);
        assert_eq!(rows[0].total_offerings.to_string(), "15.00");
        assert_eq!(rows[0].average_attendance, 4); // 3.5 rounds up

        assert_eq!(rows[1].child_name, "A2");
        assert!(rows[1].leader_name.is_none());
        assert_eq!(rows[1].member_count, 2);
        assert_eq!(rows[1].average_attendance, 0);
    }

    #[test]
    fn test_organization_breakdown_lists_zones() {
        let mut f = Fixture::new();
        let north = f.zone("North");
        let south = f.zone("South");
        let index = f.build();

        let rows = performance_breakdown(&index, NodeRef::Organization);
        let children: Vec<NodeRef> = rows.iter().map(|r| r.child).collect();
        assert_eq!(children, vec![NodeRef::Zone(north), NodeRef::Zone(south)]);
    }

    #[test]
    fn test_cell_breakdown_is_empty() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let cell = f.cell(area, "C1");
        f.members(cell, 3);
        let index = f.build();

        assert!(performance_breakdown(&index, NodeRef::Cell(cell)).is_empty());
    }
}
