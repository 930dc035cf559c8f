//! Hierarchy index
//!
//! [`HierarchyIndex`] owns a [`Snapshot`] and answers lookups against it in
//! constant time: records by id, children by parent, and the ancestors of any
//! node. It is built in a single linear pass over each collection and is never
//! updated in place. After a mutation, build a new index from a fresh
//! snapshot.
//!
//! # Example
//!
//! ```
//! use shepherd_shared::hierarchy::HierarchyIndex;
//! use shepherd_shared::models::node::NodeRef;
//! use shepherd_shared::snapshot::Snapshot;
//!
//! let index = HierarchyIndex::build(Snapshot::default());
//! assert!(index.children_of(NodeRef::Organization).is_empty());
//! ```

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::{
    area::Area, cell::Cell, meeting::Meeting, member::Member, node::NodeRef, user::User,
    zone::Zone,
};
use crate::snapshot::Snapshot;

/// A borrowed view of one node of the tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    Organization,
    Zone(&'a Zone),
    Area(&'a Area),
    Cell(&'a Cell),
    Member(&'a Member),
    Meeting(&'a Meeting),
}

impl<'a> Node<'a> {
    pub fn node_ref(&self) -> NodeRef {
        match self {
            Node::Organization => NodeRef::Organization,
            Node::Zone(z) => NodeRef::Zone(z.id),
            Node::Area(a) => NodeRef::Area(a.id),
            Node::Cell(c) => NodeRef::Cell(c.id),
            Node::Member(m) => NodeRef::Member(m.id),
            Node::Meeting(m) => NodeRef::Meeting(m.id),
        }
    }

    /// Display name; meetings are named by their date
    pub fn name(&self) -> String {
        match self {
            Node::Organization => "Organization".to_string(),
            Node::Zone(z) => z.name.clone(),
            Node::Area(a) => a.name.clone(),
            Node::Cell(c) => c.name.clone(),
            Node::Member(m) => m.name.clone(),
            Node::Meeting(m) => m.meeting_date.to_string(),
        }
    }

    /// Profile id of the node's leader, if it has one
    pub fn leader_id(&self) -> Option<Uuid> {
        match self {
            Node::Zone(z) => z.leader_id,
            Node::Area(a) => a.leader_id,
            Node::Cell(c) => c.leader_id,
            _ => None,
        }
    }
}

/// Ancestor ids of a node, including the node itself at its own level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ancestry {
    pub zone_id: Option<Uuid>,
    pub area_id: Option<Uuid>,
    pub cell_id: Option<Uuid>,
}

/// Members and meetings that aggregate under a node
#[derive(Debug, Clone, Default)]
pub struct Subtree<'a> {
    pub members: Vec<&'a Member>,
    pub meetings: Vec<&'a Meeting>,
}

/// Id and parent lookups over a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyIndex {
    snapshot: Snapshot,
    users_by_id: HashMap<Uuid, usize>,
    zones_by_id: HashMap<Uuid, usize>,
    areas_by_id: HashMap<Uuid, usize>,
    cells_by_id: HashMap<Uuid, usize>,
    members_by_id: HashMap<Uuid, usize>,
    meetings_by_id: HashMap<Uuid, usize>,
    areas_by_zone: HashMap<Uuid, Vec<usize>>,
    cells_by_area: HashMap<Uuid, Vec<usize>>,
    members_by_cell: HashMap<Uuid, Vec<usize>>,
    meetings_by_cell: HashMap<Uuid, Vec<usize>>,
}

/// Drops every record whose id was already seen; the first record wins
fn drop_duplicates<T>(items: &mut Vec<T>, kind: &str, id: impl Fn(&T) -> Uuid) {
    let mut seen = HashSet::with_capacity(items.len());
    items.retain(|item| {
        let key = id(item);
        let first = seen.insert(key);
        if !first {
            tracing::debug!(kind, id = %key, "Ignoring duplicate record");
        }
        first
    });
}

/// Maps each id to its position
fn index_by_id<T>(items: &[T], id: impl Fn(&T) -> Uuid) -> HashMap<Uuid, usize> {
    items.iter().enumerate().map(|(i, item)| (id(item), i)).collect()
}

/// Groups positions by parent key, preserving input order
fn group_by_parent<T>(items: &[T], parent: impl Fn(&T) -> Uuid) -> HashMap<Uuid, Vec<usize>> {
    let mut map: HashMap<Uuid, Vec<usize>> = HashMap::new();
    for (i, item) in items.iter().enumerate() {
        map.entry(parent(item)).or_default().push(i);
    }
    map
}

impl HierarchyIndex {
    /// Indexes a snapshot
    ///
    /// When several records of one kind share an id, only the first is kept.
    pub fn build(mut snapshot: Snapshot) -> Self {
        drop_duplicates(&mut snapshot.users, "user", |u| u.id);
        drop_duplicates(&mut snapshot.zones, "zone", |z| z.id);
        drop_duplicates(&mut snapshot.areas, "area", |a| a.id);
        drop_duplicates(&mut snapshot.cells, "cell", |c| c.id);
        drop_duplicates(&mut snapshot.members, "member", |m| m.id);
        drop_duplicates(&mut snapshot.meetings, "meeting", |m| m.id);
        drop_duplicates(&mut snapshot.alerts, "alert", |a| a.id);

        let index = Self {
            users_by_id: index_by_id(&snapshot.users, |u| u.id),
            zones_by_id: index_by_id(&snapshot.zones, |z| z.id),
            areas_by_id: index_by_id(&snapshot.areas, |a| a.id),
            cells_by_id: index_by_id(&snapshot.cells, |c| c.id),
            members_by_id: index_by_id(&snapshot.members, |m| m.id),
            meetings_by_id: index_by_id(&snapshot.meetings, |m| m.id),
            areas_by_zone: group_by_parent(&snapshot.areas, |a| a.zone_id),
            cells_by_area: group_by_parent(&snapshot.cells, |c| c.area_id),
            members_by_cell: group_by_parent(&snapshot.members, |m| m.cell_id),
            meetings_by_cell: group_by_parent(&snapshot.meetings, |m| m.cell_id),
            snapshot,
        };

        tracing::debug!(
            zones = index.snapshot.zones.len(),
            areas = index.snapshot.areas.len(),
            cells = index.snapshot.cells.len(),
            members = index.snapshot.members.len(),
            meetings = index.snapshot.meetings.len(),
            "Built hierarchy index"
        );

        index
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }

    pub fn user(&self, id: Uuid) -> Option<&User> {
        self.users_by_id.get(&id).map(|&i| &self.snapshot.users[i])
    }

    pub fn zone(&self, id: Uuid) -> Option<&Zone> {
        self.zones_by_id.get(&id).map(|&i| &self.snapshot.zones[i])
    }

    pub fn area(&self, id: Uuid) -> Option<&Area> {
        self.areas_by_id.get(&id).map(|&i| &self.snapshot.areas[i])
    }

    pub fn cell(&self, id: Uuid) -> Option<&Cell> {
        self.cells_by_id.get(&id).map(|&i| &self.snapshot.cells[i])
    }

    pub fn member(&self, id: Uuid) -> Option<&Member> {
        self.members_by_id.get(&id).map(|&i| &self.snapshot.members[i])
    }

    pub fn meeting(&self, id: Uuid) -> Option<&Meeting> {
        self.meetings_by_id.get(&id).map(|&i| &self.snapshot.meetings[i])
    }

    /// Resolves a reference to the node it names
    pub fn node(&self, node: NodeRef) -> Option<Node<'_>> {
        match node {
            NodeRef::Organization => Some(Node::Organization),
            NodeRef::Zone(id) => self.zone(id).map(Node::Zone),
            NodeRef::Area(id) => self.area(id).map(Node::Area),
            NodeRef::Cell(id) => self.cell(id).map(Node::Cell),
            NodeRef::Member(id) => self.member(id).map(Node::Member),
            NodeRef::Meeting(id) => self.meeting(id).map(Node::Meeting),
        }
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.node(node).is_some()
    }

    pub fn areas_of(&self, zone_id: Uuid) -> impl Iterator<Item = &Area> + '_ {
        self.areas_by_zone
            .get(&zone_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.snapshot.areas[i])
    }

    pub fn cells_of(&self, area_id: Uuid) -> impl Iterator<Item = &Cell> + '_ {
        self.cells_by_area
            .get(&area_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.snapshot.cells[i])
    }

    pub fn members_of(&self, cell_id: Uuid) -> impl Iterator<Item = &Member> + '_ {
        self.members_by_cell
            .get(&cell_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.snapshot.members[i])
    }

    pub fn meetings_of(&self, cell_id: Uuid) -> impl Iterator<Item = &Meeting> + '_ {
        self.meetings_by_cell
            .get(&cell_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.snapshot.meetings[i])
    }

    /// Immediate children of a node, in snapshot order
    ///
    /// A cell's children are its members followed by its meetings. Members,
    /// meetings and unknown nodes have none.
    pub fn children_of(&self, node: NodeRef) -> Vec<Node<'_>> {
        match node {
            NodeRef::Organization => self.snapshot.zones.iter().map(Node::Zone).collect(),
            NodeRef::Zone(id) => self.areas_of(id).map(Node::Area).collect(),
            NodeRef::Area(id) => self.cells_of(id).map(Node::Cell).collect(),
            NodeRef::Cell(id) => self
                .members_of(id)
                .map(Node::Member)
                .chain(self.meetings_of(id).map(Node::Meeting))
                .collect(),
            NodeRef::Member(_) | NodeRef::Meeting(_) => Vec::new(),
        }
    }

    /// Resolves the zone, area and cell a node sits under
    ///
    /// Returns `None` for unknown nodes. Links to missing parents stop the walk
    /// and leave the higher levels unset.
    pub fn ancestry(&self, node: NodeRef) -> Option<Ancestry> {
        let cell_id = match node {
            NodeRef::Organization => return Some(Ancestry::default()),
            NodeRef::Zone(id) => {
                self.zone(id)?;
                return Some(Ancestry {
                    zone_id: Some(id),
                    ..Default::default()
                });
            }
            NodeRef::Area(id) => {
                let area = self.area(id)?;
                return Some(Ancestry {
                    zone_id: Some(area.zone_id),
                    area_id: Some(area.id),
                    cell_id: None,
                });
            }
            NodeRef::Cell(id) => self.cell(id)?.id,
            NodeRef::Member(id) => self.member(id)?.cell_id,
            NodeRef::Meeting(id) => self.meeting(id)?.cell_id,
        };

        let area_id = self.cell(cell_id).map(|c| c.area_id);
        let zone_id = area_id.and_then(|a| self.area(a)).map(|a| a.zone_id);

        Some(Ancestry {
            zone_id,
            area_id,
            cell_id: Some(cell_id),
        })
    }

    /// Cells in the subtree of a node
    ///
    /// The organization covers every cell, including cells whose parents are
    /// missing from the snapshot.
    pub fn cells_under(&self, node: NodeRef) -> Vec<&Cell> {
        match node {
            NodeRef::Organization => self.snapshot.cells.iter().collect(),
            NodeRef::Zone(id) => self
                .areas_of(id)
                .flat_map(|a| self.cells_of(a.id))
                .collect(),
            NodeRef::Area(id) => self.cells_of(id).collect(),
            NodeRef::Cell(id) => self.cell(id).into_iter().collect(),
            NodeRef::Member(_) | NodeRef::Meeting(_) => Vec::new(),
        }
    }

    /// Members and meetings that aggregate under a node
    ///
    /// A member counts only itself and has no meetings; a meeting counts only
    /// itself and has no members. Unknown nodes are empty.
    pub fn subtree(&self, node: NodeRef) -> Subtree<'_> {
        match node {
            NodeRef::Organization => Subtree {
                members: self.snapshot.members.iter().collect(),
                meetings: self.snapshot.meetings.iter().collect(),
            },
            NodeRef::Member(id) => Subtree {
                members: self.member(id).into_iter().collect(),
                meetings: Vec::new(),
            },
            NodeRef::Meeting(id) => Subtree {
                members: Vec::new(),
                meetings: self.meeting(id).into_iter().collect(),
            },
            other => {
                let cells = self.cells_under(other);
                Subtree {
                    members: cells.iter().flat_map(|c| self.members_of(c.id)).collect(),
                    meetings: cells.iter().flat_map(|c| self.meetings_of(c.id)).collect(),
                }
            }
        }
    }

    /// Name of the active user leading a node
    pub fn leader_name(&self, node: &Node<'_>) -> Option<&str> {
        node.leader_id()
            .and_then(|id| self.user(id))
            .filter(|u| u.is_active)
            .map(|u| u.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[test]
    fn test_lookup_by_id() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let cell = f.cell(area, "C1");
        let member = f.member(cell, "Ann");
        let index = f.build();

        assert_eq!(index.zone(zone).map(|z| z.name.as_str()), Some("North"));
        assert_eq!(index.cell(cell).map(|c| c.area_id), Some(area));
        assert!(index.member(member).is_some());
        assert!(index.area(Uuid::new_v4()).is_none());
        assert!(index.contains(NodeRef::Organization));
        assert!(!index.contains(NodeRef::Meeting(Uuid::new_v4())));
    }

    #[test]
    fn test_children_preserve_input_order() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let a1 = f.area(zone, "A1");
        let a2 = f.area(zone, "A2");
        let a3 = f.area(zone, "A3");
        let index = f.build();

        let children: Vec<NodeRef> = index
            .children_of(NodeRef::Zone(zone))
            .iter()
            .map(Node::node_ref)
            .collect();
        assert_eq!(
            children,
            vec![NodeRef::Area(a1), NodeRef::Area(a2), NodeRef::Area(a3)]
        );
        assert!(index.children_of(NodeRef::Area(Uuid::new_v4())).is_empty());
    }

    #[test]
    fn test_cell_children_are_members_then_meetings() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let cell = f.cell(area, "C1");
        let meeting = f.meeting(cell, "2024-03-06", 4, "10.00");
        let member = f.member(cell, "Ann");
        let index = f.build();

        let children: Vec<NodeRef> = index
            .children_of(NodeRef::Cell(cell))
            .iter()
            .map(Node::node_ref)
            .collect();
        assert_eq!(
            children,
            vec![NodeRef::Member(member), NodeRef::Meeting(meeting)]
        );
    }

    #[test]
    fn test_ancestry_resolves_all_levels() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let cell = f.cell(area, "C1");
        let meeting = f.meeting(cell, "2024-03-06", 4, "10.00");
        let index = f.build();

        let expected = Ancestry {
            zone_id: Some(zone),
            area_id: Some(area),
            cell_id: Some(cell),
        };
        assert_eq!(index.ancestry(NodeRef::Meeting(meeting)), Some(expected));
        assert_eq!(index.ancestry(NodeRef::Cell(cell)), Some(expected));
        assert_eq!(
            index.ancestry(NodeRef::Area(area)),
            Some(Ancestry {
                zone_id: Some(zone),
                area_id: Some(area),
                cell_id: None
            })
        );
        assert_eq!(index.ancestry(NodeRef::Member(Uuid::new_v4())), None);
    }

    #[test]
    fn test_subtree_semantics() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let c1 = f.cell(area, "C1");
        let c2 = f.cell(area, "C2");
        let m1 = f.member(c1, "Ann");
        f.member(c2, "Bob");
        let meeting = f.meeting(c1, "2024-03-06", 4, "10.00");
        let index = f.build();

        let area_tree = index.subtree(NodeRef::Area(area));
        assert_eq!(area_tree.members.len(), 2);
        assert_eq!(area_tree.meetings.len(), 1);

        let member_tree = index.subtree(NodeRef::Member(m1));
        assert_eq!(member_tree.members.len(), 1);
        assert!(member_tree.meetings.is_empty());

        let meeting_tree = index.subtree(NodeRef::Meeting(meeting));
        assert!(meeting_tree.members.is_empty());
        assert_eq!(meeting_tree.meetings.len(), 1);

        assert!(index.subtree(NodeRef::Zone(Uuid::new_v4())).members.is_empty());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let cell = f.cell(area, "C1");
        f.member(cell, "Ann");
        let snapshot = f.snapshot();

        let first = HierarchyIndex::build(snapshot.clone());
        let second = HierarchyIndex::build(first.snapshot().clone());
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_ids_keep_first_record() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let cell = f.cell(area, "C1");
        f.members(cell, 3);
        let mut snapshot = f.snapshot();

        let mut zone_copy = snapshot.zones[0].clone();
        zone_copy.name = "Shadow".to_string();
        snapshot.zones.push(zone_copy);
        let mut area_copy = snapshot.areas[0].clone();
        area_copy.name = "Shadow".to_string();
        snapshot.areas.push(area_copy);
        let member_copy = snapshot.members[0].clone();
        snapshot.members.push(member_copy);

        let index = HierarchyIndex::build(snapshot);
        assert_eq!(index.zone(zone).map(|z| z.name.as_str()), Some("North"));
        assert_eq!(index.area(area).map(|a| a.name.as_str()), Some("A1"));
        assert_eq!(index.snapshot().areas.len(), 1);

        assert_eq!(index.children_of(NodeRef::Zone(zone)).len(), 1);
        assert_eq!(index.children_of(NodeRef::Organization).len(), 1);
        assert_eq!(index.cells_under(NodeRef::Zone(zone)).len(), 1);
        assert_eq!(index.subtree(NodeRef::Zone(zone)).members.len(), 3);
        assert_eq!(index.subtree(NodeRef::Organization).members.len(), 3);
    }

    #[test]
    fn test_leader_name_skips_inactive_users() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let leader = f.zone_leader(zone, "Grace");
        let mut snapshot = f.snapshot();
        snapshot.zones[0].leader_id = Some(leader);
        let index = HierarchyIndex::build(snapshot.clone());
        let node = index.node(NodeRef::Zone(zone)).unwrap();
        assert_eq!(index.leader_name(&node), Some("Grace"));

        snapshot.users[0].is_active = false;
        let index = HierarchyIndex::build(snapshot);
        let node = index.node(NodeRef::Zone(zone)).unwrap();
        assert_eq!(index.leader_name(&node), None);
    }
}
