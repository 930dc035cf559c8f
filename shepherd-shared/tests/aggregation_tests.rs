/// Aggregation scenarios over a zone with two uneven areas
mod common;

use common::ZoneScenario;
use rust_decimal::Decimal;
use shepherd_shared::aggregation::{
    average_attendance, member_count, performance_breakdown, summary, total_offerings,
    weekly_growth,
};
use shepherd_shared::hierarchy::HierarchyIndex;
use shepherd_shared::models::node::NodeRef;
use std::str::FromStr;

#[test]
fn test_zone_totals_and_breakdown() {
    let s = ZoneScenario::new();
    let index = s.index();

    assert_eq!(member_count(&index, NodeRef::Zone(s.zone)), 55);

    let rows = performance_breakdown(&index, NodeRef::Zone(s.zone));
    let counts: Vec<(&str, u64)> = rows
        .iter()
        .map(|r| (r.child_name.as_str(), r.member_count))
        .collect();
    assert_eq!(counts, vec![("A1", 40), ("A2", 15)]);
}

#[test]
fn test_area_totals_are_sums_of_cells() {
    let mut s = ZoneScenario::new();
    s.fixture.meeting(s.a1_cells[0], "2024-03-06", 12, "10.25");
    s.fixture.meeting(s.a1_cells[1], "2024-03-07", 9, "4.75");
    s.fixture.meeting(s.a1_cells[2], "2024-03-14", 11, "0.10");
    s.fixture.meeting(s.a2_cells[0], "2024-03-14", 6, "3.00");
    let index = s.index();

    for (area, cells) in [(s.a1, &s.a1_cells), (s.a2, &s.a2_cells)] {
        let area_members = member_count(&index, NodeRef::Area(area));
        let cell_members: u64 = cells
            .iter()
            .map(|c| member_count(&index, NodeRef::Cell(*c)))
            .sum();
        assert_eq!(area_members, cell_members);

        let area_offerings = total_offerings(&index, NodeRef::Area(area));
        let cell_offerings: Decimal = cells
            .iter()
            .map(|c| total_offerings(&index, NodeRef::Cell(*c)))
            .sum();
        assert_eq!(area_offerings, cell_offerings);
    }

    assert_eq!(
        total_offerings(&index, NodeRef::Zone(s.zone)),
        Decimal::from_str("18.10").unwrap()
    );
}

#[test]
fn test_no_meetings_means_zero_averages() {
    let s = ZoneScenario::new();
    let index = s.index();

    assert_eq!(average_attendance(&index, NodeRef::Zone(s.zone)), 0);
    assert_eq!(total_offerings(&index, NodeRef::Zone(s.zone)), Decimal::ZERO);

    let card = summary(&index, NodeRef::Area(s.a2));
    assert_eq!(card.member_count, 15);
    assert_eq!(card.meeting_count, 0);
    assert_eq!(card.average_attendance, 0);
}

#[test]
fn test_empty_snapshot_is_all_zero() {
    let index = HierarchyIndex::build(Default::default());
    let node = NodeRef::Organization;

    assert_eq!(member_count(&index, node), 0);
    assert_eq!(average_attendance(&index, node), 0);
    assert_eq!(total_offerings(&index, node), Decimal::ZERO);
    assert!(performance_breakdown(&index, node).is_empty());
}

#[test]
fn test_organization_overview_lists_zones() {
    let mut s = ZoneScenario::new();
    let other = s.fixture.zone("Zone Y");
    let index = s.index();

    let rows = performance_breakdown(&index, NodeRef::Organization);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].member_count, 55);
    assert_eq!(rows[1].child, NodeRef::Zone(other));
    assert_eq!(rows[1].member_count, 0);
    assert_eq!(member_count(&index, NodeRef::Organization), 55);
}

#[test]
fn test_rebuild_is_idempotent() {
    let mut s = ZoneScenario::new();
    s.fixture.meeting(s.a1_cells[0], "2024-03-06", 12, "10.25");
    let index = s.index();
    let rebuilt = HierarchyIndex::build(index.snapshot().clone());

    assert_eq!(index, rebuilt);
    assert_eq!(
        performance_breakdown(&index, NodeRef::Zone(s.zone)),
        performance_breakdown(&rebuilt, NodeRef::Zone(s.zone))
    );

    let from = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let to = chrono::NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
    assert_eq!(
        weekly_growth(&index, NodeRef::Zone(s.zone), from, to),
        weekly_growth(&rebuilt, NodeRef::Zone(s.zone), from, to)
    );
}

#[test]
fn test_duplicate_area_record_does_not_double_count() {
    let s = ZoneScenario::new();
    let mut snapshot = s.fixture.snapshot();
    let mut shadow = snapshot
        .areas
        .iter()
        .find(|a| a.id == s.a1)
        .cloned()
        .unwrap();
    shadow.name = "Shadow".to_string();
    snapshot.areas.push(shadow);
    let index = HierarchyIndex::build(snapshot);

    assert_eq!(member_count(&index, NodeRef::Zone(s.zone)), 55);
    assert_eq!(member_count(&index, NodeRef::Area(s.a1)), 40);

    let rows = performance_breakdown(&index, NodeRef::Zone(s.zone));
    let counts: Vec<(&str, u64)> = rows
        .iter()
        .map(|r| (r.child_name.as_str(), r.member_count))
        .collect();
    assert_eq!(counts, vec![("A1", 40), ("A2", 15)]);
}
