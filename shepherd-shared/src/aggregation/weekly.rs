//! Weekly growth report
//!
//! Meetings and member joins inside an inclusive date range are grouped into
//! Monday-aligned weeks. Weeks with no activity are left out.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::hierarchy::HierarchyIndex;
use crate::models::node::NodeRef;

/// Activity of one Monday-to-Sunday week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekBucket {
    /// Monday of the week, serialized as an ISO date
    pub week_start: NaiveDate,

    /// e.g. "Week of Mar 4, 2024"
    pub label: String,

    pub meeting_count: u64,

    pub attendee_sum: u64,

    pub offering_sum: Decimal,

    /// Cells that held at least one meeting this week
    pub distinct_active_cell_count: u64,

    pub new_member_count: u64,

    pub visitor_sum: i64,

    pub convert_sum: i64,

    pub followup_sum: i64,

    pub visit_sum: i64,
}

/// Monday on or before `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn week_label(monday: NaiveDate) -> String {
    format!("Week of {}", monday.format("%b %-d, %Y"))
}

#[derive(Default)]
struct Accumulator {
    meeting_count: u64,
    attendee_sum: u64,
    offering_sum: Decimal,
    cells: HashSet<Uuid>,
    new_member_count: u64,
    visitor_sum: i64,
    convert_sum: i64,
    followup_sum: i64,
    visit_sum: i64,
}

/// Weekly buckets for `node` between `from` and `to`, both inclusive
///
/// Buckets are ordered by week regardless of the order of the input records.
/// An inverted range yields no buckets.
pub fn weekly_growth(
    index: &HierarchyIndex,
    node: NodeRef,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<WeekBucket> {
    if from > to {
        return Vec::new();
    }

    let tree = index.subtree(node);
    let in_range = |d: NaiveDate| from <= d && d <= to;
    let mut weeks: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();

    for meeting in tree.meetings.iter().filter(|m| in_range(m.meeting_date)) {
        let week = weeks.entry(week_start(meeting.meeting_date)).or_default();
        week.meeting_count += 1;
        week.attendee_sum += meeting.attendance();
        week.offering_sum += meeting.offering_amount;
        week.cells.insert(meeting.cell_id);
        week.visitor_sum += i64::from(meeting.visitor_count);
        week.convert_sum += i64::from(meeting.convert_count);
        week.followup_sum += i64::from(meeting.followup_count);
        week.visit_sum += i64::from(meeting.visit_count);
    }

    for member in tree.members.iter().filter(|m| in_range(m.join_date)) {
        weeks
            .entry(week_start(member.join_date))
            .or_default()
            .new_member_count += 1;
    }

    weeks
        .into_iter()
        .map(|(monday, acc)| WeekBucket {
            week_start: monday,
            label: week_label(monday),
            meeting_count: acc.meeting_count,
            attendee_sum: acc.attendee_sum,
            offering_sum: acc.offering_sum,
            distinct_active_cell_count: acc.cells.len() as u64,
            new_member_count: acc.new_member_count,
            visitor_sum: acc.visitor_sum,
            convert_sum: acc.convert_sum,
            followup_sum: acc.followup_sum,
            visit_sum: acc.visit_sum,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use crate::testing::Fixture;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_week_start_is_monday() {
        // 2024-03-04 is a Monday
        assert_eq!(week_start(date("2024-03-04")), date("2024-03-04"));
        assert_eq!(week_start(date("2024-03-06")), date("2024-03-04"));
        assert_eq!(week_start(date("2024-03-10")), date("2024-03-04"));
        assert_eq!(week_start(date("2024-03-11")), date("2024-03-11"));
    }

    #[test]
    fn test_week_label() {
        assert_eq!(week_label(date("2024-03-04")), "Week of Mar 4, 2024");
        assert_eq!(week_label(date("2023-12-25")), "Week of Dec 25, 2023");
    }

    #[test]
    fn test_same_week_meetings_share_a_bucket() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let c1 = f.cell(area, "C1");
        let c2 = f.cell(area, "C2");
        f.meeting(c1, "2024-03-05", 10, "12.00");
        f.meeting(c2, "2024-03-07", 8, "3.50");
        f.meeting(c1, "2024-03-09", 6, "1.00");
        let index = f.build();

        let buckets = weekly_growth(
            &index,
            NodeRef::Area(area),
            date("2024-03-01"),
            date("2024-03-31"),
        );

        assert_eq!(buckets.len(), 1);
        let week = &buckets[0];
        assert_eq!(week.week_start, date("2024-03-04"));
        assert_eq!(week.meeting_count, 3);
        assert_eq!(week.attendee_sum, 24);
        assert_eq!(week.offering_sum.to_string(), "16.50");
        assert_eq!(week.distinct_active_cell_count, 2);
    }

    #[test]
    fn test_buckets_are_sparse_and_sorted() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let cell = f.cell(area, "C1");
        f.meeting(cell, "2024-03-27", 5, "0");
        f.meeting(cell, "2024-03-06", 5, "0");
        f.member_joined(cell, "Late", "2024-03-20");
        let index = f.build();

        let keys: Vec<NaiveDate> = weekly_growth(
            &index,
            NodeRef::Cell(cell),
            date("2024-03-01"),
            date("2024-03-31"),
        )
        .iter()
        .map(|b| b.week_start)
        .collect();

        // The week of Mar 11 has no activity and is skipped
        assert_eq!(
            keys,
            vec![date("2024-03-04"), date("2024-03-18"), date("2024-03-25")]
        );
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let cell = f.cell(area, "C1");
        f.meeting(cell, "2024-03-06", 5, "2.00");
        f.meeting(cell, "2024-03-14", 7, "4.00");
        f.meeting(cell, "2024-03-08", 9, "6.00");
        let snapshot = f.snapshot();

        let mut reversed = snapshot.clone();
        reversed.meetings.reverse();

        let run = |s: Snapshot| {
            weekly_growth(
                &HierarchyIndex::build(s),
                NodeRef::Cell(cell),
                date("2024-03-01"),
                date("2024-03-31"),
            )
        };
        assert_eq!(run(snapshot), run(reversed));
    }

    #[test]
    fn test_range_is_inclusive() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let cell = f.cell(area, "C1");
        f.meeting(cell, "2024-03-04", 5, "0");
        f.meeting(cell, "2024-03-10", 5, "0");
        f.meeting(cell, "2024-03-11", 5, "0");
        let index = f.build();

        let buckets = weekly_growth(
            &index,
            NodeRef::Cell(cell),
            date("2024-03-04"),
            date("2024-03-10"),
        );
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].meeting_count, 2);

        assert!(weekly_growth(
            &index,
            NodeRef::Cell(cell),
            date("2024-03-10"),
            date("2024-03-04")
        )
        .is_empty());
    }

    #[test]
    fn test_new_members_and_outreach_counts() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let cell = f.cell(area, "C1");
        f.member_joined(cell, "Ann", "2024-03-05");
        f.member_joined(cell, "Bob", "2024-03-06");
        f.member_joined(cell, "Old", "2023-01-01");
        let meeting = f.meeting(cell, "2024-03-06", 12, "0");
        f.edit_meeting(meeting, |m| {
            m.visitor_count = 3;
            m.convert_count = 1;
            m.followup_count = 2;
            m.visit_count = 4;
        });
        let index = f.build();

        let buckets = weekly_growth(
            &index,
            NodeRef::Zone(zone),
            date("2024-03-01"),
            date("2024-03-31"),
        );
        assert_eq!(buckets.len(), 1);
        let week = &buckets[0];
        assert_eq!(week.new_member_count, 2);
        assert_eq!(week.visitor_sum, 3);
        assert_eq!(week.convert_sum, 1);
        assert_eq!(week.followup_sum, 2);
        assert_eq!(week.visit_sum, 4);
    }
}
