/// Snapshot builder for tests
///
/// [`Fixture`] assembles an in-memory organization one record at a time and
/// hands back the ids it generates, so tests can describe a tree in a few
/// lines without touching a database.
///
/// # Example
///
/// ```
/// use shepherd_shared::testing::Fixture;
///
/// let mut f = Fixture::new();
/// let zone = f.zone("North");
/// let area = f.area(zone, "A1");
/// let cell = f.cell(area, "C1");
/// f.member(cell, "Ann");
/// f.meeting(cell, "2024-03-06", 12, "25.50");
///
/// let index = f.build();
/// assert_eq!(index.snapshot().members.len(), 1);
/// ```
///
/// # Panics
///
/// Date and decimal literals are parsed eagerly; malformed literals panic.
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::hierarchy::HierarchyIndex;
use crate::models::{
    alert::{Alert, AlertPriority, AlertType, Audience},
    area::Area,
    cell::Cell,
    meeting::{Meeting, MeetingStatus},
    member::{Member, MemberStatus},
    node::NodeStatus,
    role::Assignment,
    user::User,
    zone::Zone,
};
use crate::snapshot::Snapshot;

const DEFAULT_JOIN_DATE: &str = "2024-01-01";

/// Builder for a [`Snapshot`]
#[derive(Debug, Clone)]
pub struct Fixture {
    snapshot: Snapshot,
    epoch: DateTime<Utc>,
    tick: i64,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .unwrap_or_else(|e| panic!("invalid fixture date {value:?}: {e}"))
}

fn parse_decimal(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_else(|e| panic!("invalid fixture amount {value:?}: {e}"))
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::default(),
            epoch: Utc::now(),
            tick: 0,
        }
    }

    /// Strictly increasing timestamps, one per record
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        self.tick += 1;
        self.epoch + Duration::seconds(self.tick)
    }

    pub fn zone(&mut self, name: &str) -> Uuid {
        let now = self.next_timestamp();
        let id = Uuid::new_v4();
        self.snapshot.zones.push(Zone {
            id,
            name: name.to_string(),
            leader_id: None,
            status: NodeStatus::Active,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn area(&mut self, zone_id: Uuid, name: &str) -> Uuid {
        let now = self.next_timestamp();
        let id = Uuid::new_v4();
        self.snapshot.areas.push(Area {
            id,
            name: name.to_string(),
            zone_id,
            leader_id: None,
            district_name: None,
            district_leader: None,
            district_pastor: None,
            status: NodeStatus::Active,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn cell(&mut self, area_id: Uuid, name: &str) -> Uuid {
        let now = self.next_timestamp();
        let id = Uuid::new_v4();
        self.snapshot.cells.push(Cell {
            id,
            name: name.to_string(),
            area_id,
            leader_id: None,
            meeting_day: None,
            meeting_time: None,
            meeting_location: None,
            status: NodeStatus::Active,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn member(&mut self, cell_id: Uuid, name: &str) -> Uuid {
        self.member_joined(cell_id, name, DEFAULT_JOIN_DATE)
    }

    pub fn member_joined(&mut self, cell_id: Uuid, name: &str, join_date: &str) -> Uuid {
        let now = self.next_timestamp();
        let id = Uuid::new_v4();
        self.snapshot.members.push(Member {
            id,
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
            cell_id,
            join_date: parse_date(join_date),
            status: MemberStatus::Active,
            created_at: now,
            updated_at: now,
        });
        id
    }

    /// Adds `count` members named after the cell
    pub fn members(&mut self, cell_id: Uuid, count: usize) -> Vec<Uuid> {
        (0..count)
            .map(|i| self.member(cell_id, &format!("Member {}", i + 1)))
            .collect()
    }

    /// Adds a meeting with a head count and an offering
    pub fn meeting(&mut self, cell_id: Uuid, date: &str, attendance: i32, offering: &str) -> Uuid {
        let now = self.next_timestamp();
        let id = Uuid::new_v4();
        self.snapshot.meetings.push(Meeting {
            id,
            cell_id,
            meeting_date: parse_date(date),
            attendee_ids: Vec::new(),
            attendance_count: Some(attendance),
            offering_amount: parse_decimal(offering),
            visitor_count: 0,
            convert_count: 0,
            followup_count: 0,
            visit_count: 0,
            notes: None,
            status: MeetingStatus::Submitted,
            created_by: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    /// Mutates a meeting added earlier
    pub fn edit_meeting(&mut self, id: Uuid, edit: impl FnOnce(&mut Meeting)) {
        if let Some(meeting) = self.snapshot.meetings.iter_mut().find(|m| m.id == id) {
            edit(meeting);
        }
    }

    pub fn user(&mut self, name: &str, assignment: Assignment) -> Uuid {
        let now = self.next_timestamp();
        let id = Uuid::new_v4();
        self.snapshot.users.push(User {
            id,
            email: format!("{}@example.org", name.to_lowercase().replace(' ', ".")),
            name: name.to_string(),
            phone: None,
            assignment,
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn edit_user(&mut self, id: Uuid, edit: impl FnOnce(&mut User)) {
        if let Some(user) = self.snapshot.users.iter_mut().find(|u| u.id == id) {
            edit(user);
        }
    }

    pub fn super_admin(&mut self, name: &str) -> Uuid {
        self.user(name, Assignment::SuperAdmin)
    }

    /// Adds a zone leader and links them as the zone's leader
    pub fn zone_leader(&mut self, zone_id: Uuid, name: &str) -> Uuid {
        let id = self.user(name, Assignment::ZoneLeader { zone_id: Some(zone_id) });
        if let Some(zone) = self.snapshot.zones.iter_mut().find(|z| z.id == zone_id) {
            zone.leader_id = Some(id);
        }
        id
    }

    pub fn area_leader(&mut self, area_id: Uuid, name: &str) -> Uuid {
        let id = self.user(name, Assignment::AreaLeader { area_id: Some(area_id) });
        if let Some(area) = self.snapshot.areas.iter_mut().find(|a| a.id == area_id) {
            area.leader_id = Some(id);
        }
        id
    }

    pub fn cell_leader(&mut self, cell_id: Uuid, name: &str) -> Uuid {
        let id = self.user(name, Assignment::CellLeader { cell_id: Some(cell_id) });
        if let Some(cell) = self.snapshot.cells.iter_mut().find(|c| c.id == cell_id) {
            cell.leader_id = Some(id);
        }
        id
    }

    pub fn alert(
        &mut self,
        created_by: Uuid,
        title: &str,
        audience: Audience,
        priority: AlertPriority,
    ) -> Uuid {
        let now = self.next_timestamp();
        let id = Uuid::new_v4();
        self.snapshot.alerts.push(Alert {
            id,
            title: title.to_string(),
            message: format!("{title} details"),
            alert_type: AlertType::Info,
            audience,
            priority,
            is_active: true,
            created_by,
            expires_at: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn edit_alert(&mut self, id: Uuid, edit: impl FnOnce(&mut Alert)) {
        if let Some(alert) = self.snapshot.alerts.iter_mut().find(|a| a.id == id) {
            edit(alert);
        }
    }

    /// Copy of the records built so far
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.clone()
    }

    pub fn build(&self) -> HierarchyIndex {
        HierarchyIndex::build(self.snapshot())
    }
}
