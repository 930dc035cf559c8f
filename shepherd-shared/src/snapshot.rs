//! Bulk entity snapshot
//!
//! A snapshot is every record the core works with, loaded in one go from the
//! entity store. It is replaced wholesale after each mutation.

use serde::{Deserialize, Serialize};

use crate::models::{
    alert::Alert, area::Area, cell::Cell, meeting::Meeting, member::Member, user::User,
    zone::Zone,
};

/// Flat collections of every entity kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub zones: Vec<Zone>,
    pub areas: Vec<Area>,
    pub cells: Vec<Cell>,
    pub members: Vec<Member>,
    pub meetings: Vec<Meeting>,
    pub alerts: Vec<Alert>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.zones.is_empty()
            && self.areas.is_empty()
            && self.cells.is_empty()
            && self.members.is_empty()
            && self.meetings.is_empty()
            && self.alerts.is_empty()
    }
}
