//! Entity store gateway
//!
//! The only way records are read or written. A gateway performs plain
//! create/read/update/delete against an external store and holds no business
//! rules; authorization happens before a call reaches it.
//!
//! Two implementations ship with the crate:
//!
//! - [`postgres::PgEntityStore`]: PostgreSQL through sqlx
//! - [`memory::MemoryEntityStore`]: in-process, for tests and local runs
//!
//! # Example
//!
//! ```
//! use shepherd_shared::gateway::{memory::MemoryEntityStore, EntityStore, NewRecord};
//! use shepherd_shared::models::zone::CreateZone;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryEntityStore::new();
//! store
//!     .create(NewRecord::Zone(CreateZone {
//!         name: "North".to_string(),
//!         leader_id: None,
//!         status: Default::default(),
//!     }))
//!     .await?;
//!
//! let snapshot = store.fetch_snapshot().await?;
//! assert_eq!(snapshot.zones.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::{
    alert::{Alert, CreateAlert, UpdateAlert},
    area::{Area, CreateArea, UpdateArea},
    cell::{Cell, CreateCell, UpdateCell},
    meeting::{CreateMeeting, Meeting, UpdateMeeting},
    member::{CreateMember, Member, UpdateMember},
    user::{CreateUser, UpdateUser, User},
    zone::{CreateZone, UpdateZone, Zone},
};
use crate::snapshot::Snapshot;

/// Kind of record held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Zone,
    Area,
    Cell,
    Member,
    Meeting,
    Alert,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::User,
        EntityKind::Zone,
        EntityKind::Area,
        EntityKind::Cell,
        EntityKind::Member,
        EntityKind::Meeting,
        EntityKind::Alert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Zone => "zone",
            EntityKind::Area => "area",
            EntityKind::Cell => "cell",
            EntityKind::Member => "member",
            EntityKind::Meeting => "meeting",
            EntityKind::Alert => "alert",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored record of any kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "lowercase")]
pub enum Record {
    User(User),
    Zone(Zone),
    Area(Area),
    Cell(Cell),
    Member(Member),
    Meeting(Meeting),
    Alert(Alert),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::User(_) => EntityKind::User,
            Record::Zone(_) => EntityKind::Zone,
            Record::Area(_) => EntityKind::Area,
            Record::Cell(_) => EntityKind::Cell,
            Record::Member(_) => EntityKind::Member,
            Record::Meeting(_) => EntityKind::Meeting,
            Record::Alert(_) => EntityKind::Alert,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Record::User(r) => r.id,
            Record::Zone(r) => r.id,
            Record::Area(r) => r.id,
            Record::Cell(r) => r.id,
            Record::Member(r) => r.id,
            Record::Meeting(r) => r.id,
            Record::Alert(r) => r.id,
        }
    }
}

/// Input for [`EntityStore::create`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "lowercase")]
pub enum NewRecord {
    User(CreateUser),
    Zone(CreateZone),
    Area(CreateArea),
    Cell(CreateCell),
    Member(CreateMember),
    Meeting(CreateMeeting),
    Alert(CreateAlert),
}

impl NewRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            NewRecord::User(_) => EntityKind::User,
            NewRecord::Zone(_) => EntityKind::Zone,
            NewRecord::Area(_) => EntityKind::Area,
            NewRecord::Cell(_) => EntityKind::Cell,
            NewRecord::Member(_) => EntityKind::Member,
            NewRecord::Meeting(_) => EntityKind::Meeting,
            NewRecord::Alert(_) => EntityKind::Alert,
        }
    }
}

/// Input for [`EntityStore::update`]; only set fields are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "patch", rename_all = "lowercase")]
pub enum RecordPatch {
    User(UpdateUser),
    Zone(UpdateZone),
    Area(UpdateArea),
    Cell(UpdateCell),
    Member(UpdateMember),
    Meeting(UpdateMeeting),
    Alert(UpdateAlert),
}

impl RecordPatch {
    pub fn kind(&self) -> EntityKind {
        match self {
            RecordPatch::User(_) => EntityKind::User,
            RecordPatch::Zone(_) => EntityKind::Zone,
            RecordPatch::Area(_) => EntityKind::Area,
            RecordPatch::Cell(_) => EntityKind::Cell,
            RecordPatch::Member(_) => EntityKind::Member,
            RecordPatch::Meeting(_) => EntityKind::Meeting,
            RecordPatch::Alert(_) => EntityKind::Alert,
        }
    }
}

/// Store failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },

    /// The store refused the write (constraint violation, duplicate key)
    #[error("Rejected by store: {0}")]
    Rejected(String),

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation() =>
            {
                StoreError::Rejected(db.message().to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(e.to_string())
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

/// Keeps the records of one kind from a [`EntityStore::fetch_all`] result
fn unpack<T>(records: Vec<Record>, pick: impl Fn(Record) -> Option<T>) -> Vec<T> {
    records.into_iter().filter_map(pick).collect()
}

/// Create/read/update/delete access to the external store
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// All records of `kind`
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError>;

    async fn create(&self, record: NewRecord) -> Result<Record, StoreError>;

    /// Applies `patch` to the record `id` of the patch's kind
    async fn update(&self, id: Uuid, patch: RecordPatch) -> Result<Record, StoreError>;

    async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<(), StoreError>;

    /// Cheap reachability check
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Loads every kind into a [`Snapshot`]
    ///
    /// The provided implementation issues one [`EntityStore::fetch_all`] per
    /// kind, so each collection is read separately. Stores that can read all
    /// kinds at one point in time should override it.
    async fn fetch_snapshot(&self) -> Result<Snapshot, StoreError> {
        let (users, zones, areas, cells, members, meetings, alerts) = tokio::try_join!(
            self.fetch_all(EntityKind::User),
            self.fetch_all(EntityKind::Zone),
            self.fetch_all(EntityKind::Area),
            self.fetch_all(EntityKind::Cell),
            self.fetch_all(EntityKind::Member),
            self.fetch_all(EntityKind::Meeting),
            self.fetch_all(EntityKind::Alert),
        )?;

        let snapshot = Snapshot {
            users: unpack(users, |r| match r {
                Record::User(v) => Some(v),
                _ => None,
            }),
            zones: unpack(zones, |r| match r {
                Record::Zone(v) => Some(v),
                _ => None,
            }),
            areas: unpack(areas, |r| match r {
                Record::Area(v) => Some(v),
                _ => None,
            }),
            cells: unpack(cells, |r| match r {
                Record::Cell(v) => Some(v),
                _ => None,
            }),
            members: unpack(members, |r| match r {
                Record::Member(v) => Some(v),
                _ => None,
            }),
            meetings: unpack(meetings, |r| match r {
                Record::Meeting(v) => Some(v),
                _ => None,
            }),
            alerts: unpack(alerts, |r| match r {
                Record::Alert(v) => Some(v),
                _ => None,
            }),
        };

        tracing::debug!(
            users = snapshot.users.len(),
            zones = snapshot.zones.len(),
            meetings = snapshot.meetings.len(),
            "Fetched snapshot"
        );

        Ok(snapshot)
    }
}
