//! In-memory entity store
//!
//! Holds a [`Snapshot`] behind a lock and mimics the PostgreSQL schema's
//! constraints: parents must exist, user ids and emails are unique, and nodes
//! with children cannot be deleted. Writes to chosen kinds can be made to fail
//! so tests can exercise partial-failure paths.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EntityKind, EntityStore, NewRecord, Record, RecordPatch, StoreError};
use crate::models::{
    alert::Alert, area::Area, cell::Cell, meeting::Meeting, member::Member, user::User,
    zone::Zone,
};
use crate::snapshot::Snapshot;

#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    state: RwLock<Snapshot>,
    rejected_kinds: RwLock<HashSet<EntityKind>>,
    unavailable: RwLock<bool>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with `snapshot`
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
            ..Default::default()
        }
    }

    /// Makes every later write to `kind` fail with [`StoreError::Rejected`]
    pub async fn reject_writes_to(&self, kind: EntityKind) {
        self.rejected_kinds.write().await.insert(kind);
    }

    pub async fn accept_writes_to(&self, kind: EntityKind) {
        self.rejected_kinds.write().await.remove(&kind);
    }

    /// Makes every call fail with [`StoreError::Unavailable`]
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    async fn check_available(&self) -> Result<(), StoreError> {
        if *self.unavailable.read().await {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    async fn check_writable(&self, kind: EntityKind) -> Result<(), StoreError> {
        self.check_available().await?;
        if self.rejected_kinds.read().await.contains(&kind) {
            return Err(StoreError::Rejected(format!("writes to {kind} are disabled")));
        }
        Ok(())
    }
}

fn require_parent(exists: bool, kind: EntityKind, id: Uuid) -> Result<(), StoreError> {
    if exists {
        Ok(())
    } else {
        Err(StoreError::Rejected(format!(
            "referenced {kind} {id} does not exist"
        )))
    }
}

fn optional_parent(
    id: Option<Uuid>,
    kind: EntityKind,
    exists: impl Fn(Uuid) -> bool,
) -> Result<(), StoreError> {
    match id {
        Some(id) => require_parent(exists(id), kind, id),
        None => Ok(()),
    }
}

fn check_user_refs(s: &Snapshot, user: &User) -> Result<(), StoreError> {
    let a = &user.assignment;
    optional_parent(a.zone_id(), EntityKind::Zone, |id| {
        s.zones.iter().any(|z| z.id == id)
    })?;
    optional_parent(a.area_id(), EntityKind::Area, |id| {
        s.areas.iter().any(|r| r.id == id)
    })?;
    optional_parent(a.cell_id(), EntityKind::Cell, |id| {
        s.cells.iter().any(|c| c.id == id)
    })
}

fn user_exists(s: &Snapshot, id: Uuid) -> bool {
    s.users.iter().any(|u| u.id == id)
}

fn find_mut<T>(
    items: &mut [T],
    id: Uuid,
    kind: EntityKind,
    key: impl Fn(&T) -> Uuid,
) -> Result<&mut T, StoreError> {
    items
        .iter_mut()
        .find(|item| key(item) == id)
        .ok_or(StoreError::NotFound { kind, id })
}

fn remove_by_id<T>(
    items: &mut Vec<T>,
    id: Uuid,
    kind: EntityKind,
    key: impl Fn(&T) -> Uuid,
) -> Result<(), StoreError> {
    let before = items.len();
    items.retain(|item| key(item) != id);
    if items.len() == before {
        Err(StoreError::NotFound { kind, id })
    } else {
        Ok(())
    }
}

fn restrict(has_children: bool, kind: EntityKind, id: Uuid) -> Result<(), StoreError> {
    if has_children {
        Err(StoreError::Rejected(format!(
            "{kind} {id} still has dependent records"
        )))
    } else {
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError> {
        self.check_available().await?;
        let s = self.state.read().await;

        let records = match kind {
            EntityKind::User => s.users.iter().cloned().map(Record::User).collect(),
            EntityKind::Zone => s.zones.iter().cloned().map(Record::Zone).collect(),
            EntityKind::Area => s.areas.iter().cloned().map(Record::Area).collect(),
            EntityKind::Cell => s.cells.iter().cloned().map(Record::Cell).collect(),
            EntityKind::Member => s.members.iter().cloned().map(Record::Member).collect(),
            EntityKind::Meeting => s.meetings.iter().cloned().map(Record::Meeting).collect(),
            EntityKind::Alert => s.alerts.iter().cloned().map(Record::Alert).collect(),
        };

        Ok(records)
    }

    async fn create(&self, record: NewRecord) -> Result<Record, StoreError> {
        self.check_writable(record.kind()).await?;
        let mut s = self.state.write().await;
        let now = Utc::now();

        let created = match record {
            NewRecord::User(data) => {
                if user_exists(&s, data.id) {
                    return Err(StoreError::Rejected(format!(
                        "user {} already exists",
                        data.id
                    )));
                }
                if s.users.iter().any(|u| u.email.eq_ignore_ascii_case(&data.email)) {
                    return Err(StoreError::Rejected(format!(
                        "email {} is already registered",
                        data.email
                    )));
                }
                let user = User {
                    id: data.id,
                    email: data.email,
                    name: data.name,
                    phone: data.phone,
                    assignment: data.assignment,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                };
                check_user_refs(&s, &user)?;
                s.users.push(user.clone());
                Record::User(user)
            }
            NewRecord::Zone(data) => {
                optional_parent(data.leader_id, EntityKind::User, |id| user_exists(&s, id))?;
                let zone = Zone {
                    id: Uuid::new_v4(),
                    name: data.name,
                    leader_id: data.leader_id,
                    status: data.status,
                    created_at: now,
                    updated_at: now,
                };
                s.zones.push(zone.clone());
                Record::Zone(zone)
            }
            NewRecord::Area(data) => {
                require_parent(
                    s.zones.iter().any(|z| z.id == data.zone_id),
                    EntityKind::Zone,
                    data.zone_id,
                )?;
                optional_parent(data.leader_id, EntityKind::User, |id| user_exists(&s, id))?;
                let area = Area {
                    id: Uuid::new_v4(),
                    name: data.name,
                    zone_id: data.zone_id,
                    leader_id: data.leader_id,
                    district_name: data.district_name,
                    district_leader: data.district_leader,
                    district_pastor: data.district_pastor,
                    status: data.status,
                    created_at: now,
                    updated_at: now,
                };
                s.areas.push(area.clone());
                Record::Area(area)
            }
            NewRecord::Cell(data) => {
                require_parent(
                    s.areas.iter().any(|a| a.id == data.area_id),
                    EntityKind::Area,
                    data.area_id,
                )?;
                optional_parent(data.leader_id, EntityKind::User, |id| user_exists(&s, id))?;
                let cell = Cell {
                    id: Uuid::new_v4(),
                    name: data.name,
                    area_id: data.area_id,
                    leader_id: data.leader_id,
                    meeting_day: data.meeting_day,
                    meeting_time: data.meeting_time,
                    meeting_location: data.meeting_location,
                    status: data.status,
                    created_at: now,
                    updated_at: now,
                };
                s.cells.push(cell.clone());
                Record::Cell(cell)
            }
            NewRecord::Member(data) => {
                require_parent(
                    s.cells.iter().any(|c| c.id == data.cell_id),
                    EntityKind::Cell,
                    data.cell_id,
                )?;
                let member = Member {
                    id: Uuid::new_v4(),
                    name: data.name,
                    email: data.email,
                    phone: data.phone,
                    address: data.address,
                    cell_id: data.cell_id,
                    join_date: data.join_date,
                    status: data.status,
                    created_at: now,
                    updated_at: now,
                };
                s.members.push(member.clone());
                Record::Member(member)
            }
            NewRecord::Meeting(data) => {
                require_parent(
                    s.cells.iter().any(|c| c.id == data.cell_id),
                    EntityKind::Cell,
                    data.cell_id,
                )?;
                if matches!(data.attendance_count, Some(n) if n < 0) {
                    return Err(StoreError::Rejected(
                        "attendance_count must not be negative".to_string(),
                    ));
                }
                let meeting = Meeting {
                    id: Uuid::new_v4(),
                    cell_id: data.cell_id,
                    meeting_date: data.meeting_date,
                    attendee_ids: data.attendee_ids,
                    attendance_count: data.attendance_count,
                    offering_amount: data.offering_amount,
                    visitor_count: data.visitor_count,
                    convert_count: data.convert_count,
                    followup_count: data.followup_count,
                    visit_count: data.visit_count,
                    notes: data.notes,
                    status: data.status,
                    created_by: data.created_by,
                    created_at: now,
                    updated_at: now,
                };
                s.meetings.push(meeting.clone());
                Record::Meeting(meeting)
            }
            NewRecord::Alert(data) => {
                require_parent(
                    user_exists(&s, data.created_by),
                    EntityKind::User,
                    data.created_by,
                )?;
                let alert = Alert {
                    id: Uuid::new_v4(),
                    title: data.title,
                    message: data.message,
                    alert_type: data.alert_type,
                    audience: data.audience,
                    priority: data.priority,
                    is_active: true,
                    created_by: data.created_by,
                    expires_at: data.expires_at,
                    created_at: now,
                    updated_at: now,
                };
                s.alerts.push(alert.clone());
                Record::Alert(alert)
            }
        };

        tracing::debug!(kind = %created.kind(), id = %created.id(), "Created record in memory store");
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: RecordPatch) -> Result<Record, StoreError> {
        let kind = patch.kind();
        self.check_writable(kind).await?;
        let mut guard = self.state.write().await;
        let s = &mut *guard;
        let now = Utc::now();

        let updated = match patch {
            RecordPatch::User(p) => {
                let mut user = find_mut(&mut s.users, id, kind, |u| u.id)?.clone();
                p.apply_to(&mut user, now);
                check_user_refs(s, &user)?;
                *find_mut(&mut s.users, id, kind, |u| u.id)? = user.clone();
                Record::User(user)
            }
            RecordPatch::Zone(p) => {
                if let Some(Some(leader)) = p.leader_id {
                    require_parent(user_exists(s, leader), EntityKind::User, leader)?;
                }
                let zone = find_mut(&mut s.zones, id, kind, |z| z.id)?;
                p.apply_to(zone, now);
                Record::Zone(zone.clone())
            }
            RecordPatch::Area(p) => {
                if let Some(zone_id) = p.zone_id {
                    require_parent(
                        s.zones.iter().any(|z| z.id == zone_id),
                        EntityKind::Zone,
                        zone_id,
                    )?;
                }
                if let Some(Some(leader)) = p.leader_id {
                    require_parent(user_exists(s, leader), EntityKind::User, leader)?;
                }
                let area = find_mut(&mut s.areas, id, kind, |a| a.id)?;
                p.apply_to(area, now);
                Record::Area(area.clone())
            }
            RecordPatch::Cell(p) => {
                if let Some(area_id) = p.area_id {
                    require_parent(
                        s.areas.iter().any(|a| a.id == area_id),
                        EntityKind::Area,
                        area_id,
                    )?;
                }
                if let Some(Some(leader)) = p.leader_id {
                    require_parent(user_exists(s, leader), EntityKind::User, leader)?;
                }
                let cell = find_mut(&mut s.cells, id, kind, |c| c.id)?;
                p.apply_to(cell, now);
                Record::Cell(cell.clone())
            }
            RecordPatch::Member(p) => {
                if let Some(cell_id) = p.cell_id {
                    require_parent(
                        s.cells.iter().any(|c| c.id == cell_id),
                        EntityKind::Cell,
                        cell_id,
                    )?;
                }
                let member = find_mut(&mut s.members, id, kind, |m| m.id)?;
                p.apply_to(member, now);
                Record::Member(member.clone())
            }
            RecordPatch::Meeting(p) => {
                let meeting = find_mut(&mut s.meetings, id, kind, |m| m.id)?;
                p.apply_to(meeting, now);
                Record::Meeting(meeting.clone())
            }
            RecordPatch::Alert(p) => {
                let alert = find_mut(&mut s.alerts, id, kind, |a| a.id)?;
                p.apply_to(alert, now);
                Record::Alert(alert.clone())
            }
        };

        Ok(updated)
    }

    async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<(), StoreError> {
        self.check_writable(kind).await?;
        let mut guard = self.state.write().await;
        let s = &mut *guard;

        match kind {
            EntityKind::User => {
                remove_by_id(&mut s.users, id, kind, |u| u.id)?;
                for zone in s.zones.iter_mut().filter(|z| z.leader_id == Some(id)) {
                    zone.leader_id = None;
                }
                for area in s.areas.iter_mut().filter(|a| a.leader_id == Some(id)) {
                    area.leader_id = None;
                }
                for cell in s.cells.iter_mut().filter(|c| c.leader_id == Some(id)) {
                    cell.leader_id = None;
                }
                s.alerts.retain(|a| a.created_by != id);
            }
            EntityKind::Zone => {
                restrict(s.areas.iter().any(|a| a.zone_id == id), kind, id)?;
                remove_by_id(&mut s.zones, id, kind, |z| z.id)?;
            }
            EntityKind::Area => {
                restrict(s.cells.iter().any(|c| c.area_id == id), kind, id)?;
                remove_by_id(&mut s.areas, id, kind, |a| a.id)?;
            }
            EntityKind::Cell => {
                restrict(s.members.iter().any(|m| m.cell_id == id), kind, id)?;
                remove_by_id(&mut s.cells, id, kind, |c| c.id)?;
                s.meetings.retain(|m| m.cell_id != id);
            }
            EntityKind::Member => remove_by_id(&mut s.members, id, kind, |m| m.id)?,
            EntityKind::Meeting => remove_by_id(&mut s.meetings, id, kind, |m| m.id)?,
            EntityKind::Alert => remove_by_id(&mut s.alerts, id, kind, |a| a.id)?,
        }

        Ok(())
    }

    /// Copies every collection under a single read lock
    async fn fetch_snapshot(&self) -> Result<Snapshot, StoreError> {
        self.check_available().await?;
        Ok(self.state.read().await.clone())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.check_available().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::area::CreateArea;
    use crate::models::node::NodeStatus;
    use crate::models::role::Assignment;
    use crate::models::user::{CreateUser, UpdateUser};
    use crate::models::zone::{CreateZone, UpdateZone};
    use crate::testing::Fixture;

    fn new_zone(name: &str) -> NewRecord {
        NewRecord::Zone(CreateZone {
            name: name.to_string(),
            leader_id: None,
            status: NodeStatus::Active,
        })
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let store = MemoryEntityStore::new();
        let zone = store.create(new_zone("North")).await.unwrap();

        let zones = store.fetch_all(EntityKind::Zone).await.unwrap();
        assert_eq!(zones, vec![zone]);
    }

    #[tokio::test]
    async fn test_missing_parent_is_rejected() {
        let store = MemoryEntityStore::new();
        let result = store
            .create(NewRecord::Area(CreateArea {
                name: "Orphan".to_string(),
                zone_id: Uuid::new_v4(),
                leader_id: None,
                district_name: None,
                district_leader: None,
                district_pastor: None,
                status: NodeStatus::Active,
            }))
            .await;

        assert!(matches!(result, Err(StoreError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let store = MemoryEntityStore::new();
        let id = Uuid::new_v4();
        let result = store
            .update(id, RecordPatch::Zone(UpdateZone::default()))
            .await;

        assert_eq!(
            result,
            Err(StoreError::NotFound {
                kind: EntityKind::Zone,
                id
            })
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let store = MemoryEntityStore::new();
        let user = |email: &str| {
            NewRecord::User(CreateUser {
                id: Uuid::new_v4(),
                email: email.to_string(),
                name: "Lydia".to_string(),
                phone: None,
                assignment: Assignment::SuperAdmin,
            })
        };

        store.create(user("lydia@example.org")).await.unwrap();
        let second = store.create(user("Lydia@Example.org")).await;
        assert!(matches!(second, Err(StoreError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_user_scope_must_exist() {
        let mut f = Fixture::new();
        let user = f.super_admin("Priscilla");
        let store = MemoryEntityStore::with_snapshot(f.snapshot());

        let result = store
            .update(
                user,
                RecordPatch::User(UpdateUser {
                    assignment: Some(Assignment::ZoneLeader {
                        zone_id: Some(Uuid::new_v4()),
                    }),
                    ..Default::default()
                }),
            )
            .await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_delete_restricts_non_empty_nodes() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let area = f.area(zone, "A1");
        let store = MemoryEntityStore::with_snapshot(f.snapshot());

        assert!(matches!(
            store.delete(EntityKind::Zone, zone).await,
            Err(StoreError::Rejected(_))
        ));
        store.delete(EntityKind::Area, area).await.unwrap();
        store.delete(EntityKind::Zone, zone).await.unwrap();
        assert!(store.fetch_snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_leader_clears_leader_ids() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let leader = f.zone_leader(zone, "Grace");
        let store = MemoryEntityStore::with_snapshot(f.snapshot());

        store.delete(EntityKind::User, leader).await.unwrap();
        let snapshot = store.fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.zones[0].leader_id, None);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryEntityStore::new();
        store.reject_writes_to(EntityKind::Zone).await;
        assert!(matches!(
            store.create(new_zone("North")).await,
            Err(StoreError::Rejected(_))
        ));

        store.accept_writes_to(EntityKind::Zone).await;
        assert!(store.create(new_zone("North")).await.is_ok());

        store.set_unavailable(true).await;
        assert!(matches!(
            store.health_check().await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.fetch_snapshot().await.is_err());
    }
}
