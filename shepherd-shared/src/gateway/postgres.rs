//! PostgreSQL entity store
//!
//! Delegates to the per-model query helpers in [`crate::models`]. Referential
//! integrity is left to the schema's foreign keys; violations surface as
//! [`StoreError::Rejected`].

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{EntityKind, EntityStore, NewRecord, Record, RecordPatch, StoreError};
use crate::snapshot::Snapshot;
use crate::db::pool::health_check;
use crate::models::{
    alert::Alert, area::Area, cell::Cell, meeting::Meeting, member::Member, user::User,
    zone::Zone,
};

#[derive(Debug, Clone)]
pub struct PgEntityStore {
    pool: PgPool,
}

impl PgEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn wrap<T>(rows: Vec<T>, into: fn(T) -> Record) -> Vec<Record> {
    rows.into_iter().map(into).collect()
}

#[async_trait]
impl EntityStore for PgEntityStore {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>, StoreError> {
        let pool = &self.pool;
        let records = match kind {
            EntityKind::User => wrap(User::list(pool).await?, Record::User),
            EntityKind::Zone => wrap(Zone::list(pool).await?, Record::Zone),
            EntityKind::Area => wrap(Area::list(pool).await?, Record::Area),
            EntityKind::Cell => wrap(Cell::list(pool).await?, Record::Cell),
            EntityKind::Member => wrap(Member::list(pool).await?, Record::Member),
            EntityKind::Meeting => wrap(Meeting::list(pool).await?, Record::Meeting),
            EntityKind::Alert => wrap(Alert::list(pool).await?, Record::Alert),
        };

        Ok(records)
    }

    async fn create(&self, record: NewRecord) -> Result<Record, StoreError> {
        let pool = &self.pool;
        let kind = record.kind();

        let created = match record {
            NewRecord::User(data) => Record::User(User::create(pool, data).await?),
            NewRecord::Zone(data) => Record::Zone(Zone::create(pool, data).await?),
            NewRecord::Area(data) => Record::Area(Area::create(pool, data).await?),
            NewRecord::Cell(data) => Record::Cell(Cell::create(pool, data).await?),
            NewRecord::Member(data) => Record::Member(Member::create(pool, data).await?),
            NewRecord::Meeting(data) => Record::Meeting(Meeting::create(pool, data).await?),
            NewRecord::Alert(data) => Record::Alert(Alert::create(pool, data).await?),
        };

        tracing::info!(kind = %kind, id = %created.id(), "Created record");
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: RecordPatch) -> Result<Record, StoreError> {
        let pool = &self.pool;
        let kind = patch.kind();

        let updated = match patch {
            RecordPatch::User(p) => User::update(pool, id, p).await?.map(Record::User),
            RecordPatch::Zone(p) => Zone::update(pool, id, p).await?.map(Record::Zone),
            RecordPatch::Area(p) => Area::update(pool, id, p).await?.map(Record::Area),
            RecordPatch::Cell(p) => Cell::update(pool, id, p).await?.map(Record::Cell),
            RecordPatch::Member(p) => Member::update(pool, id, p).await?.map(Record::Member),
            RecordPatch::Meeting(p) => Meeting::update(pool, id, p).await?.map(Record::Meeting),
            RecordPatch::Alert(p) => Alert::update(pool, id, p).await?.map(Record::Alert),
        };

        updated.ok_or(StoreError::NotFound { kind, id })
    }

    async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<(), StoreError> {
        let pool = &self.pool;
        let removed = match kind {
            EntityKind::User => User::delete(pool, id).await?,
            EntityKind::Zone => Zone::delete(pool, id).await?,
            EntityKind::Area => Area::delete(pool, id).await?,
            EntityKind::Cell => Cell::delete(pool, id).await?,
            EntityKind::Member => Member::delete(pool, id).await?,
            EntityKind::Meeting => Meeting::delete(pool, id).await?,
            EntityKind::Alert => Alert::delete(pool, id).await?,
        };

        if removed {
            tracing::info!(kind = %kind, id = %id, "Deleted record");
            Ok(())
        } else {
            Err(StoreError::NotFound { kind, id })
        }
    }

    /// Reads every table inside one read-only `REPEATABLE READ` transaction,
    /// so the snapshot reflects a single point in time
    async fn fetch_snapshot(&self) -> Result<Snapshot, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let snapshot = Snapshot {
            users: User::list(&mut *tx).await?,
            zones: Zone::list(&mut *tx).await?,
            areas: Area::list(&mut *tx).await?,
            cells: Cell::list(&mut *tx).await?,
            members: Member::list(&mut *tx).await?,
            meetings: Meeting::list(&mut *tx).await?,
            alerts: Alert::list(&mut *tx).await?,
        };
        tx.commit().await?;

        tracing::debug!(
            users = snapshot.users.len(),
            zones = snapshot.zones.len(),
            members = snapshot.members.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
