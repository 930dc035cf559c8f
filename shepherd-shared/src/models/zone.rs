//! Zone model and database operations
//!
//! Zones are the top level of the organization below the root. Each zone has
//! at most one leader.
//!
//! # Example
//!
//! ```no_run
//! use shepherd_shared::models::zone::{CreateZone, Zone};
//! use sqlx::PgPool;
//!
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! let zone = Zone::create(&pool, CreateZone {
//!     name: "North".to_string(),
//!     leader_id: None,
//!     status: Default::default(),
//! }).await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::node::NodeStatus;

/// A zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Zone {
    pub id: Uuid,

    pub name: String,

    /// Profile id of the zone leader
    pub leader_id: Option<Uuid>,

    pub status: NodeStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateZone {
    pub name: String,
    pub leader_id: Option<Uuid>,
    #[serde(default)]
    pub status: NodeStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateZone {
    pub name: Option<String>,
    pub leader_id: Option<Option<Uuid>>,
    pub status: Option<NodeStatus>,
}

impl UpdateZone {
    pub fn apply_to(self, zone: &mut Zone, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            zone.name = name;
        }
        if let Some(leader_id) = self.leader_id {
            zone.leader_id = leader_id;
        }
        if let Some(status) = self.status {
            zone.status = status;
        }
        zone.updated_at = now;
    }
}

impl Zone {
    pub async fn create(pool: &PgPool, data: CreateZone) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Zone>(
            r#"
            INSERT INTO zones (name, leader_id, status)
            VALUES ($1, $2, $3)
            RETURNING id, name, leader_id, status, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.leader_id)
        .bind(data.status)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Zone>(
            "SELECT id, name, leader_id, status, created_at, updated_at FROM zones WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists all zones ordered by name
    /// Lists every record; accepts a pool or an open transaction
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Zone>(
            "SELECT id, name, leader_id, status, created_at, updated_at FROM zones ORDER BY name ASC",
        )
        .fetch_all(executor)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateZone,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE zones SET updated_at = NOW()");

        if let Some(name) = data.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(leader_id) = data.leader_id {
            builder.push(", leader_id = ").push_bind(leader_id);
        }
        if let Some(status) = data.status {
            builder.push(", status = ").push_bind(status);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING id, name, leader_id, status, created_at, updated_at");

        builder.build_query_as::<Zone>().fetch_optional(pool).await
    }

    /// Deletes a zone
    ///
    /// Fails with a foreign key violation while areas still reference it.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM zones WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
