//! Area model and database operations
//!
//! Areas belong to exactly one zone and carry some district metadata that is
//! only ever displayed, never interpreted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::node::NodeStatus;

const AREA_COLUMNS: &str = "id, name, zone_id, leader_id, district_name, district_leader, \
     district_pastor, status, created_at, updated_at";

/// An area within a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Area {
    pub id: Uuid,

    pub name: String,

    /// Parent zone
    pub zone_id: Uuid,

    pub leader_id: Option<Uuid>,

    pub district_name: Option<String>,

    pub district_leader: Option<String>,

    pub district_pastor: Option<String>,

    pub status: NodeStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArea {
    pub name: String,
    pub zone_id: Uuid,
    pub leader_id: Option<Uuid>,
    pub district_name: Option<String>,
    pub district_leader: Option<String>,
    pub district_pastor: Option<String>,
    #[serde(default)]
    pub status: NodeStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateArea {
    pub name: Option<String>,
    pub zone_id: Option<Uuid>,
    pub leader_id: Option<Option<Uuid>>,
    pub district_name: Option<Option<String>>,
    pub district_leader: Option<Option<String>>,
    pub district_pastor: Option<Option<String>>,
    pub status: Option<NodeStatus>,
}

impl UpdateArea {
    pub fn apply_to(self, area: &mut Area, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            area.name = name;
        }
        if let Some(zone_id) = self.zone_id {
            area.zone_id = zone_id;
        }
        if let Some(leader_id) = self.leader_id {
            area.leader_id = leader_id;
        }
        if let Some(v) = self.district_name {
            area.district_name = v;
        }
        if let Some(v) = self.district_leader {
            area.district_leader = v;
        }
        if let Some(v) = self.district_pastor {
            area.district_pastor = v;
        }
        if let Some(status) = self.status {
            area.status = status;
        }
        area.updated_at = now;
    }
}

impl Area {
    pub async fn create(pool: &PgPool, data: CreateArea) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Area>(&format!(
            r#"
            INSERT INTO areas (name, zone_id, leader_id, district_name, district_leader, district_pastor, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {AREA_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.zone_id)
        .bind(data.leader_id)
        .bind(data.district_name)
        .bind(data.district_leader)
        .bind(data.district_pastor)
        .bind(data.status)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Area>(&format!("SELECT {AREA_COLUMNS} FROM areas WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists every record; accepts a pool or an open transaction
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Area>(&format!("SELECT {AREA_COLUMNS} FROM areas ORDER BY name ASC"))
            .fetch_all(executor)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateArea,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE areas SET updated_at = NOW()");

        if let Some(name) = data.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(zone_id) = data.zone_id {
            builder.push(", zone_id = ").push_bind(zone_id);
        }
        if let Some(leader_id) = data.leader_id {
            builder.push(", leader_id = ").push_bind(leader_id);
        }
        if let Some(v) = data.district_name {
            builder.push(", district_name = ").push_bind(v);
        }
        if let Some(v) = data.district_leader {
            builder.push(", district_leader = ").push_bind(v);
        }
        if let Some(v) = data.district_pastor {
            builder.push(", district_pastor = ").push_bind(v);
        }
        if let Some(status) = data.status {
            builder.push(", status = ").push_bind(status);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(AREA_COLUMNS);

        builder.build_query_as::<Area>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM areas WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
