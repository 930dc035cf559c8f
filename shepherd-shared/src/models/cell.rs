//! Cell model and database operations
//!
//! A cell is the smallest group: it has members and holds meetings on a
//! regular schedule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::node::NodeStatus;

const CELL_COLUMNS: &str = "id, name, area_id, leader_id, meeting_day, meeting_time, \
     meeting_location, status, created_at, updated_at";

/// A cell within an area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Cell {
    pub id: Uuid,

    pub name: String,

    /// Parent area
    pub area_id: Uuid,

    pub leader_id: Option<Uuid>,

    /// Free-form weekday, e.g. "Wednesday"
    pub meeting_day: Option<String>,

    /// Free-form time, e.g. "19:00"
    pub meeting_time: Option<String>,

    pub meeting_location: Option<String>,

    pub status: NodeStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCell {
    pub name: String,
    pub area_id: Uuid,
    pub leader_id: Option<Uuid>,
    pub meeting_day: Option<String>,
    pub meeting_time: Option<String>,
    pub meeting_location: Option<String>,
    #[serde(default)]
    pub status: NodeStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCell {
    pub name: Option<String>,
    pub area_id: Option<Uuid>,
    pub leader_id: Option<Option<Uuid>>,
    pub meeting_day: Option<Option<String>>,
    pub meeting_time: Option<Option<String>>,
    pub meeting_location: Option<Option<String>>,
    pub status: Option<NodeStatus>,
}

impl UpdateCell {
    pub fn apply_to(self, cell: &mut Cell, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            cell.name = name;
        }
        if let Some(area_id) = self.area_id {
            cell.area_id = area_id;
        }
        if let Some(leader_id) = self.leader_id {
            cell.leader_id = leader_id;
        }
        if let Some(v) = self.meeting_day {
            cell.meeting_day = v;
        }
        if let Some(v) = self.meeting_time {
            cell.meeting_time = v;
        }
        if let Some(v) = self.meeting_location {
            cell.meeting_location = v;
        }
        if let Some(status) = self.status {
            cell.status = status;
        }
        cell.updated_at = now;
    }
}

impl Cell {
    pub async fn create(pool: &PgPool, data: CreateCell) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Cell>(&format!(
            r#"
            INSERT INTO cells (name, area_id, leader_id, meeting_day, meeting_time, meeting_location, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CELL_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.area_id)
        .bind(data.leader_id)
        .bind(data.meeting_day)
        .bind(data.meeting_time)
        .bind(data.meeting_location)
        .bind(data.status)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Cell>(&format!("SELECT {CELL_COLUMNS} FROM cells WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists every record; accepts a pool or an open transaction
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Cell>(&format!("SELECT {CELL_COLUMNS} FROM cells ORDER BY name ASC"))
            .fetch_all(executor)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCell,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE cells SET updated_at = NOW()");

        if let Some(name) = data.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(area_id) = data.area_id {
            builder.push(", area_id = ").push_bind(area_id);
        }
        if let Some(leader_id) = data.leader_id {
            builder.push(", leader_id = ").push_bind(leader_id);
        }
        if let Some(v) = data.meeting_day {
            builder.push(", meeting_day = ").push_bind(v);
        }
        if let Some(v) = data.meeting_time {
            builder.push(", meeting_time = ").push_bind(v);
        }
        if let Some(v) = data.meeting_location {
            builder.push(", meeting_location = ").push_bind(v);
        }
        if let Some(status) = data.status {
            builder.push(", status = ").push_bind(status);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(CELL_COLUMNS);

        builder.build_query_as::<Cell>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cells WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
