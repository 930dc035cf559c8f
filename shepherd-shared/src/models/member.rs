//! Member model and database operations
//!
//! Members belong to a single cell. The join date drives the new-member
//! counts in weekly growth reports.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const MEMBER_COLUMNS: &str =
    "id, name, email, phone, address, cell_id, join_date, status, created_at, updated_at";

/// Membership status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
}

/// A cell member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: Uuid,

    pub name: String,

    pub email: Option<String>,

    pub phone: Option<String>,

    pub address: Option<String>,

    /// Parent cell
    pub cell_id: Uuid,

    pub join_date: NaiveDate,

    pub status: MemberStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMember {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub cell_id: Uuid,
    pub join_date: NaiveDate,
    #[serde(default)]
    pub status: MemberStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMember {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub cell_id: Option<Uuid>,
    pub join_date: Option<NaiveDate>,
    pub status: Option<MemberStatus>,
}

impl UpdateMember {
    pub fn apply_to(self, member: &mut Member, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            member.name = name;
        }
        if let Some(v) = self.email {
            member.email = v;
        }
        if let Some(v) = self.phone {
            member.phone = v;
        }
        if let Some(v) = self.address {
            member.address = v;
        }
        if let Some(cell_id) = self.cell_id {
            member.cell_id = cell_id;
        }
        if let Some(join_date) = self.join_date {
            member.join_date = join_date;
        }
        if let Some(status) = self.status {
            member.status = status;
        }
        member.updated_at = now;
    }
}

impl Member {
    pub async fn create(pool: &PgPool, data: CreateMember) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Member>(&format!(
            r#"
            INSERT INTO members (name, email, phone, address, cell_id, join_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.address)
        .bind(data.cell_id)
        .bind(data.join_date)
        .bind(data.status)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists all members ordered by name
    /// Lists every record; accepts a pool or an open transaction
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members ORDER BY name ASC"
        ))
        .fetch_all(executor)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateMember,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE members SET updated_at = NOW()");

        if let Some(name) = data.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(v) = data.email {
            builder.push(", email = ").push_bind(v);
        }
        if let Some(v) = data.phone {
            builder.push(", phone = ").push_bind(v);
        }
        if let Some(v) = data.address {
            builder.push(", address = ").push_bind(v);
        }
        if let Some(cell_id) = data.cell_id {
            builder.push(", cell_id = ").push_bind(cell_id);
        }
        if let Some(join_date) = data.join_date {
            builder.push(", join_date = ").push_bind(join_date);
        }
        if let Some(status) = data.status {
            builder.push(", status = ").push_bind(status);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(MEMBER_COLUMNS);

        builder.build_query_as::<Member>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
