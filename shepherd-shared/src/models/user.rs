//! User profile model and database operations
//!
//! A user profile shares its id with the identity provider account that signs
//! in with it. Credentials never live in this table.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE user_role AS ENUM ('cell-leader', 'area-leader', 'zone-leader', 'super-admin');
//!
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY,
//!     email TEXT NOT NULL UNIQUE,
//!     name TEXT NOT NULL,
//!     phone TEXT,
//!     role user_role NOT NULL,
//!     zone_id UUID REFERENCES zones(id) ON DELETE SET NULL,
//!     area_id UUID REFERENCES areas(id) ON DELETE SET NULL,
//!     cell_id UUID REFERENCES cells(id) ON DELETE SET NULL,
//!     is_active BOOLEAN NOT NULL DEFAULT TRUE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! # Example
//!
//! ```no_run
//! use shepherd_shared::models::role::Assignment;
//! use shepherd_shared::models::user::{CreateUser, User};
//! use sqlx::PgPool;
//! use uuid::Uuid;
//!
//! # async fn example(pool: PgPool, zone_id: Uuid) -> Result<(), sqlx::Error> {
//! let user = User::create(&pool, CreateUser {
//!     id: Uuid::new_v4(),
//!     email: "grace@example.org".to_string(),
//!     name: "Grace".to_string(),
//!     phone: None,
//!     assignment: Assignment::ZoneLeader { zone_id: Some(zone_id) },
//! }).await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::role::{Assignment, Role};

const USER_COLUMNS: &str =
    "id, email, name, phone, role, zone_id, area_id, cell_id, is_active, created_at, updated_at";

/// A user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Profile id, identical to the identity provider account id
    pub id: Uuid,

    pub email: String,

    pub name: String,

    pub phone: Option<String>,

    /// Role and the node the user leads
    pub assignment: Assignment,

    /// Inactive users keep their profile but are not shown as leaders
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        self.assignment.role()
    }
}

/// Flat row shape of the `users` table
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    phone: Option<String>,
    role: Role,
    zone_id: Option<Uuid>,
    area_id: Option<Uuid>,
    cell_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            phone: row.phone,
            assignment: Assignment::from_columns(row.role, row.zone_id, row.area_id, row.cell_id),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Id of the identity provider account
    pub id: Uuid,

    pub email: String,

    pub name: String,

    pub phone: Option<String>,

    pub assignment: Assignment,
}

/// Input for updating a user profile
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,

    /// Use `Some(None)` to clear
    pub phone: Option<Option<String>>,

    /// Replaces role and scope together
    pub assignment: Option<Assignment>,

    pub is_active: Option<bool>,
}

impl UpdateUser {
    /// Applies the patch to an in-memory record
    pub fn apply_to(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        if let Some(assignment) = self.assignment {
            user.assignment = assignment;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        user.updated_at = now;
    }
}

impl User {
    /// Creates a profile row
    ///
    /// # Errors
    ///
    /// Returns an error if the id or email already exists, or if the scope id
    /// references a missing node.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let a = data.assignment;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, email, name, phone, role, zone_id, area_id, cell_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.id)
        .bind(data.email)
        .bind(data.name)
        .bind(data.phone)
        .bind(a.role())
        .bind(a.zone_id())
        .bind(a.area_id())
        .bind(a.cell_id())
        .fetch_one(pool)
        .await?;

        Ok(row.into())
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Lists every profile, oldest first
    /// Lists every record; accepts a pool or an open transaction
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Updates a profile
    ///
    /// Returns `None` if the profile doesn't exist. Writing an assignment
    /// rewrites all three scope columns so that stale ids never linger.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");

        if let Some(name) = data.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(phone) = data.phone {
            builder.push(", phone = ").push_bind(phone);
        }
        if let Some(a) = data.assignment {
            builder
                .push(", role = ")
                .push_bind(a.role())
                .push(", zone_id = ")
                .push_bind(a.zone_id())
                .push(", area_id = ")
                .push_bind(a.area_id())
                .push(", cell_id = ")
                .push_bind(a.cell_id());
        }
        if let Some(is_active) = data.is_active {
            builder.push(", is_active = ").push_bind(is_active);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(USER_COLUMNS);

        let row = builder
            .build_query_as::<UserRow>()
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Deletes a profile, returning whether a row was removed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
