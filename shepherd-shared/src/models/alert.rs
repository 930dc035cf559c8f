//! Alert model and database operations
//!
//! Alerts are short broadcast messages shown on dashboards. The audience is
//! stored as a text tag plus a recipient id array:
//!
//! | `target_audience` | meaning |
//! |---|---|
//! | `all` | every user |
//! | a role tag, e.g. `zone-leader` | every user holding that role |
//! | `recipients` | only the users listed in `recipient_ids` |
//!
//! Unknown tags are read as an explicit recipient list so that a malformed
//! row is shown to fewer people rather than more.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::role::Role;

const ALERT_COLUMNS: &str = "id, title, message, alert_type, target_audience, recipient_ids, \
     priority, is_active, created_by, expires_at, created_at, updated_at";

/// Visual category of an alert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "alert_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    #[default]
    Info,
    Warning,
    Success,
    Error,
}

/// Alert priority, lowest first
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    sqlx::Type,
)]
#[sqlx(type_name = "alert_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Who an alert is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Audience {
    All,
    Role(Role),
    Recipients(Vec<Uuid>),
}

impl Audience {
    /// Storage tag for the `target_audience` column
    pub fn tag(&self) -> &'static str {
        match self {
            Audience::All => "all",
            Audience::Role(role) => role.as_str(),
            Audience::Recipients(_) => "recipients",
        }
    }

    /// Ids for the `recipient_ids` column
    pub fn recipient_ids(&self) -> Vec<Uuid> {
        match self {
            Audience::Recipients(ids) => ids.clone(),
            _ => Vec::new(),
        }
    }

    /// Rebuilds an audience from its storage columns
    pub fn from_columns(tag: &str, recipient_ids: Vec<Uuid>) -> Self {
        if tag.eq_ignore_ascii_case("all") {
            return Audience::All;
        }
        match tag.parse::<Role>() {
            Ok(role) => Audience::Role(role),
            Err(_) => Audience::Recipients(recipient_ids),
        }
    }
}

/// A broadcast alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,

    pub title: String,

    pub message: String,

    pub alert_type: AlertType,

    pub audience: Audience,

    pub priority: AlertPriority,

    pub is_active: bool,

    /// Profile id of the sender
    pub created_by: Uuid,

    /// Alerts past this instant are hidden
    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    title: String,
    message: String,
    alert_type: AlertType,
    target_audience: String,
    recipient_ids: Vec<Uuid>,
    priority: AlertPriority,
    is_active: bool,
    created_by: Uuid,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AlertRow> for Alert {
    fn from(row: AlertRow) -> Self {
        Alert {
            id: row.id,
            title: row.title,
            message: row.message,
            alert_type: row.alert_type,
            audience: Audience::from_columns(&row.target_audience, row.recipient_ids),
            priority: row.priority,
            is_active: row.is_active,
            created_by: row.created_by,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAlert {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub alert_type: AlertType,
    pub audience: Audience,
    #[serde(default)]
    pub priority: AlertPriority,
    pub created_by: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAlert {
    pub title: Option<String>,
    pub message: Option<String>,
    pub alert_type: Option<AlertType>,
    pub audience: Option<Audience>,
    pub priority: Option<AlertPriority>,
    pub is_active: Option<bool>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl UpdateAlert {
    pub fn apply_to(self, alert: &mut Alert, now: DateTime<Utc>) {
        if let Some(v) = self.title {
            alert.title = v;
        }
        if let Some(v) = self.message {
            alert.message = v;
        }
        if let Some(v) = self.alert_type {
            alert.alert_type = v;
        }
        if let Some(v) = self.audience {
            alert.audience = v;
        }
        if let Some(v) = self.priority {
            alert.priority = v;
        }
        if let Some(v) = self.is_active {
            alert.is_active = v;
        }
        if let Some(v) = self.expires_at {
            alert.expires_at = v;
        }
        alert.updated_at = now;
    }
}

impl Alert {
    pub async fn create(pool: &PgPool, data: CreateAlert) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            INSERT INTO alerts (title, message, alert_type, target_audience, recipient_ids, priority, created_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(data.title)
        .bind(data.message)
        .bind(data.alert_type)
        .bind(data.audience.tag())
        .bind(data.audience.recipient_ids())
        .bind(data.priority)
        .bind(data.created_by)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        Ok(row.into())
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Lists all alerts, newest first
    /// Lists every record; accepts a pool or an open transaction
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts ORDER BY created_at DESC"
        ))
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateAlert,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE alerts SET updated_at = NOW()");

        if let Some(v) = data.title {
            builder.push(", title = ").push_bind(v);
        }
        if let Some(v) = data.message {
            builder.push(", message = ").push_bind(v);
        }
        if let Some(v) = data.alert_type {
            builder.push(", alert_type = ").push_bind(v);
        }
        if let Some(audience) = data.audience {
            builder
                .push(", target_audience = ")
                .push_bind(audience.tag())
                .push(", recipient_ids = ")
                .push_bind(audience.recipient_ids());
        }
        if let Some(v) = data.priority {
            builder.push(", priority = ").push_bind(v);
        }
        if let Some(v) = data.is_active {
            builder.push(", is_active = ").push_bind(v);
        }
        if let Some(v) = data.expires_at {
            builder.push(", expires_at = ").push_bind(v);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(ALERT_COLUMNS);

        let row = builder
            .build_query_as::<AlertRow>()
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM alerts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
