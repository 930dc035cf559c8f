//! Meeting model and database operations
//!
//! A meeting is one gathering of a cell. Attendance is recorded either as a
//! list of attending member ids, as a bare head count, or both; the head count
//! wins when present.
//!
//! # Example
//!
//! ```
//! use shepherd_shared::models::meeting::Meeting;
//! # fn example(meeting: Meeting) {
//! let attendance = meeting.attendance();
//! # }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const MEETING_COLUMNS: &str = "id, cell_id, meeting_date, attendee_ids, attendance_count, \
     offering_amount, visitor_count, convert_count, followup_count, visit_count, notes, \
     status, created_by, created_at, updated_at";

/// Review status of a meeting report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "meeting_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
}

/// A recorded cell meeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Meeting {
    pub id: Uuid,

    /// Cell that held the meeting
    pub cell_id: Uuid,

    pub meeting_date: NaiveDate,

    /// Members who attended
    pub attendee_ids: Vec<Uuid>,

    /// Head count, overrides `attendee_ids` when set
    pub attendance_count: Option<i32>,

    pub offering_amount: Decimal,

    pub visitor_count: i32,

    pub convert_count: i32,

    pub followup_count: i32,

    pub visit_count: i32,

    pub notes: Option<String>,

    pub status: MeetingStatus,

    /// Profile id of the user who recorded the meeting
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    /// Effective attendance of this meeting
    pub fn attendance(&self) -> u64 {
        match self.attendance_count {
            Some(count) => count.max(0) as u64,
            None => self.attendee_ids.len() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMeeting {
    pub cell_id: Uuid,
    pub meeting_date: NaiveDate,
    #[serde(default)]
    pub attendee_ids: Vec<Uuid>,
    pub attendance_count: Option<i32>,
    #[serde(default)]
    pub offering_amount: Decimal,
    #[serde(default)]
    pub visitor_count: i32,
    #[serde(default)]
    pub convert_count: i32,
    #[serde(default)]
    pub followup_count: i32,
    #[serde(default)]
    pub visit_count: i32,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: MeetingStatus,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMeeting {
    pub meeting_date: Option<NaiveDate>,
    pub attendee_ids: Option<Vec<Uuid>>,
    pub attendance_count: Option<Option<i32>>,
    pub offering_amount: Option<Decimal>,
    pub visitor_count: Option<i32>,
    pub convert_count: Option<i32>,
    pub followup_count: Option<i32>,
    pub visit_count: Option<i32>,
    pub notes: Option<Option<String>>,
    pub status: Option<MeetingStatus>,
}

impl UpdateMeeting {
    pub fn apply_to(self, meeting: &mut Meeting, now: DateTime<Utc>) {
        if let Some(v) = self.meeting_date {
            meeting.meeting_date = v;
        }
        if let Some(v) = self.attendee_ids {
            meeting.attendee_ids = v;
        }
        if let Some(v) = self.attendance_count {
            meeting.attendance_count = v;
        }
        if let Some(v) = self.offering_amount {
            meeting.offering_amount = v;
        }
        if let Some(v) = self.visitor_count {
            meeting.visitor_count = v;
        }
        if let Some(v) = self.convert_count {
            meeting.convert_count = v;
        }
        if let Some(v) = self.followup_count {
            meeting.followup_count = v;
        }
        if let Some(v) = self.visit_count {
            meeting.visit_count = v;
        }
        if let Some(v) = self.notes {
            meeting.notes = v;
        }
        if let Some(v) = self.status {
            meeting.status = v;
        }
        meeting.updated_at = now;
    }
}

impl Meeting {
    pub async fn create(pool: &PgPool, data: CreateMeeting) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Meeting>(&format!(
            r#"
            INSERT INTO meetings (
                cell_id, meeting_date, attendee_ids, attendance_count, offering_amount,
                visitor_count, convert_count, followup_count, visit_count, notes, status, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {MEETING_COLUMNS}
            "#
        ))
        .bind(data.cell_id)
        .bind(data.meeting_date)
        .bind(data.attendee_ids)
        .bind(data.attendance_count)
        .bind(data.offering_amount)
        .bind(data.visitor_count)
        .bind(data.convert_count)
        .bind(data.followup_count)
        .bind(data.visit_count)
        .bind(data.notes)
        .bind(data.status)
        .bind(data.created_by)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Meeting>(&format!(
            "SELECT {MEETING_COLUMNS} FROM meetings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists all meetings, newest first
    /// Lists every record; accepts a pool or an open transaction
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Meeting>(&format!(
            "SELECT {MEETING_COLUMNS} FROM meetings ORDER BY meeting_date DESC, created_at DESC"
        ))
        .fetch_all(executor)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateMeeting,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE meetings SET updated_at = NOW()");

        if let Some(v) = data.meeting_date {
            builder.push(", meeting_date = ").push_bind(v);
        }
        if let Some(v) = data.attendee_ids {
            builder.push(", attendee_ids = ").push_bind(v);
        }
        if let Some(v) = data.attendance_count {
            builder.push(", attendance_count = ").push_bind(v);
        }
        if let Some(v) = data.offering_amount {
            builder.push(", offering_amount = ").push_bind(v);
        }
        if let Some(v) = data.visitor_count {
            builder.push(", visitor_count = ").push_bind(v);
        }
        if let Some(v) = data.convert_count {
            builder.push(", convert_count = ").push_bind(v);
        }
        if let Some(v) = data.followup_count {
            builder.push(", followup_count = ").push_bind(v);
        }
        if let Some(v) = data.visit_count {
            builder.push(", visit_count = ").push_bind(v);
        }
        if let Some(v) = data.notes {
            builder.push(", notes = ").push_bind(v);
        }
        if let Some(v) = data.status {
            builder.push(", status = ").push_bind(v);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(MEETING_COLUMNS);

        builder.build_query_as::<Meeting>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM meetings WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting(attendees: usize, count: Option<i32>) -> Meeting {
        let now = Utc::now();
        Meeting {
            id: Uuid::new_v4(),
            cell_id: Uuid::new_v4(),
            meeting_date: NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
            attendee_ids: (0..attendees).map(|_| Uuid::new_v4()).collect(),
            attendance_count: count,
            offering_amount: Decimal::ZERO,
            visitor_count: 0,
            convert_count: 0,
            followup_count: 0,
            visit_count: 0,
            notes: None,
            status: MeetingStatus::Submitted,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_attendance_prefers_head_count() {
        assert_eq!(meeting(3, Some(12)).attendance(), 12);
        assert_eq!(meeting(3, None).attendance(), 3);
        assert_eq!(meeting(0, None).attendance(), 0);
        assert_eq!(meeting(2, Some(-4)).attendance(), 0);
    }
}
