//! Alert audience filtering and broadcasting
//!
//! An alert is shown to a user while it is active and unexpired, and the user
//! is in its audience: everyone, everyone holding a role, or an explicit
//! recipient list. Senders always see their own alerts.

use chrono::{DateTime, Utc};

use crate::auth::authorization::{require_broadcast, AuthzError};
use crate::gateway::{EntityStore, NewRecord, Record, StoreError};
use crate::models::alert::{Alert, Audience, CreateAlert};
use crate::models::role::Assignment;
use crate::models::user::User;

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error(transparent)]
    Denied(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Whether `user` should see `alert` at `now`
pub fn is_visible_to(alert: &Alert, user: &User, now: DateTime<Utc>) -> bool {
    if !alert.is_active || alert.expires_at.is_some_and(|at| at <= now) {
        return false;
    }
    if alert.created_by == user.id {
        return true;
    }

    match &alert.audience {
        Audience::All => true,
        Audience::Role(role) => user.role() == *role,
        Audience::Recipients(ids) => ids.contains(&user.id),
    }
}

/// Alerts `user` should see, most urgent first and newest first within a
/// priority
pub fn visible_alerts<'a>(alerts: &'a [Alert], user: &User, now: DateTime<Utc>) -> Vec<&'a Alert> {
    let mut visible: Vec<&Alert> = alerts
        .iter()
        .filter(|a| is_visible_to(a, user, now))
        .collect();

    visible.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    visible
}

/// Stores a new alert on behalf of a super admin
pub async fn broadcast(
    actor: &Assignment,
    store: &dyn EntityStore,
    alert: CreateAlert,
) -> Result<Alert, BroadcastError> {
    require_broadcast(actor)?;

    match store.create(NewRecord::Alert(alert)).await? {
        Record::Alert(alert) => {
            tracing::info!(alert_id = %alert.id, audience = alert.audience.tag(), "Broadcast alert");
            Ok(alert)
        }
        other => Err(StoreError::Database(format!(
            "store returned a {} for an alert",
            other.kind()
        ))
        .into()),
    }
}
