/// Alert endpoints
///
/// # Endpoints
///
/// - `GET /v1/alerts` - Alerts addressed to the caller, most urgent first
/// - `POST /v1/alerts` - Broadcast an alert (super admins only)

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shepherd_shared::{
    alerts,
    auth::middleware::AuthContext,
    models::alert::{Alert, AlertPriority, AlertType, Audience, CreateAlert},
};
use validator::Validate;

/// Broadcast request; the sender is always the caller
#[derive(Debug, Deserialize, Validate)]
pub struct BroadcastRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,

    #[serde(default)]
    pub alert_type: AlertType,

    /// e.g. `{"type": "role", "value": "cell-leader"}`
    pub audience: Audience,

    #[serde(default)]
    pub priority: AlertPriority,

    pub expires_at: Option<DateTime<Utc>>,
}

/// Alerts the caller should see now
pub async fn list_alerts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Alert>>> {
    let actor = state.load_actor(auth.user_id).await?;

    let visible = alerts::visible_alerts(&actor.index.snapshot().alerts, &actor.user, Utc::now())
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(visible))
}

/// Broadcast an alert
///
/// # Endpoint
///
/// ```text
/// POST /v1/alerts
/// Authorization: Bearer <access token>
///
/// {
///   "title": "Prayer night",
///   "message": "Friday at 7",
///   "audience": { "type": "all" },
///   "priority": "high"
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: The caller is not a super admin
/// - `422 Unprocessable Entity`: Validation failed
pub async fn broadcast_alert(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<BroadcastRequest>,
) -> ApiResult<(StatusCode, Json<Alert>)> {
    req.validate()?;

    let actor = state.load_actor(auth.user_id).await?;
    let alert = alerts::broadcast(
        &actor.user.assignment,
        state.store.as_ref(),
        CreateAlert {
            title: req.title,
            message: req.message,
            alert_type: req.alert_type,
            audience: req.audience,
            priority: req.priority,
            created_by: actor.user.id,
            expires_at: req.expires_at,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(alert)))
}
