/// Node report endpoints
///
/// A node is addressed by kind and id; the organization root is
/// `organization` with the nil UUID. Every report is checked against the
/// caller's view rights on the current tree first.
///
/// # Endpoints
///
/// - `GET /v1/nodes/:kind/:id/summary` - Headline numbers
/// - `GET /v1/nodes/:kind/:id/breakdown` - One row per immediate child
/// - `GET /v1/nodes/:kind/:id/growth?from=YYYY-MM-DD&to=YYYY-MM-DD` - Weekly buckets

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shepherd_shared::{
    aggregation::{self, BreakdownRow, NodeSummary, WeekBucket},
    auth::{authorization::require_view, middleware::AuthContext},
    models::node::{NodeKind, NodeRef, UnknownNodeKind},
};
use uuid::Uuid;

/// Date range of a growth report, both ends inclusive
#[derive(Debug, Deserialize)]
pub struct GrowthQuery {
    pub from: NaiveDate,

    pub to: NaiveDate,
}

fn node_ref(kind: &str, id: Uuid) -> ApiResult<NodeRef> {
    let kind: NodeKind = kind
        .parse()
        .map_err(|e: UnknownNodeKind| ApiError::BadRequest(e.to_string()))?;
    Ok(NodeRef::new(kind, id))
}

/// Summary of a node
///
/// # Response
///
/// ```json
/// {
///   "node": { "kind": "zone", "id": "uuid" },
///   "name": "North",
///   "member_count": 55,
///   "active_member_count": 52,
///   "meeting_count": 120,
///   "average_attendance": 11,
///   "total_offerings": "4520.50"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown node kind
/// - `403 Forbidden`: The node is outside the caller's scope
pub async fn summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<NodeSummary>> {
    let node = node_ref(&kind, id)?;
    let actor = state.load_actor(auth.user_id).await?;
    require_view(&actor.user.assignment, &actor.index, node)?;

    Ok(Json(aggregation::summary(&actor.index, node)))
}

/// Performance breakdown of a node's immediate children
///
/// Cells, members and meetings have no reportable children and return an
/// empty list.
pub async fn breakdown(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<Vec<BreakdownRow>>> {
    let node = node_ref(&kind, id)?;
    let actor = state.load_actor(auth.user_id).await?;
    require_view(&actor.user.assignment, &actor.index, node)?;

    Ok(Json(aggregation::performance_breakdown(&actor.index, node)))
}

/// Weekly growth of a node
///
/// Weeks start on Monday and weeks without activity are omitted. A range
/// whose `from` is after `to` yields an empty list.
pub async fn growth(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((kind, id)): Path<(String, Uuid)>,
    Query(range): Query<GrowthQuery>,
) -> ApiResult<Json<Vec<WeekBucket>>> {
    let node = node_ref(&kind, id)?;
    let actor = state.load_actor(auth.user_id).await?;
    require_view(&actor.user.assignment, &actor.index, node)?;

    Ok(Json(aggregation::weekly_growth(
        &actor.index,
        node,
        range.from,
        range.to,
    )))
}
