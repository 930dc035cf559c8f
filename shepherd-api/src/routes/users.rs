/// User endpoints
///
/// # Endpoints
///
/// - `GET /v1/me` - The caller's profile and the roles they may create
/// - `GET /v1/users/allowed-roles` - Roles the caller may create
/// - `POST /v1/users` - Create a leader account and link it into the tree

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use shepherd_shared::{
    auth::{authorization::allowed_roles as roles_for, middleware::AuthContext},
    identity::ProvisionRequest,
    models::{node::NodeRef, role::Role, user::User},
    provisioning::{provision_leader, ProvisionReport},
};
use validator::Validate;

/// A role as offered in a creation form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOption {
    pub role: Role,

    /// Display name, e.g. "Zone Leader"
    pub label: String,
}

impl From<Role> for RoleOption {
    fn from(role: Role) -> Self {
        Self {
            role,
            label: role.label().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: User,

    /// The node the caller leads, if assigned
    pub scope: Option<NodeRef>,

    pub allowed_roles: Vec<RoleOption>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllowedRolesResponse {
    pub roles: Vec<RoleOption>,
}

fn role_options(role: Role) -> Vec<RoleOption> {
    roles_for(role).iter().copied().map(RoleOption::from).collect()
}

/// The caller's own profile
///
/// # Response
///
/// ```json
/// {
///   "user": { "id": "uuid", "name": "Grace", "assignment": { "role": "zone-leader", "zone_id": "uuid" }, ... },
///   "scope": { "kind": "zone", "id": "uuid" },
///   "allowed_roles": [{ "role": "area-leader", "label": "Area Leader" }, ...]
/// }
/// ```
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MeResponse>> {
    let actor = state.load_actor(auth.user_id).await?;
    let user = actor.user;

    Ok(Json(MeResponse {
        scope: user.assignment.scope(),
        allowed_roles: role_options(user.role()),
        user,
    }))
}

/// Roles the caller may create
pub async fn allowed_roles(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AllowedRolesResponse>> {
    let actor = state.load_actor(auth.user_id).await?;

    Ok(Json(AllowedRolesResponse {
        roles: role_options(actor.user.role()),
    }))
}

/// Provision a leader
///
/// Creates the account, makes sure a profile exists, then links the new
/// leader and their node to each other. Linking is best effort: once the
/// account exists the endpoint answers `201` and the report says which steps
/// succeeded, so the temporary password is never lost.
///
/// # Endpoint
///
/// ```text
/// POST /v1/users
/// Authorization: Bearer <access token>
///
/// {
///   "email": "lydia@example.org",
///   "name": "Lydia",
///   "phone": null,
///   "assignment": { "role": "area-leader", "area_id": "uuid" }
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user_id": "uuid",
///   "temporary_password": "...",
///   "path": "privileged",
///   "profile_created": true,
///   "primary_succeeded": true,
///   "linking_succeeded": true,
///   "failure_reason": null
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: The target node does not exist
/// - `403 Forbidden`: The caller may not create this role or scope
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: The identity provider refused the account, e.g. the
///   email is already registered
/// - `503 Service Unavailable`: No provisioning path could be reached
pub async fn provision(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ProvisionRequest>,
) -> ApiResult<(StatusCode, Json<ProvisionReport>)> {
    req.validate()?;

    let actor = state.load_actor(auth.user_id).await?;
    let report = provision_leader(
        &actor.user.assignment,
        &actor.index,
        state.store.as_ref(),
        state.identity.as_ref(),
        req,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(report)))
}
