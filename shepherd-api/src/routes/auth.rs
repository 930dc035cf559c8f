/// Authentication endpoints
///
/// Sign-in goes through the identity provider; the API then issues its own
/// access and refresh tokens carrying the profile id and role. The provider
/// session is handed back to the client so that it can be signed out later.
///
/// # Endpoints
///
/// - `POST /v1/auth/login` - Sign in and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token
/// - `POST /v1/auth/logout` - End the provider session
/// - `POST /v1/auth/password-reset` - Send a recovery email
/// - `POST /v1/auth/recover` - Set a new password from a recovery link

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use shepherd_shared::{
    auth::{jwt, middleware::AuthContext},
    identity::{parse_recovery_fragment, SessionTokens},
    models::user::User,
    session::SessionContext,
};
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// The signed-in user's profile
    pub user: User,

    /// API access token (1h)
    pub access_token: String,

    /// API refresh token (30d)
    pub refresh_token: String,

    /// Identity provider session, needed for logout
    pub provider_session: SessionTokens,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (1h)
    pub access_token: String,
}

/// Logout request
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub provider_session: SessionTokens,
}

/// Password reset request
#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Recovery completion request
#[derive(Debug, Deserialize, Validate)]
pub struct RecoverRequest {
    /// The link from the recovery email, or just its fragment
    #[validate(length(min = 1, message = "Recovery link is required"))]
    pub link: String,

    pub new_password: String,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "grace@example.org",
///   "password": "Corr3ct-horse"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user": { "id": "uuid", "assignment": { "role": "zone-leader", "zone_id": "uuid" }, ... },
///   "access_token": "eyJ...",
///   "refresh_token": "eyJ...",
///   "provider_session": { "access_token": "...", "refresh_token": "...", "expires_at": null }
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: No profile, or the profile is deactivated
/// - `422 Unprocessable Entity`: Validation failed
/// - `503 Service Unavailable`: Identity provider or store unreachable
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let session = SessionContext::start(
        state.store.clone(),
        state.identity.clone(),
        &req.email,
        &req.password,
    )
    .await?;

    let user = session.actor().clone();
    let (access_token, refresh_token) =
        jwt::issue_token_pair(user.id, user.role(), state.jwt_secret())?;

    tracing::info!(user_id = %user.id, role = %user.role(), "User signed in");

    Ok(Json(LoginResponse {
        user,
        access_token,
        refresh_token,
        provider_session: session.tokens().clone(),
    }))
}

/// Token refresh endpoint
///
/// The new access token carries the role the profile has now, so a changed
/// assignment shows up after the next refresh.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/refresh
/// Content-Type: application/json
///
/// {
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
/// - `403 Forbidden`: The profile is gone or deactivated
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;
    let actor = state.load_actor(claims.sub).await?;

    let access_token =
        jwt::refresh_access_token(&req.refresh_token, state.jwt_secret(), actor.user.role())?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Logout endpoint
///
/// Ends the identity provider session. API tokens simply expire.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/logout
/// Authorization: Bearer <access token>
///
/// {
///   "provider_session": { "access_token": "...", "refresh_token": "..." }
/// }
/// ```
///
/// # Response
///
/// `204 No Content`
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<LogoutRequest>,
) -> ApiResult<StatusCode> {
    state.identity.sign_out(&req.provider_session).await?;

    tracing::info!(user_id = %auth.user_id, "User signed out");
    Ok(StatusCode::NO_CONTENT)
}

/// Password reset endpoint
///
/// Answers the same way whether or not the email has an account.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/password-reset
///
/// { "email": "grace@example.org" }
/// ```
///
/// # Response
///
/// `202 Accepted`
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    req.validate()?;

    state.identity.request_password_reset(&req.email).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "If the account exists, a recovery email has been sent".to_string(),
        }),
    ))
}

/// Recovery completion endpoint
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/recover
///
/// {
///   "link": "https://app.example.org/reset#access_token=...&type=recovery",
///   "new_password": "N3w-password"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: The link is malformed or not a recovery link
/// - `401 Unauthorized`: The recovery session expired or was already used
/// - `422 Unprocessable Entity`: The new password is too weak
pub async fn recover(
    State(state): State<AppState>,
    Json(req): Json<RecoverRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let tokens = parse_recovery_fragment(&req.link)?;
    state
        .identity
        .complete_recovery(&tokens, &req.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}
