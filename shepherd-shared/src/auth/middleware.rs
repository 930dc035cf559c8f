/// Bearer token authentication for Axum
///
/// Validates the access token in `Authorization: Bearer <token>` and inserts
/// an [`AuthContext`] into the request extensions. The context only says who
/// the caller is; what they may do is decided per request by the
/// authorization policy against the current snapshot.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use shepherd_shared::auth::middleware::{create_jwt_middleware, AuthContext};
///
/// async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
///     format!("{} ({})", auth.user_id, auth.role)
/// }
///
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn(create_jwt_middleware("secret")));
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_access_token, Claims, JwtError};
use crate::models::role::Role;

/// Identity of the caller, added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Profile id
    pub user_id: Uuid,

    /// Role claimed by the token
    pub role: Role,

    /// The raw bearer token, forwarded on sign-out
    #[serde(skip)]
    pub token: String,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims, token: impl Into<String>) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            token: token.into(),
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,

    InvalidFormat(String),

    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing credentials".to_string(),
            ),
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

/// Rejects requests without a valid access token
pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_access_token(token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
    })?;

    tracing::debug!(user_id = %claims.sub, role = %claims.role, "Authenticated request");

    let context = AuthContext::from_claims(&claims, token);
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

/// Captures the secret for use with `axum::middleware::from_fn`
pub fn create_jwt_middleware(
    secret: impl Into<String>,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>
       + Clone {
    let secret = secret.into();
    move |req, next| {
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(secret, req, next))
    }
}
