/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use shepherd_api::{app::AppState, config::Config};
/// use shepherd_shared::gateway::memory::MemoryEntityStore;
/// use shepherd_shared::identity::local::LocalIdentityProvider;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let store = Arc::new(MemoryEntityStore::new());
/// let identity = Arc::new(
///     LocalIdentityProvider::new(config.jwt.secret.clone()).with_profile_store(store.clone()),
/// );
/// let state = AppState::new(store, identity, config);
/// let app = shepherd_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, error::ApiResult};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use shepherd_shared::{
    auth::middleware::create_jwt_middleware,
    gateway::EntityStore,
    hierarchy::HierarchyIndex,
    identity::IdentityProvider,
    models::user::User,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Where profiles and the organization tree live
    pub store: Arc<dyn EntityStore>,

    /// Account sign-in, recovery and provisioning
    pub identity: Arc<dyn IdentityProvider>,

    /// Application configuration
    pub config: Arc<Config>,
}

/// The caller's profile and the tree as of this request
pub struct ActorView {
    pub user: User,

    pub index: HierarchyIndex,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EntityStore>,
        identity: Arc<dyn IdentityProvider>,
        config: Config,
    ) -> Self {
        Self {
            store,
            identity,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Loads a fresh snapshot and looks up the caller's active profile
    ///
    /// Every request is evaluated against the current tree, so a changed
    /// assignment takes effect immediately, whatever role the token claims.
    pub async fn load_actor(&self, user_id: Uuid) -> ApiResult<ActorView> {
        let index = HierarchyIndex::build(self.store.fetch_snapshot().await?);

        let user = index
            .user(user_id)
            .cloned()
            .ok_or_else(|| ApiError::Forbidden(format!("No profile exists for account {}", user_id)))?;

        if !user.is_active {
            return Err(ApiError::Forbidden(format!("Account {} is deactivated", user_id)));
        }

        Ok(ActorView { user, index })
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                           # Health check (public)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /login               # public
///     │   ├── POST /refresh             # public
///     │   ├── POST /password-reset      # public
///     │   ├── POST /recover             # public
///     │   └── POST /logout
///     ├── GET  /me
///     ├── /nodes/:kind/:id/
///     │   ├── GET /summary
///     │   ├── GET /breakdown
///     │   └── GET /growth?from=&to=
///     ├── /users/
///     │   ├── POST /                    # Provision a leader
///     │   └── GET  /allowed-roles
///     └── /alerts/
///         ├── GET  /
///         └── POST /                    # Broadcast (super admins)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (everything under `/v1` except the public auth routes)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/password-reset", post(routes::auth::request_password_reset))
        .route("/recover", post(routes::auth::recover));

    let protected_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route("/me", get(routes::users::me))
        .route("/nodes/:kind/:id/summary", get(routes::nodes::summary))
        .route("/nodes/:kind/:id/breakdown", get(routes::nodes::breakdown))
        .route("/nodes/:kind/:id/growth", get(routes::nodes::growth))
        .route("/users", post(routes::users::provision))
        .route("/users/allowed-roles", get(routes::users::allowed_roles))
        .route(
            "/alerts",
            get(routes::alerts::list_alerts).post(routes::alerts::broadcast_alert),
        )
        .layer(middleware::from_fn(create_jwt_middleware(
            state.jwt_secret().to_string(),
        )));

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes)
        .merge(protected_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shepherd_shared::gateway::memory::MemoryEntityStore;
    use shepherd_shared::identity::local::LocalIdentityProvider;
    use shepherd_shared::models::role::Assignment;
    use shepherd_shared::testing::Fixture;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn state_with(fixture: &Fixture) -> AppState {
        let store = Arc::new(MemoryEntityStore::with_snapshot(fixture.snapshot()));
        let identity = Arc::new(LocalIdentityProvider::new(SECRET));
        AppState::new(store, identity, Config::local(SECRET))
    }

    #[tokio::test]
    async fn test_load_actor_reads_current_profile() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let leader = f.zone_leader(zone, "Grace");
        let state = state_with(&f);

        let view = state.load_actor(leader).await.unwrap();
        assert_eq!(view.user.assignment, Assignment::ZoneLeader { zone_id: Some(zone) });
        assert!(view.index.zone(zone).is_some());
    }

    #[tokio::test]
    async fn test_load_actor_rejects_unknown_and_inactive() {
        let mut f = Fixture::new();
        let zone = f.zone("North");
        let leader = f.zone_leader(zone, "Grace");
        f.edit_user(leader, |u| u.is_active = false);
        let state = state_with(&f);

        assert!(matches!(
            state.load_actor(Uuid::new_v4()).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            state.load_actor(leader).await,
            Err(ApiError::Forbidden(msg)) if msg.contains("deactivated")
        ));
    }
}
