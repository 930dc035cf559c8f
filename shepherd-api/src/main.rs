//! # Shepherd API Server
//!
//! Serves the Shepherd JSON API. The entity store (PostgreSQL or in-memory)
//! and the identity provider (hosted or local) are chosen by configuration.
//!
//! ## Usage
//!
//! ```bash
//! SHEPHERD__JWT__SECRET=... SHEPHERD__DATABASE__URL=postgres://... \
//! SHEPHERD__IDENTITY__BASE_URL=https://... SHEPHERD__IDENTITY__ANON_KEY=... \
//!     cargo run -p shepherd-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use shepherd_api::{
    app::{build_router, AppState},
    config::{Config, IdentityMode, StoreBackend},
};
use shepherd_shared::{
    db::{migrations::run_migrations, pool::create_pool},
    gateway::{memory::MemoryEntityStore, postgres::PgEntityStore, EntityStore, NewRecord},
    identity::{
        hosted::HostedIdentityProvider, local::LocalIdentityProvider, IdentityProvider,
    },
    models::{
        role::{Assignment, Role},
        user::CreateUser,
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "shepherd_api=debug,shepherd_shared=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Shepherd API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let store = build_store(&config).await?;
    let identity = build_identity(&config, store.clone()).await?;

    let bind_address = config.bind_address();
    let state = AppState::new(store, identity, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn EntityStore>> {
    match config.store.backend {
        StoreBackend::Postgres => {
            let pool = create_pool(config.database_config())
                .await
                .context("Failed to connect to the database")?;

            if config.database.run_migrations {
                run_migrations(&pool)
                    .await
                    .context("Failed to run migrations")?;
            }

            tracing::info!("Using PostgreSQL store");
            Ok(Arc::new(PgEntityStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryEntityStore::new()))
        }
    }
}

async fn build_identity(
    config: &Config,
    store: Arc<dyn EntityStore>,
) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    match config.identity.mode {
        IdentityMode::Hosted => {
            if config.identity.admin_email.is_some() {
                tracing::warn!("identity.admin_email is ignored in hosted mode");
            }
            if config.identity.service_key.is_none() {
                tracing::warn!("No service key configured; provisioning uses the client path");
            }

            let provider = HostedIdentityProvider::new(config.hosted_identity_config())
                .context("Failed to build the identity client")?;
            Ok(Arc::new(provider))
        }
        IdentityMode::Local => {
            let mut provider = LocalIdentityProvider::new(config.jwt.secret.clone())
                .with_profile_store(store.clone());
            if let Some(url) = &config.identity.redirect_url {
                provider = provider.with_redirect_url(url.clone());
            }

            if let (Some(email), Some(password)) = (
                &config.identity.admin_email,
                &config.identity.admin_password,
            ) {
                seed_admin(&provider, store.as_ref(), email, password).await?;
            }

            tracing::info!("Using local identity provider");
            Ok(Arc::new(provider))
        }
    }
}

/// Creates the first super admin account and profile
async fn seed_admin(
    provider: &LocalIdentityProvider,
    store: &dyn EntityStore,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let id = provider
        .register(email, password, Role::SuperAdmin)
        .await
        .context("Failed to create the admin account")?;

    store
        .create(NewRecord::User(CreateUser {
            id,
            email: email.to_string(),
            name: "Administrator".to_string(),
            phone: None,
            assignment: Assignment::SuperAdmin,
        }))
        .await
        .context("Failed to create the admin profile")?;

    tracing::info!(user_id = %id, %email, "Seeded super admin");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, exiting...");
}
