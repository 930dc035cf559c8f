/// Configuration management for the API server
///
/// Settings are layered: built-in defaults, then an optional `shepherd.toml`
/// in the working directory, then `SHEPHERD__`-prefixed environment variables
/// (a `.env` file is loaded first when present). Nested keys are separated by
/// a double underscore.
///
/// # Environment Variables
///
/// - `SHEPHERD__API__HOST`: Host to bind to (default: 0.0.0.0)
/// - `SHEPHERD__API__PORT`: Port to bind to (default: 8080)
/// - `SHEPHERD__API__CORS_ORIGINS`: Comma-separated origins (default: `*`)
/// - `SHEPHERD__STORE__BACKEND`: `postgres` (default) or `memory`
/// - `SHEPHERD__DATABASE__URL`: PostgreSQL connection string
/// - `SHEPHERD__JWT__SECRET`: Secret key for JWT signing (required)
/// - `SHEPHERD__IDENTITY__MODE`: `hosted` (default) or `local`
/// - `SHEPHERD__IDENTITY__BASE_URL` / `SHEPHERD__IDENTITY__ANON_KEY`: hosted
///   auth service
/// - `SHEPHERD__IDENTITY__SERVICE_KEY`: enables privileged provisioning
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use shepherd_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use shepherd_shared::db::pool::DatabaseConfig;
use shepherd_shared::identity::hosted::HostedIdentityConfig;

/// Name of the optional settings file, without extension
pub const CONFIG_FILE: &str = "shepherd";

const ENV_PREFIX: &str = "SHEPHERD";

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,

    pub store: StoreConfig,

    pub database: DatabaseSettings,

    pub identity: IdentitySettings,

    pub jwt: JwtConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,

    /// Process-local store, emptied on restart
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// PostgreSQL connection URL, required for the postgres backend
    pub url: Option<String>,

    pub max_connections: u32,

    pub min_connections: u32,

    pub connect_timeout_seconds: u64,

    /// Apply pending migrations at startup
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let pool = DatabaseConfig::default();
        Self {
            url: None,
            max_connections: pool.max_connections,
            min_connections: pool.min_connections,
            connect_timeout_seconds: pool.connect_timeout_seconds,
            run_migrations: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    /// Hosted auth service over HTTP
    #[default]
    Hosted,

    /// In-process accounts, for development and tests
    Local,
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    pub mode: IdentityMode,

    pub base_url: Option<String>,

    pub anon_key: Option<String>,

    pub service_key: Option<String>,

    pub provision_function: String,

    /// Page recovery emails link back to
    pub redirect_url: Option<String>,

    pub timeout_seconds: u64,

    /// Super admin account created at startup in local mode
    pub admin_email: Option<String>,

    pub admin_password: Option<String>,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        let hosted = HostedIdentityConfig::default();
        Self {
            mode: IdentityMode::default(),
            base_url: None,
            anon_key: None,
            service_key: None,
            provision_function: hosted.provision_function,
            redirect_url: None,
            timeout_seconds: hosted.timeout_seconds,
            admin_email: None,
            admin_password: None,
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

impl Config {
    /// Loads `.env`, `shepherd.toml` and `SHEPHERD__*` variables
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result fails
    /// [`Config::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("api.cors_origins"),
            );

        Self::from_builder(builder)
    }

    /// Builds and validates a configuration from arbitrary sources
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks settings that depend on each other
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "jwt.secret must be at least {} characters long",
                MIN_SECRET_LEN
            )));
        }

        if self.store.backend == StoreBackend::Postgres
            && self.database.url.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Invalid(
                "database.url is required for the postgres store".to_string(),
            ));
        }

        if self.identity.mode == IdentityMode::Hosted {
            let missing = |v: &Option<String>| v.as_deref().map_or(true, str::is_empty);
            if missing(&self.identity.base_url) || missing(&self.identity.anon_key) {
                return Err(ConfigError::Invalid(
                    "identity.base_url and identity.anon_key are required in hosted mode"
                        .to_string(),
                ));
            }
        }

        if self.identity.admin_email.is_some() != self.identity.admin_password.is_some() {
            return Err(ConfigError::Invalid(
                "identity.admin_email and identity.admin_password must be set together"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Pool settings for the postgres store
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database.url.clone().unwrap_or_default(),
            max_connections: self.database.max_connections,
            min_connections: self.database.min_connections,
            connect_timeout_seconds: self.database.connect_timeout_seconds,
            ..DatabaseConfig::default()
        }
    }

    /// Client settings for the hosted identity provider
    pub fn hosted_identity_config(&self) -> HostedIdentityConfig {
        HostedIdentityConfig {
            base_url: self
                .identity
                .base_url
                .clone()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            anon_key: self.identity.anon_key.clone().unwrap_or_default(),
            service_key: self.identity.service_key.clone(),
            provision_function: self.identity.provision_function.clone(),
            redirect_url: self.identity.redirect_url.clone(),
            timeout_seconds: self.identity.timeout_seconds,
        }
    }

    /// In-memory store with local identity, as used by tests and demos
    pub fn local(jwt_secret: impl Into<String>) -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Memory,
            },
            identity: IdentitySettings {
                mode: IdentityMode::Local,
                ..IdentitySettings::default()
            },
            jwt: JwtConfig {
                secret: jwt_secret.into(),
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn parse(toml: &str) -> Result<Config, ConfigError> {
        Config::from_builder(
            config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    #[test]
    fn test_bind_address() {
        let mut config = Config::local(SECRET);
        config.api.host = "127.0.0.1".to_string();
        config.api.port = 9090;

        assert_eq!(config.bind_address(), "127.0.0.1:9090");
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = parse(&format!(
            r#"
            [store]
            backend = "memory"

            [identity]
            mode = "local"

            [jwt]
            secret = "{SECRET}"
            "#
        ))
        .unwrap();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.identity.provision_function, "create-user");
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let err = parse(
            r#"
            [store]
            backend = "memory"
            [identity]
            mode = "local"
            [jwt]
            secret = "short"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("jwt.secret")));
    }

    #[test]
    fn test_postgres_requires_url() {
        let err = parse(&format!(
            r#"
            [identity]
            mode = "local"
            [jwt]
            secret = "{SECRET}"
            "#
        ))
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("database.url")));
    }

    #[test]
    fn test_hosted_mode_requires_endpoint_and_key() {
        let err = parse(&format!(
            r#"
            [store]
            backend = "memory"
            [identity]
            base_url = "https://auth.example.org"
            [jwt]
            secret = "{SECRET}"
            "#
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("anon_key")));

        let config = parse(&format!(
            r#"
            [store]
            backend = "memory"
            [identity]
            base_url = "https://auth.example.org/"
            anon_key = "anon"
            [jwt]
            secret = "{SECRET}"
            "#
        ))
        .unwrap();
        let hosted = config.hosted_identity_config();
        assert_eq!(hosted.base_url, "https://auth.example.org");
        assert_eq!(hosted.service_key, None);
    }

    #[test]
    fn test_admin_credentials_come_in_pairs() {
        let mut config = Config::local(SECRET);
        config.identity.admin_email = Some("admin@example.org".to_string());

        assert!(config.validate().is_err());

        config.identity.admin_password = Some("Adm1n-password".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_config_carries_pool_settings() {
        let mut config = Config::local(SECRET);
        config.database.url = Some("postgresql://localhost/shepherd".to_string());
        config.database.max_connections = 4;

        let pool = config.database_config();
        assert_eq!(pool.url, "postgresql://localhost/shepherd");
        assert_eq!(pool.max_connections, 4);
        assert!(pool.test_before_acquire);
    }
}
