//! Hosted identity provider client
//!
//! Talks to a GoTrue-compatible auth service over REST:
//!
//! | operation | request |
//! |---|---|
//! | sign in | `POST /auth/v1/token?grant_type=password` |
//! | sign out | `POST /auth/v1/logout` |
//! | password reset | `POST /auth/v1/recover` |
//! | complete recovery | `PUT /auth/v1/user` with the recovery access token |
//! | client provisioning | `POST /auth/v1/signup` |
//! | privileged provisioning | `POST /functions/v1/{function}` with the service key |
//!
//! Connection failures, timeouts, `404` and `5xx` responses are reported as
//! [`IdentityError::Unavailable`]; other `4xx` responses are rejections.
//!
//! # Example
//!
//! ```no_run
//! use shepherd_shared::identity::hosted::{HostedIdentityConfig, HostedIdentityProvider};
//! use shepherd_shared::identity::IdentityProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = HostedIdentityProvider::new(HostedIdentityConfig {
//!     base_url: "https://auth.example.org".to_string(),
//!     anon_key: "public-anon-key".to_string(),
//!     ..Default::default()
//! })?;
//!
//! let session = provider.sign_in("grace@example.org", "Corr3ct-horse").await?;
//! println!("signed in as {}", session.user_id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use super::{
    AuthSession, IdentityError, IdentityProvider, ProvisionPath, ProvisionRequest,
    ProvisionedUser, RecoveryTokens, SessionTokens,
};

/// Connection settings for the hosted auth service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedIdentityConfig {
    /// Project URL, without a trailing slash
    pub base_url: String,

    /// Public key sent with every request
    pub anon_key: String,

    /// Key authorizing privileged provisioning; without it that path is
    /// unavailable
    pub service_key: Option<String>,

    /// Server function that creates an account and its profile row
    pub provision_function: String,

    /// Where recovery emails send the user back to
    pub redirect_url: Option<String>,

    pub timeout_seconds: u64,
}

impl Default for HostedIdentityConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            anon_key: String::new(),
            service_key: None,
            provision_function: "create-user".to_string(),
            redirect_url: None,
            timeout_seconds: 15,
        }
    }
}

pub struct HostedIdentityProvider {
    config: HostedIdentityConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct AccountBody {
    id: Uuid,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    user: AccountBody,
}

/// Sign-up answers with the account itself, or with a session wrapping it
/// when email confirmation is disabled
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session { user: AccountBody },
    Account(AccountBody),
}

#[derive(Debug, Deserialize)]
struct PrivilegedResponse {
    #[serde(alias = "id")]
    user_id: Uuid,
    #[serde(default = "profile_created_default")]
    profile_created: bool,
}

fn profile_created_default() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self, status: StatusCode) -> String {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_else(|| status.to_string())
    }
}

/// Maps a non-success status to an error
///
/// `401`/`400` on sign-in are handled by the caller.
fn status_error(status: StatusCode, message: String) -> IdentityError {
    if status == StatusCode::NOT_FOUND || status.is_server_error() {
        IdentityError::Unavailable(format!("{status}: {message}"))
    } else {
        IdentityError::Rejected(message)
    }
}

fn transport_error(e: reqwest::Error) -> IdentityError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        IdentityError::Unavailable(e.to_string())
    } else {
        IdentityError::Internal(e.to_string())
    }
}

async fn error_message(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body: ErrorBody = response.json().await.unwrap_or_default();
    (status, body.into_message(status))
}

impl HostedIdentityProvider {
    pub fn new(config: HostedIdentityConfig) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| IdentityError::Internal(e.to_string()))?;

        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: HostedIdentityConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.config.anon_key)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, IdentityError> {
        let response = builder.send().await.map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(response);
        }

        let (status, message) = error_message(response).await;
        Err(status_error(status, message))
    }

    fn signup_metadata(request: &ProvisionRequest) -> serde_json::Value {
        json!({
            "name": request.name,
            "phone": request.phone,
            "role": request.assignment.role(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let response = self
            .request(self.client.post(self.url("/auth/v1/token?grant_type=password")))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            tracing::debug!(email = %email, status = %status, "Sign-in refused");
            return Err(IdentityError::InvalidCredentials);
        }
        if !status.is_success() {
            let (status, message) = error_message(response).await;
            return Err(status_error(status, message));
        }

        let body: TokenResponse = response.json().await.map_err(transport_error)?;
        let expires_at = body
            .expires_in
            .map(|secs| Utc::now() + ChronoDuration::seconds(secs));

        tracing::info!(user_id = %body.user.id, "Signed in");

        Ok(AuthSession {
            user_id: body.user.id,
            email: body.user.email.unwrap_or_else(|| email.to_string()),
            tokens: SessionTokens {
                access_token: body.access_token,
                refresh_token: body.refresh_token,
                expires_at,
            },
        })
    }

    async fn sign_out(&self, tokens: &SessionTokens) -> Result<(), IdentityError> {
        self.send(
            self.request(self.client.post(self.url("/auth/v1/logout")))
                .bearer_auth(&tokens.access_token),
        )
        .await?;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let mut builder = self.request(self.client.post(self.url("/auth/v1/recover")));
        if let Some(redirect) = &self.config.redirect_url {
            builder = builder.query(&[("redirect_to", redirect)]);
        }

        self.send(builder.json(&json!({ "email": email }))).await?;
        tracing::info!(email = %email, "Requested password reset");
        Ok(())
    }

    async fn complete_recovery(
        &self,
        tokens: &RecoveryTokens,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let result = self
            .send(
                self.request(self.client.put(self.url("/auth/v1/user")))
                    .bearer_auth(&tokens.access_token)
                    .json(&json!({ "password": new_password })),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(IdentityError::Rejected(msg)) if msg.to_lowercase().contains("jwt") => {
                Err(IdentityError::InvalidSession)
            }
            Err(e) => Err(e),
        }
    }

    async fn provision_privileged(
        &self,
        request: &ProvisionRequest,
        temporary_password: &str,
    ) -> Result<ProvisionedUser, IdentityError> {
        let service_key = self.config.service_key.as_deref().ok_or_else(|| {
            IdentityError::Unavailable("no privileged credentials configured".to_string())
        })?;

        let path = format!("/functions/v1/{}", self.config.provision_function);
        let response = self
            .send(
                self.request(self.client.post(self.url(&path)))
                    .bearer_auth(service_key)
                    .json(&json!({
                        "email": request.email,
                        "password": temporary_password,
                        "name": request.name,
                        "phone": request.phone,
                        "role": request.assignment.role(),
                        "zone_id": request.assignment.zone_id(),
                        "area_id": request.assignment.area_id(),
                        "cell_id": request.assignment.cell_id(),
                    })),
            )
            .await?;

        let body: PrivilegedResponse = response.json().await.map_err(transport_error)?;
        tracing::info!(user_id = %body.user_id, "Provisioned account through server function");

        Ok(ProvisionedUser {
            user_id: body.user_id,
            temporary_password: temporary_password.to_string(),
            path: ProvisionPath::Privileged,
            profile_created: body.profile_created,
        })
    }

    async fn provision_client(
        &self,
        request: &ProvisionRequest,
        temporary_password: &str,
    ) -> Result<ProvisionedUser, IdentityError> {
        let response = self
            .send(
                self.request(self.client.post(self.url("/auth/v1/signup")))
                    .json(&json!({
                        "email": request.email,
                        "password": temporary_password,
                        "data": Self::signup_metadata(request),
                    })),
            )
            .await?;

        let account = match response.json().await.map_err(transport_error)? {
            SignUpResponse::Session { user } => user,
            SignUpResponse::Account(account) => account,
        };
        tracing::info!(user_id = %account.id, "Provisioned account through client sign-up");

        Ok(ProvisionedUser {
            user_id: account.id,
            temporary_password: temporary_password.to_string(),
            path: ProvisionPath::Client,
            profile_created: false,
        })
    }
}
