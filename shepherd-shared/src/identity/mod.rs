//! Identity provider boundary
//!
//! Accounts and credentials live with an external identity provider. This
//! module defines what the core needs from it: signing in and out, password
//! recovery, and creating accounts for newly appointed leaders.
//!
//! # Provisioning paths
//!
//! Accounts are created through one of two paths:
//!
//! - **Privileged**: a server-side operation that creates the account and its
//!   profile row together
//! - **Client**: a plain sign-up that only creates the account; the profile
//!   row is left to the caller
//!
//! [`IdentityProvider::provision_user`] tries the privileged path first and
//! falls back to the client path only when the privileged path is unavailable
//! (unreachable, missing, or not configured). Business rejections such as a
//! duplicate email are returned as-is.
//!
//! # Implementations
//!
//! - [`hosted::HostedIdentityProvider`]: REST client for a hosted auth service
//! - [`local::LocalIdentityProvider`]: in-process accounts for development and
//!   tests

pub mod hosted;
pub mod local;
pub mod recovery;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::generate_temporary_password;
use crate::gateway::StoreError;
use crate::models::role::Assignment;

pub use recovery::{parse_recovery_fragment, RecoveryTokens};

/// Tokens of a provider session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,

    pub refresh_token: String,

    pub expires_at: Option<DateTime<Utc>>,
}

/// A signed-in provider session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Account id; equal to the user's profile id
    pub user_id: Uuid,

    pub email: String,

    pub tokens: SessionTokens,
}

/// Account to create for a new leader
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProvisionRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    /// Role and the node the new user will lead
    pub assignment: Assignment,
}

/// Which provisioning path created an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionPath {
    Privileged,
    Client,
}

impl fmt::Display for ProvisionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionPath::Privileged => f.write_str("privileged"),
            ProvisionPath::Client => f.write_str("client"),
        }
    }
}

/// A newly created account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedUser {
    pub user_id: Uuid,

    /// Password the new user signs in with the first time
    pub temporary_password: String,

    pub path: ProvisionPath,

    /// Whether the provider also wrote the profile row
    pub profile_created: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired session")]
    InvalidSession,

    /// The provider refused the request for a business reason
    #[error("{0}")]
    Rejected(String),

    /// The provider or the requested operation could not be reached
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid recovery link: {0}")]
    InvalidRecoveryLink(String),

    #[error("{0}")]
    WeakPassword(String),

    #[error("Failed to write profile: {0}")]
    Profile(#[from] StoreError),

    #[error("Identity provider error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Whether provisioning may fall back to the client path
    pub fn is_unavailable(&self) -> bool {
        matches!(self, IdentityError::Unavailable(_))
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    async fn sign_out(&self, tokens: &SessionTokens) -> Result<(), IdentityError>;

    /// Sends a recovery email; unknown addresses are not reported
    async fn request_password_reset(&self, email: &str) -> Result<(), IdentityError>;

    /// Sets a new password using the tokens of a recovery link
    async fn complete_recovery(
        &self,
        tokens: &RecoveryTokens,
        new_password: &str,
    ) -> Result<(), IdentityError>;

    /// Creates the account and its profile row on the provider side
    async fn provision_privileged(
        &self,
        request: &ProvisionRequest,
        temporary_password: &str,
    ) -> Result<ProvisionedUser, IdentityError>;

    /// Creates the account only
    async fn provision_client(
        &self,
        request: &ProvisionRequest,
        temporary_password: &str,
    ) -> Result<ProvisionedUser, IdentityError>;

    /// Creates an account with a fresh temporary password
    ///
    /// Falls back from the privileged path to the client path when the
    /// privileged path is unavailable.
    async fn provision_user(
        &self,
        request: &ProvisionRequest,
    ) -> Result<ProvisionedUser, IdentityError> {
        let temporary_password = generate_temporary_password();

        match self.provision_privileged(request, &temporary_password).await {
            Ok(user) => Ok(user),
            Err(e) if e.is_unavailable() => {
                tracing::warn!(
                    email = %request.email,
                    error = %e,
                    "Privileged provisioning unavailable, falling back to client sign-up"
                );
                self.provision_client(request, &temporary_password).await
            }
            Err(e) => Err(e),
        }
    }
}
