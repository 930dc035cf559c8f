//! In-process identity provider
//!
//! Keeps accounts in memory with Argon2id password hashes and issues HS256
//! session tokens. Used for local development and tests, where no hosted auth
//! service is around.
//!
//! Recovery emails are not sent; they are collected in an outbox that tests
//! and the development server can read back.
//!
//! The privileged provisioning path needs a profile store to write profile
//! rows into, and can be switched off to exercise the client fallback.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AuthSession, IdentityError, IdentityProvider, ProvisionPath, ProvisionRequest,
    ProvisionedUser, RecoveryTokens, SessionTokens,
};
use crate::auth::jwt::{
    create_token, issue_token_pair, validate_access_token, validate_token_of_type, Claims,
    JwtError, TokenType,
};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::gateway::{EntityKind, EntityStore, NewRecord};
use crate::models::role::Role;
use crate::models::user::CreateUser;

#[derive(Debug, Clone)]
struct Account {
    id: Uuid,
    email: String,
    password_hash: String,
    role: Role,
}

/// A recovery email that would have been sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryMail {
    pub email: String,
    pub link: String,
}

pub struct LocalIdentityProvider {
    jwt_secret: String,
    accounts: RwLock<HashMap<String, Account>>,
    revoked: RwLock<HashSet<String>>,
    outbox: RwLock<Vec<RecoveryMail>>,
    profiles: Option<Arc<dyn EntityStore>>,
    privileged_enabled: AtomicBool,
    redirect_url: String,
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

impl From<JwtError> for IdentityError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::CreateError(msg) => IdentityError::Internal(msg),
            _ => IdentityError::InvalidSession,
        }
    }
}

impl LocalIdentityProvider {
    /// A provider without a profile store; only the client path works
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            accounts: RwLock::new(HashMap::new()),
            revoked: RwLock::new(HashSet::new()),
            outbox: RwLock::new(Vec::new()),
            profiles: None,
            privileged_enabled: AtomicBool::new(true),
            redirect_url: "http://localhost:3000/reset-password".to_string(),
        }
    }

    /// Enables the privileged path, writing profile rows into `store`
    pub fn with_profile_store(mut self, store: Arc<dyn EntityStore>) -> Self {
        self.profiles = Some(store);
        self
    }

    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = url.into();
        self
    }

    /// Turns the privileged path on or off
    pub fn set_privileged_enabled(&self, enabled: bool) {
        self.privileged_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Creates an account directly, for seeding
    ///
    /// # Errors
    ///
    /// Fails if the email is taken or the password cannot be hashed.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Uuid, IdentityError> {
        self.insert_account(Uuid::new_v4(), email, password, role)
            .await
    }

    /// Recovery emails collected so far
    pub async fn recovery_outbox(&self) -> Vec<RecoveryMail> {
        self.outbox.read().await.clone()
    }

    async fn insert_account(
        &self,
        id: Uuid,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Uuid, IdentityError> {
        let key = email_key(email);
        let password_hash =
            hash_password(password).map_err(|e| IdentityError::Internal(e.to_string()))?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&key) {
            return Err(IdentityError::Rejected(
                "A user with this email address has already been registered".to_string(),
            ));
        }

        accounts.insert(
            key.clone(),
            Account {
                id,
                email: key,
                password_hash,
                role,
            },
        );

        Ok(id)
    }

    async fn remove_account(&self, email: &str) {
        self.accounts.write().await.remove(&email_key(email));
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let account = self
            .accounts
            .read()
            .await
            .get(&email_key(email))
            .cloned()
            .ok_or(IdentityError::InvalidCredentials)?;

        let valid = verify_password(password, &account.password_hash)
            .map_err(|e| IdentityError::Internal(e.to_string()))?;
        if !valid {
            return Err(IdentityError::InvalidCredentials);
        }

        let (access_token, refresh_token) =
            issue_token_pair(account.id, account.role, &self.jwt_secret)?;
        let expires_at = Some(Utc::now() + TokenType::Access.default_expiration());

        tracing::info!(user_id = %account.id, "Signed in");

        Ok(AuthSession {
            user_id: account.id,
            email: account.email,
            tokens: SessionTokens {
                access_token,
                refresh_token,
                expires_at,
            },
        })
    }

    async fn sign_out(&self, tokens: &SessionTokens) -> Result<(), IdentityError> {
        if self.revoked.read().await.contains(&tokens.access_token) {
            return Err(IdentityError::InvalidSession);
        }
        validate_access_token(&tokens.access_token, &self.jwt_secret)?;

        let mut revoked = self.revoked.write().await;
        revoked.insert(tokens.access_token.clone());
        revoked.insert(tokens.refresh_token.clone());
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let Some(account) = self.accounts.read().await.get(&email_key(email)).cloned() else {
            tracing::debug!(email = %email, "Password reset for unknown address ignored");
            return Ok(());
        };

        let claims = Claims::new(account.id, account.role, TokenType::Recovery);
        let token = create_token(&claims, &self.jwt_secret)?;
        let link = format!(
            "{}#access_token={}&expires_in={}&type=recovery",
            self.redirect_url,
            token,
            TokenType::Recovery.default_expiration().num_seconds()
        );

        self.outbox.write().await.push(RecoveryMail {
            email: account.email,
            link,
        });
        Ok(())
    }

    async fn complete_recovery(
        &self,
        tokens: &RecoveryTokens,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        if self.revoked.read().await.contains(&tokens.access_token) {
            return Err(IdentityError::InvalidSession);
        }
        let claims =
            validate_token_of_type(&tokens.access_token, &self.jwt_secret, TokenType::Recovery)?;
        validate_password_strength(new_password)
            .map_err(|e| IdentityError::WeakPassword(e.to_string()))?;

        let password_hash =
            hash_password(new_password).map_err(|e| IdentityError::Internal(e.to_string()))?;

        {
            let mut accounts = self.accounts.write().await;
            let account = accounts
                .values_mut()
                .find(|a| a.id == claims.sub)
                .ok_or(IdentityError::InvalidSession)?;
            account.password_hash = password_hash;
        }

        // A recovery link works once
        self.revoked
            .write()
            .await
            .insert(tokens.access_token.clone());

        tracing::info!(user_id = %claims.sub, "Password reset completed");
        Ok(())
    }

    async fn provision_privileged(
        &self,
        request: &ProvisionRequest,
        temporary_password: &str,
    ) -> Result<ProvisionedUser, IdentityError> {
        if !self.privileged_enabled.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable(
                "privileged provisioning is disabled".to_string(),
            ));
        }
        let store = self.profiles.as_ref().ok_or_else(|| {
            IdentityError::Unavailable("no profile store configured".to_string())
        })?;

        let role = request.assignment.role();
        let user_id = self
            .insert_account(Uuid::new_v4(), &request.email, temporary_password, role)
            .await?;

        let profile = NewRecord::User(CreateUser {
            id: user_id,
            email: request.email.clone(),
            name: request.name.clone(),
            phone: request.phone.clone(),
            assignment: request.assignment.clone(),
        });

        // Account and profile are created together or not at all
        if let Err(e) = store.create(profile).await {
            self.remove_account(&request.email).await;
            return Err(e.into());
        }

        tracing::info!(user_id = %user_id, kind = %EntityKind::User, "Provisioned account with profile");

        Ok(ProvisionedUser {
            user_id,
            temporary_password: temporary_password.to_string(),
            path: ProvisionPath::Privileged,
            profile_created: true,
        })
    }

    async fn provision_client(
        &self,
        request: &ProvisionRequest,
        temporary_password: &str,
    ) -> Result<ProvisionedUser, IdentityError> {
        let user_id = self
            .insert_account(
                Uuid::new_v4(),
                &request.email,
                temporary_password,
                request.assignment.role(),
            )
            .await?;

        tracing::info!(user_id = %user_id, "Provisioned account without profile");

        Ok(ProvisionedUser {
            user_id,
            temporary_password: temporary_password.to_string(),
            path: ProvisionPath::Client,
            profile_created: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryEntityStore;
    use crate::identity::parse_recovery_fragment;
    use crate::models::role::Assignment;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn request(email: &str) -> ProvisionRequest {
        ProvisionRequest {
            email: email.to_string(),
            name: "Martha".to_string(),
            phone: None,
            assignment: Assignment::SuperAdmin,
        }
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let provider = LocalIdentityProvider::new(SECRET);
        let id = provider
            .register("grace@example.org", "Corr3ct-horse", Role::ZoneLeader)
            .await
            .unwrap();

        assert!(matches!(
            provider.sign_in("grace@example.org", "wrong").await,
            Err(IdentityError::InvalidCredentials)
        ));
        assert!(matches!(
            provider.sign_in("nobody@example.org", "Corr3ct-horse").await,
            Err(IdentityError::InvalidCredentials)
        ));

        let session = provider
            .sign_in("Grace@Example.org", "Corr3ct-horse")
            .await
            .unwrap();
        assert_eq!(session.user_id, id);
        let claims = validate_access_token(&session.tokens.access_token, SECRET).unwrap();
        assert_eq!(claims.role, Role::ZoneLeader);

        provider.sign_out(&session.tokens).await.unwrap();
        assert!(matches!(
            provider.sign_out(&session.tokens).await,
            Err(IdentityError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_recovery_round_trip() {
        let provider = LocalIdentityProvider::new(SECRET);
        provider
            .register("grace@example.org", "Corr3ct-horse", Role::CellLeader)
            .await
            .unwrap();

        provider
            .request_password_reset("nobody@example.org")
            .await
            .unwrap();
        assert!(provider.recovery_outbox().await.is_empty());

        provider
            .request_password_reset("grace@example.org")
            .await
            .unwrap();
        let mail = provider.recovery_outbox().await.remove(0);
        let tokens = parse_recovery_fragment(&mail.link).unwrap();

        assert!(matches!(
            provider.complete_recovery(&tokens, "weak").await,
            Err(IdentityError::WeakPassword(_))
        ));
        provider
            .complete_recovery(&tokens, "N3w-passphrase")
            .await
            .unwrap();

        assert!(provider
            .sign_in("grace@example.org", "N3w-passphrase")
            .await
            .is_ok());
        assert!(matches!(
            provider.complete_recovery(&tokens, "An0ther-one!").await,
            Err(IdentityError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_recovery_token() {
        let provider = LocalIdentityProvider::new(SECRET);
        provider
            .register("grace@example.org", "Corr3ct-horse", Role::CellLeader)
            .await
            .unwrap();
        let session = provider
            .sign_in("grace@example.org", "Corr3ct-horse")
            .await
            .unwrap();

        let tokens = RecoveryTokens {
            access_token: session.tokens.access_token,
            refresh_token: None,
        };
        assert!(matches!(
            provider.complete_recovery(&tokens, "N3w-passphrase").await,
            Err(IdentityError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_privileged_path_writes_profile() {
        let store = Arc::new(MemoryEntityStore::new());
        let provider = LocalIdentityProvider::new(SECRET).with_profile_store(store.clone());

        let user = provider
            .provision_user(&request("martha@example.org"))
            .await
            .unwrap();
        assert_eq!(user.path, ProvisionPath::Privileged);
        assert!(user.profile_created);

        let snapshot = store.fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.users[0].id, user.user_id);

        assert!(provider
            .sign_in("martha@example.org", &user.temporary_password)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_falls_back_without_privileged_path() {
        let store = Arc::new(MemoryEntityStore::new());
        let provider = LocalIdentityProvider::new(SECRET).with_profile_store(store.clone());
        provider.set_privileged_enabled(false);

        let user = provider
            .provision_user(&request("martha@example.org"))
            .await
            .unwrap();
        assert_eq!(user.path, ProvisionPath::Client);
        assert!(!user.profile_created);
        assert!(store.fetch_snapshot().await.unwrap().users.is_empty());
    }

    #[tokio::test]
    async fn test_failed_profile_write_rolls_back_account() {
        let store = Arc::new(MemoryEntityStore::new());
        store.reject_writes_to(EntityKind::User).await;
        let provider = LocalIdentityProvider::new(SECRET).with_profile_store(store.clone());

        let result = provider
            .provision_privileged(&request("martha@example.org"), "Temp-Passw0rd")
            .await;
        assert!(matches!(result, Err(IdentityError::Profile(_))));

        // The address is free again
        assert!(provider
            .provision_client(&request("martha@example.org"), "Temp-Passw0rd")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let provider = LocalIdentityProvider::new(SECRET);
        provider
            .provision_client(&request("martha@example.org"), "Temp-Passw0rd")
            .await
            .unwrap();

        let result = provider
            .provision_user(&request("MARTHA@example.org"))
            .await;
        assert!(matches!(result, Err(IdentityError::Rejected(_))));
    }
}
