//! Signed-in session context
//!
//! A [`SessionContext`] owns everything a dashboard needs for one signed-in
//! leader: their profile, their provider tokens, and the hierarchy index built
//! from the latest snapshot. Nothing is global; a process can hold any number
//! of sessions side by side.
//!
//! Every read goes through the policy first. Writes made through the context
//! (provisioning, broadcasting) are followed by a full [`refresh`].
//!
//! [`refresh`]: SessionContext::refresh
//!
//! # Example
//!
//! ```no_run
//! use shepherd_shared::session::SessionContext;
//! # use std::sync::Arc;
//! # use shepherd_shared::gateway::EntityStore;
//! # use shepherd_shared::identity::IdentityProvider;
//!
//! # async fn example(
//! #     store: Arc<dyn EntityStore>,
//! #     identity: Arc<dyn IdentityProvider>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = SessionContext::start(store, identity, "grace@example.org", "Corr3ct-horse").await?;
//!
//! if let Some(scope) = session.assignment().scope() {
//!     let summary = session.summary(scope)?;
//!     println!("{} members", summary.member_count);
//! }
//!
//! session.refresh().await?;
//! session.end().await?;
//! # Ok(())
//! # }
//! ```

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::aggregation::{self, BreakdownRow, NodeSummary, WeekBucket};
use crate::alerts::{self, BroadcastError};
use crate::auth::authorization::{self, require_view, AuthzError};
use crate::gateway::{EntityStore, StoreError};
use crate::hierarchy::HierarchyIndex;
use crate::identity::{IdentityError, IdentityProvider, ProvisionRequest, SessionTokens};
use crate::models::alert::{Alert, CreateAlert};
use crate::models::node::NodeRef;
use crate::models::role::{Assignment, Role};
use crate::models::user::User;
use crate::provisioning::{provision_leader, ProvisionError, ProvisionReport};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No profile exists for account {0}")]
    NoProfile(Uuid),

    #[error("Account {0} is deactivated")]
    Inactive(Uuid),

    #[error(transparent)]
    Denied(#[from] AuthzError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}

pub struct SessionContext {
    store: Arc<dyn EntityStore>,
    identity: Arc<dyn IdentityProvider>,
    tokens: SessionTokens,
    actor: User,
    index: HierarchyIndex,
}

/// Looks up the active profile of `user_id` in `index`
fn active_profile(index: &HierarchyIndex, user_id: Uuid) -> Result<User, SessionError> {
    let user = index
        .user(user_id)
        .cloned()
        .ok_or(SessionError::NoProfile(user_id))?;

    if !user.is_active {
        return Err(SessionError::Inactive(user_id));
    }
    Ok(user)
}

impl SessionContext {
    /// Signs in and loads the first snapshot
    ///
    /// # Errors
    ///
    /// Fails on bad credentials, when the account has no active profile, or
    /// when the snapshot cannot be loaded. A session that cannot be used is
    /// signed out again.
    pub async fn start(
        store: Arc<dyn EntityStore>,
        identity: Arc<dyn IdentityProvider>,
        email: &str,
        password: &str,
    ) -> Result<Self, SessionError> {
        let session = identity.sign_in(email, password).await?;

        match Self::for_actor(store, identity.clone(), session.user_id, session.tokens.clone())
            .await
        {
            Ok(context) => Ok(context),
            Err(e) => {
                if let Err(sign_out) = identity.sign_out(&session.tokens).await {
                    tracing::warn!(error = %sign_out, "Failed to sign out unusable session");
                }
                Err(e)
            }
        }
    }

    /// Resumes a session for an already signed-in account
    pub async fn for_actor(
        store: Arc<dyn EntityStore>,
        identity: Arc<dyn IdentityProvider>,
        user_id: Uuid,
        tokens: SessionTokens,
    ) -> Result<Self, SessionError> {
        let index = HierarchyIndex::build(store.fetch_snapshot().await?);
        let actor = active_profile(&index, user_id)?;

        tracing::info!(user_id = %actor.id, role = %actor.role(), "Session started");

        Ok(Self {
            store,
            identity,
            tokens,
            actor,
            index,
        })
    }

    /// Reloads the snapshot and the actor's profile
    pub async fn refresh(&mut self) -> Result<(), SessionError> {
        let index = HierarchyIndex::build(self.store.fetch_snapshot().await?);
        self.actor = active_profile(&index, self.actor.id)?;
        self.index = index;

        tracing::debug!(user_id = %self.actor.id, "Session refreshed");
        Ok(())
    }

    /// Signs out and drops the session
    pub async fn end(self) -> Result<(), SessionError> {
        self.identity.sign_out(&self.tokens).await?;
        tracing::info!(user_id = %self.actor.id, "Session ended");
        Ok(())
    }

    pub fn actor(&self) -> &User {
        &self.actor
    }

    pub fn assignment(&self) -> &Assignment {
        &self.actor.assignment
    }

    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    pub fn index(&self) -> &HierarchyIndex {
        &self.index
    }

    pub fn can_view(&self, node: NodeRef) -> bool {
        authorization::can_view(self.assignment(), &self.index, node)
    }

    pub fn allowed_roles(&self) -> &'static [Role] {
        authorization::allowed_roles(self.actor.role())
    }

    pub fn summary(&self, node: NodeRef) -> Result<NodeSummary, SessionError> {
        require_view(self.assignment(), &self.index, node)?;
        Ok(aggregation::summary(&self.index, node))
    }

    pub fn breakdown(&self, node: NodeRef) -> Result<Vec<BreakdownRow>, SessionError> {
        require_view(self.assignment(), &self.index, node)?;
        Ok(aggregation::performance_breakdown(&self.index, node))
    }

    pub fn growth(
        &self,
        node: NodeRef,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<WeekBucket>, SessionError> {
        require_view(self.assignment(), &self.index, node)?;
        Ok(aggregation::weekly_growth(&self.index, node, from, to))
    }

    /// Alerts the actor should see now
    pub fn alerts(&self) -> Vec<&Alert> {
        alerts::visible_alerts(&self.index.snapshot().alerts, &self.actor, Utc::now())
    }

    /// Runs the provisioning workflow as the actor, then refreshes
    pub async fn provision(
        &mut self,
        request: ProvisionRequest,
    ) -> Result<ProvisionReport, SessionError> {
        let report = provision_leader(
            self.assignment(),
            &self.index,
            self.store.as_ref(),
            self.identity.as_ref(),
            request,
        )
        .await?;

        self.refresh().await?;
        Ok(report)
    }

    /// Broadcasts an alert as the actor, then refreshes
    pub async fn broadcast(&mut self, alert: CreateAlert) -> Result<Alert, SessionError> {
        let alert = CreateAlert {
            created_by: self.actor.id,
            ..alert
        };
        let sent = alerts::broadcast(self.assignment(), self.store.as_ref(), alert).await?;

        self.refresh().await?;
        Ok(sent)
    }
}
