//! Session issuance, validation, organization switching and revocation

use crate::auth::{client_token, generate_session_token, hash_token, verify_password};
use crate::config::AuthConfig;
use crate::db::models::{Membership, Organization, Session, SessionKind, User};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::store::{DirectoryStore, SessionStore};
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Upper bound on any configured session lifetime
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

/// Login credentials
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A freshly issued session; the only place the raw token appears
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

/// Outcome of validating a token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionValidation {
    pub is_valid: bool,
    pub session: Option<Session>,
}

impl SessionValidation {
    fn invalid() -> Self {
        Self {
            is_valid: false,
            session: None,
        }
    }

    fn valid(session: Session) -> Self {
        Self {
            is_valid: true,
            session: Some(session),
        }
    }
}

/// Lowercase and trim an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Session service shared by all handlers
pub struct SessionService {
    sessions: Arc<dyn SessionStore>,
    directory: Arc<dyn DirectoryStore>,
    config: AuthConfig,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        directory: Arc<dyn DirectoryStore>,
        config: AuthConfig,
    ) -> Self {
        Self {
            sessions,
            directory,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Lifetime of a session of the given kind
    pub fn ttl(&self, kind: SessionKind) -> Duration {
        let secs = match kind {
            SessionKind::Web => self.config.web_session_ttl_secs,
            SessionKind::Api => self.config.api_session_ttl_secs,
        };
        Duration::seconds(secs.min(MAX_TTL_SECS) as i64)
    }

    /// Token for this request: forwarded header, then cookie, then bearer
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(self.config.forward_header.as_str())
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .or_else(|| client_token(headers, &self.config.session_cookie))
            .map(String::from)
    }

    /// Verify credentials and issue a new session
    pub async fn create_session(
        &self,
        credentials: &Credentials,
        kind: SessionKind,
    ) -> Result<IssuedSession> {
        let email = normalize_email(&credentials.email);

        let user = match self.directory.find_user_by_email(&email).await? {
            Some(user) if verify_password(&credentials.password, &user.password_hash) => user,
            _ => {
                metrics::record_login(false, kind_label(kind));
                info!(email = %email, "Login rejected");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !user.is_active {
            metrics::record_login(false, kind_label(kind));
            return Err(AppError::AccountDisabled);
        }

        let organization_id = self.default_organization(&user).await?;

        let token = generate_session_token();
        let now = Utc::now();
        let session = Session {
            token_hash: hash_token(&token),
            user_id: user.id,
            organization_id,
            kind: kind.into(),
            created_at: now.into(),
            expires_at: (now + self.ttl(kind)).into(),
        };

        let session = self.sessions.insert_session(session).await?;
        metrics::record_login(true, kind_label(kind));

        info!(
            user_id = %user.id,
            organization_id = ?organization_id,
            kind = kind_label(kind),
            "Session created"
        );

        Ok(IssuedSession { token, session })
    }

    /// Look up a token, failing closed on anything unexpected
    pub async fn validate_session(&self, token: &str) -> SessionValidation {
        if token.is_empty() {
            metrics::record_validation("missing");
            return SessionValidation::invalid();
        }

        let token_hash = hash_token(token);
        let session = match self.sessions.find_session(&token_hash).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                metrics::record_validation("unknown");
                return SessionValidation::invalid();
            }
            Err(e) => {
                warn!(error = %e, "Session lookup failed");
                metrics::record_validation("error");
                return SessionValidation::invalid();
            }
        };

        if session.is_expired() {
            metrics::record_validation("expired");
            if let Err(e) = self.sessions.delete_session(&token_hash).await {
                debug!(error = %e, "Failed to purge expired session");
            }
            return SessionValidation::invalid();
        }

        match self.resolve(session).await {
            Ok(Some(session)) => {
                metrics::record_validation("valid");
                SessionValidation::valid(session)
            }
            Ok(None) => {
                metrics::record_validation("user_inactive");
                SessionValidation::invalid()
            }
            Err(e) => {
                warn!(error = %e, "Session resolution failed");
                metrics::record_validation("error");
                SessionValidation::invalid()
            }
        }
    }

    /// Move a session to another organization the user belongs to
    pub async fn switch_organization(&self, token: &str, organization_id: Uuid) -> Result<Session> {
        let validation = self.validate_session(token).await;
        let session = match validation.session {
            Some(session) if validation.is_valid => session,
            _ => return Err(AppError::InvalidSession),
        };

        if self
            .accessible(session.user_id, organization_id)
            .await?
            .is_none()
        {
            metrics::record_switch(false);
            warn!(
                user_id = %session.user_id,
                organization_id = %organization_id,
                "Organization switch denied"
            );
            return Err(AppError::NotMember {
                organization_id: organization_id.to_string(),
            });
        }

        let updated = self
            .sessions
            .set_session_organization(&hash_token(token), organization_id)
            .await?
            .ok_or(AppError::InvalidSession)?;

        // Next login starts where the user left off
        if let Err(e) = self.remember_home(session.user_id, organization_id).await {
            warn!(error = %e, user_id = %session.user_id, "Failed to store home organization");
        }

        metrics::record_switch(true);
        info!(
            user_id = %updated.user_id,
            organization_id = %organization_id,
            "Organization switched"
        );

        Ok(updated)
    }

    /// Remove a session; unknown tokens are not an error
    pub async fn revoke_session(&self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Ok(());
        }

        if self.sessions.delete_session(&hash_token(token)).await? {
            metrics::record_revocations(1);
            debug!("Session revoked");
        }
        Ok(())
    }

    /// Remove every session of a user
    pub async fn revoke_user_sessions(&self, user_id: Uuid) -> Result<u64> {
        let removed = self.sessions.delete_user_sessions(user_id).await?;
        metrics::record_revocations(removed);
        info!(user_id = %user_id, removed, "User sessions revoked");
        Ok(removed)
    }

    /// Active membership in an active organization, if any
    pub async fn accessible(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<(Organization, Membership)>> {
        let membership = match self
            .directory
            .find_membership(user_id, organization_id)
            .await?
        {
            Some(m) if m.is_active => m,
            _ => return Ok(None),
        };

        match self.directory.find_organization(organization_id).await? {
            Some(org) if org.is_active => Ok(Some((org, membership))),
            _ => Ok(None),
        }
    }

    /// Home organization if still reachable, else the oldest active membership
    async fn default_organization(&self, user: &User) -> Result<Option<Uuid>> {
        if let Some(home) = user.home_organization_id {
            if self.accessible(user.id, home).await?.is_some() {
                return Ok(Some(home));
            }
        }

        for membership in self.directory.list_user_memberships(user.id).await? {
            if self
                .accessible(user.id, membership.organization_id)
                .await?
                .is_some()
            {
                return Ok(Some(membership.organization_id));
            }
        }

        Ok(None)
    }

    /// Check the user and organization behind a live session.
    ///
    /// Returns `None` for sessions whose user is gone or disabled; a session
    /// whose organization became unreachable is returned without one.
    async fn resolve(&self, mut session: Session) -> Result<Option<Session>> {
        match self.directory.find_user_by_id(session.user_id).await? {
            Some(user) if user.is_active => {}
            _ => return Ok(None),
        }

        if let Some(org) = session.organization_id {
            if self.accessible(session.user_id, org).await?.is_none() {
                debug!(organization_id = %org, "Session organization no longer accessible");
                session.organization_id = None;
            }
        }

        Ok(Some(session))
    }

    async fn remember_home(&self, user_id: Uuid, organization_id: Uuid) -> Result<()> {
        let mut user = self
            .directory
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user", user_id))?;

        if user.home_organization_id != Some(organization_id) {
            user.home_organization_id = Some(organization_id);
            user.updated_at = Utc::now().into();
            self.directory.update_user(user).await?;
        }
        Ok(())
    }
}

fn kind_label(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::Web => "web",
        SessionKind::Api => "api",
    }
}
