//! User registration and profile management

use crate::auth::hash_password;
use crate::db::models::{Tier, User};
use crate::errors::{AppError, Result};
use crate::services::organizations::{validate_name, NewOrganization, OrganizationService};
use crate::services::session::{normalize_email, SessionService};
use crate::store::DirectoryStore;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    /// Create this organization with the new user as owner
    #[validate(length(min = 1, max = 100))]
    pub organization_name: Option<String>,
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub home_organization_id: Option<Uuid>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            is_active: user.is_active,
            home_organization_id: user.home_organization_id,
            created_at: user.created_at,
        }
    }
}

/// Account operations
pub struct AccountService {
    directory: Arc<dyn DirectoryStore>,
    organizations: Arc<OrganizationService>,
    sessions: Arc<SessionService>,
}

impl AccountService {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        organizations: Arc<OrganizationService>,
        sessions: Arc<SessionService>,
    ) -> Self {
        Self {
            directory,
            organizations,
            sessions,
        }
    }

    /// Create a user, optionally with a first organization; nothing is kept on failure
    pub async fn register(&self, registration: Registration) -> Result<UserProfile> {
        registration.validate()?;
        let email = normalize_email(&registration.email);
        let name = registration.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::MissingField {
                field: "name".to_string(),
            });
        }
        let organization_name = registration
            .organization_name
            .as_deref()
            .map(validate_name)
            .transpose()?;

        if self.directory.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict {
                message: format!("email '{}' is already registered", email),
            });
        }

        let now = Utc::now();
        let user = self
            .directory
            .insert_user(User {
                id: Uuid::new_v4(),
                email,
                name,
                password_hash: hash_password(&registration.password)?,
                is_active: true,
                home_organization_id: None,
                created_at: now.into(),
                updated_at: now.into(),
            })
            .await?;

        info!(user_id = %user.id, "User registered");

        if let Some(org_name) = organization_name {
            let created = self
                .organizations
                .create(
                    user.id,
                    NewOrganization {
                        name: org_name,
                        tier: Some(Tier::Free),
                    },
                )
                .await;

            if let Err(e) = created {
                warn!(user_id = %user.id, error = %e, "Organization step failed, undoing registration");
                self.directory.delete_user(user.id).await?;
                return Err(e);
            }
        }

        self.profile(user.id).await
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile> {
        self.directory
            .find_user_by_id(user_id)
            .await?
            .map(|u| UserProfile::from(&u))
            .ok_or_else(|| AppError::not_found("user", user_id))
    }

    pub async fn update_profile(&self, user_id: Uuid, name: &str) -> Result<UserProfile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::MissingField {
                field: "name".to_string(),
            });
        }
        if name.chars().count() > 100 {
            return Err(AppError::Validation {
                message: "name must be at most 100 characters".to_string(),
                field: Some("name".to_string()),
            });
        }

        let mut user = self
            .directory
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user", user_id))?;
        user.name = name.to_string();
        user.updated_at = Utc::now().into();

        let user = self.directory.update_user(user).await?;
        Ok(UserProfile::from(&user))
    }

    /// Close an account and end every session it holds
    pub async fn deactivate(&self, user_id: Uuid) -> Result<()> {
        let mut user = self
            .directory
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user", user_id))?;

        user.is_active = false;
        user.updated_at = Utc::now().into();
        self.directory.update_user(user).await?;
        self.sessions.revoke_user_sessions(user_id).await?;

        info!(user_id = %user_id, "Account deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::db::models::{Membership, Organization, SessionKind};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use crate::rbac::Role;
    use crate::services::session::Credentials;
    use crate::services::testing::Fixture;

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.to_string(),
            password: "password123".to_string(),
            name: "Ada Lovelace".to_string(),
            organization_name: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let fx = Fixture::new();
        let profile = fx.accounts.register(registration("Ada@Example.com")).await.unwrap();
        assert_eq!(profile.email, "ada@example.com");

        let issued = fx
            .sessions
            .create_session(
                &Credentials {
                    email: "ada@example.com".into(),
                    password: "password123".into(),
                },
                SessionKind::Web,
            )
            .await
            .unwrap();
        assert_eq!(issued.session.user_id, profile.id);
    }

    #[tokio::test]
    async fn test_register_with_organization_sets_home() {
        let fx = Fixture::new();
        let mut input = registration("ada@example.com");
        input.organization_name = Some("Engines Ltd".into());

        let profile = fx.accounts.register(input).await.unwrap();
        let home = profile.home_organization_id.expect("home organization");

        let orgs = fx.organizations.list_for_user(profile.id).await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].id, home);
        assert_eq!(orgs[0].role, Role::Owner);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let fx = Fixture::new();
        fx.accounts.register(registration("ada@example.com")).await.unwrap();
        let err = fx
            .accounts
            .register(registration("ADA@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let fx = Fixture::new();
        let mut input = registration("ada@example.com");
        input.password = "short".into();
        let err = fx.accounts.register(input).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_blank_organization_name_leaves_no_user() {
        let fx = Fixture::new();
        let mut input = registration("ada@example.com");
        input.organization_name = Some("   ".into());

        let err = fx.accounts.register(input).await.unwrap_err();
        assert!(matches!(err, AppError::MissingField { .. }));
        assert!(fx
            .store
            .find_user_by_email("ada@example.com")
            .await
            .unwrap()
            .is_none());

        fx.accounts.register(registration("ada@example.com")).await.unwrap();
    }

    /// Directory whose organization inserts always fail
    struct NoOrganizations(Arc<MemoryStore>);

    #[async_trait]
    impl DirectoryStore for NoOrganizations {
        async fn ping(&self) -> Result<()> {
            self.0.ping().await
        }
        async fn insert_user(&self, user: User) -> Result<User> {
            self.0.insert_user(user).await
        }
        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
            self.0.find_user_by_id(id).await
        }
        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
            self.0.find_user_by_email(email).await
        }
        async fn update_user(&self, user: User) -> Result<User> {
            self.0.update_user(user).await
        }
        async fn delete_user(&self, id: Uuid) -> Result<bool> {
            self.0.delete_user(id).await
        }
        async fn insert_organization(&self, organization: Organization) -> Result<Organization> {
            Err(AppError::Conflict {
                message: format!("organization slug '{}' is taken", organization.slug),
            })
        }
        async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>> {
            self.0.find_organization(id).await
        }
        async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
            self.0.find_organization_by_slug(slug).await
        }
        async fn update_organization(&self, organization: Organization) -> Result<Organization> {
            self.0.update_organization(organization).await
        }
        async fn insert_membership(&self, membership: Membership) -> Result<Membership> {
            self.0.insert_membership(membership).await
        }
        async fn update_membership(&self, membership: Membership) -> Result<Membership> {
            self.0.update_membership(membership).await
        }
        async fn find_membership(
            &self,
            user_id: Uuid,
            organization_id: Uuid,
        ) -> Result<Option<Membership>> {
            self.0.find_membership(user_id, organization_id).await
        }
        async fn list_user_memberships(&self, user_id: Uuid) -> Result<Vec<Membership>> {
            self.0.list_user_memberships(user_id).await
        }
        async fn list_organization_members(&self, organization_id: Uuid) -> Result<Vec<Membership>> {
            self.0.list_organization_members(organization_id).await
        }
    }

    #[tokio::test]
    async fn test_failed_organization_step_removes_user() {
        let store = Arc::new(MemoryStore::new());
        let directory: Arc<dyn DirectoryStore> = Arc::new(NoOrganizations(store.clone()));
        let sessions = Arc::new(SessionService::new(
            store.clone(),
            directory.clone(),
            AuthConfig::default(),
        ));
        let organizations = Arc::new(OrganizationService::new(directory.clone()));
        let accounts = AccountService::new(directory, organizations, sessions);

        let mut input = registration("ada@example.com");
        input.organization_name = Some("Engines Ltd".into());
        let err = accounts.register(input).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
        assert!(store
            .find_user_by_email("ada@example.com")
            .await
            .unwrap()
            .is_none());

        accounts.register(registration("ada@example.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_profile_requires_name() {
        let fx = Fixture::new();
        let user = fx.user("ada@example.com", "password123").await;
        assert!(matches!(
            fx.accounts.update_profile(user.id, "   ").await.unwrap_err(),
            AppError::MissingField { .. }
        ));

        let updated = fx.accounts.update_profile(user.id, "Countess").await.unwrap();
        assert_eq!(updated.name, "Countess");
    }

    #[tokio::test]
    async fn test_deactivate_revokes_sessions() {
        let fx = Fixture::new();
        let user = fx.user("ada@example.com", "password123").await;
        let issued = fx.login("ada@example.com").await;

        fx.accounts.deactivate(user.id).await.unwrap();
        assert!(!fx.sessions.validate_session(&issued.token).await.is_valid);
    }
}
