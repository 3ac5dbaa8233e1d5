//! Test fixture wiring every service to one in-memory store

use crate::auth::hash_password;
use crate::config::AuthConfig;
use crate::db::models::{Membership, Organization, Service, SessionKind, Tier, User};
use crate::rbac::Role;
use crate::services::session::{Credentials, IssuedSession};
use crate::services::{AccountService, CatalogService, OrganizationService, SessionService};
use crate::store::{DirectoryStore, MemoryStore};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use uuid::Uuid;

/// Argon2 is slow in debug builds; hash each test password once
fn cached_hash(password: &str) -> String {
    static HASHES: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
    let mut hashes = HASHES
        .get_or_init(Default::default)
        .lock()
        .unwrap();
    hashes
        .entry(password.to_string())
        .or_insert_with(|| hash_password(password).unwrap())
        .clone()
}

pub(crate) struct Fixture {
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<SessionService>,
    pub organizations: Arc<OrganizationService>,
    pub accounts: AccountService,
    pub catalog: CatalogService,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(AuthConfig::default())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(SessionService::new(store.clone(), store.clone(), config));
        let organizations = Arc::new(OrganizationService::new(store.clone()));
        let accounts = AccountService::new(store.clone(), organizations.clone(), sessions.clone());
        let catalog = CatalogService::new(store.clone(), store.clone());

        Self {
            store,
            sessions,
            organizations,
            accounts,
            catalog,
        }
    }

    pub fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    pub async fn user(&self, email: &str, password: &str) -> User {
        let now = Utc::now();
        self.store
            .insert_user(User {
                id: Uuid::new_v4(),
                email: email.to_lowercase(),
                name: email.split('@').next().unwrap_or(email).to_string(),
                password_hash: cached_hash(password),
                is_active: true,
                home_organization_id: None,
                created_at: now.into(),
                updated_at: now.into(),
            })
            .await
            .unwrap()
    }

    pub async fn organization(&self, name: &str) -> Organization {
        let now = Utc::now();
        self.store
            .insert_organization(Organization {
                id: Uuid::new_v4(),
                name: name.to_string(),
                slug: format!("{}-{}", name.to_lowercase().replace(' ', "-"), Uuid::new_v4().simple()),
                tier: Tier::Free.into(),
                is_active: true,
                created_at: now.into(),
                updated_at: now.into(),
            })
            .await
            .unwrap()
    }

    /// Add `user` to `org`; later joins sort after earlier ones
    pub async fn join(&self, user: &User, org: &Organization, role: Role) -> Membership {
        let existing = self.store.list_user_memberships(user.id).await.unwrap().len() as i64;
        let joined = Utc::now() + Duration::milliseconds(existing);
        self.store
            .insert_membership(Membership {
                id: Uuid::new_v4(),
                user_id: user.id,
                organization_id: org.id,
                role: role.as_str().to_string(),
                permissions: serde_json::json!([]),
                is_active: true,
                joined_at: joined.into(),
                updated_at: joined.into(),
            })
            .await
            .unwrap()
    }

    pub async fn set_home(&self, user: &User, org: &Organization) {
        let mut user = self.store.find_user_by_id(user.id).await.unwrap().unwrap();
        user.home_organization_id = Some(org.id);
        self.store.update_user(user).await.unwrap();
    }

    pub async fn deactivate_organization(&self, org: &Organization) {
        let mut org = self.store.find_organization(org.id).await.unwrap().unwrap();
        org.is_active = false;
        self.store.update_organization(org).await.unwrap();
    }

    pub async fn service(&self, name: &str, tier: Tier) -> Service {
        self.store
            .insert_service(Service {
                id: Uuid::new_v4(),
                slug: name.to_lowercase().replace(' ', "-"),
                name: name.to_string(),
                category: "automation".to_string(),
                description: format!("{} agent", name),
                required_tier: tier.into(),
                is_active: true,
                created_at: Utc::now().into(),
            })
            .await
    }

    /// Web session for a user created with the default test password
    pub async fn login(&self, email: &str) -> IssuedSession {
        self.sessions
            .create_session(&Self::credentials(email, "password123"), SessionKind::Web)
            .await
            .unwrap()
    }
}
