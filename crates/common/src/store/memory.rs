//! In-process store used for local development and tests

use super::{CatalogStore, DirectoryStore, ServiceFilter, SessionStore};
use crate::db::models::{Agent, Membership, Organization, Service, Session, User};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    sessions: HashMap<String, Session>,
    users: HashMap<Uuid, User>,
    organizations: HashMap<Uuid, Organization>,
    memberships: HashMap<Uuid, Membership>,
    services: HashMap<Uuid, Service>,
    agents: HashMap<Uuid, Agent>,
}

/// Store keeping every record in memory behind one lock.
///
/// Every mutation happens under the write lock, so readers never observe a
/// half-applied update.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog entry; the catalog is otherwise read-only
    pub async fn insert_service(&self, service: Service) -> Service {
        let mut state = self.state.write().await;
        state.services.insert(service.id, service.clone());
        service
    }

    /// Number of stored sessions, including expired ones
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }
}

fn sorted_by_join(mut members: Vec<Membership>) -> Vec<Membership> {
    members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
    members
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: Session) -> Result<Session> {
        let mut state = self.state.write().await;
        if state.sessions.contains_key(&session.token_hash) {
            return Err(AppError::Conflict {
                message: "session token collision".to_string(),
            });
        }
        state
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(session)
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>> {
        Ok(self.state.read().await.sessions.get(token_hash).cloned())
    }

    async fn set_session_organization(
        &self,
        token_hash: &str,
        organization_id: Uuid,
    ) -> Result<Option<Session>> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        Ok(state
            .sessions
            .get_mut(token_hash)
            .filter(|s| s.expires_at > now)
            .map(|s| {
                s.organization_id = Some(organization_id);
                s.clone()
            }))
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool> {
        Ok(self.state.write().await.sessions.remove(token_hash).is_some())
    }

    async fn delete_user_sessions(&self, user_id: Uuid) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_user(&self, user: User) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict {
                message: format!("email '{}' is already registered", user.email),
            });
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_user(&self, user: User) -> Result<User> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(AppError::not_found("user", user.id)),
        }
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.users.remove(&id).is_some())
    }

    async fn insert_organization(&self, organization: Organization) -> Result<Organization> {
        let mut state = self.state.write().await;
        if state
            .organizations
            .values()
            .any(|o| o.slug == organization.slug)
        {
            return Err(AppError::Conflict {
                message: format!("organization slug '{}' is taken", organization.slug),
            });
        }
        state
            .organizations
            .insert(organization.id, organization.clone());
        Ok(organization)
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>> {
        Ok(self.state.read().await.organizations.get(&id).cloned())
    }

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        Ok(self
            .state
            .read()
            .await
            .organizations
            .values()
            .find(|o| o.slug == slug)
            .cloned())
    }

    async fn update_organization(&self, organization: Organization) -> Result<Organization> {
        let mut state = self.state.write().await;
        match state.organizations.get_mut(&organization.id) {
            Some(existing) => {
                *existing = organization.clone();
                Ok(organization)
            }
            None => Err(AppError::not_found("organization", organization.id)),
        }
    }

    async fn insert_membership(&self, membership: Membership) -> Result<Membership> {
        let mut state = self.state.write().await;
        let duplicate = state.memberships.values().any(|m| {
            m.user_id == membership.user_id && m.organization_id == membership.organization_id
        });
        if duplicate {
            return Err(AppError::Conflict {
                message: "membership already exists".to_string(),
            });
        }
        state.memberships.insert(membership.id, membership.clone());
        Ok(membership)
    }

    async fn update_membership(&self, membership: Membership) -> Result<Membership> {
        let mut state = self.state.write().await;
        match state.memberships.get_mut(&membership.id) {
            Some(existing) => {
                *existing = membership.clone();
                Ok(membership)
            }
            None => Err(AppError::not_found("membership", membership.id)),
        }
    }

    async fn find_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Membership>> {
        Ok(self
            .state
            .read()
            .await
            .memberships
            .values()
            .find(|m| m.user_id == user_id && m.organization_id == organization_id)
            .cloned())
    }

    async fn list_user_memberships(&self, user_id: Uuid) -> Result<Vec<Membership>> {
        let state = self.state.read().await;
        Ok(sorted_by_join(
            state
                .memberships
                .values()
                .filter(|m| m.user_id == user_id && m.is_active)
                .cloned()
                .collect(),
        ))
    }

    async fn list_organization_members(&self, organization_id: Uuid) -> Result<Vec<Membership>> {
        let state = self.state.read().await;
        Ok(sorted_by_join(
            state
                .memberships
                .values()
                .filter(|m| m.organization_id == organization_id && m.is_active)
                .cloned()
                .collect(),
        ))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_services(&self, filter: &ServiceFilter) -> Result<(Vec<Service>, u64)> {
        let state = self.state.read().await;
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());

        let mut matched: Vec<Service> = state
            .services
            .values()
            .filter(|s| s.is_active)
            .filter(|s| {
                filter
                    .category
                    .as_ref()
                    .map_or(true, |c| &s.category == c)
            })
            .filter(|s| {
                needle.as_ref().map_or(true, |n| {
                    s.name.to_lowercase().contains(n) || s.description.to_lowercase().contains(n)
                })
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_service(&self, id: Uuid) -> Result<Option<Service>> {
        Ok(self.state.read().await.services.get(&id).cloned())
    }

    async fn list_agents(&self, organization_id: Uuid) -> Result<Vec<Agent>> {
        let state = self.state.read().await;
        let mut agents: Vec<Agent> = state
            .agents
            .values()
            .filter(|a| a.organization_id == organization_id)
            .cloned()
            .collect();
        agents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(agents)
    }

    async fn find_agent(&self, id: Uuid) -> Result<Option<Agent>> {
        Ok(self.state.read().await.agents.get(&id).cloned())
    }

    async fn insert_agent(&self, agent: Agent) -> Result<Agent> {
        let mut state = self.state.write().await;
        state.agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    async fn update_agent(&self, agent: Agent) -> Result<Agent> {
        let mut state = self.state.write().await;
        match state.agents.get_mut(&agent.id) {
            Some(existing) => {
                *existing = agent.clone();
                Ok(agent)
            }
            None => Err(AppError::not_found("agent", agent.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::SessionKind;
    use chrono::Duration;

    fn session(hash: &str, user_id: Uuid, ttl: Duration) -> Session {
        let now = Utc::now();
        Session {
            token_hash: hash.to_string(),
            user_id,
            organization_id: None,
            kind: SessionKind::Web.into(),
            created_at: now.into(),
            expires_at: (now + ttl).into(),
        }
    }

    fn service(name: &str, category: &str, active: bool) -> Service {
        Service {
            id: Uuid::new_v4(),
            slug: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            category: category.to_string(),
            description: format!("{} automation", name),
            required_tier: "free".to_string(),
            is_active: active,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_switch_on_expired_session_is_rejected() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store
            .insert_session(session("expired", user, Duration::seconds(-5)))
            .await
            .unwrap();

        let updated = store
            .set_session_organization("expired", Uuid::new_v4())
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_delete_user_sessions_only_touches_that_user() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        for (hash, user) in [("a1", alice), ("a2", alice), ("b1", bob)] {
            store
                .insert_session(session(hash, user, Duration::hours(1)))
                .await
                .unwrap();
        }

        assert_eq!(store.delete_user_sessions(alice).await.unwrap(), 2);
        assert_eq!(store.session_count().await, 1);
        assert!(store.find_session("b1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_services_filters_and_pages() {
        let store = MemoryStore::new();
        store.insert_service(service("Post Scheduler", "social", true)).await;
        store.insert_service(service("Comment Responder", "social", true)).await;
        store.insert_service(service("Lead Finder", "sales", true)).await;
        store.insert_service(service("Retired Bot", "social", false)).await;

        let filter = ServiceFilter::new(Some(1), Some(1), Some("social".into()), None);
        let (page, total) = store.list_services(&filter).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Comment Responder");

        let filter = ServiceFilter::new(None, None, None, Some("LEAD".into()));
        let (page, total) = store.list_services(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].name, "Lead Finder");
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let store = MemoryStore::new();
        store.insert_service(service("Lead Finder", "sales", true)).await;
        store.insert_service(service("Rate_Limit Monitor", "ops", true)).await;

        let filter = ServiceFilter::new(None, None, None, Some("_".into()));
        let (page, total) = store.list_services(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].name, "Rate_Limit Monitor");

        let filter = ServiceFilter::new(None, None, None, Some("%".into()));
        let (_, total) = store.list_services(&filter).await.unwrap();
        assert_eq!(total, 0);
    }
}
