//! Storage abstractions
//!
//! Services depend on these traits instead of a concrete database so the
//! backend is picked once at startup. Two implementations exist:
//! [`crate::db::Repository`] (PostgreSQL via SeaORM) and [`MemoryStore`].

mod memory;

pub use memory::MemoryStore;

use crate::db::models::{Agent, Membership, Organization, Service, Session, User};
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default page size for catalog listings
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Upper bound for catalog page size
pub const MAX_PAGE_SIZE: u64 = 100;

/// Catalog listing filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFilter {
    /// 1-based page number
    pub page: u64,
    pub limit: u64,
    pub category: Option<String>,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
}

impl ServiceFilter {
    /// Build a filter, clamping page and limit into their valid ranges
    pub fn new(
        page: Option<u64>,
        limit: Option<u64>,
        category: Option<String>,
        search: Option<String>,
    ) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            category: category.filter(|c| !c.trim().is_empty()),
            search: search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

impl Default for ServiceFilter {
    fn default() -> Self {
        Self::new(None, None, None, None)
    }
}

/// Persistence for login sessions, keyed by token digest
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: Session) -> Result<Session>;

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>>;

    /// Set the current organization in a single atomic write.
    ///
    /// Returns `None` if no unexpired session has this digest.
    async fn set_session_organization(
        &self,
        token_hash: &str,
        organization_id: Uuid,
    ) -> Result<Option<Session>>;

    /// Returns whether a row was removed
    async fn delete_session(&self, token_hash: &str) -> Result<bool>;

    async fn delete_user_sessions(&self, user_id: Uuid) -> Result<u64>;
}

/// Persistence for users, organizations and memberships
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Check backend connectivity
    async fn ping(&self) -> Result<()>;

    async fn insert_user(&self, user: User) -> Result<User>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn update_user(&self, user: User) -> Result<User>;

    /// Remove a user row; only used to undo a failed registration
    async fn delete_user(&self, id: Uuid) -> Result<bool>;

    async fn insert_organization(&self, organization: Organization) -> Result<Organization>;

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>>;

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>>;

    async fn update_organization(&self, organization: Organization) -> Result<Organization>;

    async fn insert_membership(&self, membership: Membership) -> Result<Membership>;

    async fn update_membership(&self, membership: Membership) -> Result<Membership>;

    /// Relation between a user and an organization, active or not
    async fn find_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Membership>>;

    /// Active memberships of a user, oldest first
    async fn list_user_memberships(&self, user_id: Uuid) -> Result<Vec<Membership>>;

    /// Active members of an organization, oldest first
    async fn list_organization_members(&self, organization_id: Uuid) -> Result<Vec<Membership>>;
}

/// Persistence for the service catalog and agents
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Active services matching the filter, plus the total match count
    async fn list_services(&self, filter: &ServiceFilter) -> Result<(Vec<Service>, u64)>;

    async fn find_service(&self, id: Uuid) -> Result<Option<Service>>;

    async fn list_agents(&self, organization_id: Uuid) -> Result<Vec<Agent>>;

    async fn find_agent(&self, id: Uuid) -> Result<Option<Agent>>;

    async fn insert_agent(&self, agent: Agent) -> Result<Agent>;

    async fn update_agent(&self, agent: Agent) -> Result<Agent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_clamps_page_and_limit() {
        let filter = ServiceFilter::new(Some(0), Some(1000), None, None);
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, MAX_PAGE_SIZE);

        let filter = ServiceFilter::new(None, Some(0), None, None);
        assert_eq!(filter.limit, 1);
    }

    #[test]
    fn test_filter_offset() {
        let filter = ServiceFilter::new(Some(3), Some(10), None, None);
        assert_eq!(filter.offset(), 20);
    }

    #[test]
    fn test_blank_filters_are_dropped() {
        let filter = ServiceFilter::new(None, None, Some("  ".into()), Some(" chat ".into()));
        assert_eq!(filter.category, None);
        assert_eq!(filter.search.as_deref(), Some("chat"));
    }
}
