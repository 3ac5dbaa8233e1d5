//! Repository pattern for database operations
//!
//! Implements the storage traits on top of SeaORM with proper error
//! handling. Every write goes through a single statement.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::store::{CatalogStore, DirectoryStore, ServiceFilter, SessionStore};
use async_trait::async_trait;
use sea_orm::sea_query::{extension::postgres::PgExpr, Expr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.connection()
    }
}

/// Map unique-constraint violations to conflicts, everything else passes through
fn on_insert(err: DbErr, what: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict {
            message: format!("{} already exists", what),
        },
        _ => AppError::Database(err),
    }
}

/// Escape LIKE wildcards so user text matches literally; `\` is Postgres' default escape
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Mark every column as set so inserts and updates write the whole row
fn fully_set<A: ActiveModelTrait>(active: A) -> A {
    active.reset_all()
}

// ========================================================================
// Session Operations
// ========================================================================

#[async_trait]
impl SessionStore for Repository {
    async fn insert_session(&self, session: Session) -> Result<Session> {
        fully_set(session.into_active_model())
            .insert(self.conn())
            .await
            .map_err(|e| on_insert(e, "session"))
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>> {
        SessionEntity::find_by_id(token_hash.to_string())
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn set_session_organization(
        &self,
        token_hash: &str,
        organization_id: Uuid,
    ) -> Result<Option<Session>> {
        // UPDATE ... WHERE token_hash = $1 AND expires_at > now() RETURNING *
        let now = chrono::Utc::now();
        let mut updated = SessionEntity::update_many()
            .col_expr(SessionColumn::OrganizationId, Expr::value(organization_id))
            .filter(SessionColumn::TokenHash.eq(token_hash))
            .filter(SessionColumn::ExpiresAt.gt(now))
            .exec_with_returning(self.conn())
            .await?;

        Ok(updated.pop())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let result = SessionEntity::delete_by_id(token_hash.to_string())
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn delete_user_sessions(&self, user_id: Uuid) -> Result<u64> {
        let result = SessionEntity::delete_many()
            .filter(SessionColumn::UserId.eq(user_id))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected)
    }
}

// ========================================================================
// Directory Operations
// ========================================================================

#[async_trait]
impl DirectoryStore for Repository {
    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    async fn insert_user(&self, user: User) -> Result<User> {
        fully_set(user.into_active_model())
            .insert(self.conn())
            .await
            .map_err(|e| on_insert(e, "user"))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn update_user(&self, user: User) -> Result<User> {
        fully_set(user.into_active_model())
            .update(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let result = UserEntity::delete_by_id(id).exec(self.conn()).await?;
        Ok(result.rows_affected > 0)
    }

    async fn insert_organization(&self, organization: Organization) -> Result<Organization> {
        fully_set(organization.into_active_model())
            .insert(self.conn())
            .await
            .map_err(|e| on_insert(e, "organization"))
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>> {
        OrganizationEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        OrganizationEntity::find()
            .filter(OrganizationColumn::Slug.eq(slug))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn update_organization(&self, organization: Organization) -> Result<Organization> {
        fully_set(organization.into_active_model())
            .update(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn insert_membership(&self, membership: Membership) -> Result<Membership> {
        fully_set(membership.into_active_model())
            .insert(self.conn())
            .await
            .map_err(|e| on_insert(e, "membership"))
    }

    async fn update_membership(&self, membership: Membership) -> Result<Membership> {
        fully_set(membership.into_active_model())
            .update(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Membership>> {
        MembershipEntity::find()
            .filter(MembershipColumn::UserId.eq(user_id))
            .filter(MembershipColumn::OrganizationId.eq(organization_id))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn list_user_memberships(&self, user_id: Uuid) -> Result<Vec<Membership>> {
        MembershipEntity::find()
            .filter(MembershipColumn::UserId.eq(user_id))
            .filter(MembershipColumn::IsActive.eq(true))
            .order_by_asc(MembershipColumn::JoinedAt)
            .order_by_asc(MembershipColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn list_organization_members(&self, organization_id: Uuid) -> Result<Vec<Membership>> {
        MembershipEntity::find()
            .filter(MembershipColumn::OrganizationId.eq(organization_id))
            .filter(MembershipColumn::IsActive.eq(true))
            .order_by_asc(MembershipColumn::JoinedAt)
            .order_by_asc(MembershipColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }
}

// ========================================================================
// Catalog Operations
// ========================================================================

#[async_trait]
impl CatalogStore for Repository {
    async fn list_services(&self, filter: &ServiceFilter) -> Result<(Vec<Service>, u64)> {
        let mut query = ServiceEntity::find().filter(ServiceColumn::IsActive.eq(true));

        if let Some(ref category) = filter.category {
            query = query.filter(ServiceColumn::Category.eq(category.as_str()));
        }

        if let Some(ref search) = filter.search {
            let pattern = format!("%{}%", escape_like(search));
            query = query.filter(
                Condition::any()
                    .add(Expr::col(ServiceColumn::Name).ilike(pattern.clone()))
                    .add(Expr::col(ServiceColumn::Description).ilike(pattern)),
            );
        }

        let query = query
            .order_by_asc(ServiceColumn::Name)
            .order_by_asc(ServiceColumn::Id);

        let total = query.clone().count(self.conn()).await?;
        let services = query
            .offset(filter.offset())
            .limit(filter.limit)
            .all(self.conn())
            .await?;

        Ok((services, total))
    }

    async fn find_service(&self, id: Uuid) -> Result<Option<Service>> {
        ServiceEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn list_agents(&self, organization_id: Uuid) -> Result<Vec<Agent>> {
        AgentEntity::find()
            .filter(AgentColumn::OrganizationId.eq(organization_id))
            .order_by_asc(AgentColumn::CreatedAt)
            .order_by_asc(AgentColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_agent(&self, id: Uuid) -> Result<Option<Agent>> {
        AgentEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn insert_agent(&self, agent: Agent) -> Result<Agent> {
        fully_set(agent.into_active_model())
            .insert(self.conn())
            .await
            .map_err(|e| on_insert(e, "agent"))
    }

    async fn update_agent(&self, agent: Agent) -> Result<Agent> {
        fully_set(agent.into_active_model())
            .update(self.conn())
            .await
            .map_err(Into::into)
    }
}
