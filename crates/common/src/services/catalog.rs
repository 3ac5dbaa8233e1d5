//! Service catalog and per-organization agents

use crate::db::models::{Agent, AgentStatus, Service};
use crate::errors::{AppError, Result};
use crate::rbac::Permission;
use crate::services::member_access;
use crate::store::{CatalogStore, DirectoryStore, ServiceFilter};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// One page of results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, filter: &ServiceFilter) -> Self {
        Self {
            items,
            total,
            page: filter.page,
            limit: filter.limit,
            total_pages: total.div_ceil(filter.limit.max(1)),
        }
    }
}

/// Agent creation input
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAgent {
    pub service_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Catalog operations
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    directory: Arc<dyn DirectoryStore>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>, directory: Arc<dyn DirectoryStore>) -> Self {
        Self { catalog, directory }
    }

    pub async fn list_services(&self, filter: &ServiceFilter) -> Result<Page<Service>> {
        let (items, total) = self.catalog.list_services(filter).await?;
        Ok(Page::new(items, total, filter))
    }

    pub async fn get_service(&self, id: Uuid) -> Result<Service> {
        match self.catalog.find_service(id).await? {
            Some(service) if service.is_active => Ok(service),
            _ => Err(AppError::not_found("service", id)),
        }
    }

    pub async fn list_agents(&self, actor: Uuid, organization_id: Uuid) -> Result<Vec<Agent>> {
        let (_, _, access) = member_access(self.directory.as_ref(), actor, organization_id).await?;
        access.require(Permission::ViewAgents)?;
        self.catalog.list_agents(organization_id).await
    }

    /// Configure a new agent; the organization's tier must cover the service
    pub async fn create_agent(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        input: NewAgent,
    ) -> Result<Agent> {
        let (org, _, access) = member_access(self.directory.as_ref(), actor, organization_id).await?;
        access.require(Permission::ManageAgents)?;

        if !org.is_active {
            return Err(AppError::Forbidden {
                message: "organization is disabled".to_string(),
            });
        }

        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::MissingField {
                field: "name".to_string(),
            });
        }

        let service = self.get_service(input.service_id).await?;
        let required = service.minimum_tier();
        if org.subscription_tier() < required {
            return Err(AppError::TierRequired {
                required: required.as_str().to_string(),
            });
        }

        let now = Utc::now();
        let agent = self
            .catalog
            .insert_agent(Agent {
                id: Uuid::new_v4(),
                organization_id,
                service_id: service.id,
                name: name.to_string(),
                config: input.config,
                status: AgentStatus::Active.into(),
                created_by: actor,
                created_at: now.into(),
                updated_at: now.into(),
            })
            .await?;

        info!(
            agent_id = %agent.id,
            organization_id = %organization_id,
            service = %service.slug,
            "Agent created"
        );
        Ok(agent)
    }

    pub async fn set_agent_status(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        agent_id: Uuid,
        status: AgentStatus,
    ) -> Result<Agent> {
        let (_, _, access) = member_access(self.directory.as_ref(), actor, organization_id).await?;
        access.require(Permission::ManageAgents)?;

        let mut agent = match self.catalog.find_agent(agent_id).await? {
            Some(agent) if agent.organization_id == organization_id => agent,
            _ => return Err(AppError::not_found("agent", agent_id)),
        };

        if agent.agent_status() != status {
            agent.status = status.into();
            agent.updated_at = Utc::now().into();
            agent = self.catalog.update_agent(agent).await?;
            info!(agent_id = %agent.id, status = %agent.status, "Agent status changed");
        }
        Ok(agent)
    }
}
