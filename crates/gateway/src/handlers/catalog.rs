//! Service catalog and agent handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::ApiResponse;
use crate::AppState;
use workforce_common::{
    auth::AuthContext,
    db::models::{Agent, AgentStatus, Service},
    errors::Result,
    services::catalog::{NewAgent, Page},
    store::ServiceFilter,
};

/// Catalog listing query parameters
#[derive(Debug, Deserialize)]
pub struct ListServicesQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAgentRequest {
    pub status: AgentStatus,
}

pub async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ListServicesQuery>,
) -> Result<Json<ApiResponse<Page<Service>>>> {
    let filter = ServiceFilter::new(query.page, query.limit, query.category, query.search);
    let page = state.catalog.list_services(&filter).await?;
    Ok(ApiResponse::ok(page))
}

pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Service>>> {
    let service = state.catalog.get_service(id).await?;
    Ok(ApiResponse::ok(service))
}

pub async fn list_agents(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Agent>>>> {
    let agents = state.catalog.list_agents(auth.user_id(), id).await?;
    Ok(ApiResponse::ok(agents))
}

pub async fn create_agent(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<NewAgent>,
) -> Result<(StatusCode, Json<ApiResponse<Agent>>)> {
    let agent = state.catalog.create_agent(auth.user_id(), id, request).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(agent)))
}

pub async fn update_agent(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, agent_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateAgentRequest>,
) -> Result<Json<ApiResponse<Agent>>> {
    let agent = state
        .catalog
        .set_agent_status(auth.user_id(), id, agent_id, request.status)
        .await?;
    Ok(ApiResponse::ok(agent))
}
