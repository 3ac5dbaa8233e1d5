//! Organization and membership handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::ApiResponse;
use crate::AppState;
use workforce_common::{
    auth::AuthContext,
    errors::Result,
    rbac::{Permission, Role},
    services::organizations::{
        MemberSummary, NewOrganization, OrganizationSummary, OrganizationUpdate,
    },
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    #[serde(default = "default_member_role")]
    pub role: Role,
}

fn default_member_role() -> Role {
    Role::Member
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
    /// Replaces the member's custom grants when present
    #[serde(default)]
    pub permissions: Option<Vec<Permission>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedMember {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

pub async fn list_organizations(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<Vec<OrganizationSummary>>>> {
    let organizations = state.organizations.list_for_user(auth.user_id()).await?;
    Ok(ApiResponse::ok(organizations))
}

pub async fn create_organization(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<NewOrganization>,
) -> Result<(StatusCode, Json<ApiResponse<OrganizationSummary>>)> {
    let organization = state.organizations.create(auth.user_id(), request).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(organization)))
}

pub async fn get_organization(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrganizationSummary>>> {
    let organization = state.organizations.get(auth.user_id(), id).await?;
    Ok(ApiResponse::ok(organization))
}

pub async fn update_organization(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<OrganizationUpdate>,
) -> Result<Json<ApiResponse<OrganizationSummary>>> {
    let organization = state
        .organizations
        .update(auth.user_id(), id, request)
        .await?;
    Ok(ApiResponse::ok(organization))
}

pub async fn toggle_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<ToggleStatusRequest>,
) -> Result<Json<ApiResponse<OrganizationSummary>>> {
    let organization = state
        .organizations
        .set_active(auth.user_id(), id, request.is_active)
        .await?;
    Ok(ApiResponse::ok(organization))
}

pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<MemberSummary>>>> {
    let members = state.organizations.list_members(auth.user_id(), id).await?;
    Ok(ApiResponse::ok(members))
}

pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MemberSummary>>)> {
    let member = state
        .organizations
        .add_member(auth.user_id(), id, &request.email, request.role)
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(member)))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<MemberSummary>>> {
    let member = state
        .organizations
        .update_member_role(auth.user_id(), id, user_id, request.role, request.permissions)
        .await?;
    Ok(ApiResponse::ok(member))
}

pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<RemovedMember>>> {
    state
        .organizations
        .remove_member(auth.user_id(), id, user_id)
        .await?;
    Ok(ApiResponse::ok(RemovedMember {
        user_id,
        organization_id: id,
    }))
}
