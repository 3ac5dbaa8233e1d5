//! User profile handlers

use axum::{
    extract::State,
    http::header,
    response::AppendHeaders,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::handlers::{auth::clear_cookies, ApiResponse};
use crate::AppState;
use workforce_common::{auth::AuthContext, errors::Result, services::accounts::UserProfile};

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AccountClosed {
    pub message: String,
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let profile = state.accounts.profile(auth.user_id()).await?;
    Ok(ApiResponse::ok(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let profile = state
        .accounts
        .update_profile(auth.user_id(), &request.name)
        .await?;
    Ok(ApiResponse::ok(profile))
}

/// Close the caller's account; every session it holds ends
pub async fn close_account(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<(
    AppendHeaders<[(header::HeaderName, String); 2]>,
    Json<ApiResponse<AccountClosed>>,
)> {
    state.accounts.deactivate(auth.user_id()).await?;
    Ok((
        clear_cookies(state.sessions.config()),
        ApiResponse::ok(AccountClosed {
            message: "Account closed".to_string(),
        }),
    ))
}
