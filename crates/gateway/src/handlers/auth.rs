//! Authentication handlers: register, login, me, logout, organization switch

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::AppendHeaders,
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::ApiResponse;
use crate::AppState;
use workforce_common::{
    auth::AuthContext,
    config::AuthConfig,
    db::models::{Session, SessionKind},
    errors::Result,
    guard::{decide, GuardDecision, SessionState},
    services::{
        accounts::{Registration, UserProfile},
        organizations::OrganizationSummary,
        session::Credentials,
    },
};

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Defaults to a browser session
    #[serde(default)]
    pub kind: Option<SessionKind>,
}

/// Session as returned to clients; the token digest is never exposed
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub kind: SessionKind,
    pub created_at: DateTime<FixedOffset>,
    pub expires_at: DateTime<FixedOffset>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            organization_id: session.organization_id,
            kind: session.session_kind(),
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserProfile,
    pub session: SessionView,
    pub current_organization: Option<OrganizationSummary>,
    pub organizations: Vec<OrganizationSummary>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchOrganizationRequest {
    pub organization_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct GuardQuery {
    pub pathname: String,
}

fn cookie_attributes(config: &AuthConfig, max_age: i64) -> String {
    let secure = if config.secure_cookies { "; Secure" } else { "" };
    format!("HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}", max_age, secure)
}

fn session_cookie(config: &AuthConfig, token: &str, max_age: i64) -> String {
    format!(
        "{}={}; {}",
        config.session_cookie,
        token,
        cookie_attributes(config, max_age)
    )
}

fn cleared_cookie(config: &AuthConfig, name: &str) -> String {
    format!("{}=; {}", name, cookie_attributes(config, 0))
}

/// Expire both the session and refresh cookies
pub(crate) fn clear_cookies(config: &AuthConfig) -> AppendHeaders<[(header::HeaderName, String); 2]> {
    AppendHeaders([
        (
            header::SET_COOKIE,
            cleared_cookie(config, &config.session_cookie),
        ),
        (
            header::SET_COOKIE,
            cleared_cookie(config, &config.refresh_cookie),
        ),
    ])
}

/// Create an account
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<Registration>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>)> {
    let profile = state.accounts.register(request).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(profile)))
}

/// Exchange credentials for a session token and cookie
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(
    AppendHeaders<[(header::HeaderName, String); 1]>,
    Json<ApiResponse<LoginResponse>>,
)> {
    let kind = request.kind.unwrap_or(SessionKind::Web);
    let credentials = Credentials {
        email: request.email,
        password: request.password,
    };

    let issued = state.sessions.create_session(&credentials, kind).await?;
    let max_age = state.sessions.ttl(kind).num_seconds();
    let cookie = session_cookie(state.sessions.config(), &issued.token, max_age);

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        ApiResponse::ok(LoginResponse {
            session: SessionView::from(&issued.session),
            token: issued.token,
        }),
    ))
}

/// Current user, session and organizations
pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<MeResponse>>> {
    let user = state.accounts.profile(auth.user_id()).await?;
    let organizations = state.organizations.list_for_user(auth.user_id()).await?;
    let current_organization = auth
        .organization_id()
        .and_then(|id| organizations.iter().find(|o| o.id == id).cloned());

    Ok(ApiResponse::ok(MeResponse {
        user,
        session: SessionView::from(&auth.session),
        current_organization,
        organizations,
    }))
}

/// End the session; always succeeds and always clears both cookies
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (
    AppendHeaders<[(header::HeaderName, String); 2]>,
    Json<ApiResponse<LogoutResponse>>,
) {
    if let Some(token) = state.sessions.token_from_headers(&headers) {
        if let Err(e) = state.sessions.revoke_session(&token).await {
            tracing::warn!(error = %e, "Session revocation failed during logout");
        }
    }

    (
        clear_cookies(state.sessions.config()),
        ApiResponse::ok(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// Move the session to another organization
pub async fn switch_organization(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<SwitchOrganizationRequest>,
) -> Result<Json<ApiResponse<SessionView>>> {
    let session = state
        .sessions
        .switch_organization(&auth.token, request.organization_id)
        .await?;
    Ok(ApiResponse::ok(SessionView::from(&session)))
}

/// Where a dashboard page should go for the caller's session
pub async fn guard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GuardQuery>,
) -> Json<ApiResponse<GuardDecision>> {
    let session_state = match state.sessions.token_from_headers(&headers) {
        Some(token) => {
            let validation = state.sessions.validate_session(&token).await;
            match validation.session {
                Some(session) if validation.is_valid => SessionState::Active {
                    organization_id: session.organization_id,
                },
                _ => SessionState::Anonymous,
            }
        }
        None => SessionState::Anonymous,
    };

    ApiResponse::ok(decide(&query.pathname, &session_state, &state.config.guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let config = AuthConfig::default();
        let cookie = session_cookie(&config, "wf_abc", 60);
        assert_eq!(
            cookie,
            "sessionToken=wf_abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=60"
        );
    }

    #[test]
    fn test_cleared_cookie_is_secure_when_configured() {
        let config = AuthConfig {
            secure_cookies: true,
            ..AuthConfig::default()
        };
        let cookie = cleared_cookie(&config, "refreshToken");
        assert!(cookie.starts_with("refreshToken=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.ends_with("; Secure"));
    }
}
