//! Router tests against the in-memory backend

use super::*;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
};
use async_trait::async_trait;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use workforce_common::{db::models::Session, AppError};

/// Session store that can read and write but never delete
struct UndeletableSessions(Arc<MemoryStore>);

#[async_trait]
impl SessionStore for UndeletableSessions {
    async fn insert_session(&self, session: Session) -> workforce_common::Result<Session> {
        self.0.insert_session(session).await
    }

    async fn find_session(&self, token_hash: &str) -> workforce_common::Result<Option<Session>> {
        self.0.find_session(token_hash).await
    }

    async fn set_session_organization(
        &self,
        token_hash: &str,
        organization_id: Uuid,
    ) -> workforce_common::Result<Option<Session>> {
        self.0.set_session_organization(token_hash, organization_id).await
    }

    async fn delete_session(&self, _token_hash: &str) -> workforce_common::Result<bool> {
        Err(AppError::Internal {
            message: "session table unavailable".to_string(),
        })
    }

    async fn delete_user_sessions(&self, _user_id: Uuid) -> workforce_common::Result<u64> {
        Err(AppError::Internal {
            message: "session table unavailable".to_string(),
        })
    }
}

fn test_state() -> AppState {
    let mut config = AppConfig::default();
    config.rate_limit.enabled = false;
    config.storage.backend = StorageBackend::Memory;
    AppState::in_memory(Arc::new(config))
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

async fn register_and_login(app: &Router, email: &str, organization: Option<&str>) -> String {
    let (status, _, _) = send(
        app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": "password123",
                "name": "Test User",
                "organizationName": organization,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send(
        app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "password123" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = create_router(test_state());
    let (status, _, body) = send(&app, request("GET", "/api/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_status_reports_ready() {
    let app = create_router(test_state());
    let (status, _, body) = send(&app, request("GET", "/api/status", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ready");
    assert_eq!(body["data"]["storage"], "memory");
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = create_router(test_state());
    let (status, _, body) = send(&app, request("GET", "/api/user/profile", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "MISSING_SESSION_TOKEN");
}

#[tokio::test]
async fn test_unknown_token_is_rejected_downstream() {
    let app = create_router(test_state());
    let (status, _, body) = send(
        &app,
        request("GET", "/api/user/profile", Some("wf_not_a_session"), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_SESSION");
}

#[tokio::test]
async fn test_gate_forwards_cookie_token() {
    let state = test_state();
    let app = Router::new()
        .route(
            "/api/user/echo",
            get(|headers: HeaderMap| async move {
                headers
                    .get("x-session-token")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            }),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_gate::session_gate,
        ))
        .with_state(state);

    let request = Request::builder()
        .uri("/api/user/echo")
        .header(header::COOKIE, "theme=dark; sessionToken=wf_from_cookie")
        .header(header::AUTHORIZATION, "Bearer wf_from_bearer")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    assert_eq!(&bytes[..], b"wf_from_cookie");
}

#[tokio::test]
async fn test_catalog_is_unclassified() {
    let app = create_router(test_state());
    let (status, _, body) = send(&app, request("GET", "/api/services?limit=500", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);
    assert_eq!(body["data"]["limit"], 100);
}

#[tokio::test]
async fn test_login_sets_cookie() {
    let app = create_router(test_state());
    send(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "ada@example.com", "password": "password123", "name": "Ada" })),
        ),
    )
    .await;

    let (status, headers, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "password123" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap();
    assert!(token.starts_with("wf_"));

    let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with(&format!("sessionToken={}", token)));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
}

#[tokio::test]
async fn test_bad_credentials() {
    let app = create_router(test_state());
    let (status, _, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "password123" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = create_router(test_state());
    let token = register_and_login(&app, "ada@example.com", Some("Engines")).await;

    let (status, _, me) = send(&app, request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let home = me["data"]["currentOrganization"]["id"].as_str().unwrap().to_string();
    assert_eq!(me["data"]["session"]["organizationId"], home.as_str());
    assert_eq!(me["data"]["currentOrganization"]["role"], "owner");

    let (status, _, created) = send(
        &app,
        request("POST", "/api/organization", Some(&token), Some(json!({ "name": "Looms" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let second = created["data"]["id"].as_str().unwrap().to_string();

    let (status, _, switched) = send(
        &app,
        request(
            "POST",
            "/api/auth/switch-organization",
            Some(&token),
            Some(json!({ "organizationId": second })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(switched["data"]["organizationId"], second.as_str());

    let (_, _, me) = send(&app, request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(me["data"]["currentOrganization"]["id"], second.as_str());
    assert_eq!(me["data"]["organizations"].as_array().unwrap().len(), 2);

    let (status, headers, body) =
        send(&app, request("POST", "/api/auth/logout", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let cleared: Vec<_> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().any(|c| c.starts_with("sessionToken=;")));
    assert!(cleared.iter().any(|c| c.starts_with("refreshToken=;")));

    let (status, _, body) = send(&app, request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_SESSION");

    // Logging out twice still succeeds
    let (status, _, _) = send(&app, request("POST", "/api/auth/logout", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_switch_to_foreign_organization_is_forbidden() {
    let app = create_router(test_state());
    let ada = register_and_login(&app, "ada@example.com", Some("Engines")).await;
    let grace = register_and_login(&app, "grace@example.com", Some("Compilers")).await;

    let (_, _, me) = send(&app, request("GET", "/api/auth/me", Some(&grace), None)).await;
    let foreign = me["data"]["currentOrganization"]["id"].as_str().unwrap().to_string();

    let (status, _, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/switch-organization",
            Some(&ada),
            Some(json!({ "organizationId": foreign })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NOT_MEMBER");

    let (status, _, _) = send(
        &app,
        request("GET", &format!("/api/organization/{}", foreign), Some(&ada), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_member_management_over_http() {
    let app = create_router(test_state());
    let owner = register_and_login(&app, "owner@example.com", Some("Engines")).await;
    let bob = register_and_login(&app, "bob@example.com", None).await;

    let (_, _, me) = send(&app, request("GET", "/api/auth/me", Some(&owner), None)).await;
    let org = me["data"]["currentOrganization"]["id"].as_str().unwrap().to_string();

    let (status, _, added) = send(
        &app,
        request(
            "POST",
            &format!("/api/organization/{}/members", org),
            Some(&owner),
            Some(json!({ "email": "bob@example.com", "role": "viewer" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let bob_id = added["data"]["userId"].as_str().unwrap().to_string();

    // A viewer cannot rename the organization
    let (status, _, body) = send(
        &app,
        request(
            "PATCH",
            &format!("/api/organization/{}", org),
            Some(&bob),
            Some(json!({ "name": "Hijacked" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INSUFFICIENT_ROLE");

    let (status, _, updated) = send(
        &app,
        request(
            "PUT",
            &format!("/api/organization/{}/members/{}/role", org, bob_id),
            Some(&owner),
            Some(json!({ "role": "admin" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["role"], "admin");

    let (status, _, members) = send(
        &app,
        request("GET", &format!("/api/organization/{}/members", org), Some(&bob), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members["data"].as_array().unwrap().len(), 2);

    let (status, _, _) = send(
        &app,
        request(
            "DELETE",
            &format!("/api/organization/{}/members/{}", org, bob_id),
            Some(&owner),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(
        &app,
        request("GET", &format!("/api/organization/{}", org), Some(&bob), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_guard_endpoint() {
    let app = create_router(test_state());

    let (status, _, body) = send(
        &app,
        request("GET", "/api/auth/guard?pathname=/dashboard", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], "redirect");
    assert_eq!(body["data"]["location"], "/login");

    let token = register_and_login(&app, "ada@example.com", None).await;
    let (_, _, body) = send(
        &app,
        request("GET", "/api/auth/guard?pathname=/dashboard", Some(&token), None),
    )
    .await;
    assert_eq!(body["data"]["location"], "/dashboard/error/none-org");

    let (_, _, body) = send(
        &app,
        request(
            "GET",
            "/api/auth/guard?pathname=/dashboard/error/none-org",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(body["data"]["action"], "render");
}

#[tokio::test]
async fn test_rate_limit_rejects_excess_requests() {
    let mut config = AppConfig::default();
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst = 1;
    let app = create_router(AppState::in_memory(Arc::new(config)));

    let (status, _, _) = send(&app, request("GET", "/api/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(&app, request("GET", "/api/health", None, None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMITED");
}

fn cleared_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_logout_succeeds_when_revocation_fails() {
    let mut config = AppConfig::default();
    config.rate_limit.enabled = false;
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        Arc::new(config),
        Arc::new(UndeletableSessions(store.clone())),
        store.clone(),
        store,
    );
    let app = create_router(state);
    let token = register_and_login(&app, "ada@example.com", None).await;

    let (status, headers, body) =
        send(&app, request("POST", "/api/auth/logout", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let cleared = cleared_cookies(&headers);
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().any(|c| c.starts_with("sessionToken=;") && c.contains("Max-Age=0")));
    assert!(cleared.iter().any(|c| c.starts_with("refreshToken=;") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_close_account_ends_every_session() {
    let app = create_router(test_state());
    let first = register_and_login(&app, "ada@example.com", Some("Engines")).await;
    let (_, _, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "password123" })),
        ),
    )
    .await;
    let second = body["data"]["token"].as_str().unwrap().to_string();

    let (status, headers, body) =
        send(&app, request("DELETE", "/api/user/profile", Some(&first), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(cleared_cookies(&headers).len(), 2);

    for token in [&first, &second] {
        let (status, _, body) = send(&app, request("GET", "/api/auth/me", Some(token), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_SESSION");
    }

    let (status, _, body) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "password123" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCOUNT_DISABLED");
}
