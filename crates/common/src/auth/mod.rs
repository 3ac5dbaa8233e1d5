//! Authentication utilities
//!
//! Provides:
//! - Opaque session token generation and digesting
//! - Password hashing
//! - Token extraction from cookies and headers
//! - The `AuthContext` extractor for handlers

use crate::db::models::Session;
use crate::errors::{AppError, Result};
use crate::services::session::SessionService;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// Prefix carried by every session token
pub const TOKEN_PREFIX: &str = "wf_";

/// Generate a new opaque session token
pub fn generate_session_token() -> String {
    let random_bytes: [u8; 32] = rand::random();
    format!("{}{}", TOKEN_PREFIX, hex::encode(random_bytes))
}

/// Digest a token for storage and lookup
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password into an argon2 PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// Extract a bearer token from an Authorization header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Find a cookie by name across all Cookie headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|v| !v.is_empty())
}

/// Session token sent by the client: cookie first, then bearer header
pub fn client_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    cookie_value(headers, cookie_name).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer)
    })
}

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Raw token presented by the client
    pub token: String,

    /// Validated session with its organization resolved
    pub session: Session,
}

impl AuthContext {
    pub fn user_id(&self) -> Uuid {
        self.session.user_id
    }

    pub fn organization_id(&self) -> Option<Uuid> {
        self.session.organization_id
    }
}

/// Axum extractor for AuthContext.
///
/// Revalidates the token forwarded by the session gate (or sent directly by
/// the client) on every request.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    Arc<SessionService>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let sessions = Arc::<SessionService>::from_ref(state);

        let token = sessions
            .token_from_headers(&parts.headers)
            .ok_or(AppError::MissingSessionToken)?;

        let validation = sessions.validate_session(&token).await;
        match validation.session {
            Some(session) if validation.is_valid => Ok(AuthContext { token, session }),
            _ => Err(AppError::InvalidSession),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_generate_session_token() {
        let token = generate_session_token();
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(token.len(), TOKEN_PREFIX.len() + 64);
        assert_ne!(token, generate_session_token());
    }

    #[test]
    fn test_hash_token_is_stable() {
        let token = "wf_test_12345";
        assert_eq!(hash_token(token), hash_token(token));
        assert_ne!(hash_token(token), hash_token("wf_other"));
        assert_eq!(hash_token(token).len(), 64);
    }

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer wf_123"), Some("wf_123"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("wf_123"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sessionToken=abc; lang=en"),
        );
        assert_eq!(cookie_value(&headers, "sessionToken"), Some("abc"));
        assert_eq!(cookie_value(&headers, "refreshToken"), None);
    }

    #[test]
    fn test_cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sessionToken=from-cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(client_token(&headers, "sessionToken"), Some("from-cookie"));

        headers.remove(header::COOKIE);
        assert_eq!(client_token(&headers, "sessionToken"), Some("from-header"));
    }
}
