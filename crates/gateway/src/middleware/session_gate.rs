//! Protected-route middleware
//!
//! Protected paths must carry a session token (cookie first, then bearer).
//! The token is forwarded to handlers in the configured header, where the
//! `AuthContext` extractor revalidates it. Public and unclassified paths pass
//! through untouched.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;
use workforce_common::{
    auth::client_token,
    errors::AppError,
    metrics,
    routing::RouteClass,
};

use crate::AppState;

pub async fn session_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if state.routes.classify(request.uri().path()) != RouteClass::Protected {
        return next.run(request).await;
    }

    let auth = &state.config.auth;
    let token = match client_token(request.headers(), &auth.session_cookie) {
        Some(token) => token.to_string(),
        None => {
            metrics::record_gate_rejection();
            debug!(path = %request.uri().path(), "Protected route requested without a token");
            return AppError::MissingSessionToken.into_response();
        }
    };

    let name = match HeaderName::from_bytes(auth.forward_header.as_bytes()) {
        Ok(name) => name,
        Err(_) => {
            return AppError::Configuration {
                message: format!("invalid forward header '{}'", auth.forward_header),
            }
            .into_response()
        }
    };
    let value = match HeaderValue::from_str(&token) {
        Ok(value) => value,
        Err(_) => return AppError::InvalidSession.into_response(),
    };

    request.headers_mut().insert(name, value);
    next.run(request).await
}
