//! Workforce API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Session enforcement for protected routes
//! - Rate limiting
//! - Request routing to the account, organization and catalog services
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    extract::FromRef,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use workforce_common::{
    config::{AppConfig, StorageBackend},
    db::DbPool,
    metrics,
    routing::RouteTable,
    services::{AccountService, CatalogService, OrganizationService, SessionService},
    store::{CatalogStore, DirectoryStore, MemoryStore, SessionStore},
    Repository,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub directory: Arc<dyn DirectoryStore>,
    pub sessions: Arc<SessionService>,
    pub accounts: Arc<AccountService>,
    pub organizations: Arc<OrganizationService>,
    pub catalog: Arc<CatalogService>,
    pub routes: Arc<RouteTable>,
}

impl AppState {
    /// Wire every service to the chosen stores
    pub fn new(
        config: Arc<AppConfig>,
        session_store: Arc<dyn SessionStore>,
        directory: Arc<dyn DirectoryStore>,
        catalog_store: Arc<dyn CatalogStore>,
    ) -> Self {
        let sessions = Arc::new(SessionService::new(
            session_store,
            directory.clone(),
            config.auth.clone(),
        ));
        let organizations = Arc::new(OrganizationService::new(directory.clone()));
        let accounts = Arc::new(AccountService::new(
            directory.clone(),
            organizations.clone(),
            sessions.clone(),
        ));
        let catalog = Arc::new(CatalogService::new(catalog_store, directory.clone()));
        let routes = Arc::new(RouteTable::from_config(&config.routes));

        Self {
            config,
            directory,
            sessions,
            accounts,
            organizations,
            catalog,
            routes,
        }
    }

    /// State backed entirely by one in-memory store
    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store.clone(), store)
    }
}

impl FromRef<AppState> for Arc<SessionService> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(
        service = %config.observability.service_name,
        "Starting Workforce API Gateway v{}",
        workforce_common::VERSION
    );

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                metrics::LATENCY_BUCKETS,
            )?
            .install()?;
        info!(%metrics_addr, "Prometheus exporter listening");
    }
    metrics::register_metrics();

    let config = Arc::new(config);

    // Initialize storage
    let state = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = DbPool::new(&config.database).await?;
            let repo = Arc::new(Repository::new(pool));
            AppState::new(config.clone(), repo.clone(), repo.clone(), repo)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; all data is lost on shutdown");
            AppState::in_memory(config.clone())
        }
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Health endpoints (public)
        .route("/health", get(handlers::health::health))
        .route("/status", get(handlers::health::status))

        // Auth endpoints
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/switch-organization", post(handlers::auth::switch_organization))
        .route("/auth/guard", get(handlers::auth::guard))

        // User endpoints
        .route(
            "/user/profile",
            get(handlers::users::get_profile)
                .patch(handlers::users::update_profile)
                .delete(handlers::users::close_account),
        )

        // Organization endpoints
        .route(
            "/organization",
            get(handlers::organizations::list_organizations)
                .post(handlers::organizations::create_organization),
        )
        .route(
            "/organization/{id}",
            get(handlers::organizations::get_organization)
                .patch(handlers::organizations::update_organization),
        )
        .route(
            "/organization/{id}/toggle-status",
            post(handlers::organizations::toggle_status),
        )
        .route(
            "/organization/{id}/members",
            get(handlers::organizations::list_members).post(handlers::organizations::add_member),
        )
        .route(
            "/organization/{id}/members/{user_id}/role",
            put(handlers::organizations::update_member_role),
        )
        .route(
            "/organization/{id}/members/{user_id}",
            delete(handlers::organizations::remove_member),
        )
        .route(
            "/organization/{id}/agents",
            get(handlers::catalog::list_agents).post(handlers::catalog::create_agent),
        )
        .route(
            "/organization/{id}/agents/{agent_id}",
            patch(handlers::catalog::update_agent),
        )

        // Catalog endpoints
        .route("/services", get(handlers::catalog::list_services))
        .route("/services/{id}", get(handlers::catalog::get_service));

    let mut app = Router::new()
        .nest("/api", api_routes)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_gate::session_gate,
        ));

    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        app = app.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit,
        ));
    }

    app.layer(from_fn(middleware::metrics::track_metrics))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests;
