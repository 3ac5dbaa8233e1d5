//! Workforce Common Library
//!
//! Shared code for the Workforce gateway including:
//! - Session issuance, validation and organization switching
//! - Role-based access control
//! - Organization, account and catalog services
//! - Route classification and the organization guard
//! - Storage traits with SeaORM and in-memory backends
//! - Error types, configuration and metrics

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod guard;
pub mod metrics;
pub mod rbac;
pub mod routing;
pub mod services;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use store::MemoryStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
