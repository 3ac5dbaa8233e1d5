//! Route classification for the session gate
//!
//! Paths are matched by literal prefix against the configured lists. The
//! public list is checked first, so a path matching both lists is public.

use crate::config::RoutesConfig;
use serde::Serialize;

/// How a request path is treated by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    Public,
    Protected,
    Unclassified,
}

/// Static public and protected prefix lists
#[derive(Debug, Clone)]
pub struct RouteTable {
    public: Vec<String>,
    protected: Vec<String>,
}

impl RouteTable {
    pub fn new(public: Vec<String>, protected: Vec<String>) -> Self {
        Self { public, protected }
    }

    pub fn from_config(config: &RoutesConfig) -> Self {
        Self::new(config.public.clone(), config.protected.clone())
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        if self.public.iter().any(|p| path.starts_with(p.as_str())) {
            RouteClass::Public
        } else if self.protected.iter().any(|p| path.starts_with(p.as_str())) {
            RouteClass::Protected
        } else {
            RouteClass::Unclassified
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::from_config(&RoutesConfig::default())
    }
}
