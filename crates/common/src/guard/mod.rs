//! Organization guard for dashboard pages
//!
//! A pure decision over the current pathname and session state; callers
//! perform the redirect.

use crate::config::GuardConfig;
use serde::Serialize;
use uuid::Uuid;

/// What the client knows about its session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Validation still in flight
    Loading,
    Anonymous,
    Active { organization_id: Option<Uuid> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "location", rename_all = "snake_case")]
pub enum GuardDecision {
    Render,
    Redirect(String),
    Pending,
}

pub fn decide(pathname: &str, session: &SessionState, config: &GuardConfig) -> GuardDecision {
    let organization_id = match session {
        SessionState::Loading => return GuardDecision::Pending,
        SessionState::Anonymous => return GuardDecision::Redirect(config.login_path.clone()),
        SessionState::Active { organization_id } => organization_id,
    };

    if config
        .exclusions
        .iter()
        .any(|prefix| pathname.starts_with(prefix.as_str()))
    {
        return GuardDecision::Render;
    }

    match organization_id {
        Some(_) => GuardDecision::Render,
        None => GuardDecision::Redirect(config.org_setup_path.clone()),
    }
}
