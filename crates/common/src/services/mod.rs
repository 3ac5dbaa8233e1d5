//! Service layer
//!
//! Each service is constructed once at startup and shared behind an `Arc`;
//! storage comes in through the traits in [`crate::store`].

pub mod accounts;
pub mod catalog;
pub mod organizations;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use accounts::AccountService;
pub use catalog::CatalogService;
pub use organizations::OrganizationService;
pub use session::SessionService;

use crate::db::models::{Membership, Organization};
use crate::errors::{AppError, Result};
use crate::rbac::Access;
use crate::store::DirectoryStore;
use uuid::Uuid;

/// Resolve what `actor` may do inside `organization_id`.
///
/// Unknown organizations are 404; organizations the actor has no active
/// relation to are 403.
pub(crate) async fn member_access(
    directory: &dyn DirectoryStore,
    actor: Uuid,
    organization_id: Uuid,
) -> Result<(Organization, Membership, Access)> {
    let organization = directory
        .find_organization(organization_id)
        .await?
        .ok_or_else(|| AppError::not_found("organization", organization_id))?;

    match directory.find_membership(actor, organization_id).await? {
        Some(membership) if membership.is_active => {
            let access = membership.access();
            Ok((organization, membership, access))
        }
        _ => Err(AppError::NotMember {
            organization_id: organization_id.to_string(),
        }),
    }
}
