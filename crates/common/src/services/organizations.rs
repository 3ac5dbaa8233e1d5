//! Organization and membership management

use crate::db::models::{Membership, Organization, Tier, User};
use crate::errors::{AppError, Result};
use crate::rbac::{Permission, Role};
use crate::services::member_access;
use crate::services::session::normalize_email;
use crate::store::DirectoryStore;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Attempts at finding a free slug before giving up
const SLUG_ATTEMPTS: usize = 5;

/// Organization creation input
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub tier: Option<Tier>,
}

/// Partial organization update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationUpdate {
    pub name: Option<String>,
    pub tier: Option<Tier>,
}

/// An organization as seen by one of its members
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub tier: Tier,
    pub is_active: bool,
    pub role: Role,
    pub permissions: Vec<Permission>,
    pub joined_at: DateTime<FixedOffset>,
}

impl OrganizationSummary {
    fn new(organization: &Organization, membership: &Membership) -> Self {
        Self {
            id: organization.id,
            name: organization.name.clone(),
            slug: organization.slug.clone(),
            tier: organization.subscription_tier(),
            is_active: organization.is_active,
            role: membership.member_role(),
            permissions: membership.access().effective().into_iter().collect(),
            joined_at: membership.joined_at,
        }
    }
}

/// A member as listed inside an organization
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Custom grants on top of the role's defaults
    pub grants: Vec<Permission>,
    pub joined_at: DateTime<FixedOffset>,
}

impl MemberSummary {
    fn new(user: &User, membership: &Membership) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: membership.member_role(),
            grants: membership.access().grants.into_iter().collect(),
            joined_at: membership.joined_at,
        }
    }
}

/// Lowercase, dash-separated form of a name
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("org");
    }
    slug
}

pub(crate) fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::MissingField {
            field: "name".to_string(),
        });
    }
    if name.chars().count() > 100 {
        return Err(AppError::Validation {
            message: "name must be at most 100 characters".to_string(),
            field: Some("name".to_string()),
        });
    }
    Ok(name.to_string())
}

fn grant_values(grants: &[Permission]) -> serde_json::Value {
    serde_json::Value::Array(
        grants
            .iter()
            .map(|p| serde_json::Value::String(p.as_str().to_string()))
            .collect(),
    )
}

/// Organization operations
pub struct OrganizationService {
    directory: Arc<dyn DirectoryStore>,
}

impl OrganizationService {
    pub fn new(directory: Arc<dyn DirectoryStore>) -> Self {
        Self { directory }
    }

    /// Create an organization owned by `actor`
    pub async fn create(&self, actor: Uuid, input: NewOrganization) -> Result<OrganizationSummary> {
        let name = validate_name(&input.name)?;
        let mut user = self
            .directory
            .find_user_by_id(actor)
            .await?
            .ok_or_else(|| AppError::not_found("user", actor))?;

        let slug = self.free_slug(&name).await?;
        let now = Utc::now();

        let organization = self
            .directory
            .insert_organization(Organization {
                id: Uuid::new_v4(),
                name,
                slug,
                tier: input.tier.unwrap_or(Tier::Free).into(),
                is_active: true,
                created_at: now.into(),
                updated_at: now.into(),
            })
            .await?;

        let membership = self
            .directory
            .insert_membership(Membership {
                id: Uuid::new_v4(),
                user_id: actor,
                organization_id: organization.id,
                role: Role::Owner.as_str().to_string(),
                permissions: grant_values(&[]),
                is_active: true,
                joined_at: now.into(),
                updated_at: now.into(),
            })
            .await?;

        if user.home_organization_id.is_none() {
            user.home_organization_id = Some(organization.id);
            user.updated_at = now.into();
            self.directory.update_user(user).await?;
        }

        info!(
            organization_id = %organization.id,
            owner = %actor,
            "Organization created"
        );

        Ok(OrganizationSummary::new(&organization, &membership))
    }

    /// Organizations the user is an active member of
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrganizationSummary>> {
        let memberships = self.directory.list_user_memberships(user_id).await?;
        let mut summaries = Vec::with_capacity(memberships.len());

        for membership in &memberships {
            if let Some(org) = self
                .directory
                .find_organization(membership.organization_id)
                .await?
            {
                summaries.push(OrganizationSummary::new(&org, membership));
            }
        }

        Ok(summaries)
    }

    pub async fn get(&self, actor: Uuid, organization_id: Uuid) -> Result<OrganizationSummary> {
        let (org, membership, access) =
            member_access(self.directory.as_ref(), actor, organization_id).await?;
        access.require(Permission::ViewOrganization)?;
        Ok(OrganizationSummary::new(&org, &membership))
    }

    pub async fn update(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        update: OrganizationUpdate,
    ) -> Result<OrganizationSummary> {
        if update.name.is_none() && update.tier.is_none() {
            return Err(AppError::MissingField {
                field: "name or tier".to_string(),
            });
        }

        let (mut org, membership, access) =
            member_access(self.directory.as_ref(), actor, organization_id).await?;
        access.require(Permission::UpdateOrganization)?;

        if let Some(ref name) = update.name {
            org.name = validate_name(name)?;
        }
        if let Some(tier) = update.tier {
            org.tier = tier.into();
        }
        org.updated_at = Utc::now().into();

        let org = self.directory.update_organization(org).await?;
        info!(organization_id = %org.id, actor = %actor, "Organization updated");
        Ok(OrganizationSummary::new(&org, &membership))
    }

    /// Enable or disable an organization
    pub async fn set_active(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        is_active: bool,
    ) -> Result<OrganizationSummary> {
        let (mut org, membership, access) =
            member_access(self.directory.as_ref(), actor, organization_id).await?;
        access.require(Permission::ToggleOrganization)?;

        if org.is_active != is_active {
            org.is_active = is_active;
            org.updated_at = Utc::now().into();
            org = self.directory.update_organization(org).await?;
            info!(
                organization_id = %org.id,
                actor = %actor,
                is_active,
                "Organization status changed"
            );
        }

        Ok(OrganizationSummary::new(&org, &membership))
    }

    pub async fn list_members(
        &self,
        actor: Uuid,
        organization_id: Uuid,
    ) -> Result<Vec<MemberSummary>> {
        let (_, _, access) = member_access(self.directory.as_ref(), actor, organization_id).await?;
        access.require(Permission::ViewMembers)?;

        let memberships = self
            .directory
            .list_organization_members(organization_id)
            .await?;
        let mut members = Vec::with_capacity(memberships.len());
        for membership in &memberships {
            if let Some(user) = self.directory.find_user_by_id(membership.user_id).await? {
                members.push(MemberSummary::new(&user, membership));
            }
        }
        Ok(members)
    }

    /// Add an existing user, reactivating a previous membership if there is one
    pub async fn add_member(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        email: &str,
        role: Role,
    ) -> Result<MemberSummary> {
        let (_, _, access) = member_access(self.directory.as_ref(), actor, organization_id).await?;
        access.can_assign(None, role)?;

        let email = normalize_email(email);
        let user = self
            .directory
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::not_found("user", &email))?;

        let now = Utc::now();
        let membership = match self
            .directory
            .find_membership(user.id, organization_id)
            .await?
        {
            Some(existing) if existing.is_active => {
                return Err(AppError::Conflict {
                    message: format!("{} is already a member", email),
                });
            }
            Some(mut existing) => {
                existing.is_active = true;
                existing.role = role.as_str().to_string();
                existing.permissions = grant_values(&[]);
                existing.joined_at = now.into();
                existing.updated_at = now.into();
                self.directory.update_membership(existing).await?
            }
            None => {
                self.directory
                    .insert_membership(Membership {
                        id: Uuid::new_v4(),
                        user_id: user.id,
                        organization_id,
                        role: role.as_str().to_string(),
                        permissions: grant_values(&[]),
                        is_active: true,
                        joined_at: now.into(),
                        updated_at: now.into(),
                    })
                    .await?
            }
        };

        info!(
            organization_id = %organization_id,
            user_id = %user.id,
            role = %role,
            "Member added"
        );

        Ok(MemberSummary::new(&user, &membership))
    }

    /// Change a member's role and, optionally, their custom grants
    pub async fn update_member_role(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        user_id: Uuid,
        role: Role,
        grants: Option<Vec<Permission>>,
    ) -> Result<MemberSummary> {
        let (_, _, access) = member_access(self.directory.as_ref(), actor, organization_id).await?;
        let mut target = self.active_member(organization_id, user_id).await?;
        let current = target.member_role();

        access.can_assign(Some(current), role)?;
        if current == Role::Owner && role != Role::Owner {
            self.ensure_other_owner(organization_id, user_id).await?;
        }

        if let Some(ref grants) = grants {
            if let Some(missing) = grants.iter().find(|p| !access.has(**p)) {
                return Err(AppError::InsufficientRole {
                    message: format!("cannot grant '{}' without holding it", missing.as_str()),
                });
            }
            target.permissions = grant_values(grants);
        }

        target.role = role.as_str().to_string();
        target.updated_at = Utc::now().into();
        let target = self.directory.update_membership(target).await?;

        let user = self
            .directory
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user", user_id))?;

        info!(
            organization_id = %organization_id,
            user_id = %user_id,
            from = %current,
            to = %role,
            "Member role updated"
        );

        Ok(MemberSummary::new(&user, &target))
    }

    /// Deactivate a membership; members may always remove themselves
    pub async fn remove_member(&self, actor: Uuid, organization_id: Uuid, user_id: Uuid) -> Result<()> {
        let (_, _, access) = member_access(self.directory.as_ref(), actor, organization_id).await?;
        let mut target = self.active_member(organization_id, user_id).await?;
        let role = target.member_role();

        if actor != user_id {
            access.can_assign(Some(role), role)?;
        }
        if role == Role::Owner {
            self.ensure_other_owner(organization_id, user_id).await?;
        }

        target.is_active = false;
        target.updated_at = Utc::now().into();
        self.directory.update_membership(target).await?;

        info!(
            organization_id = %organization_id,
            user_id = %user_id,
            actor = %actor,
            "Member removed"
        );
        Ok(())
    }

    async fn active_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<Membership> {
        match self
            .directory
            .find_membership(user_id, organization_id)
            .await?
        {
            Some(m) if m.is_active => Ok(m),
            _ => Err(AppError::not_found("member", user_id)),
        }
    }

    async fn ensure_other_owner(&self, organization_id: Uuid, leaving: Uuid) -> Result<()> {
        let others = self
            .directory
            .list_organization_members(organization_id)
            .await?
            .into_iter()
            .filter(|m| m.user_id != leaving && m.member_role() == Role::Owner)
            .count();

        if others == 0 {
            return Err(AppError::Forbidden {
                message: "organization must keep at least one owner".to_string(),
            });
        }
        Ok(())
    }

    async fn free_slug(&self, name: &str) -> Result<String> {
        let base = slugify(name);
        if self.directory.find_organization_by_slug(&base).await?.is_none() {
            return Ok(base);
        }

        for _ in 0..SLUG_ATTEMPTS {
            let suffix = &Uuid::new_v4().simple().to_string()[..6];
            let candidate = format!("{}-{}", base, suffix);
            if self
                .directory
                .find_organization_by_slug(&candidate)
                .await?
                .is_none()
            {
                return Ok(candidate);
            }
        }

        Err(AppError::Conflict {
            message: format!("could not allocate a slug for '{}'", name),
        })
    }
}
