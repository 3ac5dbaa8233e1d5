//! Organization roles and permissions
//!
//! Roles form a strict order `viewer < member < admin < owner`. Each role's
//! permission set contains every permission of the roles below it; a
//! membership can additionally carry custom grants.

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Role a user holds inside an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Member,
    Admin,
    Owner,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Viewer, Role::Member, Role::Admin, Role::Owner];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Permissions granted by this role alone
    pub fn permissions(&self) -> BTreeSet<Permission> {
        Permission::ALL
            .iter()
            .copied()
            .filter(|p| p.minimum_role() <= *self)
            .collect()
    }

    pub fn grants(&self, permission: Permission) -> bool {
        permission.minimum_role() <= *self
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "viewer" => Ok(Role::Viewer),
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(AppError::Validation {
                message: format!("Unknown role '{}'", other),
                field: Some("role".to_string()),
            }),
        }
    }
}

/// Individual capability inside an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewOrganization,
    ViewMembers,
    ViewAgents,
    RunAgents,
    ManageAgents,
    ManageMembers,
    UpdateOrganization,
    ToggleOrganization,
    AssignOwner,
}

impl Permission {
    pub const ALL: [Permission; 9] = [
        Permission::ViewOrganization,
        Permission::ViewMembers,
        Permission::ViewAgents,
        Permission::RunAgents,
        Permission::ManageAgents,
        Permission::ManageMembers,
        Permission::UpdateOrganization,
        Permission::ToggleOrganization,
        Permission::AssignOwner,
    ];

    /// Lowest role that holds this permission without a custom grant
    pub fn minimum_role(&self) -> Role {
        match self {
            Permission::ViewOrganization | Permission::ViewMembers | Permission::ViewAgents => {
                Role::Viewer
            }
            Permission::RunAgents => Role::Member,
            Permission::ManageAgents
            | Permission::ManageMembers
            | Permission::UpdateOrganization => Role::Admin,
            Permission::ToggleOrganization | Permission::AssignOwner => Role::Owner,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewOrganization => "view_organization",
            Permission::ViewMembers => "view_members",
            Permission::ViewAgents => "view_agents",
            Permission::RunAgents => "run_agents",
            Permission::ManageAgents => "manage_agents",
            Permission::ManageMembers => "manage_members",
            Permission::UpdateOrganization => "update_organization",
            Permission::ToggleOrganization => "toggle_organization",
            Permission::AssignOwner => "assign_owner",
        }
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AppError::Validation {
                message: format!("Unknown permission '{}'", s),
                field: Some("permissions".to_string()),
            })
    }
}

/// Effective access of one user inside one organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub role: Role,
    pub grants: BTreeSet<Permission>,
}

impl Access {
    pub fn new(role: Role, grants: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            role,
            grants: grants.into_iter().collect(),
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.role.grants(permission) || self.grants.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(AppError::InsufficientRole {
                message: format!(
                    "role '{}' lacks permission '{}'",
                    self.role,
                    permission.as_str()
                ),
            })
        }
    }

    /// Every permission this access holds
    pub fn effective(&self) -> BTreeSet<Permission> {
        let mut set = self.role.permissions();
        set.extend(self.grants.iter().copied());
        set
    }

    /// Check whether this actor may move a member from `current` to `target`.
    ///
    /// `current` is `None` when the subject is not yet a member.
    pub fn can_assign(&self, current: Option<Role>, target: Role) -> Result<()> {
        self.require(Permission::ManageMembers)?;

        let touches_owner = target == Role::Owner || current == Some(Role::Owner);
        if touches_owner && !self.has(Permission::AssignOwner) {
            return Err(AppError::InsufficientRole {
                message: "only owners can grant or revoke the owner role".to_string(),
            });
        }

        if target > self.role {
            return Err(AppError::InsufficientRole {
                message: format!("cannot grant '{}' above own role '{}'", target, self.role),
            });
        }

        if let Some(current) = current {
            if current > self.role {
                return Err(AppError::InsufficientRole {
                    message: format!("cannot modify a member with role '{}'", current),
                });
            }
        }

        Ok(())
    }
}

/// Parse a stored permission list, skipping unknown entries
pub fn parse_grants(values: &[String]) -> BTreeSet<Permission> {
    values
        .iter()
        .filter_map(|v| match v.parse::<Permission>() {
            Ok(p) => Some(p),
            Err(_) => {
                tracing::warn!(permission = %v, "Ignoring unknown stored permission");
                None
            }
        })
        .collect()
}
