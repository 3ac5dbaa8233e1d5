//! User-organization relation entity

use crate::rbac::{parse_grants, Access, Role};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organization_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub organization_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub role: String,

    /// Custom grants on top of the role, as a JSON array of names
    #[sea_orm(column_type = "JsonBinary")]
    pub permissions: Json,

    /// Removal deactivates instead of deleting
    pub is_active: bool,

    pub joined_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Stored role; unknown values degrade to the lowest role
    pub fn member_role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Viewer)
    }

    pub fn grant_names(&self) -> Vec<String> {
        self.permissions
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn access(&self) -> Access {
        Access {
            role: self.member_role(),
            grants: parse_grants(&self.grant_names()),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id"
    )]
    Organization,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
