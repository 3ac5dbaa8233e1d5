//! Login session entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How the session was obtained
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Web,
    Api,
}

impl From<String> for SessionKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "api" => SessionKind::Api,
            _ => SessionKind::Web,
        }
    }
}

impl From<SessionKind> for String {
    fn from(kind: SessionKind) -> Self {
        match kind {
            SessionKind::Web => "web".to_string(),
            SessionKind::Api => "api".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    /// SHA-256 of the opaque token; the token itself is never stored
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    #[serde(skip_serializing)]
    pub token_hash: String,

    pub user_id: Uuid,

    /// Currently selected organization
    pub organization_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub kind: String,

    pub created_at: DateTimeWithTimeZone,

    pub expires_at: DateTimeWithTimeZone,
}

impl Model {
    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        use chrono::Utc;
        self.expires_at <= Utc::now()
    }

    pub fn session_kind(&self) -> SessionKind {
        SessionKind::from(self.kind.clone())
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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
