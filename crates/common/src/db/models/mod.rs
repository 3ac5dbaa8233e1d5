//! SeaORM entity models
//!
//! Database entities for the Workforce platform

mod user;
mod organization;
mod membership;
mod session;
mod service;
mod agent;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use organization::{
    Entity as OrganizationEntity,
    Model as Organization,
    ActiveModel as OrganizationActiveModel,
    Column as OrganizationColumn,
    Tier,
};

pub use membership::{
    Entity as MembershipEntity,
    Model as Membership,
    ActiveModel as MembershipActiveModel,
    Column as MembershipColumn,
};

pub use session::{
    Entity as SessionEntity,
    Model as Session,
    ActiveModel as SessionActiveModel,
    Column as SessionColumn,
    SessionKind,
};

pub use service::{
    Entity as ServiceEntity,
    Model as Service,
    ActiveModel as ServiceActiveModel,
    Column as ServiceColumn,
};

pub use agent::{
    Entity as AgentEntity,
    Model as Agent,
    ActiveModel as AgentActiveModel,
    Column as AgentColumn,
    AgentStatus,
};
