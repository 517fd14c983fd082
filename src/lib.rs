pub mod algorithms;
pub mod config;
pub mod error;
pub mod gateway;
pub mod graph;
pub mod invariants;
pub mod layout;
pub mod models;
pub mod operations;
pub mod permissions;
pub mod validator;
pub mod viewport;

#[cfg(test)]
mod fixtures;

pub mod prelude {
    pub use crate::algorithms::{ancestors, assign_generations, descendants, reachable_from};
    pub use crate::config::{EngineConfig, ViewportConfig};
    pub use crate::error::{ErrorKind, LibError, Result};
    pub use crate::gateway::{FamilyTreeGateway, InMemoryGateway};
    pub use crate::graph::FamilyGraph;
    pub use crate::invariants::{MAX_PARENTS, ensure_kinship_invariants, kinship_violations};
    pub use crate::layout::{
        Connector, ConnectorKind, GridPoint, PlacedPerson, TreeLayout, compute_layout,
    };
    pub use crate::models::{
        AccountStatus, ConnectionOptions, CreateMemberPayload, Degree, DeleteMemberPayload,
        FamilyTreeId, Gender, KinshipViolation, MemberCreated, NewMemberDraft, Person,
        PersonAttributes, PersonId, RelationType, UserId,
    };
    pub use crate::operations::{
        FetchTicket, MutationRequest, MutationTicket, SessionContext, TreeController,
        TreeViewState, ViewError, ViewStatus,
    };
    pub use crate::permissions::ActingUser;
    pub use crate::validator::{
        DeleteDecision, DeleteRefusal, MemberPlan, PlannedLink, apply_member_plan, can_delete,
        ensure_can_delete, plan_add_member,
    };
    pub use crate::viewport::{ScreenPoint, Viewport, ViewportSize};
}
