//! Host-facing types.
//!
//! Identities, entity snapshots, events and the traits through which the
//! naval subsystem reads the host simulation and issues orders to it.

pub mod entity;
pub mod events;
pub mod host;
pub mod position;

pub use entity::{
    Activity, EntityId, EntityInfo, EntityKind, FishResource, PlanId, PlayerId, RegionId, Role,
    Roles, ShipTemplate, ALL_ROLES,
};
pub use events::{Destroyed, Events, OwnershipChanged};
pub use host::{Accessibility, Host, PlayerContext};
pub use position::Position;
