//! Entity identities and the read-only snapshot the host hands out.
//!
//! Ships, docks and land units are owned by the host simulation. The naval
//! subsystem only ever sees an `EntityInfo` snapshot and refers to entities
//! by id.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::position::Position;

/// Host entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Player identifier. Player 0 is gaia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

/// Accessibility region index, shared by land and sea regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u16);

/// Transport plan identifier, unique and increasing per manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plan {}", self.0)
    }
}

/// Naval role of a ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Transport,
    Warship,
    Fishing,
}

/// All roles in index order.
pub const ALL_ROLES: [Role; 3] = [Role::Transport, Role::Warship, Role::Fishing];

impl Role {
    const fn bit(self) -> u8 {
        match self {
            Role::Transport => 1,
            Role::Warship => 2,
            Role::Fishing => 4,
        }
    }
}

/// A set of roles. Roles are not exclusive: an armed transport is both a
/// transport and a warship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Roles(u8);

impl Roles {
    pub const NONE: Roles = Roles(0);

    /// Builds a role set from a slice of roles.
    pub fn of(roles: &[Role]) -> Roles {
        Roles(roles.iter().fold(0, |acc, r| acc | r.bit()))
    }

    pub fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the roles present in the set.
    pub fn iter(self) -> impl Iterator<Item = Role> {
        ALL_ROLES.into_iter().filter(move |r| self.contains(*r))
    }
}

/// Broad class of an entity, as far as the naval subsystem cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Ship,
    /// Dock or shipyard; grants sea access from the land region it stands on.
    Dock,
    /// A land unit that might need to cross water.
    Unit,
    Other,
}

/// What an entity is currently busy with, reduced to the states the
/// anti-deadlock heuristic distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    Idle,
    Moving,
    GatherApproaching,
    ReturnResourceApproaching,
    TradeApproaching,
    Busy,
}

impl Activity {
    /// True for the "walking towards a target" states a ship can get stuck in.
    pub fn is_approaching(self) -> bool {
        matches!(
            self,
            Activity::GatherApproaching
                | Activity::ReturnResourceApproaching
                | Activity::TradeApproaching
        )
    }
}

/// Snapshot of a host entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfo {
    pub id: EntityId,
    pub owner: PlayerId,
    pub kind: EntityKind,
    /// None when garrisoned or not placed in the world.
    pub position: Option<Position>,
    /// Ship roles; empty for anything but ships.
    pub roles: Roles,
    /// Number of units this entity can hold.
    pub garrison_max: u32,
    /// The entity this one is garrisoned in.
    pub garrisoned_in: Option<EntityId>,
    /// Whether this entity can be loaded onto a ship.
    pub can_garrison: bool,
    pub is_siege: bool,
    pub activity: Activity,
    /// Docks still under construction.
    pub foundation: bool,
}

impl EntityInfo {
    pub fn is_ship(&self) -> bool {
        self.kind == EntityKind::Ship
    }

    pub fn is_dock(&self) -> bool {
        self.kind == EntityKind::Dock
    }

    pub fn is_idle(&self) -> bool {
        self.activity == Activity::Idle
    }
}

/// A trainable ship template as the host describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipTemplate {
    pub name: String,
    pub roles: Roles,
    pub garrison_max: u32,
    /// Default arrow count; armed ships defend themselves while carrying.
    pub arrows: u32,
    /// Whether the hold accepts siege engines.
    pub carries_siege: bool,
    /// False when the template is disabled or capped for this player.
    pub available: bool,
}

/// A fishable resource in the water.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FishResource {
    pub id: EntityId,
    pub position: Position,
    pub amount: f32,
}
