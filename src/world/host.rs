//! The boundary to the host simulation.
//!
//! The host owns terrain, pathfinding and every entity. The naval subsystem
//! reads it through [`Accessibility`] and [`Host`] and acts on it only
//! through the command methods of [`Host`]. All calls happen synchronously
//! inside one simulation tick.

use super::entity::{EntityId, EntityInfo, FishResource, PlayerId, RegionId, ShipTemplate};
use super::position::Position;

/// The accessibility oracle: connected-component indices of land-passable
/// and water-passable terrain.
pub trait Accessibility {
    /// Land region under `pos`, or None for water or out of bounds.
    fn land_region(&self, pos: Position) -> Option<RegionId>;

    /// Sea region under `pos`, or None for land or out of bounds.
    fn sea_region(&self, pos: Position) -> Option<RegionId>;

    /// Regions directly touching `region` (land touches sea and vice versa).
    fn region_links(&self, region: RegionId) -> Vec<RegionId>;

    fn regions_adjacent(&self, a: RegionId, b: RegionId) -> bool {
        self.region_links(a).contains(&b)
    }

    fn in_bounds(&self, pos: Position) -> bool;

    fn land_regions(&self) -> Vec<RegionId>;

    fn sea_regions(&self) -> Vec<RegionId>;
}

/// Entity lookups, diplomacy and the unit-command sink.
pub trait Host: Accessibility {
    fn entity(&self, id: EntityId) -> Option<EntityInfo>;

    /// Ids of every entity owned by `player`.
    fn entities_of(&self, player: PlayerId) -> Vec<EntityId>;

    /// Every dock on the map, whoever owns it.
    fn docks(&self) -> Vec<EntityInfo>;

    fn is_ally(&self, player: PlayerId, other: PlayerId) -> bool;

    fn fish_resources(&self) -> Vec<FishResource>;

    /// Ship templates `player` can train from a dock facing `sea`.
    fn ship_templates(&self, player: PlayerId, sea: RegionId) -> Vec<ShipTemplate>;

    /// Ships queued for training by `player`, optionally restricted to a sea.
    fn queued_ships(&self, player: PlayerId, sea: Option<RegionId>) -> usize;

    fn move_to(&mut self, id: EntityId, target: Position);

    fn move_to_range(&mut self, id: EntityId, target: Position, min_range: f32, max_range: f32);

    fn garrison(&mut self, unit: EntityId, ship: EntityId);

    fn unload_all(&mut self, ship: EntityId);

    /// Queues one ship of `template` at a dock of `player` facing `sea`.
    /// Returns false when no such dock can train it.
    fn train(&mut self, player: PlayerId, sea: RegionId, template: &str) -> bool;
}

/// Explicit per-player context passed into every manager call.
pub struct PlayerContext<'a> {
    pub player: PlayerId,
    /// Number of ticks the AI has played so far.
    pub turn: u32,
    pub host: &'a mut dyn Host,
}

impl<'a> PlayerContext<'a> {
    pub fn new(player: PlayerId, turn: u32, host: &'a mut dyn Host) -> Self {
        PlayerContext { player, turn, host }
    }

    pub fn entity(&self, id: EntityId) -> Option<EntityInfo> {
        self.host.entity(id)
    }

    /// Looks up an entity and keeps it only if this player owns it.
    pub fn own_entity(&self, id: EntityId) -> Option<EntityInfo> {
        self.host.entity(id).filter(|e| e.owner == self.player)
    }

    pub fn is_ally(&self, other: PlayerId) -> bool {
        other == self.player || self.host.is_ally(self.player, other)
    }
}
