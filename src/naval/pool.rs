//! The ship pool.
//!
//! Holds one record per owned ship and an index from `(role, sea)` to ship
//! ids that is updated on every insertion, removal, role change or sea
//! change, so queries never rescan the fleet. A sea nobody sails on simply
//! has no index entry and every query on it is empty.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::config::NavalConfig;
use super::docks::AROUND;
use super::error::TransportError;
use crate::world::{Accessibility, EntityId, EntityInfo, FishResource, PlanId, Position, RegionId, Role, Roles};

/// An owned ship and its naval metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Ship {
    pub id: EntityId,
    pub roles: Roles,
    /// Garrison capacity.
    pub capacity: u32,
    /// Sea region the ship sails on, computed at creation or capture.
    pub sea: Option<RegionId>,
    /// The plan this ship is serving.
    pub transporter: Option<PlanId>,
    pub(crate) previous_position: Option<Position>,
    pub(crate) turn_previous_position: u32,
    pub(crate) previous_idle_position: Option<Position>,
}

impl Ship {
    fn new(info: &EntityInfo) -> Self {
        Ship {
            id: info.id,
            roles: info.roles,
            capacity: info.garrison_max,
            sea: None,
            transporter: None,
            previous_position: None,
            turn_previous_position: 0,
            previous_idle_position: None,
        }
    }
}

/// Sea classification of a fish resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FishSea {
    pub sea: RegionId,
    /// Far enough from shore in every direction to be safe from land raids.
    pub open_sea: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ShipPool {
    ships: BTreeMap<EntityId, Ship>,
    index: BTreeMap<(Role, RegionId), BTreeSet<EntityId>>,
    by_sea: BTreeMap<RegionId, BTreeSet<EntityId>>,
    fish: HashMap<EntityId, Option<FishSea>>,
}

impl ShipPool {
    pub fn new() -> Self {
        ShipPool::default()
    }

    /// Adds an owned ship, or refreshes its roles and sea if already known.
    /// Returns false for anything that is not a ship.
    pub fn add<A: Accessibility + ?Sized>(&mut self, acc: &A, info: &EntityInfo) -> bool {
        if !info.is_ship() {
            return false;
        }
        self.unindex(info.id);
        let ship = self.ships.entry(info.id).or_insert_with(|| Ship::new(info));
        ship.roles = info.roles;
        ship.capacity = info.garrison_max;
        self.set_ship_index(acc, info.id, info.position);
        true
    }

    /// Recomputes the sea a ship sails on from its position and stores it.
    /// A ship without position keeps its previous sea.
    pub fn set_ship_index<A: Accessibility + ?Sized>(&mut self, acc: &A, id: EntityId, position: Option<Position>) {
        self.unindex(id);
        if let Some(ship) = self.ships.get_mut(&id) {
            if let Some(sea) = position.and_then(|p| acc.sea_region(p)) {
                ship.sea = Some(sea);
            }
        }
        self.reindex(id);
    }

    /// Removes a ship from the pool and every index.
    pub fn remove(&mut self, id: EntityId) -> Option<Ship> {
        self.unindex(id);
        self.ships.remove(&id)
    }

    fn unindex(&mut self, id: EntityId) {
        let Some(ship) = self.ships.get(&id) else {
            return;
        };
        let Some(sea) = ship.sea else {
            return;
        };
        for role in ship.roles.iter() {
            if let Some(set) = self.index.get_mut(&(role, sea)) {
                set.remove(&id);
                if set.is_empty() {
                    self.index.remove(&(role, sea));
                }
            }
        }
        if let Some(set) = self.by_sea.get_mut(&sea) {
            set.remove(&id);
            if set.is_empty() {
                self.by_sea.remove(&sea);
            }
        }
    }

    fn reindex(&mut self, id: EntityId) {
        let Some(ship) = self.ships.get(&id) else {
            return;
        };
        let Some(sea) = ship.sea else {
            return;
        };
        for role in ship.roles.iter() {
            self.index.entry((role, sea)).or_default().insert(id);
        }
        self.by_sea.entry(sea).or_default().insert(id);
    }

    pub fn get(&self, id: EntityId) -> Option<&Ship> {
        self.ships.get(&id)
    }

    /// Mutable access for bookkeeping fields. Roles and sea must change
    /// through `add` and `set_ship_index` to keep the index consistent.
    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Ship> {
        self.ships.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ships.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ship> {
        self.ships.values()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.ships.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    /// Ships with `role` on `sea`, in id order.
    pub fn in_sea(&self, role: Role, sea: RegionId) -> impl Iterator<Item = &Ship> {
        self.index
            .get(&(role, sea))
            .into_iter()
            .flat_map(|set| set.iter())
            .filter_map(|id| self.ships.get(id))
    }

    pub fn count(&self, role: Role, sea: RegionId) -> usize {
        self.index.get(&(role, sea)).map_or(0, |s| s.len())
    }

    /// Every ship on `sea`, whatever its role.
    pub fn all_in_sea(&self, sea: RegionId) -> impl Iterator<Item = &Ship> {
        self.by_sea
            .get(&sea)
            .into_iter()
            .flat_map(|set| set.iter())
            .filter_map(|id| self.ships.get(id))
    }

    /// Seas with at least one ship.
    pub fn seas(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.by_sea.keys().copied()
    }

    /// Marks `ship` as serving `plan`. A ship serves one plan at a time.
    pub fn claim(&mut self, ship: EntityId, plan: PlanId) -> Result<(), TransportError> {
        let s = self.ships.get_mut(&ship).ok_or(TransportError::UnknownEntity(ship))?;
        match s.transporter {
            Some(other) if other != plan => Err(TransportError::ShipAlreadyClaimed { ship, plan: other }),
            _ => {
                s.transporter = Some(plan);
                Ok(())
            }
        }
    }

    /// Clears the plan claim of `ship`.
    pub fn release(&mut self, ship: EntityId) {
        if let Some(s) = self.ships.get_mut(&ship) {
            s.transporter = None;
        }
    }

    /// Sea region a fish resource lies in, classified as open sea or
    /// coastal. Computed once per resource and cached.
    ///
    /// Open sea means that in each of the eight probe directions at least
    /// one point within `fish_probe_radius` is still the same sea.
    pub fn get_fish_sea<A: Accessibility + ?Sized>(&mut self, acc: &A, fish: &FishResource, config: &NavalConfig) -> Option<FishSea> {
        if let Some(cached) = self.fish.get(&fish.id) {
            return *cached;
        }
        let result = acc.sea_region(fish.position).map(|sea| {
            let tries = config.fish_probe_tries.max(1);
            let step = config.fish_probe_radius / tries as f32;
            let open_sea = AROUND.iter().all(|(dx, dz)| {
                (0..tries).any(|t| {
                    let r = step * (tries - t) as f32;
                    let p = fish.position.offset(dx * r, dz * r);
                    acc.in_bounds(p) && acc.sea_region(p) == Some(sea)
                })
            });
            FishSea { sea, open_sea }
        });
        self.fish.insert(fish.id, result);
        result
    }

    /// Drops a depleted fish resource from the cache.
    pub fn forget_fish(&mut self, id: EntityId) {
        self.fish.remove(&id);
    }
}
