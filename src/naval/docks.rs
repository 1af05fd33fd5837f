//! Dock and shipyard registry.
//!
//! Every owned dock is tagged with the land region it stands on and the sea
//! region it opens onto. A route between two land regions is feasible when
//! some sea touches both (landing-zone index) and the player has a dock on
//! each shore of that sea.

use std::collections::{BTreeMap, BTreeSet};

use crate::world::{Accessibility, EntityId, EntityInfo, Position, RegionId};

/// Unit directions probed around a point, clockwise from north-west.
pub(crate) const AROUND: [(f32, f32); 8] = [
    (-0.7, 0.7),
    (0.0, 1.0),
    (0.7, 0.7),
    (1.0, 0.0),
    (0.7, -0.7),
    (0.0, -1.0),
    (-0.7, -0.7),
    (-1.0, 0.0),
];

/// Spacing of the rings probed around a dock to find its sea.
const DOCK_PROBE_STEP: f32 = 4.0;
const DOCK_PROBE_RINGS: u32 = 4;

/// A dock with its access indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dock {
    pub id: EntityId,
    pub land: RegionId,
    pub sea: RegionId,
    pub position: Position,
    pub built: bool,
}

/// Land region -> sea regions it touches.
pub type LandingZones = BTreeMap<RegionId, BTreeSet<RegionId>>;

#[derive(Debug, Clone, Default)]
pub struct DockRegistry {
    docks: BTreeMap<EntityId, Dock>,
    landing_zones: LandingZones,
}

/// Finds the land region a shore structure stands on and the sea it faces.
///
/// The land region is the one under `pos` (or the nearest probed one when
/// `pos` is in the water). The sea is the nearest probed sea region that
/// the oracle links to that land region.
pub fn shore_access<A: Accessibility + ?Sized>(acc: &A, pos: Position) -> Option<(RegionId, RegionId)> {
    let probe = |want_land: bool, accept: &dyn Fn(RegionId) -> bool| -> Option<RegionId> {
        for ring in 1..=DOCK_PROBE_RINGS {
            let r = ring as f32 * DOCK_PROBE_STEP;
            for (dx, dz) in AROUND {
                let p = pos.offset(dx * r, dz * r);
                let region = if want_land { acc.land_region(p) } else { acc.sea_region(p) };
                if let Some(region) = region.filter(|r| accept(*r)) {
                    return Some(region);
                }
            }
        }
        None
    };

    let land = match acc.land_region(pos) {
        Some(l) => l,
        None => probe(true, &|_| true)?,
    };
    let linked = |s: RegionId| acc.regions_adjacent(land, s);
    let sea = match acc.sea_region(pos).filter(|s| linked(*s)) {
        Some(s) => s,
        None => probe(false, &linked)?,
    };
    Some((land, sea))
}

impl DockRegistry {
    pub fn new() -> Self {
        DockRegistry::default()
    }

    /// Rebuilds the landing-zone index from the oracle's region links.
    pub fn compute_landing_zones<A: Accessibility + ?Sized>(&mut self, acc: &A) {
        let seas: BTreeSet<RegionId> = acc.sea_regions().into_iter().collect();
        self.landing_zones.clear();
        for land in acc.land_regions() {
            let touching: BTreeSet<RegionId> = acc
                .region_links(land)
                .into_iter()
                .filter(|r| seas.contains(r))
                .collect();
            if !touching.is_empty() {
                self.landing_zones.insert(land, touching);
            }
        }
    }

    pub fn landing_zones(&self) -> &LandingZones {
        &self.landing_zones
    }

    pub fn set_landing_zones(&mut self, zones: LandingZones) {
        self.landing_zones = zones;
    }

    /// True when the landing-zone index says `land` touches `sea`.
    pub fn touches(&self, land: RegionId, sea: RegionId) -> bool {
        self.landing_zones.get(&land).map_or(false, |s| s.contains(&sea))
    }

    /// Computes and stores the access indices of a dock or dock foundation.
    /// Returns None (and registers nothing) when the dock faces no sea.
    pub fn set_access_indices<A: Accessibility + ?Sized>(&mut self, acc: &A, info: &EntityInfo) -> Option<Dock> {
        let position = info.position?;
        let (land, sea) = shore_access(acc, position)?;
        let dock = Dock { id: info.id, land, sea, position, built: !info.foundation };
        self.docks.insert(info.id, dock);
        Some(dock)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Dock> {
        self.docks.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Dock> {
        self.docks.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dock> {
        self.docks.values()
    }

    pub fn len(&self) -> usize {
        self.docks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docks.is_empty()
    }

    pub fn has_built_dock(&self) -> bool {
        self.docks.values().any(|d| d.built)
    }

    /// True when a dock on `land` opens onto `sea`.
    pub fn has_access(&self, land: RegionId, sea: RegionId) -> bool {
        self.docks.values().any(|d| d.land == land && d.sea == sea)
    }

    /// Seas reachable from at least one dock.
    pub fn seas(&self) -> BTreeSet<RegionId> {
        self.docks.values().map(|d| d.sea).collect()
    }

    pub fn docks_in_sea(&self, sea: RegionId) -> impl Iterator<Item = &Dock> {
        self.docks.values().filter(move |d| d.sea == sea)
    }

    /// The dock on `(land, sea)` closest to `near`.
    pub fn nearest_dock(&self, land: RegionId, sea: RegionId, near: Position) -> Option<&Dock> {
        self.docks
            .values()
            .filter(|d| d.land == land && d.sea == sea)
            .min_by(|a, b| {
                a.position
                    .square_distance(near)
                    .total_cmp(&b.position.square_distance(near))
            })
    }

    /// The sea a ship can carry units across from `start` to `end`, if any.
    /// The lowest region id wins when several qualify.
    pub fn sea_between(&self, start: RegionId, end: RegionId) -> Option<RegionId> {
        let candidates = self.landing_zones.get(&start)?;
        candidates
            .iter()
            .copied()
            .find(|sea| self.touches(end, *sea) && self.has_access(start, *sea) && self.has_access(end, *sea))
    }
}
