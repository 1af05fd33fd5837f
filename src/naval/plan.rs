//! Transport plans.
//!
//! A plan groups land units that must cross one sea from `start_index` to
//! `end_index`, holds claims on the ships carrying them and walks through
//! `Boarding -> Sailing -> Completed`. A plan only ever stores ids; the
//! claims themselves live in the harbor's ship pool and unit ledger so that
//! a ship or unit is claimed by at most one plan.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::error::TransportError;
use super::harbor::Harbor;
use super::units::OnBoard;
use crate::world::{EntityId, PlanId, PlayerContext, Position, RegionId, Role};

/// Lifecycle of a transport plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanState {
    /// Units walk to the embarkation point and wait for ships.
    Boarding,
    /// Every unit is aboard; ships head for the landing point.
    Sailing,
    /// No unit left to carry. The manager drops the plan.
    Completed,
}

/// A unit that left its plan away from the destination and needs a new
/// transport from where it stands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reroute {
    pub unit: EntityId,
    pub from: RegionId,
    pub to: RegionId,
    pub end_pos: Position,
}

/// One grouped transportation job.
#[derive(Debug, Clone)]
pub struct TransportPlan {
    pub id: PlanId,
    /// Land region the units leave from.
    pub start_index: RegionId,
    /// Land region the units must reach.
    pub end_index: RegionId,
    /// Sea crossed between the two.
    pub sea: RegionId,
    pub end_pos: Position,
    pub state: PlanState,
    /// True while some unit waits for a ship to be assigned.
    pub need_transport_ships: bool,
    pub(crate) units: Vec<EntityId>,
    pub(crate) transport_ships: Vec<EntityId>,
    pub(crate) need_split: Vec<EntityId>,
    pub(crate) stranded: Vec<Reroute>,
    pub(crate) boarding_pos: BTreeMap<EntityId, Position>,
    pub(crate) landing_pos: Option<Position>,
    pub(crate) unloaded: BTreeSet<EntityId>,
    pub(crate) n_try: BTreeMap<EntityId, u32>,
}

impl TransportPlan {
    /// Creates a plan carrying `units` (each with its own unloading
    /// position) from `start_index` to `end_index`.
    ///
    /// Fails without claiming anything when no sea links the two regions
    /// through the player's docks, or when a unit is unknown, cannot board
    /// a ship or is already claimed.
    ///
    /// # Panics
    /// Panics if `units` is empty.
    pub fn new(
        ctx: &PlayerContext,
        harbor: &mut Harbor,
        id: PlanId,
        start_index: RegionId,
        end_index: RegionId,
        end_pos: Position,
        units: &[(EntityId, Position)],
    ) -> Result<Self, TransportError> {
        assert!(!units.is_empty(), "a transport plan needs at least one unit");
        if start_index == end_index {
            return Err(TransportError::NoSeaBetween { start: start_index, end: end_index });
        }
        let sea = harbor
            .docks
            .sea_between(start_index, end_index)
            .ok_or(TransportError::NoSeaBetween { start: start_index, end: end_index })?;

        Self::claim_units(ctx, harbor, id, units)?;
        debug!(
            "starting {} from {} to {} across {} with {} units",
            id,
            start_index,
            end_index,
            sea,
            units.len()
        );
        Ok(Self::on_route(id, (start_index, end_index, sea), end_pos, units))
    }

    /// Checks every unit of a new plan, then claims them all for `id`.
    /// Nothing is claimed when one of them is refused.
    pub(crate) fn claim_units(
        ctx: &PlayerContext,
        harbor: &mut Harbor,
        id: PlanId,
        units: &[(EntityId, Position)],
    ) -> Result<(), TransportError> {
        let mut seen = BTreeSet::new();
        let mut siege = Vec::with_capacity(units.len());
        for &(unit, _) in units {
            let info = ctx.own_entity(unit).ok_or(TransportError::UnknownEntity(unit))?;
            if !info.can_garrison {
                return Err(TransportError::NotTransportable(unit));
            }
            if let Some(plan) = harbor.units.transport_of(unit) {
                return Err(TransportError::UnitAlreadyClaimed { unit, plan });
            }
            if !seen.insert(unit) {
                return Err(TransportError::UnitAlreadyClaimed { unit, plan: id });
            }
            siege.push(info.is_siege);
        }
        for (&(unit, pos), is_siege) in units.iter().zip(siege) {
            harbor.units.claim(unit, id, pos, is_siege)?;
        }
        Ok(())
    }

    /// A boarding plan over `(start, end, sea)` whose units are already
    /// claimed.
    pub(crate) fn on_route(
        id: PlanId,
        (start_index, end_index, sea): (RegionId, RegionId, RegionId),
        end_pos: Position,
        units: &[(EntityId, Position)],
    ) -> Self {
        TransportPlan {
            id,
            start_index,
            end_index,
            sea,
            end_pos,
            state: PlanState::Boarding,
            need_transport_ships: true,
            units: units.iter().map(|(u, _)| *u).collect(),
            transport_ships: Vec::new(),
            need_split: Vec::new(),
            stranded: Vec::new(),
            boarding_pos: BTreeMap::new(),
            landing_pos: None,
            unloaded: BTreeSet::new(),
            n_try: BTreeMap::new(),
        }
    }

    /// Units currently managed by this plan.
    pub fn units(&self) -> &[EntityId] {
        &self.units
    }

    /// Ships currently committed to this plan.
    pub fn transport_ships(&self) -> &[EntityId] {
        &self.transport_ships
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Where `ship` picks up its passengers, once chosen.
    pub fn boarding_pos(&self, ship: EntityId) -> Option<Position> {
        self.boarding_pos.get(&ship).copied()
    }

    /// Squared distance within which a ship counts as at its boarding point.
    pub fn boarding_range(&self, harbor: &Harbor) -> f32 {
        harbor.config.boarding_range * harbor.config.boarding_range
    }

    pub fn landing_pos(&self) -> Option<Position> {
        self.landing_pos
    }

    /// Number of siege units in the plan.
    pub fn siege_count(&self, harbor: &Harbor) -> usize {
        self.units
            .iter()
            .filter(|u| harbor.units.get(**u).map_or(false, |p| p.siege))
            .count()
    }

    /// Adds a unit to a plan that is still boarding.
    pub fn add_unit(&mut self, ctx: &PlayerContext, harbor: &mut Harbor, unit: EntityId, end_pos: Position) -> Result<(), TransportError> {
        if self.state != PlanState::Boarding {
            return Err(TransportError::PlanNotBoarding(self.id));
        }
        let info = ctx.own_entity(unit).ok_or(TransportError::UnknownEntity(unit))?;
        if !info.can_garrison {
            return Err(TransportError::NotTransportable(unit));
        }
        harbor.units.claim(unit, self.id, end_pos, info.is_siege)?;
        self.units.push(unit);
        Ok(())
    }

    /// Claims the best idle transport of the plan's sea. Ships able to
    /// take every unassigned unit come first, then the one nearest to the
    /// first unit still waiting.
    pub fn assign_ship(&mut self, ctx: &PlayerContext, harbor: &mut Harbor) -> bool {
        let unassigned: Vec<EntityId> = self
            .units
            .iter()
            .copied()
            .filter(|u| harbor.units.on_board(*u) == Some(OnBoard::Unassigned))
            .collect();
        let remaining = unassigned.len().max(1) as u32;
        let anchor = unassigned
            .iter()
            .find_map(|u| ctx.entity(*u).and_then(|e| e.position));

        let mut best: Option<(bool, f32, EntityId)> = None;
        for ship in harbor.ships.in_sea(Role::Transport, self.sea) {
            if ship.transporter.is_some() || ship.capacity == 0 {
                continue;
            }
            let Some(pos) = ctx.entity(ship.id).and_then(|e| e.position) else {
                continue;
            };
            let fits = ship.capacity >= remaining;
            let dist = anchor.map_or(0.0, |a| a.square_distance(pos));
            let better = match best {
                None => true,
                Some((best_fits, best_dist, _)) => (fits && !best_fits) || (fits == best_fits && dist < best_dist),
            };
            if better {
                best = Some((fits, dist, ship.id));
            }
        }

        let Some((_, _, ship)) = best else {
            return false;
        };
        if let Err(e) = harbor.ships.claim(ship, self.id) {
            warn!("{}: {}", self.id, e);
            return false;
        }
        self.transport_ships.push(ship);
        self.need_transport_ships = false;
        debug!("{} gets ship {}", self.id, ship);
        true
    }

    /// Advances the plan by one tick. Returns the number of units still
    /// managed; zero means the plan is finished and must be released.
    pub fn update(&mut self, ctx: &mut PlayerContext, harbor: &mut Harbor) -> usize {
        self.prune(ctx, harbor);
        match self.state {
            PlanState::Boarding => self.on_boarding(ctx, harbor),
            PlanState::Sailing => self.on_sailing(ctx, harbor),
            PlanState::Completed => {}
        }
        if self.units.is_empty() {
            self.state = PlanState::Completed;
        }
        self.units.len()
    }

    /// Drops units and ships that vanished or lost their claim.
    fn prune(&mut self, ctx: &PlayerContext, harbor: &mut Harbor) {
        let id = self.id;
        self.units.retain(|u| {
            let claimed = harbor.units.transport_of(*u) == Some(id);
            let alive = ctx.own_entity(*u).is_some();
            if claimed && !alive {
                harbor.units.release(*u);
            }
            claimed && alive
        });
        self.transport_ships
            .retain(|s| harbor.ships.get(*s).map_or(false, |ship| ship.transporter == Some(id)));
    }

    fn on_boarding(&mut self, ctx: &mut PlayerContext, harbor: &mut Harbor) {
        if self.units.is_empty() {
            return;
        }
        let range_sq = self.boarding_range(harbor);
        let centroid = Position::centroid(
            self.units
                .iter()
                .filter_map(|u| ctx.entity(*u).and_then(|e| e.position)),
        );
        for &ship in &self.transport_ships {
            let Some(info) = ctx.entity(ship) else {
                continue;
            };
            let Some(ship_pos) = info.position else {
                continue;
            };
            match self.boarding_pos.get(&ship) {
                Some(&target) => {
                    if info.is_idle() && ship_pos.square_distance(target) > range_sq {
                        ctx.host.move_to(ship, target);
                    }
                }
                None => {
                    let near = centroid.unwrap_or(ship_pos);
                    let target = harbor
                        .docks
                        .nearest_dock(self.start_index, self.sea, near)
                        .map_or(ship_pos, |d| d.position);
                    self.boarding_pos.insert(ship, target);
                    ctx.host.move_to(ship, target);
                }
            }
        }

        let period = harbor.config.boarding_retry_period.max(1);
        for &unit in &self.units {
            let (Some(info), Some(status)) = (ctx.entity(unit), harbor.units.on_board(unit)) else {
                continue;
            };
            let next = match status {
                OnBoard::Aboard(ship) => {
                    if info.garrisoned_in != Some(ship) && info.position.is_some() {
                        OnBoard::Unassigned
                    } else {
                        status
                    }
                }
                OnBoard::Boarding(ship) => {
                    if info.garrisoned_in == Some(ship) {
                        self.n_try.remove(&unit);
                        OnBoard::Aboard(ship)
                    } else if !self.transport_ships.contains(&ship) {
                        OnBoard::Unassigned
                    } else {
                        let n = self.n_try.entry(unit).or_insert(0);
                        *n += 1;
                        if *n % period == 0 {
                            ctx.host.garrison(unit, ship);
                        }
                        status
                    }
                }
                OnBoard::Unassigned => match info.garrisoned_in {
                    Some(ship) if self.transport_ships.contains(&ship) => OnBoard::Aboard(ship),
                    _ => OnBoard::Unassigned,
                },
            };
            harbor.units.set_on_board(unit, next);
        }

        let mut load: BTreeMap<EntityId, u32> = BTreeMap::new();
        for &unit in &self.units {
            if let Some(ship) = harbor.units.on_board(unit).and_then(|o| o.ship()) {
                *load.entry(ship).or_default() += 1;
            }
        }
        for &unit in &self.units {
            if harbor.units.on_board(unit) != Some(OnBoard::Unassigned) {
                continue;
            }
            if ctx.entity(unit).and_then(|e| e.position).is_none() {
                continue;
            }
            let room = self.transport_ships.iter().copied().find(|s| {
                let capacity = harbor.ships.get(*s).map_or(0, |ship| ship.capacity);
                load.get(s).copied().unwrap_or(0) < capacity
            });
            match room {
                Some(ship) => {
                    *load.entry(ship).or_default() += 1;
                    harbor.units.set_on_board(unit, OnBoard::Boarding(ship));
                    self.n_try.insert(unit, 0);
                    ctx.host.garrison(unit, ship);
                }
                None => {
                    if !self.transport_ships.is_empty() && !self.need_split.contains(&unit) {
                        self.need_split.push(unit);
                    }
                }
            }
        }

        if self.transport_ships.is_empty() {
            self.need_transport_ships = true;
            return;
        }
        let all_aboard = self
            .units
            .iter()
            .all(|u| matches!(harbor.units.on_board(*u), Some(OnBoard::Aboard(_))));
        if all_aboard && self.need_split.is_empty() {
            self.start_sailing(ctx, harbor);
        }
    }

    fn start_sailing(&mut self, ctx: &mut PlayerContext, harbor: &mut Harbor) {
        let carrying: BTreeSet<EntityId> = self
            .units
            .iter()
            .filter_map(|u| harbor.units.on_board(*u).and_then(|o| o.ship()))
            .collect();
        for &ship in self.transport_ships.iter().filter(|s| !carrying.contains(s)) {
            harbor.ships.release(ship);
        }
        self.transport_ships.retain(|s| carrying.contains(s));

        let landing = harbor
            .docks
            .nearest_dock(self.end_index, self.sea, self.end_pos)
            .map_or(self.end_pos, |d| d.position);
        self.landing_pos = Some(landing);
        for &ship in &self.transport_ships {
            ctx.host.move_to(ship, landing);
        }
        self.boarding_pos.clear();
        self.n_try.clear();
        self.state = PlanState::Sailing;
        debug!("{} sailing with {} ships", self.id, self.transport_ships.len());
    }

    fn on_sailing(&mut self, ctx: &mut PlayerContext, harbor: &mut Harbor) {
        let landing = self.landing_pos.unwrap_or(self.end_pos);
        let unload_sq = harbor.config.unload_range * harbor.config.unload_range;
        let period = harbor.config.boarding_retry_period.max(1);

        for &ship in &self.transport_ships {
            let Some(info) = ctx.entity(ship) else {
                continue;
            };
            let Some(pos) = info.position else {
                continue;
            };
            if !self.unloaded.contains(&ship) {
                if pos.square_distance(landing) <= unload_sq {
                    ctx.host.unload_all(ship);
                    self.unloaded.insert(ship);
                } else if info.is_idle() {
                    let n = self.n_try.entry(ship).or_insert(0);
                    *n += 1;
                    if *n >= period {
                        ctx.host.unload_all(ship);
                        self.unloaded.insert(ship);
                    } else {
                        ctx.host.move_to(ship, landing);
                    }
                }
            } else if info.is_idle() {
                let n = self.n_try.entry(ship).or_insert(0);
                *n += 1;
                if *n % period == 0 {
                    ctx.host.unload_all(ship);
                }
            }
        }

        let mut ashore = Vec::new();
        for &unit in &self.units {
            let Some(info) = ctx.entity(unit) else {
                continue;
            };
            if info.garrisoned_in.is_some() {
                continue;
            }
            let Some(pos) = info.position else {
                continue;
            };
            if let Some(region) = ctx.host.land_region(pos) {
                ashore.push((unit, region));
            }
        }
        for (unit, region) in ashore {
            self.units.retain(|u| *u != unit);
            let Some(passenger) = harbor.units.release(unit) else {
                continue;
            };
            if region == self.end_index {
                ctx.host.move_to(unit, passenger.end_pos);
            } else {
                self.stranded.push(Reroute {
                    unit,
                    from: region,
                    to: self.end_index,
                    end_pos: passenger.end_pos,
                });
            }
        }

        let emptied: Vec<EntityId> = self
            .transport_ships
            .iter()
            .copied()
            .filter(|s| self.unloaded.contains(s))
            .filter(|s| {
                !self
                    .units
                    .iter()
                    .any(|u| ctx.entity(*u).map_or(false, |e| e.garrisoned_in == Some(*s)))
            })
            .collect();
        for ship in emptied {
            harbor.ships.release(ship);
            self.transport_ships.retain(|s| *s != ship);
            self.unloaded.remove(&ship);
            self.n_try.remove(&ship);
        }
    }

    /// Reconciles the plan after one of its ships was destroyed or lost.
    ///
    /// While boarding, every unit heading for or sitting in that ship goes
    /// back to unassigned and the plan asks for a ship again. While
    /// sailing, every unit standing in the world leaves the plan; those not
    /// already in the destination region are returned for re-planning.
    pub fn on_ship_lost(&mut self, ctx: &PlayerContext, harbor: &mut Harbor, ship: EntityId) -> Vec<Reroute> {
        self.transport_ships.retain(|s| *s != ship);
        self.boarding_pos.remove(&ship);
        self.unloaded.remove(&ship);
        self.n_try.remove(&ship);

        match self.state {
            PlanState::Boarding => {
                for &unit in &self.units {
                    if harbor.units.on_board(unit).and_then(|o| o.ship()) == Some(ship) {
                        harbor.units.set_on_board(unit, OnBoard::Unassigned);
                        self.n_try.remove(&unit);
                    }
                }
                self.need_transport_ships = true;
                Vec::new()
            }
            PlanState::Sailing => {
                let mut leaving = Vec::new();
                for &unit in &self.units {
                    match ctx.entity(unit) {
                        None => leaving.push((unit, None)),
                        Some(info) => match info.position {
                            Some(pos) => leaving.push((unit, ctx.host.land_region(pos))),
                            // Still inside another ship of this plan.
                            None if info
                                .garrisoned_in
                                .map_or(false, |s| self.transport_ships.contains(&s)) => {}
                            None => leaving.push((unit, None)),
                        },
                    }
                }
                let mut reroutes = Vec::new();
                for (unit, region) in leaving {
                    self.units.retain(|u| *u != unit);
                    let Some(passenger) = harbor.units.release(unit) else {
                        continue;
                    };
                    match region {
                        Some(r) if r != self.end_index => reroutes.push(Reroute {
                            unit,
                            from: r,
                            to: self.end_index,
                            end_pos: passenger.end_pos,
                        }),
                        _ => {}
                    }
                }
                reroutes
            }
            PlanState::Completed => Vec::new(),
        }
    }

    /// Detaches the units marked for splitting that are still unassigned,
    /// dropping their claims. Returns them with their unloading positions.
    pub(crate) fn take_split_units(&mut self, harbor: &mut Harbor) -> Vec<(EntityId, Position)> {
        let marked = std::mem::take(&mut self.need_split);
        let mut out = Vec::new();
        for unit in marked {
            if !self.units.contains(&unit) || harbor.units.on_board(unit) != Some(OnBoard::Unassigned) {
                continue;
            }
            self.units.retain(|u| *u != unit);
            self.n_try.remove(&unit);
            if let Some(p) = harbor.units.release(unit) {
                out.push((unit, p.end_pos));
            }
        }
        out
    }

    pub(crate) fn take_stranded(&mut self) -> Vec<Reroute> {
        std::mem::take(&mut self.stranded)
    }

    /// Releases every claim this plan holds on units and ships.
    pub fn release_all(&mut self, harbor: &mut Harbor) {
        for ship in self.transport_ships.drain(..) {
            if harbor.ships.get(ship).and_then(|s| s.transporter) == Some(self.id) {
                harbor.ships.release(ship);
            }
        }
        for unit in self.units.drain(..) {
            if harbor.units.transport_of(unit) == Some(self.id) {
                harbor.units.release(unit);
            }
        }
        self.need_split.clear();
        self.boarding_pos.clear();
        self.unloaded.clear();
        self.n_try.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naval::config::NavalConfig;
    use crate::sim::SimWorld;
    use crate::world::{Accessibility, Host, PlayerId, Roles};

    const P1: PlayerId = PlayerId(1);

    const STRAIT: [&str; 4] = [
        "####~~~~~~~~~~####",
        "####~~~~~~~~~~####",
        "####~~~~~~~~~~####",
        "####~~~~~~~~~~####",
    ];

    struct Fixture {
        world: SimWorld,
        harbor: Harbor,
        west: RegionId,
        east: RegionId,
    }

    fn fixture() -> Fixture {
        let mut world = SimWorld::from_ascii(&STRAIT, 4.0);
        let d1 = world.add_dock(P1, world.cell_center(3, 1));
        let d2 = world.add_dock(P1, world.cell_center(14, 1));
        let mut harbor = Harbor::new(NavalConfig::default());
        harbor.docks.compute_landing_zones(&world);
        harbor.docks.set_access_indices(&world, &world.entity(d1).unwrap());
        harbor.docks.set_access_indices(&world, &world.entity(d2).unwrap());
        let west = world.land_region(world.cell_center(0, 0)).unwrap();
        let east = world.land_region(world.cell_center(17, 0)).unwrap();
        Fixture { world, harbor, west, east }
    }

    impl Fixture {
        fn ship(&mut self, i: usize, capacity: u32) -> EntityId {
            let id = self.world.add_ship(P1, self.world.cell_center(i, 1), Roles::of(&[Role::Transport]), capacity);
            let info = self.world.entity(id).unwrap();
            self.harbor.ships.add(&self.world, &info);
            id
        }

        fn unit(&mut self, i: usize, j: usize) -> EntityId {
            self.world.add_unit(P1, self.world.cell_center(i, j), false)
        }

        fn plan(&mut self, units: &[EntityId]) -> TransportPlan {
            let end = self.world.cell_center(17, 2);
            let list: Vec<(EntityId, Position)> = units.iter().map(|u| (*u, end)).collect();
            let ctx = PlayerContext::new(P1, 0, &mut self.world);
            TransportPlan::new(&ctx, &mut self.harbor, PlanId(1), self.west, self.east, end, &list).unwrap()
        }

        fn tick(&mut self, plan: &mut TransportPlan) -> usize {
            let mut ctx = PlayerContext::new(P1, 0, &mut self.world);
            let n = plan.update(&mut ctx, &mut self.harbor);
            self.world.step();
            n
        }
    }

    #[test]
    fn new_plan_claims_its_units() {
        let mut f = fixture();
        let u = f.unit(1, 1);
        let plan = f.plan(&[u]);
        assert_eq!(plan.state, PlanState::Boarding);
        assert!(plan.need_transport_ships);
        assert_eq!(f.harbor.units.transport_of(u), Some(PlanId(1)));
        assert_eq!(f.harbor.units.on_board(u), Some(OnBoard::Unassigned));
    }

    #[test]
    #[should_panic(expected = "at least one unit")]
    fn empty_plan_is_a_programming_error() {
        let mut f = fixture();
        let (w, e) = (f.west, f.east);
        let ctx = PlayerContext::new(P1, 0, &mut f.world);
        let _ = TransportPlan::new(&ctx, &mut f.harbor, PlanId(1), w, e, Position::default(), &[]);
    }

    #[test]
    fn plan_without_docks_is_infeasible() {
        let mut world = SimWorld::from_ascii(&STRAIT, 4.0);
        let u = world.add_unit(P1, world.cell_center(1, 1), false);
        let mut harbor = Harbor::new(NavalConfig::default());
        harbor.docks.compute_landing_zones(&world);
        let west = world.land_region(world.cell_center(0, 0)).unwrap();
        let east = world.land_region(world.cell_center(17, 0)).unwrap();
        let ctx = PlayerContext::new(P1, 0, &mut world);
        let err = TransportPlan::new(&ctx, &mut harbor, PlanId(1), west, east, Position::default(), &[(u, Position::default())])
            .unwrap_err();
        assert!(matches!(err, TransportError::NoSeaBetween { .. }));
        assert!(harbor.units.is_empty());
    }

    #[test]
    fn claimed_unit_cannot_join_a_second_plan() {
        let mut f = fixture();
        let u = f.unit(1, 1);
        let _plan = f.plan(&[u]);
        let (w, e) = (f.west, f.east);
        let ctx = PlayerContext::new(P1, 0, &mut f.world);
        let err = TransportPlan::new(&ctx, &mut f.harbor, PlanId(2), w, e, Position::default(), &[(u, Position::default())])
            .unwrap_err();
        assert!(matches!(err, TransportError::UnitAlreadyClaimed { plan: PlanId(1), .. }));
    }

    #[test]
    fn structures_are_not_transportable() {
        let mut f = fixture();
        let u = f.unit(1, 1);
        let mut plan = f.plan(&[u]);
        let house = f.world.add_structure(P1, f.world.cell_center(0, 3));
        let ctx = PlayerContext::new(P1, 0, &mut f.world);
        let err = plan.add_unit(&ctx, &mut f.harbor, house, Position::default()).unwrap_err();
        assert!(matches!(err, TransportError::NotTransportable(_)));
    }

    #[test]
    fn assign_prefers_a_ship_that_fits_everyone() {
        let mut f = fixture();
        let small = f.ship(4, 1);
        let big = f.ship(9, 5);
        let a = f.unit(1, 1);
        let b = f.unit(1, 2);
        let mut plan = f.plan(&[a, b]);
        let ctx = PlayerContext::new(P1, 0, &mut f.world);
        assert!(plan.assign_ship(&ctx, &mut f.harbor));
        assert_eq!(plan.transport_ships(), &[big]);
        assert!(!plan.need_transport_ships);
        assert_eq!(f.harbor.ships.get(big).unwrap().transporter, Some(PlanId(1)));
        assert_eq!(f.harbor.ships.get(small).unwrap().transporter, None);
    }

    #[test]
    fn assign_without_ships_fails() {
        let mut f = fixture();
        let a = f.unit(1, 1);
        let mut plan = f.plan(&[a]);
        let ctx = PlayerContext::new(P1, 0, &mut f.world);
        assert!(!plan.assign_ship(&ctx, &mut f.harbor));
        assert!(plan.need_transport_ships);
    }

    #[test]
    fn full_crossing_completes() {
        let mut f = fixture();
        let ship = f.ship(6, 5);
        let a = f.unit(1, 1);
        let b = f.unit(1, 2);
        let mut plan = f.plan(&[a, b]);
        {
            let ctx = PlayerContext::new(P1, 0, &mut f.world);
            assert!(plan.assign_ship(&ctx, &mut f.harbor));
        }
        let mut saw_sailing = false;
        let mut remaining = plan.len();
        for _ in 0..60 {
            remaining = f.tick(&mut plan);
            if plan.state == PlanState::Sailing {
                saw_sailing = true;
                assert!(plan.add_unit(
                    &PlayerContext::new(P1, 0, &mut f.world),
                    &mut f.harbor,
                    a,
                    Position::default()
                )
                .is_err());
            }
            if remaining == 0 {
                break;
            }
        }
        assert!(saw_sailing);
        assert_eq!(remaining, 0);
        assert_eq!(plan.state, PlanState::Completed);
        assert!(f.harbor.units.is_empty());
        assert_eq!(f.harbor.ships.get(ship).unwrap().transporter, None);
        for u in [a, b] {
            let pos = f.world.entity(u).unwrap().position.unwrap();
            assert_eq!(f.world.land_region(pos), Some(f.east));
        }
    }

    #[test]
    fn overflow_is_marked_for_split() {
        let mut f = fixture();
        f.ship(6, 1);
        let a = f.unit(1, 1);
        let b = f.unit(1, 2);
        let mut plan = f.plan(&[a, b]);
        {
            let ctx = PlayerContext::new(P1, 0, &mut f.world);
            plan.assign_ship(&ctx, &mut f.harbor);
        }
        f.tick(&mut plan);
        let moved = plan.take_split_units(&mut f.harbor);
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].0, b);
        assert_eq!(plan.units(), &[a]);
        assert_eq!(f.harbor.units.transport_of(b), None);
        assert!(matches!(f.harbor.units.on_board(a), Some(OnBoard::Boarding(_))));
    }

    #[test]
    fn losing_a_ship_while_boarding_resets_units() {
        let mut f = fixture();
        let ship = f.ship(6, 5);
        let a = f.unit(1, 1);
        let b = f.unit(1, 2);
        let mut plan = f.plan(&[a, b]);
        {
            let ctx = PlayerContext::new(P1, 0, &mut f.world);
            plan.assign_ship(&ctx, &mut f.harbor);
        }
        f.tick(&mut plan);
        assert!(plan.units().iter().all(|u| f.harbor.units.on_board(*u) == Some(OnBoard::Boarding(ship))));

        f.world.kill(ship);
        f.harbor.ships.remove(ship);
        let ctx = PlayerContext::new(P1, 0, &mut f.world);
        let reroutes = plan.on_ship_lost(&ctx, &mut f.harbor, ship);
        assert!(reroutes.is_empty());
        assert!(plan.need_transport_ships);
        assert!(plan.transport_ships().is_empty());
        assert_eq!(plan.len(), 2);
        for u in [a, b] {
            assert_eq!(f.harbor.units.on_board(u), Some(OnBoard::Unassigned));
        }
    }

    #[test]
    fn release_all_clears_claims() {
        let mut f = fixture();
        let ship = f.ship(6, 5);
        let a = f.unit(1, 1);
        let mut plan = f.plan(&[a]);
        {
            let ctx = PlayerContext::new(P1, 0, &mut f.world);
            plan.assign_ship(&ctx, &mut f.harbor);
        }
        plan.release_all(&mut f.harbor);
        assert!(plan.is_empty());
        assert!(plan.transport_ships().is_empty());
        assert_eq!(f.harbor.units.transport_of(a), None);
        assert_eq!(f.harbor.ships.get(ship).unwrap().transporter, None);
    }

    #[test]
    fn dead_units_are_pruned() {
        let mut f = fixture();
        let a = f.unit(1, 1);
        let b = f.unit(1, 2);
        let mut plan = f.plan(&[a, b]);
        f.world.kill(a);
        assert_eq!(f.tick(&mut plan), 1);
        assert_eq!(f.harbor.units.transport_of(a), None);
        f.world.kill(b);
        assert_eq!(f.tick(&mut plan), 0);
        assert_eq!(plan.state, PlanState::Completed);
    }
}
