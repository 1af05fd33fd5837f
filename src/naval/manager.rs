//! The naval manager.
//!
//! Single authority turning "this unit must cross water" requests into
//! transport plans and ship claims. Each tick it reconciles host events,
//! advances every plan in list order, re-plans stranded units, hands idle
//! ships to plans waiting for one, resizes the fleet every few ticks and
//! nudges blocked ships apart.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::config::NavalConfig;
use super::docks::DockRegistry;
use super::error::TransportError;
use super::harbor::Harbor;
use super::plan::{PlanState, Reroute, TransportPlan};
use super::pool::ShipPool;
use super::units::{OnBoard, UnitLedger};
use crate::world::{EntityId, Events, PlanId, PlayerContext, Position, RegionId};

/// Naval state of one player.
pub struct NavalManager {
    pub(crate) harbor: Harbor,
    pub(crate) plans: Vec<TransportPlan>,
    pub(crate) next_plan_id: u32,
    pub(crate) wanted_transport_ships: BTreeMap<RegionId, u32>,
    pub(crate) wanted_war_ships: BTreeMap<RegionId, u32>,
    pub(crate) wanted_fish_ships: BTreeMap<RegionId, u32>,
    pub(crate) needed_transport_ships: BTreeMap<RegionId, u32>,
    pub(crate) needed_war_ships: BTreeMap<RegionId, u32>,
    pub(crate) rng: SmallRng,
}

impl NavalManager {
    pub fn new(config: NavalConfig) -> Self {
        let rng = if config.seed != 0 {
            SmallRng::seed_from_u64(config.seed)
        } else {
            SmallRng::from_entropy()
        };
        NavalManager {
            harbor: Harbor::new(config),
            plans: Vec::new(),
            next_plan_id: 1,
            wanted_transport_ships: BTreeMap::new(),
            wanted_war_ships: BTreeMap::new(),
            wanted_fish_ships: BTreeMap::new(),
            needed_transport_ships: BTreeMap::new(),
            needed_war_ships: BTreeMap::new(),
            rng,
        }
    }

    /// Builds the landing-zone index and registers the player's current
    /// docks and ships.
    pub fn init(&mut self, ctx: &mut PlayerContext) {
        self.harbor.docks.compute_landing_zones(&*ctx.host);
        for id in ctx.host.entities_of(ctx.player) {
            let Some(info) = ctx.entity(id) else {
                continue;
            };
            if info.is_dock() {
                self.harbor.docks.set_access_indices(&*ctx.host, &info);
            } else if info.is_ship() {
                self.harbor.ships.add(&*ctx.host, &info);
            }
        }
        self.update_fish_targets(ctx);
        info!(
            "naval manager ready: {} docks, {} ships, {} landing zones",
            self.harbor.docks.len(),
            self.harbor.ships.len(),
            self.harbor.docks.landing_zones().len()
        );
    }

    /// Asks for `unit` to be carried from land region `start_index` to
    /// `end_index` and unloaded near `end_pos`.
    ///
    /// Returns false when the unit stays unclaimed: it cannot board ships,
    /// is already claimed, or no sea route exists yet.
    pub fn require_transport(
        &mut self,
        ctx: &mut PlayerContext,
        unit: EntityId,
        start_index: RegionId,
        end_index: RegionId,
        end_pos: Position,
    ) -> bool {
        match self.try_require_transport(ctx, unit, start_index, end_index, end_pos) {
            Ok(plan) => {
                debug!("{} joins {}", unit, plan);
                true
            }
            Err(e) => {
                warn!("transport of {} refused: {}", unit, e);
                false
            }
        }
    }

    /// Like [`require_transport`](Self::require_transport) but reports the
    /// plan that took the unit, or why none did.
    pub fn try_require_transport(
        &mut self,
        ctx: &mut PlayerContext,
        unit: EntityId,
        start_index: RegionId,
        end_index: RegionId,
        end_pos: Position,
    ) -> Result<PlanId, TransportError> {
        let info = ctx.own_entity(unit).ok_or(TransportError::UnknownEntity(unit))?;
        if !info.can_garrison {
            return Err(TransportError::NotTransportable(unit));
        }
        if let Some(plan) = self.harbor.units.transport_of(unit) {
            return Err(TransportError::UnitAlreadyClaimed { unit, plan });
        }
        if start_index == end_index {
            return Err(TransportError::NoSeaBetween { start: start_index, end: end_index });
        }

        let siege_cap = self.harbor.config.siege_per_transport;
        let harbor = &self.harbor;
        let merge = self
            .plans
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                p.state == PlanState::Boarding && p.start_index == start_index && p.end_index == end_index
            })
            .filter(|(_, p)| !info.is_siege || p.siege_count(harbor) < siege_cap)
            .min_by_key(|(_, p)| p.len())
            .map(|(i, _)| i);

        if let Some(i) = merge {
            let plan = &mut self.plans[i];
            plan.add_unit(ctx, &mut self.harbor, unit, end_pos)?;
            return Ok(plan.id);
        }

        let id = PlanId(self.next_plan_id);
        let plan = TransportPlan::new(ctx, &mut self.harbor, id, start_index, end_index, end_pos, &[(unit, end_pos)])?;
        self.next_plan_id += 1;
        self.plans.push(plan);
        Ok(id)
    }

    /// Runs one tick.
    pub fn update(&mut self, ctx: &mut PlayerContext, events: &Events) {
        let mut reroutes = self.check_events(ctx, events);
        reroutes.extend(self.update_plans(ctx));
        for r in reroutes {
            if !self.require_transport(ctx, r.unit, r.from, r.to, r.end_pos) {
                debug!("{} left on {} after losing its transport", r.unit, r.from);
            }
        }
        self.assign_ships_to_plans(ctx);

        if ctx.turn % self.harbor.config.check_period.max(1) == 0 {
            self.check_levels(ctx);
            self.maintain_fleet(ctx);
        }
        self.move_apart(ctx);
    }

    /// Reconciles docks, ships and claimed units with the host's events.
    /// Returns the units a lost ship left behind that need a new plan.
    fn check_events(&mut self, ctx: &mut PlayerContext, events: &Events) -> Vec<Reroute> {
        let mut reroutes = Vec::new();

        for &id in &events.create {
            let Some(info) = ctx.own_entity(id) else {
                continue;
            };
            if info.is_dock() {
                match self.harbor.docks.set_access_indices(&*ctx.host, &info) {
                    Some(dock) => debug!("dock {} links {} to {}", id, dock.land, dock.sea),
                    None => debug!("dock {} faces no sea", id),
                }
            }
        }

        for &id in &events.training_finished {
            let Some(info) = ctx.own_entity(id) else {
                continue;
            };
            if self.harbor.ships.add(&*ctx.host, &info) {
                debug!("ship {} joins the pool", id);
            }
        }

        for d in &events.destroy {
            if d.owner == ctx.player {
                self.on_entity_lost(ctx, d.id, &mut reroutes);
            }
        }

        for c in &events.ownership_changed {
            if c.from == ctx.player && c.to != ctx.player {
                self.on_entity_lost(ctx, c.id, &mut reroutes);
            } else if c.to == ctx.player && c.from != ctx.player {
                let Some(info) = ctx.entity(c.id) else {
                    continue;
                };
                if info.is_ship() {
                    self.harbor.ships.add(&*ctx.host, &info);
                    debug!("captured ship {}", c.id);
                } else if info.is_dock() {
                    self.harbor.docks.set_access_indices(&*ctx.host, &info);
                    debug!("captured dock {}", c.id);
                }
            }
        }

        reroutes
    }

    /// Forgets a dock, ship or claimed unit that left the player.
    fn on_entity_lost(&mut self, ctx: &PlayerContext, id: EntityId, reroutes: &mut Vec<Reroute>) {
        if let Some(dock) = self.harbor.docks.remove(id) {
            debug!("lost dock {} on {}", id, dock.land);
            return;
        }

        if let Some(ship) = self.harbor.ships.remove(id) {
            let Some(plan_id) = ship.transporter else {
                debug!("lost ship {}", id);
                return;
            };
            match self.plan_index(plan_id) {
                Ok(i) => {
                    let plan = &mut self.plans[i];
                    let lost = plan.on_ship_lost(ctx, &mut self.harbor, id);
                    debug!("{} lost ship {}, {} units to re-plan", plan_id, id, lost.len());
                    reroutes.extend(lost);
                }
                Err(e) => warn!("lost ship {}: {}", id, e),
            }
            return;
        }

        if let Some(plan_id) = self.harbor.units.transport_of(id) {
            self.harbor.units.release(id);
            if let Ok(i) = self.plan_index(plan_id) {
                self.plans[i].units.retain(|u| *u != id);
            }
        }
    }

    fn plan_index(&self, id: PlanId) -> Result<usize, TransportError> {
        self.plans
            .iter()
            .position(|p| p.id == id)
            .ok_or(TransportError::UnknownPlan(id))
    }

    /// Updates every plan in list order, splitting saturated ones and
    /// dropping finished ones in the same pass.
    fn update_plans(&mut self, ctx: &mut PlayerContext) -> Vec<Reroute> {
        let mut reroutes = Vec::new();
        let mut i = 0;
        while i < self.plans.len() {
            self.plans[i].update(ctx, &mut self.harbor);
            if !self.plans[i].need_split.is_empty() {
                self.split_transport(ctx, i);
            }
            reroutes.extend(self.plans[i].take_stranded());

            if self.plans[i].is_empty() {
                let mut plan = self.plans.remove(i);
                plan.release_all(&mut self.harbor);
                debug!("{} finished", plan.id);
                // The next plan now sits at index i.
                continue;
            }
            i += 1;
        }
        reroutes
    }

    /// Moves the units of plan `i` that found no room aboard into a new
    /// sibling plan with the same route.
    fn split_transport(&mut self, ctx: &PlayerContext, i: usize) {
        let movers = self.plans[i].take_split_units(&mut self.harbor);
        if movers.is_empty() {
            return;
        }
        let (start, end, end_pos, parent) = {
            let p = &self.plans[i];
            (p.start_index, p.end_index, p.end_pos, p.id)
        };
        let id = PlanId(self.next_plan_id);
        match TransportPlan::new(ctx, &mut self.harbor, id, start, end, end_pos, &movers) {
            Ok(plan) => {
                self.next_plan_id += 1;
                debug!("{} splits {} units into {}", parent, movers.len(), id);
                self.plans.push(plan);
            }
            Err(e) => {
                warn!("cannot split {}: {}", parent, e);
                for (unit, pos) in movers {
                    if let Err(e) = self.plans[i].add_unit(ctx, &mut self.harbor, unit, pos) {
                        warn!("{} dropped from {}: {}", unit, parent, e);
                    }
                }
            }
        }
    }

    /// Gives an idle transport to every boarding plan still waiting for one.
    pub fn assign_ships_to_plans(&mut self, ctx: &PlayerContext) {
        for plan in self.plans.iter_mut() {
            if plan.state == PlanState::Boarding && plan.need_transport_ships && !plan.is_empty() {
                plan.assign_ship(ctx, &mut self.harbor);
            }
        }
    }

    pub fn plans(&self) -> &[TransportPlan] {
        &self.plans
    }

    pub fn plan(&self, id: PlanId) -> Option<&TransportPlan> {
        self.plans.iter().find(|p| p.id == id)
    }

    /// Number of plans opened so far, finished ones included.
    pub fn plans_created(&self) -> u32 {
        self.next_plan_id.saturating_sub(1)
    }

    /// The plan carrying `unit`, if any.
    pub fn transport_of(&self, unit: EntityId) -> Option<PlanId> {
        self.harbor.units.transport_of(unit)
    }

    pub fn on_board(&self, unit: EntityId) -> Option<OnBoard> {
        self.harbor.units.on_board(unit)
    }

    pub fn ships(&self) -> &ShipPool {
        &self.harbor.ships
    }

    pub fn docks(&self) -> &DockRegistry {
        &self.harbor.docks
    }

    pub fn units(&self) -> &UnitLedger {
        &self.harbor.units
    }

    pub fn config(&self) -> &NavalConfig {
        &self.harbor.config
    }

    /// The sea a plan from `start` to `end` would cross today.
    pub fn route(&self, start: RegionId, end: RegionId) -> Option<RegionId> {
        self.harbor.docks.sea_between(start, end)
    }

    pub fn wanted_transport_ships(&self, sea: RegionId) -> u32 {
        self.wanted_transport_ships.get(&sea).copied().unwrap_or(0)
    }

    pub fn wanted_war_ships(&self, sea: RegionId) -> u32 {
        self.wanted_war_ships.get(&sea).copied().unwrap_or(0)
    }

    pub fn wanted_fish_ships(&self, sea: RegionId) -> u32 {
        self.wanted_fish_ships.get(&sea).copied().unwrap_or(0)
    }

    /// Boarding plans of `sea` waiting for a ship at the last fleet check.
    pub fn needed_transport_ships(&self, sea: RegionId) -> u32 {
        self.needed_transport_ships.get(&sea).copied().unwrap_or(0)
    }

    pub fn needed_war_ships(&self, sea: RegionId) -> u32 {
        self.needed_war_ships.get(&sea).copied().unwrap_or(0)
    }

    /// Records that military planning needs `count` warships on `sea`.
    pub fn require_war_ships(&mut self, sea: RegionId, count: u32) {
        self.needed_war_ships.insert(sea, count);
    }
}
