//! Save and restore of the naval state.
//!
//! The saved form keeps fleet targets, the landing-zone index and, per
//! active plan, its route, unit and ship membership and boarding progress.
//! Restoring rebuilds each plan through the constructor path so every
//! claim and derived field is recomputed against the live host, then
//! replays the saved progress on top. A plan saved while sailing keeps its
//! saved sea, since losing a dock mid-crossing does not stop it.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::config::NavalConfig;
use super::error::TransportError;
use super::harbor::Harbor;
use super::manager::NavalManager;
use super::plan::{PlanState, TransportPlan};
use super::units::OnBoard;
use crate::world::{EntityId, PlanId, PlayerContext, Position, RegionId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub id: EntityId,
    pub end_pos: Position,
    pub on_board: OnBoard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: PlanId,
    pub start_index: RegionId,
    pub end_index: RegionId,
    /// Sea being crossed. Older saves without it re-derive the route.
    #[serde(default)]
    pub sea: Option<RegionId>,
    pub end_pos: Position,
    pub state: PlanState,
    pub need_transport_ships: bool,
    pub units: Vec<UnitRecord>,
    pub ships: Vec<EntityId>,
    #[serde(default)]
    pub boarding_pos: Vec<(EntityId, Position)>,
    #[serde(default)]
    pub landing_pos: Option<Position>,
    #[serde(default)]
    pub unloaded: Vec<EntityId>,
    #[serde(default)]
    pub n_try: Vec<(EntityId, u32)>,
}

/// Everything the naval manager needs to resume a saved game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavalState {
    pub next_plan_id: u32,
    pub wanted_transport_ships: Vec<(RegionId, u32)>,
    pub wanted_war_ships: Vec<(RegionId, u32)>,
    pub wanted_fish_ships: Vec<(RegionId, u32)>,
    pub needed_transport_ships: Vec<(RegionId, u32)>,
    pub needed_war_ships: Vec<(RegionId, u32)>,
    pub landing_zones: Vec<(RegionId, Vec<RegionId>)>,
    pub transports: Vec<PlanRecord>,
}

impl NavalState {
    pub fn to_json(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, TransportError> {
        Ok(serde_json::from_str(s)?)
    }
}

fn table(map: &BTreeMap<RegionId, u32>) -> Vec<(RegionId, u32)> {
    map.iter().map(|(k, v)| (*k, *v)).collect()
}

impl TransportPlan {
    pub(crate) fn to_record(&self, harbor: &Harbor) -> PlanRecord {
        PlanRecord {
            id: self.id,
            start_index: self.start_index,
            end_index: self.end_index,
            sea: Some(self.sea),
            end_pos: self.end_pos,
            state: self.state,
            need_transport_ships: self.need_transport_ships,
            units: self
                .units
                .iter()
                .filter_map(|u| harbor.units.get(*u))
                .map(|p| UnitRecord { id: p.id, end_pos: p.end_pos, on_board: p.on_board })
                .collect(),
            ships: self.transport_ships.clone(),
            boarding_pos: self.boarding_pos.iter().map(|(k, v)| (*k, *v)).collect(),
            landing_pos: self.landing_pos,
            unloaded: self.unloaded.iter().copied().collect(),
            n_try: self.n_try.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }

    /// Rebuilds the plan of `record` around its surviving `units`.
    ///
    /// Boarding plans go through [`TransportPlan::new`] and so need a
    /// route today. Sailing plans are already past the docks and resume on
    /// their saved sea.
    pub(crate) fn resume(
        ctx: &PlayerContext,
        harbor: &mut Harbor,
        record: &PlanRecord,
        units: &[(EntityId, Position)],
    ) -> Result<Self, TransportError> {
        match (record.state, record.sea) {
            (PlanState::Sailing, Some(sea)) if !units.is_empty() => {
                Self::claim_units(ctx, harbor, record.id, units)?;
                Ok(Self::on_route(
                    record.id,
                    (record.start_index, record.end_index, sea),
                    record.end_pos,
                    units,
                ))
            }
            _ => Self::new(
                ctx,
                harbor,
                record.id,
                record.start_index,
                record.end_index,
                record.end_pos,
                units,
            ),
        }
    }

    /// Replays saved progress on a freshly constructed plan. Ships that no
    /// longer exist or are claimed elsewhere are skipped.
    pub(crate) fn restore_progress(&mut self, harbor: &mut Harbor, record: &PlanRecord) {
        for &ship in &record.ships {
            if harbor.ships.contains(ship) && harbor.ships.claim(ship, self.id).is_ok() {
                self.transport_ships.push(ship);
            }
        }
        let ships: BTreeSet<EntityId> = self.transport_ships.iter().copied().collect();

        for u in &record.units {
            if !self.units.contains(&u.id) {
                continue;
            }
            let on_board = match u.on_board.ship() {
                Some(s) if !ships.contains(&s) => OnBoard::Unassigned,
                _ => u.on_board,
            };
            harbor.units.set_on_board(u.id, on_board);
        }

        self.state = match record.state {
            PlanState::Sailing if !ships.is_empty() => PlanState::Sailing,
            _ => PlanState::Boarding,
        };
        self.need_transport_ships = record.need_transport_ships || (ships.is_empty() && self.state == PlanState::Boarding);
        self.boarding_pos = record
            .boarding_pos
            .iter()
            .filter(|(s, _)| ships.contains(s))
            .copied()
            .collect();
        self.landing_pos = record.landing_pos;
        self.unloaded = record.unloaded.iter().copied().filter(|s| ships.contains(s)).collect();
        self.n_try = record.n_try.iter().copied().collect();
    }
}

impl NavalManager {
    /// Snapshot of the persistent state.
    pub fn save(&self) -> NavalState {
        NavalState {
            next_plan_id: self.next_plan_id,
            wanted_transport_ships: table(&self.wanted_transport_ships),
            wanted_war_ships: table(&self.wanted_war_ships),
            wanted_fish_ships: table(&self.wanted_fish_ships),
            needed_transport_ships: table(&self.needed_transport_ships),
            needed_war_ships: table(&self.needed_war_ships),
            landing_zones: self
                .harbor
                .docks
                .landing_zones()
                .iter()
                .map(|(land, seas)| (*land, seas.iter().copied().collect()))
                .collect(),
            transports: self.plans.iter().map(|p| p.to_record(&self.harbor)).collect(),
        }
    }

    /// Rebuilds a manager from a saved state against the current host.
    ///
    /// Docks and ships are re-registered from the host as in
    /// [`init`](Self::init). Saved plans whose units are all gone are
    /// dropped, and so are boarding plans whose route no longer exists.
    pub fn restore(ctx: &mut PlayerContext, config: NavalConfig, state: NavalState) -> Result<Self, TransportError> {
        if let Some(bad) = state.transports.iter().find(|r| r.id.0 >= state.next_plan_id) {
            return Err(TransportError::Restore(format!(
                "{} is not below the next plan id {}",
                bad.id, state.next_plan_id
            )));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = state.transports.iter().find(|r| !seen.insert(r.id)) {
            return Err(TransportError::Restore(format!("{} saved twice", dup.id)));
        }

        let mut naval = NavalManager::new(config);
        naval.init(ctx);
        naval.next_plan_id = state.next_plan_id.max(1);
        naval.wanted_transport_ships = state.wanted_transport_ships.into_iter().collect();
        naval.wanted_war_ships = state.wanted_war_ships.into_iter().collect();
        naval.wanted_fish_ships = state.wanted_fish_ships.into_iter().collect();
        naval.needed_transport_ships = state.needed_transport_ships.into_iter().collect();
        naval.needed_war_ships = state.needed_war_ships.into_iter().collect();
        if !state.landing_zones.is_empty() {
            naval.harbor.docks.set_landing_zones(
                state
                    .landing_zones
                    .into_iter()
                    .map(|(land, seas)| (land, seas.into_iter().collect()))
                    .collect(),
            );
        }

        for record in state.transports {
            let units: Vec<(EntityId, Position)> = record
                .units
                .iter()
                .filter(|u| ctx.own_entity(u.id).is_some())
                .map(|u| (u.id, u.end_pos))
                .collect();
            if units.is_empty() {
                debug!("saved {} has no unit left", record.id);
                continue;
            }
            match TransportPlan::resume(ctx, &mut naval.harbor, &record, &units) {
                Ok(mut plan) => {
                    plan.restore_progress(&mut naval.harbor, &record);
                    naval.plans.push(plan);
                }
                Err(e) => warn!("cannot restore {}: {}", record.id, e),
            }
        }
        info!("restored {} transport plans", naval.plans.len());
        Ok(naval)
    }
}
