//! Fleet sizing and ship training.

use std::collections::BTreeMap;

use log::{debug, info};

use super::manager::NavalManager;
use super::plan::PlanState;
use crate::world::{PlayerContext, RegionId, Role, ShipTemplate};

/// What a ship is trained for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipGoal {
    Transport,
    Attack,
    Fishing,
}

/// Picks the template that best serves `goal`. On equal scores the later
/// template wins.
///
/// Transports are scored by garrison capacity with bonuses for arrows and
/// siege holds; attack ships by arrows; fishing boats only need the role.
pub fn best_ship_template(templates: &[ShipTemplate], goal: ShipGoal) -> Option<&ShipTemplate> {
    let mut best: Option<(u32, &ShipTemplate)> = None;
    for t in templates.iter().filter(|t| t.available) {
        let score = match goal {
            ShipGoal::Transport => {
                if !t.roles.contains(Role::Transport) || t.garrison_max < 2 {
                    continue;
                }
                t.garrison_max + 10 * t.arrows + if t.carries_siege { 50 } else { 0 }
            }
            ShipGoal::Attack => {
                if !t.roles.contains(Role::Warship) && t.arrows == 0 {
                    continue;
                }
                t.arrows
            }
            ShipGoal::Fishing => {
                if !t.roles.contains(Role::Fishing) {
                    continue;
                }
                1
            }
        };
        if best.map_or(true, |(s, _)| score >= s) {
            best = Some((score, t));
        }
    }
    best.map(|(_, t)| t)
}

impl NavalManager {
    /// Adjusts the wanted fleet sizes per sea.
    ///
    /// A sea's transport target grows by one per pass while boarding plans
    /// of at least `min_plan_units_for_ship` units wait for a ship, nothing
    /// is queued for that sea, the fleet has caught up with the current
    /// target and it does not already exceed the largest waiting plan by
    /// more than `max_surplus_ships`. Targets never shrink.
    pub fn check_levels(&mut self, ctx: &mut PlayerContext) {
        let min_units = self.harbor.config.min_plan_units_for_ship;
        let surplus = self.harbor.config.max_surplus_ships;

        self.needed_transport_ships.clear();
        let mut largest: BTreeMap<RegionId, usize> = BTreeMap::new();
        for plan in &self.plans {
            if plan.state != PlanState::Boarding || !plan.need_transport_ships || plan.len() < min_units {
                continue;
            }
            *self.needed_transport_ships.entry(plan.sea).or_default() += 1;
            let l = largest.entry(plan.sea).or_default();
            *l = (*l).max(plan.len());
        }

        for (&sea, &largest) in &largest {
            if ctx.host.queued_ships(ctx.player, Some(sea)) > 0 {
                continue;
            }
            let supply = self.harbor.ships.count(Role::Transport, sea);
            let wanted = self.wanted_transport_ships.entry(sea).or_default();
            if supply < *wanted as usize || supply > largest + surplus {
                continue;
            }
            *wanted += 1;
            info!("wanted transport ships on {} raised to {}", sea, wanted);
        }

        self.update_fish_targets(ctx);

        for (&sea, &needed) in &self.needed_war_ships {
            let wanted = self.wanted_war_ships.entry(sea).or_default();
            if *wanted < needed {
                *wanted = needed;
                info!("wanted war ships on {} raised to {}", sea, needed);
            }
        }
    }

    /// Derives the fishing-boat target of every docked sea from the fish
    /// left in it.
    pub(crate) fn update_fish_targets(&mut self, ctx: &PlayerContext) {
        let cfg = &self.harbor.config;
        let mut totals: BTreeMap<RegionId, f32> = self.harbor.docks.seas().into_iter().map(|s| (s, 0.0)).collect();
        for fish in ctx.host.fish_resources() {
            if fish.amount <= 0.0 {
                self.harbor.ships.forget_fish(fish.id);
                continue;
            }
            if let Some(fs) = self.harbor.ships.get_fish_sea(&*ctx.host, &fish, cfg) {
                if let Some(total) = totals.get_mut(&fs.sea) {
                    *total += fish.amount;
                }
            }
        }
        for (sea, total) in totals {
            let target = if total < cfg.min_fish_for_boats {
                0
            } else {
                ((total / cfg.fish_per_boat).ceil() as u32).min(cfg.target_num_fishers)
            };
            if self.wanted_fish_ships.insert(sea, target) != Some(target) {
                info!("wanted fishing boats on {} set to {}", sea, target);
            }
        }
    }

    /// Trains at most one ship per docked sea where a fleet is below its
    /// target: transports first, then fishing boats, then warships.
    /// Does nothing while any ship is queued.
    pub fn maintain_fleet(&mut self, ctx: &mut PlayerContext) {
        if ctx.host.queued_ships(ctx.player, None) > 0 || !self.harbor.docks.has_built_dock() {
            return;
        }
        for sea in self.harbor.docks.seas() {
            if !self.harbor.docks.docks_in_sea(sea).any(|d| d.built) {
                continue;
            }
            let ships = &self.harbor.ships;
            let goal = if (ships.count(Role::Transport, sea) as u32) < self.wanted_transport_ships(sea) {
                ShipGoal::Transport
            } else if (ships.count(Role::Fishing, sea) as u32) < self.wanted_fish_ships(sea) {
                ShipGoal::Fishing
            } else if (ships.count(Role::Warship, sea) as u32) < self.wanted_war_ships(sea) {
                ShipGoal::Attack
            } else {
                continue;
            };
            let templates = ctx.host.ship_templates(ctx.player, sea);
            let Some(template) = best_ship_template(&templates, goal) else {
                debug!("no ship template for {:?} on {}", goal, sea);
                continue;
            };
            if ctx.host.train(ctx.player, sea, &template.name) {
                info!("training {} on {} for {:?}", template.name, sea, goal);
            }
        }
    }
}
