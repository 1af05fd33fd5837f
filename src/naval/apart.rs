//! Per-tick anti-deadlock repositioning of ships.
//!
//! The host pathfinder does not resolve ships blocking each other, so
//! ships that make no progress are nudged with short move-to-range orders.
//! Thresholds are tunables in [`NavalConfig`](super::config::NavalConfig).

use std::collections::BTreeSet;

use log::trace;
use rand::Rng;

use super::docks::shore_access;
use super::manager::NavalManager;
use super::plan::PlanState;
use crate::world::{EntityId, PlayerContext, Position, RegionId};

/// Ticks an approaching ship may sit on the same spot before it counts as
/// blocked.
const STUCK_TURNS: u32 = 2;

/// Extra range beyond the minimum of a move-to-range nudge.
const NUDGE_SLACK: f32 = 5.0;

impl NavalManager {
    /// Nudges blocked ships and the ships in their way.
    ///
    /// Ships serving a plan are steered by the plan and never nudged. Any
    /// other ship that is
    /// - approaching a gather, drop-site or trade target from the same spot
    ///   for [`STUCK_TURNS`] ticks moves a short way in a jittered direction;
    /// - idle and parked near an allied dock of its sea moves out of the
    ///   dock's way once per resting spot;
    /// - close to a blocked ship, a moving plan ship or a transport waiting
    ///   at its boarding point is pushed away from it.
    pub fn move_apart(&mut self, ctx: &mut PlayerContext) {
        let turn = ctx.turn;
        let (nudge_min, nudge_max) = self.harbor.config.blocked_nudge;
        let clearance = self.harbor.config.idle_dock_clearance;
        let idle_sq = self.harbor.config.blocking_idle_sq;
        let busy_sq = self.harbor.config.blocking_busy_sq;

        let mut blocked: Vec<(EntityId, Position, Option<RegionId>)> = Vec::new();
        let mut moved: BTreeSet<EntityId> = BTreeSet::new();
        let mut allied_docks: Option<Vec<(Position, RegionId)>> = None;

        for id in self.harbor.ships.ids() {
            let Some(info) = ctx.entity(id) else {
                continue;
            };
            let Some(pos) = info.position else {
                continue;
            };
            let Some(ship) = self.harbor.ships.get_mut(id) else {
                continue;
            };
            if ship.transporter.is_some() {
                continue;
            }

            if info.is_idle() {
                if ship.previous_idle_position.map_or(false, |p| p.same_spot(pos)) {
                    continue;
                }
                ship.previous_idle_position = Some(pos);
                let sea = ship.sea;
                let docks = allied_docks.get_or_insert_with(|| {
                    ctx.host
                        .docks()
                        .into_iter()
                        .filter(|d| ctx.is_ally(d.owner))
                        .filter_map(|d| {
                            let p = d.position?;
                            shore_access(&*ctx.host, p).map(|(_, s)| (p, s))
                        })
                        .collect()
                });
                let near = docks
                    .iter()
                    .find(|(p, s)| Some(*s) == sea && p.square_distance(pos) < clearance * clearance);
                if let Some(&(dock_pos, _)) = near {
                    trace!("ship {} clears the dock at {:?}", id, dock_pos);
                    ctx.host.move_to_range(id, dock_pos, clearance, clearance + NUDGE_SLACK);
                    moved.insert(id);
                }
                continue;
            }
            ship.previous_idle_position = None;

            if !info.activity.is_approaching() {
                continue;
            }
            let unchanged = ship.previous_position.map_or(false, |p| p.same_spot(pos));
            if !unchanged {
                ship.previous_position = Some(pos);
                ship.turn_previous_position = turn;
                continue;
            }
            if turn < ship.turn_previous_position + STUCK_TURNS {
                continue;
            }
            let sea = ship.sea;
            let target = pos.offset(self.rng.gen_range(-1.0..=1.0), self.rng.gen_range(-1.0..=1.0));
            trace!("ship {} is stuck at {:?}", id, pos);
            ctx.host.move_to_range(id, target, nudge_min, nudge_max);
            blocked.push((id, pos, sea));
            moved.insert(id);
        }

        let mut anchors = blocked;
        for plan in &self.plans {
            let pickup_sq = plan.boarding_range(&self.harbor);
            for &id in plan.transport_ships() {
                let Some(info) = ctx.entity(id) else {
                    continue;
                };
                let Some(pos) = info.position else {
                    continue;
                };
                // A transport idling at its pickup point still needs room.
                let waiting = plan.state == PlanState::Boarding
                    && plan.boarding_pos(id).map_or(false, |b| b.square_distance(pos) <= pickup_sq);
                if info.is_idle() && !waiting {
                    continue;
                }
                anchors.push((id, pos, self.harbor.ships.get(id).and_then(|s| s.sea)));
            }
        }

        let idle_range = idle_sq.sqrt();
        for (anchor, anchor_pos, sea) in anchors {
            let Some(sea) = sea else {
                continue;
            };
            let others: Vec<EntityId> = self
                .harbor
                .ships
                .all_in_sea(sea)
                .filter(|s| s.transporter.is_none() && s.id != anchor && !moved.contains(&s.id))
                .map(|s| s.id)
                .collect();
            for other in others {
                let Some(info) = ctx.entity(other) else {
                    continue;
                };
                let Some(pos) = info.position else {
                    continue;
                };
                let d = pos.square_distance(anchor_pos);
                if info.is_idle() && d < idle_sq {
                    trace!("ship {} makes way for {}", other, anchor);
                    ctx.host.move_to_range(other, anchor_pos, idle_range, idle_range + NUDGE_SLACK);
                    moved.insert(other);
                } else if !info.is_idle() && d < busy_sq {
                    trace!("ship {} makes way for {}", other, anchor);
                    ctx.host.move_to_range(other, anchor_pos, nudge_min, nudge_max);
                    moved.insert(other);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::naval::config::NavalConfig;
    use crate::naval::manager::NavalManager;
    use crate::sim::{Command, SimWorld};
    use crate::world::{Accessibility, Activity, EntityId, PlanId, PlayerContext, PlayerId, Role, Roles};

    const P1: PlayerId = PlayerId(1);

    const BAY: [&str; 6] = [
        "##################",
        "~~~~~~~~~~~~~~~~~~",
        "~~~~~~~~~~~~~~~~~~",
        "~~~~~~~~~~~~~~~~~~",
        "~~~~~~~~~~~~~~~~~~",
        "~~~~~~~~~~~~~~~~~~",
    ];

    const STRAIT: [&str; 4] = [
        "####~~~~~~~~~~####",
        "####~~~~~~~~~~####",
        "####~~~~~~~~~~####",
        "####~~~~~~~~~~####",
    ];

    fn setup() -> (SimWorld, NavalManager) {
        let world = SimWorld::from_ascii(&BAY, 8.0);
        let naval = NavalManager::new(NavalConfig { seed: 5, ..NavalConfig::default() });
        (world, naval)
    }

    fn tick(world: &mut SimWorld, naval: &mut NavalManager, turn: u32) {
        let events = world.take_events();
        let mut ctx = PlayerContext::new(P1, turn, world);
        naval.update(&mut ctx, &events);
    }

    fn nudged(world: &SimWorld, id: EntityId) -> bool {
        world
            .commands
            .iter()
            .any(|c| matches!(c, Command::MoveToRange(s, ..) if *s == id))
    }

    #[test]
    fn stuck_approaching_ship_is_nudged() {
        let (mut world, mut naval) = setup();
        let ship = world.add_ship(P1, world.cell_center(8, 3), Roles::of(&[Role::Fishing]), 0);
        world.set_activity(ship, Activity::GatherApproaching);
        naval.harbor.config.check_period = 1000;
        tick(&mut world, &mut naval, 1);
        tick(&mut world, &mut naval, 2);
        assert!(!nudged(&world, ship));
        tick(&mut world, &mut naval, 3);
        assert!(nudged(&world, ship));
    }

    #[test]
    fn moving_ship_is_not_stuck() {
        let (mut world, mut naval) = setup();
        let ship = world.add_ship(P1, world.cell_center(8, 3), Roles::of(&[Role::Fishing]), 0);
        world.set_activity(ship, Activity::TradeApproaching);
        naval.harbor.config.check_period = 1000;
        for turn in 1..6 {
            tick(&mut world, &mut naval, turn);
            let x = world.cell_center(2 + turn as usize, 3);
            world.set_position(ship, x);
        }
        assert!(!nudged(&world, ship));
    }

    #[test]
    fn idle_ship_clears_an_allied_dock_once() {
        let (mut world, mut naval) = setup();
        world.add_dock(P1, world.cell_center(8, 0));
        let ship = world.add_ship(P1, world.cell_center(8, 2), Roles::of(&[Role::Transport]), 5);
        naval.init(&mut PlayerContext::new(P1, 0, &mut world));
        naval.harbor.config.check_period = 1000;
        tick(&mut world, &mut naval, 1);
        let dock_pos = world.cell_center(8, 0);
        assert!(world.commands.iter().any(|c| matches!(
            c,
            Command::MoveToRange(s, p, min, _) if *s == ship && *p == dock_pos && *min == 70.0
        )));

        world.commands.clear();
        world.set_activity(ship, Activity::Idle);
        tick(&mut world, &mut naval, 2);
        assert!(!nudged(&world, ship));
    }

    #[test]
    fn idle_neighbour_makes_way_for_a_stuck_ship() {
        let (mut world, mut naval) = setup();
        let stuck = world.add_ship(P1, world.cell_center(8, 3), Roles::of(&[Role::Fishing]), 0);
        let idle = world.add_ship(P1, world.cell_center(9, 3), Roles::of(&[Role::Fishing]), 0);
        world.set_activity(stuck, Activity::GatherApproaching);
        naval.harbor.config.check_period = 1000;
        for turn in 1..=3 {
            tick(&mut world, &mut naval, turn);
        }
        let anchor = world.cell_center(8, 3);
        assert!(world.commands.iter().any(|c| matches!(
            c,
            Command::MoveToRange(s, p, min, max) if *s == idle && *p == anchor && *min == 40.0 && *max == 45.0
        )));
    }

    #[test]
    fn plan_ships_are_left_alone() {
        let (mut world, mut naval) = setup();
        let ship = world.add_ship(P1, world.cell_center(8, 3), Roles::of(&[Role::Transport]), 5);
        world.set_activity(ship, Activity::GatherApproaching);
        naval.harbor.config.check_period = 1000;
        tick(&mut world, &mut naval, 1);
        naval.harbor.ships.claim(ship, PlanId(9)).unwrap();
        for turn in 2..6 {
            tick(&mut world, &mut naval, turn);
        }
        assert!(!nudged(&world, ship));
    }

    #[test]
    fn transport_waiting_at_its_pickup_point_gets_room() {
        let mut world = SimWorld::from_ascii(&STRAIT, 4.0);
        world.add_dock(P1, world.cell_center(3, 1));
        world.add_dock(P1, world.cell_center(14, 1));
        let west = world.land_region(world.cell_center(0, 0)).unwrap();
        let east = world.land_region(world.cell_center(17, 0)).unwrap();
        let pickup = world.cell_center(9, 2);
        let transport = world.add_ship(P1, pickup, Roles::of(&[Role::Transport]), 5);
        let passing = world.add_ship(P1, world.cell_center(10, 2), Roles::of(&[Role::Fishing]), 0);
        world.set_activity(passing, Activity::Moving);
        let unit = world.add_unit(P1, world.cell_center(1, 1), false);

        let mut naval = NavalManager::new(NavalConfig { seed: 5, ..NavalConfig::default() });
        let end = world.cell_center(17, 2);
        {
            let mut ctx = PlayerContext::new(P1, 0, &mut world);
            naval.init(&mut ctx);
            assert!(naval.require_transport(&mut ctx, unit, west, east, end));
        }
        let id = naval.plans[0].id;
        naval.harbor.ships.claim(transport, id).unwrap();
        naval.plans[0].transport_ships.push(transport);
        naval.plans[0].need_transport_ships = false;

        // Not yet at the pickup point: an idle plan ship is no obstacle.
        naval.plans[0].boarding_pos.insert(transport, world.cell_center(0, 0));
        naval.move_apart(&mut PlayerContext::new(P1, 1, &mut world));
        assert!(!nudged(&world, passing));

        naval.plans[0].boarding_pos.insert(transport, pickup);
        naval.move_apart(&mut PlayerContext::new(P1, 2, &mut world));
        assert!(world.commands.iter().any(|c| matches!(
            c,
            Command::MoveToRange(s, p, ..) if *s == passing && *p == pickup
        )));
        assert!(!nudged(&world, transport));
    }
}
