//! Behavioural properties of the naval manager, checked end to end against
//! the grid simulation.

use std::collections::{BTreeMap, BTreeSet};

use flotilla::naval::{NavalConfig, NavalManager, OnBoard, PlanState};
use flotilla::sim::SimWorld;
use flotilla::world::{Accessibility, EntityId, Host, PlanId, PlayerContext, PlayerId, Position, RegionId, Role, Roles};

const P1: PlayerId = PlayerId(1);

const STRAIT: [&str; 4] = [
    "####~~~~~~~~~~####",
    "####~~~~~~~~~~####",
    "####~~~~~~~~~~####",
    "####~~~~~~~~~~####",
];

struct Game {
    world: SimWorld,
    naval: NavalManager,
    west: RegionId,
    east: RegionId,
    sea: RegionId,
    turn: u32,
}

impl Game {
    /// A strait with a land region on each side. Docks are optional so
    /// routes can be opened later.
    fn new(docks: bool, check_period: u32) -> Game {
        let mut world = SimWorld::from_ascii(&STRAIT, 4.0);
        if docks {
            world.add_dock(P1, world.cell_center(3, 1));
            world.add_dock(P1, world.cell_center(14, 1));
        }
        let west = world.land_region(world.cell_center(0, 0)).unwrap();
        let east = world.land_region(world.cell_center(17, 0)).unwrap();
        let sea = world.sea_region(world.cell_center(8, 0)).unwrap();
        let config = NavalConfig { seed: 17, check_period, ..NavalConfig::default() };
        let naval = NavalManager::new(config);
        let mut game = Game { world, naval, west, east, sea, turn: 0 };
        game.init();
        game
    }

    fn init(&mut self) {
        self.world.take_events();
        self.naval.init(&mut PlayerContext::new(P1, 0, &mut self.world));
    }

    fn target(&self) -> Position {
        self.world.cell_center(17, 2)
    }

    fn require_between(&mut self, unit: EntityId, start: RegionId, end: RegionId) -> bool {
        let target = self.target();
        let mut ctx = PlayerContext::new(P1, self.turn, &mut self.world);
        self.naval.require_transport(&mut ctx, unit, start, end, target)
    }

    fn require(&mut self, unit: EntityId) -> bool {
        let (w, e) = (self.west, self.east);
        self.require_between(unit, w, e)
    }

    fn tick(&mut self) {
        self.turn += 1;
        let events = self.world.take_events();
        let mut ctx = PlayerContext::new(P1, self.turn, &mut self.world);
        self.naval.update(&mut ctx, &events);
        self.world.step();
    }

    fn region_of(&self, unit: EntityId) -> Option<RegionId> {
        self.world
            .entity(unit)
            .and_then(|e| e.position)
            .and_then(|p| self.world.land_region(p))
    }
}

/// Asserts that units and ships are claimed by at most one plan, and that
/// every claim is mirrored on both sides.
fn assert_claims_consistent(naval: &NavalManager) {
    let mut unit_owner: BTreeMap<EntityId, PlanId> = BTreeMap::new();
    let mut ship_owner: BTreeMap<EntityId, PlanId> = BTreeMap::new();
    for plan in naval.plans() {
        for &unit in plan.units() {
            assert!(unit_owner.insert(unit, plan.id).is_none(), "{} listed by two plans", unit);
            assert_eq!(naval.transport_of(unit), Some(plan.id), "{} not claimed by {}", unit, plan.id);
        }
        for &ship in plan.transport_ships() {
            assert!(ship_owner.insert(ship, plan.id).is_none(), "ship {} listed by two plans", ship);
            let claimed = naval.ships().get(ship).and_then(|s| s.transporter);
            assert_eq!(claimed, Some(plan.id), "ship {} not claimed by {}", ship, plan.id);
        }
    }
    for passenger in naval.units().iter() {
        assert_eq!(unit_owner.get(&passenger.id), Some(&passenger.transport), "stale claim on {}", passenger.id);
    }
    for ship in naval.ships().iter() {
        if let Some(plan) = ship.transporter {
            assert_eq!(ship_owner.get(&ship.id), Some(&plan), "stale claim on ship {}", ship.id);
        }
    }
}

#[test]
fn claims_stay_exclusive_through_a_busy_crossing() {
    let mut g = Game::new(true, 3);
    g.world.add_ship(P1, g.world.cell_center(8, 1), Roles::of(&[Role::Transport]), 5);
    g.world.add_ship(P1, g.world.cell_center(10, 2), Roles::of(&[Role::Transport]), 3);
    let mut units = Vec::new();
    for i in 0..3 {
        for j in 0..3 {
            units.push(g.world.add_unit(P1, g.world.cell_center(i, j), i == 2 && j == 2));
        }
    }
    g.init();

    let mut sunk = false;
    for _ in 0..200 {
        for &u in &units {
            if g.naval.transport_of(u).is_some() {
                continue;
            }
            match g.region_of(u) {
                Some(r) if r != g.east => {
                    g.require_between(u, r, g.east);
                }
                _ => {}
            }
        }
        g.tick();
        assert_claims_consistent(&g.naval);

        if !sunk {
            let sailing = g
                .naval
                .plans()
                .iter()
                .filter(|p| p.state == PlanState::Sailing)
                .find_map(|p| p.transport_ships().first().copied());
            if let Some(ship) = sailing {
                g.world.kill(ship);
                sunk = true;
            }
        }
    }
    assert!(sunk);
    assert_claims_consistent(&g.naval);
}

#[test]
fn losing_a_ship_while_boarding_keeps_every_unit() {
    let mut g = Game::new(true, 1000);
    let ship = g.world.add_ship(P1, g.world.cell_center(8, 1), Roles::of(&[Role::Transport]), 5);
    let units: Vec<EntityId> = (0..3).map(|j| g.world.add_unit(P1, g.world.cell_center(1, j), false)).collect();
    g.init();
    for &u in &units {
        assert!(g.require(u));
    }
    let plan = g.naval.transport_of(units[0]).unwrap();

    g.tick();
    g.tick();
    for &u in &units {
        assert_eq!(g.naval.on_board(u), Some(OnBoard::Boarding(ship)));
    }

    g.world.kill(ship);
    g.tick();
    let p = g.naval.plan(plan).unwrap();
    assert_eq!(p.state, PlanState::Boarding);
    assert!(p.need_transport_ships);
    assert!(p.transport_ships().is_empty());
    assert_eq!(p.len(), 3);
    for &u in &units {
        assert_eq!(g.naval.transport_of(u), Some(plan));
        assert_eq!(g.naval.on_board(u), Some(OnBoard::Unassigned));
    }
}

#[test]
fn losing_the_ship_while_sailing_replans_from_where_units_stand() {
    let mut g = Game::new(true, 1000);
    let ship = g.world.add_ship(P1, g.world.cell_center(8, 1), Roles::of(&[Role::Transport]), 5);
    let units: Vec<EntityId> = (0..3).map(|j| g.world.add_unit(P1, g.world.cell_center(1, j), false)).collect();
    g.init();
    for &u in &units {
        assert!(g.require(u));
    }
    let first = g.naval.transport_of(units[0]).unwrap();

    for _ in 0..60 {
        g.tick();
        if g.naval.plan(first).map_or(false, |p| p.state == PlanState::Sailing) {
            break;
        }
    }
    assert_eq!(g.naval.plan(first).map(|p| p.state), Some(PlanState::Sailing));

    // Sunk right off the home shore: everyone swims back.
    g.world.kill(ship);
    g.tick();

    assert!(g.naval.plan(first).is_none());
    assert_eq!(g.naval.plans().len(), 1);
    let replanned = &g.naval.plans()[0];
    assert_eq!(replanned.start_index, g.west);
    assert_eq!(replanned.end_index, g.east);
    assert_eq!(replanned.len(), 3);
    for &u in &units {
        assert_eq!(g.region_of(u), Some(g.west));
        assert_eq!(g.naval.transport_of(u), Some(replanned.id));
    }
    assert_claims_consistent(&g.naval);
}

#[test]
fn losing_the_ship_off_the_far_shore_just_lands_the_units() {
    let mut g = Game::new(true, 1000);
    let ship = g.world.add_ship(P1, g.world.cell_center(8, 1), Roles::of(&[Role::Transport]), 5);
    let units: Vec<EntityId> = (0..2).map(|j| g.world.add_unit(P1, g.world.cell_center(1, j), false)).collect();
    g.init();
    for &u in &units {
        assert!(g.require(u));
    }
    let plan = g.naval.transport_of(units[0]).unwrap();

    for _ in 0..60 {
        g.tick();
        if g.naval.plan(plan).map_or(false, |p| p.state == PlanState::Sailing) {
            break;
        }
    }
    assert_eq!(g.naval.plan(plan).map(|p| p.state), Some(PlanState::Sailing));

    // Sunk next to the destination: everyone swims ashore there.
    let off_east = g.world.cell_center(13, 1);
    g.world.set_position(ship, off_east);
    g.world.kill(ship);
    g.tick();

    assert!(g.naval.plans().is_empty());
    assert!(g.naval.units().is_empty());
    for &u in &units {
        assert_eq!(g.region_of(u), Some(g.east));
        assert_eq!(g.naval.transport_of(u), None);
    }
    assert_claims_consistent(&g.naval);
}

#[test]
fn same_route_requests_share_one_plan() {
    let mut g = Game::new(true, 1000);
    let a = g.world.add_unit(P1, g.world.cell_center(1, 1), false);
    let b = g.world.add_unit(P1, g.world.cell_center(2, 2), false);
    assert!(g.require(a));
    assert!(g.require(b));
    assert_eq!(g.naval.plans().len(), 1);
    let plan = &g.naval.plans()[0];
    assert_eq!(plan.state, PlanState::Boarding);
    assert_eq!(plan.units(), &[a, b]);
}

#[test]
fn fourth_siege_unit_opens_a_new_plan() {
    let mut g = Game::new(true, 1000);
    let rams: Vec<EntityId> = (0..4).map(|j| g.world.add_unit(P1, g.world.cell_center(1, j), true)).collect();
    for &r in &rams[..3] {
        assert!(g.require(r));
    }
    assert_eq!(g.naval.plans().len(), 1);

    assert!(g.require(rams[3]));
    assert_eq!(g.naval.plans().len(), 2);
    assert_eq!(g.naval.plans()[0].units(), &rams[..3]);
    assert_eq!(g.naval.plans()[1].units(), &[rams[3]]);

    // Infantry joins the smaller plan.
    let spear = g.world.add_unit(P1, g.world.cell_center(2, 0), false);
    assert!(g.require(spear));
    assert_eq!(g.naval.plans()[1].units(), &[rams[3], spear]);
}

#[test]
fn wanted_transports_never_shrink_and_stop_past_the_surplus() {
    let mut g = Game::new(true, 1);
    g.world.set_templates(Vec::new());
    let units: Vec<EntityId> = (0..3).map(|j| g.world.add_unit(P1, g.world.cell_center(1, j), false)).collect();
    for &u in &units {
        assert!(g.require(u));
    }

    let mut history = Vec::new();
    for turn in 0..30usize {
        g.tick();
        let wanted = g.naval.wanted_transport_ships(g.sea);
        history.push(wanted);
        // Hulls that cannot carry anyone: supply grows, demand stays unmet.
        let supply = g.naval.ships().count(Role::Transport, g.sea) as u32;
        if supply < wanted {
            let spot = g.world.cell_center(6 + turn % 6, 3);
            g.world.add_ship(P1, spot, Roles::of(&[Role::Transport]), 0);
        }
    }

    assert!(history.windows(2).all(|w| w[0] <= w[1]), "{:?}", history);
    let largest = 3;
    let surplus = g.naval.config().max_surplus_ships as u32;
    assert_eq!(*history.last().unwrap(), largest + surplus + 1);
    assert!(history[history.len() - 10..].iter().all(|&w| w == largest + surplus + 1));
    assert!(g.naval.plans()[0].need_transport_ships);
}

#[test]
fn route_opens_once_both_shores_have_a_dock() {
    let mut g = Game::new(false, 1000);
    let unit = g.world.add_unit(P1, g.world.cell_center(1, 1), false);
    g.tick();
    assert!(!g.require(unit));
    assert!(g.naval.plans().is_empty());

    g.world.add_dock(P1, g.world.cell_center(3, 1));
    g.tick();
    assert!(!g.require(unit));
    assert!(g.naval.plans().is_empty());
    assert_eq!(g.naval.transport_of(unit), None);

    g.world.add_dock(P1, g.world.cell_center(14, 1));
    g.tick();
    assert!(g.require(unit));
    assert_eq!(g.naval.plans().len(), 1);
    let plan = &g.naval.plans()[0];
    assert_eq!(plan.start_index, g.west);
    assert_eq!(plan.end_index, g.east);
    assert_eq!(plan.sea, g.sea);
    assert_eq!(plan.units(), &[unit]);
    let seas: BTreeSet<RegionId> = g.naval.docks().iter().map(|d| d.sea).collect();
    assert_eq!(seas.into_iter().collect::<Vec<_>>(), vec![g.sea]);
}
