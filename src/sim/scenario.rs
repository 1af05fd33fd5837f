//! Headless crossing scenarios.
//!
//! Each scenario builds a small two-shore map with a dock on each side,
//! scatters land units on the home shore and asks the naval manager to
//! ferry them across, optionally sinking a loaded ship on the way. The
//! world and manager are stepped together until every surviving unit stands
//! on the far shore with no plan left, or the tick budget runs out.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::world::SimWorld;
use crate::naval::{NavalConfig, NavalManager, PlanState};
use crate::world::{Accessibility, EntityId, Host, PlayerContext, PlayerId, Position, RegionId, Role, Roles};

const CELL_SIZE: f32 = 4.0;
const HOME: PlayerId = PlayerId(1);

const OPEN_STRAIT: [&str; 8] = [
    "######~~~~~~~~~~~~######",
    "######~~~~~~~~~~~~######",
    "######~~~~~~~~~~~~######",
    "######~~~~~~~~~~~~######",
    "######~~~~~~~~~~~~######",
    "######~~~~~~~~~~~~######",
    "######~~~~~~~~~~~~######",
    "######~~~~~~~~~~~~######",
];

const ISLAND_STRAIT: [&str; 8] = [
    "######~~~~~~~~~~~~######",
    "######~~~~~~~~~~~~######",
    "######~~~~~##~~~~~######",
    "######~~~~####~~~~######",
    "######~~~~####~~~~######",
    "######~~~~~##~~~~~######",
    "######~~~~~~~~~~~~######",
    "######~~~~~~~~~~~~######",
];

const MAPS: [(&str, &[&str]); 2] = [("open_strait", &OPEN_STRAIT), ("island_strait", &ISLAND_STRAIT)];

/// Configuration for a batch of scenarios.
#[derive(Clone)]
pub struct ScenarioConfig {
    /// Number of scenarios to run.
    pub num_scenarios: usize,
    /// Tick budget per scenario.
    pub max_ticks: u32,
    /// Land units to ferry per scenario.
    pub units: usize,
    /// Transports afloat at the start; more get trained on demand.
    pub initial_ships: usize,
    /// Share of units that are siege engines.
    pub siege_share: f64,
    /// Per-tick chance of sinking a loaded ship (at most once per scenario).
    pub sink_chance: f64,
    /// Number of parallel threads.
    pub threads: usize,
    /// Random seed (0 = use entropy).
    pub seed: u64,
    /// Suppress per-scenario progress output.
    pub quiet: bool,
    pub naval: NavalConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            num_scenarios: 8,
            max_ticks: 400,
            units: 6,
            initial_ships: 1,
            siege_share: 0.2,
            sink_chance: 0.0,
            threads: 4,
            seed: 0,
            quiet: false,
            naval: NavalConfig::default(),
        }
    }
}

/// Outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioRecord {
    pub scenario_id: usize,
    pub seed: u64,
    pub map: String,
    pub units: usize,
    /// Units standing on the far shore at the end.
    pub delivered: usize,
    /// Units that died on the way.
    pub lost: usize,
    pub ticks: u32,
    /// Every survivor crossed and no plan is left.
    pub completed: bool,
    pub plans_created: u32,
    pub ships_trained: usize,
    pub ship_sunk: bool,
}

fn random_cell(world: &SimWorld, rng: &mut SmallRng, cols: std::ops::Range<usize>, rows: usize, want_land: bool) -> Option<Position> {
    for _ in 0..64 {
        let p = world.cell_center(rng.gen_range(cols.clone()), rng.gen_range(0..rows));
        let ok = if want_land { world.land_region(p).is_some() } else { world.sea_region(p).is_some() };
        if ok {
            return Some(p);
        }
    }
    None
}

/// Plays one scenario from `seed`.
pub fn run_scenario(config: &ScenarioConfig, scenario_id: usize, seed: u64) -> ScenarioRecord {
    let mut rng = SmallRng::seed_from_u64(seed);
    let (map, rows) = MAPS[rng.gen_range(0..MAPS.len())];
    let width = rows[0].len();
    let height = rows.len();
    let mut world = SimWorld::from_ascii(rows, CELL_SIZE);

    let mut record = ScenarioRecord {
        scenario_id,
        seed,
        map: map.to_string(),
        units: config.units,
        delivered: 0,
        lost: 0,
        ticks: 0,
        completed: false,
        plans_created: 0,
        ships_trained: 0,
        ship_sunk: false,
    };

    world.add_dock(HOME, world.cell_center(5, 1));
    world.add_dock(HOME, world.cell_center(width - 6, 1));
    let Some(target) = world.land_region(world.cell_center(width - 1, 0)) else {
        return record;
    };

    for _ in 0..config.initial_ships {
        if let Some(p) = random_cell(&world, &mut rng, 6..width - 6, height, false) {
            world.add_ship(HOME, p, Roles::of(&[Role::Transport]), 5);
        }
    }
    let mut units: Vec<(EntityId, Position)> = Vec::with_capacity(config.units);
    for _ in 0..config.units {
        let (Some(start), Some(end)) = (
            random_cell(&world, &mut rng, 0..5, height, true),
            random_cell(&world, &mut rng, width - 5..width, height, true),
        ) else {
            continue;
        };
        let siege = rng.gen_bool(config.siege_share.clamp(0.0, 1.0));
        units.push((world.add_unit(HOME, start, siege), end));
    }

    let naval_config = NavalConfig { seed, ..config.naval.clone() };
    let mut naval = NavalManager::new(naval_config);
    naval.init(&mut PlayerContext::new(HOME, 0, &mut world));
    world.take_events();

    let sink_chance = config.sink_chance.clamp(0.0, 1.0);
    for turn in 1..=config.max_ticks {
        record.ticks = turn;
        let events = world.take_events();
        record.ships_trained += events.training_finished.len();
        {
            let mut ctx = PlayerContext::new(HOME, turn, &mut world);
            for &(unit, end) in &units {
                if naval.transport_of(unit).is_some() {
                    continue;
                }
                let Some(region) = ctx.entity(unit).and_then(|e| e.position).and_then(|p| ctx.host.land_region(p)) else {
                    continue;
                };
                if region != target {
                    naval.require_transport(&mut ctx, unit, region, target, end);
                }
            }
            naval.update(&mut ctx, &events);
        }

        if !record.ship_sunk && sink_chance > 0.0 && rng.gen_bool(sink_chance) {
            let loaded = naval
                .plans()
                .iter()
                .filter(|p| p.state == PlanState::Sailing)
                .find_map(|p| p.transport_ships().first().copied());
            if let Some(ship) = loaded {
                world.kill(ship);
                record.ship_sunk = true;
            }
        }
        world.step();

        if naval.plans().is_empty() && all_across(&world, &units, target) {
            record.completed = true;
            break;
        }
    }

    record.plans_created = naval.plans_created();
    for &(unit, _) in &units {
        match world.entity(unit) {
            None => record.lost += 1,
            Some(info) => {
                if on_region(&world, info.position, target) {
                    record.delivered += 1;
                }
            }
        }
    }
    record
}

fn on_region(world: &SimWorld, pos: Option<Position>, region: RegionId) -> bool {
    pos.and_then(|p| world.land_region(p)) == Some(region)
}

fn all_across(world: &SimWorld, units: &[(EntityId, Position)], target: RegionId) -> bool {
    units.iter().all(|(u, _)| match world.entity(*u) {
        None => true,
        Some(info) => on_region(world, info.position, target),
    })
}

/// Runs every scenario of `config`, in parallel when more than one thread
/// is configured. Records come back in scenario order.
pub fn run_scenarios(config: &ScenarioConfig) -> Result<Vec<ScenarioRecord>, rayon::ThreadPoolBuildError> {
    use rayon::prelude::*;

    let base_seed = if config.seed != 0 { config.seed } else { rand::random() };
    let completed = AtomicUsize::new(0);
    let play = |i: usize| {
        let start = Instant::now();
        let record = run_scenario(config, i, base_seed.wrapping_add(i as u64));
        if !config.quiet {
            let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
            eprintln!(
                "Scenario {}/{}: {} on {}, {}/{} delivered in {} ticks ({:.2}s)",
                n,
                config.num_scenarios,
                if record.completed { "done" } else { "unfinished" },
                record.map,
                record.delivered,
                record.units,
                record.ticks,
                start.elapsed().as_secs_f64(),
            );
        }
        record
    };

    if config.threads > 1 {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(config.threads).build()?;
        Ok(pool.install(|| (0..config.num_scenarios).into_par_iter().map(play).collect()))
    } else {
        Ok((0..config.num_scenarios).map(play).collect())
    }
}

/// Writes records as JSONL (one JSON object per scenario, one per line).
pub fn write_jsonl<W: Write>(records: &[ScenarioRecord], out: &mut W) -> std::io::Result<()> {
    for record in records {
        serde_json::to_writer(&mut *out, record)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Prints a summary of scenario results to stderr.
pub fn print_summary(records: &[ScenarioRecord]) {
    let total = records.len();
    if total == 0 {
        eprintln!("No scenarios run.");
        return;
    }
    let completed = records.iter().filter(|r| r.completed).count();
    let units: usize = records.iter().map(|r| r.units).sum();
    let delivered: usize = records.iter().map(|r| r.delivered).sum();
    let lost: usize = records.iter().map(|r| r.lost).sum();
    let sunk = records.iter().filter(|r| r.ship_sunk).count();
    let trained: usize = records.iter().map(|r| r.ships_trained).sum();
    let plans: u32 = records.iter().map(|r| r.plans_created).sum();
    let ticks: u32 = records.iter().filter(|r| r.completed).map(|r| r.ticks).sum();

    eprintln!();
    eprintln!("=== Crossing Summary ===");
    eprintln!("Scenarios: {} ({} completed)", total, completed);
    eprintln!(
        "Units: {} delivered, {} lost, {} total",
        delivered, lost, units
    );
    if completed > 0 {
        eprintln!("Avg ticks to complete: {:.1}", ticks as f64 / completed as f64);
    }
    eprintln!("Plans created: {}, ships trained: {}, ships sunk: {}", plans, trained, sunk);
}
