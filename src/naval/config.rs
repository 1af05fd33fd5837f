//! Tunable constants of the naval subsystem.
//!
//! Distances are world units; "squared" fields compare against squared
//! distances. None of these are correctness requirements, only heuristics.

use serde::Deserialize;

/// Configuration for the naval manager.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NavalConfig {
    /// Maximum siege units one transport plan accepts.
    pub siege_per_transport: usize,
    /// Fleet sizing and maintenance run every this many ticks.
    pub check_period: u32,
    /// A ship counts as at its boarding point within this distance.
    pub boarding_range: f32,
    /// A sailing ship unloads within this distance of its landing point.
    pub unload_range: f32,
    /// Smallest waiting plan worth a dedicated ship.
    pub min_plan_units_for_ship: usize,
    /// Supply may exceed the largest waiting plan by this many ships.
    pub max_surplus_ships: usize,
    /// Fish amount one fishing boat is worth.
    pub fish_per_boat: f32,
    /// Below this total amount a sea gets no fishing boats.
    pub min_fish_for_boats: f32,
    /// Upper bound on fishing boats per sea.
    pub target_num_fishers: u32,
    /// Radius of the open-sea probe around a fish resource.
    pub fish_probe_radius: f32,
    /// Probe points per direction.
    pub fish_probe_tries: u32,
    /// Idle ships closer than this to an allied dock get moved away.
    pub idle_dock_clearance: f32,
    /// Range band a blocked ship is nudged into.
    pub blocked_nudge: (f32, f32),
    /// Squared distance under which an idle ship blocks a busy one.
    pub blocking_idle_sq: f32,
    /// Squared distance under which a busy ship blocks another busy one.
    pub blocking_busy_sq: f32,
    /// Re-issue a pending garrison order every this many ticks.
    pub boarding_retry_period: u32,
    /// Seed for the jitter RNG (0 = entropy).
    pub seed: u64,
}

impl Default for NavalConfig {
    fn default() -> Self {
        NavalConfig {
            siege_per_transport: 3,
            check_period: 3,
            boarding_range: 18.0,
            unload_range: 24.0,
            min_plan_units_for_ship: 2,
            max_surplus_ships: 2,
            fish_per_boat: 1000.0,
            min_fish_for_boats: 400.0,
            target_num_fishers: 4,
            fish_probe_radius: 120.0,
            fish_probe_tries: 4,
            idle_dock_clearance: 70.0,
            blocked_nudge: (30.0, 35.0),
            blocking_idle_sq: 1600.0,
            blocking_busy_sq: 900.0,
            boarding_retry_period: 5,
            seed: 0,
        }
    }
}

impl NavalConfig {
    /// Parses a configuration from JSON; missing fields keep their defaults.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
