//! Headless simulation.
//!
//! A grid host that implements the host traits, and a scenario runner that
//! drives the naval manager against it.

pub mod scenario;
pub mod world;

pub use scenario::{print_summary, run_scenario, run_scenarios, write_jsonl, ScenarioConfig, ScenarioRecord};
pub use world::{default_templates, Command, SimWorld};
