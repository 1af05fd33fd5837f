//! Flotilla: naval transport coordination for a real-time strategy AI.
//!
//! Exposes the host-facing types, the naval manager and its transport
//! plans, and a headless grid simulation used by the scenario runner,
//! integration tests and benchmarks.

pub mod naval;
pub mod sim;
pub mod world;
