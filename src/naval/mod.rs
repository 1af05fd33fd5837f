//! Naval transport subsystem.
//!
//! The [`NavalManager`] owns every ship of one player, ferries land units
//! between land regions through [`TransportPlan`]s and keeps the fleet sized
//! to demand. Plans borrow the manager's pools through [`Harbor`].

pub mod apart;
pub mod config;
pub mod docks;
pub mod error;
pub mod fleet;
pub mod harbor;
pub mod manager;
pub mod persist;
pub mod plan;
pub mod pool;
pub mod units;

pub use config::NavalConfig;
pub use docks::{shore_access, Dock, DockRegistry, LandingZones};
pub use error::TransportError;
pub use fleet::{best_ship_template, ShipGoal};
pub use harbor::Harbor;
pub use manager::NavalManager;
pub use persist::{NavalState, PlanRecord, UnitRecord};
pub use plan::{PlanState, Reroute, TransportPlan};
pub use pool::{FishSea, Ship, ShipPool};
pub use units::{OnBoard, Passenger, UnitLedger};
