//! Bookkeeping shared by the manager and its transport plans.

use super::config::NavalConfig;
use super::docks::DockRegistry;
use super::pool::ShipPool;
use super::units::UnitLedger;

/// Ships, claimed units and docks of one player. The manager owns it and
/// lends it to a plan for the duration of each plan call.
#[derive(Debug, Clone, Default)]
pub struct Harbor {
    pub ships: ShipPool,
    pub units: UnitLedger,
    pub docks: DockRegistry,
    pub config: NavalConfig,
}

impl Harbor {
    pub fn new(config: NavalConfig) -> Self {
        Harbor {
            ships: ShipPool::new(),
            units: UnitLedger::new(),
            docks: DockRegistry::new(),
            config,
        }
    }
}
