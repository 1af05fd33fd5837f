//! Errors of the naval subsystem.
//!
//! None of these are fatal: the manager logs them and keeps running. They
//! exist so internal paths can propagate with `?`.

use crate::world::{EntityId, PlanId, RegionId};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("entity {0} cannot be garrisoned on a ship")]
    NotTransportable(EntityId),

    #[error("unit {unit} is already claimed by {plan}")]
    UnitAlreadyClaimed { unit: EntityId, plan: PlanId },

    #[error("ship {ship} is already claimed by {plan}")]
    ShipAlreadyClaimed { ship: EntityId, plan: PlanId },

    #[error("no sea connects {start} to {end}")]
    NoSeaBetween { start: RegionId, end: RegionId },

    #[error("{0} is no longer boarding")]
    PlanNotBoarding(PlanId),

    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("unknown {0}")]
    UnknownPlan(PlanId),

    #[error("cannot restore naval state: {0}")]
    Restore(String),

    #[error("naval state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
