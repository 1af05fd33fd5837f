//! Transport claims on land units.
//!
//! A unit in the ledger is claimed by exactly one transport plan and carries
//! its boarding status and unloading position. A unit not in the ledger is
//! free. Releasing a unit removes every trace of the claim at once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::TransportError;
use crate::world::{EntityId, PlanId, Position};

/// Boarding status of a claimed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnBoard {
    /// No ship assigned yet.
    Unassigned,
    /// Walking to the given ship.
    Boarding(EntityId),
    /// Garrisoned in the given ship.
    Aboard(EntityId),
}

impl OnBoard {
    /// The ship this status refers to, if any.
    pub fn ship(self) -> Option<EntityId> {
        match self {
            OnBoard::Unassigned => None,
            OnBoard::Boarding(s) | OnBoard::Aboard(s) => Some(s),
        }
    }
}

/// Transport metadata of one claimed unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Passenger {
    pub id: EntityId,
    pub transport: PlanId,
    pub on_board: OnBoard,
    pub end_pos: Position,
    pub siege: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UnitLedger {
    units: BTreeMap<EntityId, Passenger>,
}

impl UnitLedger {
    pub fn new() -> Self {
        UnitLedger::default()
    }

    /// Claims `unit` for `plan`. Fails if another plan already holds it.
    pub fn claim(&mut self, unit: EntityId, plan: PlanId, end_pos: Position, siege: bool) -> Result<(), TransportError> {
        if let Some(p) = self.units.get(&unit) {
            return Err(TransportError::UnitAlreadyClaimed { unit, plan: p.transport });
        }
        self.units.insert(
            unit,
            Passenger { id: unit, transport: plan, on_board: OnBoard::Unassigned, end_pos, siege },
        );
        Ok(())
    }

    /// Drops the claim on `unit`, returning what it carried.
    pub fn release(&mut self, unit: EntityId) -> Option<Passenger> {
        self.units.remove(&unit)
    }

    pub fn get(&self, unit: EntityId) -> Option<&Passenger> {
        self.units.get(&unit)
    }

    pub fn transport_of(&self, unit: EntityId) -> Option<PlanId> {
        self.units.get(&unit).map(|p| p.transport)
    }

    pub fn on_board(&self, unit: EntityId) -> Option<OnBoard> {
        self.units.get(&unit).map(|p| p.on_board)
    }

    pub fn set_on_board(&mut self, unit: EntityId, on_board: OnBoard) {
        if let Some(p) = self.units.get_mut(&unit) {
            p.on_board = on_board;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Passenger> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_exclusive() {
        let mut ledger = UnitLedger::new();
        let u = EntityId(7);
        ledger.claim(u, PlanId(1), Position::new(1.0, 1.0), false).unwrap();
        let err = ledger.claim(u, PlanId(2), Position::new(2.0, 2.0), false).unwrap_err();
        assert!(matches!(err, TransportError::UnitAlreadyClaimed { plan: PlanId(1), .. }));
        assert_eq!(ledger.transport_of(u), Some(PlanId(1)));
    }

    #[test]
    fn release_clears_everything() {
        let mut ledger = UnitLedger::new();
        let u = EntityId(7);
        ledger.claim(u, PlanId(1), Position::new(1.0, 1.0), true).unwrap();
        ledger.set_on_board(u, OnBoard::Aboard(EntityId(3)));
        let p = ledger.release(u).unwrap();
        assert_eq!(p.on_board, OnBoard::Aboard(EntityId(3)));
        assert!(p.siege);
        assert!(ledger.get(u).is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn on_board_ship() {
        assert_eq!(OnBoard::Unassigned.ship(), None);
        assert_eq!(OnBoard::Boarding(EntityId(2)).ship(), Some(EntityId(2)));
        assert_eq!(OnBoard::Aboard(EntityId(5)).ship(), Some(EntityId(5)));
    }
}
