//! World coordinates.
//!
//! Positions are 2D points on the ground plane in host world units. All
//! proximity checks in the naval subsystem compare squared distances.

use serde::{Deserialize, Serialize};

/// A point on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, z: f32) -> Self {
        Position { x, z }
    }

    /// Squared euclidean distance to another position.
    pub fn square_distance(self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    /// Returns this position shifted by `(dx, dz)`.
    pub fn offset(self, dx: f32, dz: f32) -> Position {
        Position::new(self.x + dx, self.z + dz)
    }

    /// Average of a set of positions, or None if the set is empty.
    pub fn centroid<I: IntoIterator<Item = Position>>(positions: I) -> Option<Position> {
        let mut sum_x = 0.0f32;
        let mut sum_z = 0.0f32;
        let mut n = 0usize;
        for p in positions {
            sum_x += p.x;
            sum_z += p.z;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(Position::new(sum_x / n as f32, sum_z / n as f32))
    }

    /// Exact coordinate equality, used to detect ships that did not move
    /// between two ticks.
    pub fn same_spot(self, other: Position) -> bool {
        self.x == other.x && self.z == other.z
    }
}
