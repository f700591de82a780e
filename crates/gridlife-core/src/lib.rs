//! Core types and the evolution loop for the gridlife simulator.
//!
//! A population of agents inhabits a discrete grid; each agent's genome
//! encodes a small feed-forward network wired between fixed sensors and
//! actions. Over a generation agents sense, decide and act; at the
//! boundary, survivors reproduce with crossover and mutation. Everything
//! is deterministic under a configured seed: the single [`rng::Rng32`]
//! owned by the [`Simulator`] is the sole source of randomness.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod actions;
pub mod agent;
pub mod barriers;
pub mod brain;
pub mod config;
pub mod genome;
pub mod grid;
pub mod population;
pub mod rng;
pub mod sensors;
pub mod signals;
pub mod spawner;
pub mod survival;

mod simulator;

pub use actions::{Action, NUM_ACTIONS};
pub use agent::{Agent, AgentInfo};
pub use barriers::BarrierType;
pub use brain::{Connection, NeuralNet, Neuron};
pub use config::SimConfig;
pub use genome::{Gene, Genome, SinkKind, SourceKind};
pub use grid::{Grid, BARRIER_CELL, EMPTY_CELL};
pub use population::Population;
pub use rng::Rng32;
pub use sensors::{Sensor, NUM_SENSORS};
pub use signals::SignalField;
pub use simulator::{GenerationStats, InspectReport, Simulator, StateSnapshot};
pub use survival::SurvivalCriterion;

/// Errors surfaced by the core.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Integer cell position. Valid world coordinates lie in
/// `[0, size_x) x [0, size_y)`; out-of-range values are legal intermediates
/// that read as boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The eight compass points plus `Center`. `Center` maps to a zero offset
/// and is fixed under rotation. The y axis grows southward (row-major
/// screen order).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    #[default]
    Center,
}

impl Direction {
    /// The compass ring in clockwise order. `MOVE_RANDOM` indexes this with
    /// a single PRNG draw.
    pub const COMPASS: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Unit cell offset of this direction.
    #[must_use]
    pub const fn offset(self) -> Coord {
        match self {
            Direction::North => Coord::new(0, -1),
            Direction::NorthEast => Coord::new(1, -1),
            Direction::East => Coord::new(1, 0),
            Direction::SouthEast => Coord::new(1, 1),
            Direction::South => Coord::new(0, 1),
            Direction::SouthWest => Coord::new(-1, 1),
            Direction::West => Coord::new(-1, 0),
            Direction::NorthWest => Coord::new(-1, -1),
            Direction::Center => Coord::new(0, 0),
        }
    }

    /// Compass direction matching the signs of `(dx, dy)`.
    #[must_use]
    pub const fn from_offset(dx: i32, dy: i32) -> Self {
        match (dx.signum(), dy.signum()) {
            (0, -1) => Direction::North,
            (1, -1) => Direction::NorthEast,
            (1, 0) => Direction::East,
            (1, 1) => Direction::SouthEast,
            (0, 1) => Direction::South,
            (-1, 1) => Direction::SouthWest,
            (-1, 0) => Direction::West,
            (-1, -1) => Direction::NorthWest,
            _ => Direction::Center,
        }
    }

    const fn ring_index(self) -> Option<usize> {
        match self {
            Direction::North => Some(0),
            Direction::NorthEast => Some(1),
            Direction::East => Some(2),
            Direction::SouthEast => Some(3),
            Direction::South => Some(4),
            Direction::SouthWest => Some(5),
            Direction::West => Some(6),
            Direction::NorthWest => Some(7),
            Direction::Center => None,
        }
    }

    #[must_use]
    pub fn rotate90_cw(self) -> Self {
        match self.ring_index() {
            Some(index) => Self::COMPASS[(index + 2) % 8],
            None => Direction::Center,
        }
    }

    #[must_use]
    pub fn rotate90_ccw(self) -> Self {
        match self.ring_index() {
            Some(index) => Self::COMPASS[(index + 6) % 8],
            None => Direction::Center,
        }
    }

    #[must_use]
    pub fn rotate180(self) -> Self {
        match self.ring_index() {
            Some(index) => Self::COMPASS[(index + 4) % 8],
            None => Direction::Center,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_round_trip_through_from_offset() {
        for dir in Direction::COMPASS {
            let offset = dir.offset();
            assert_eq!(Direction::from_offset(offset.x, offset.y), dir);
        }
        assert_eq!(Direction::from_offset(0, 0), Direction::Center);
        assert_eq!(Direction::Center.offset(), Coord::new(0, 0));
    }

    #[test]
    fn rotations_compose() {
        for dir in Direction::COMPASS {
            assert_eq!(dir.rotate90_cw().rotate90_ccw(), dir);
            assert_eq!(dir.rotate90_cw().rotate90_cw(), dir.rotate180());
            assert_eq!(dir.rotate180().rotate180(), dir);
        }
    }

    #[test]
    fn center_is_fixed_under_rotation() {
        assert_eq!(Direction::Center.rotate90_cw(), Direction::Center);
        assert_eq!(Direction::Center.rotate90_ccw(), Direction::Center);
        assert_eq!(Direction::Center.rotate180(), Direction::Center);
    }

    #[test]
    fn east_rotates_to_south_in_screen_coordinates() {
        assert_eq!(Direction::East.rotate90_cw(), Direction::South);
        assert_eq!(Direction::North.rotate90_cw(), Direction::East);
        assert_eq!(Direction::North.rotate90_ccw(), Direction::West);
    }
}
