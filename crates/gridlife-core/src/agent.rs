//! Per-individual state.

use serde::{Deserialize, Serialize};

use crate::brain::NeuralNet;
use crate::genome::Genome;
use crate::{Coord, Direction};

/// One creature. Created fresh at generation start (indices are reassigned
/// every generation) and lives until its death intent is drained.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    /// 1-based population index, stable for the agent's lifetime. Index 0
    /// is the reserved null slot.
    pub index: u16,
    pub alive: bool,
    pub loc: Coord,
    pub birth_loc: Coord,
    pub last_move_dir: Direction,
    pub genome: Genome,
    pub brain: NeuralNet,
    pub age: u32,
    /// Raw responsiveness in `[0, 1]`, gating action firing through the
    /// responsiveness curve.
    pub responsiveness: f32,
    /// Oscillator period in steps, at least 2.
    pub osc_period: u32,
    /// Long-probe raycast distance in cells, at least 1.
    pub long_probe_dist: u32,
}

impl Agent {
    /// Fresh agent at `loc` with a brain built from `genome`.
    #[must_use]
    pub fn spawn(
        index: u16,
        loc: Coord,
        genome: Genome,
        max_neurons: usize,
        long_probe_dist: u32,
    ) -> Self {
        let brain = NeuralNet::build(&genome, max_neurons);
        Self {
            index,
            alive: true,
            loc,
            birth_loc: loc,
            last_move_dir: Direction::Center,
            genome,
            brain,
            age: 0,
            responsiveness: 0.5,
            osc_period: 34,
            long_probe_dist,
        }
    }

    /// Placeholder occupying the reserved index-0 slot.
    #[must_use]
    pub(crate) fn null() -> Self {
        Self {
            index: 0,
            alive: false,
            loc: Coord::new(0, 0),
            birth_loc: Coord::new(0, 0),
            last_move_dir: Direction::Center,
            genome: Genome::default(),
            brain: NeuralNet::build(&Genome::default(), 1),
            age: 0,
            responsiveness: 0.0,
            osc_period: 2,
            long_probe_dist: 1,
        }
    }
}

/// Inspect-facing summary of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub index: u16,
    pub alive: bool,
    pub loc: Coord,
    pub birth_loc: Coord,
    pub last_move_dir: Direction,
    pub age: u32,
    pub responsiveness: f32,
    pub osc_period: u32,
    pub long_probe_dist: u32,
    pub genome_length: usize,
    pub color: [u8; 3],
}

impl AgentInfo {
    #[must_use]
    pub fn from_agent(agent: &Agent) -> Self {
        Self {
            index: agent.index,
            alive: agent.alive,
            loc: agent.loc,
            birth_loc: agent.birth_loc,
            last_move_dir: agent.last_move_dir,
            age: agent.age,
            responsiveness: agent.responsiveness,
            osc_period: agent.osc_period,
            long_probe_dist: agent.long_probe_dist,
            genome_length: agent.genome.len(),
            color: agent.genome.color(),
        }
    }
}
