//! The fixed sensor set: pure functions from agent and world state to a
//! scalar in `[0, 1]`.
//!
//! Directional sensors look along `fwd`, the unit offset of the agent's
//! last move. A `Center` last-move direction degenerates to a zero offset;
//! probes then report their documented neutral defaults instead of
//! scanning in place. Out-of-bounds cells read as boundary (for barrier
//! probes) or empty (for everything else). Sensors never mutate world
//! state; only `Random` consumes the shared PRNG.

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::config::SimConfig;
use crate::grid::Grid;
use crate::population::Population;
use crate::rng::Rng32;
use crate::signals::SignalField;
use crate::Coord;

/// Number of sensors wired into each brain.
pub const NUM_SENSORS: usize = 21;

/// Sensor identifiers; the discriminant is the sensor's input index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Sensor {
    LocX = 0,
    LocY = 1,
    BoundaryDistX = 2,
    BoundaryDistY = 3,
    BoundaryDist = 4,
    LastMoveDirX = 5,
    LastMoveDirY = 6,
    GeneticSimForward = 7,
    LongProbePopulationForward = 8,
    LongProbeBarrierForward = 9,
    Population = 10,
    PopulationForward = 11,
    PopulationLeftRight = 12,
    Oscillator1 = 13,
    Age = 14,
    BarrierForward = 15,
    BarrierLeftRight = 16,
    Random = 17,
    Signal0 = 18,
    Signal0Forward = 19,
    Signal0LeftRight = 20,
}

impl Sensor {
    /// Every sensor in input-index order.
    pub const ALL: [Sensor; NUM_SENSORS] = [
        Sensor::LocX,
        Sensor::LocY,
        Sensor::BoundaryDistX,
        Sensor::BoundaryDistY,
        Sensor::BoundaryDist,
        Sensor::LastMoveDirX,
        Sensor::LastMoveDirY,
        Sensor::GeneticSimForward,
        Sensor::LongProbePopulationForward,
        Sensor::LongProbeBarrierForward,
        Sensor::Population,
        Sensor::PopulationForward,
        Sensor::PopulationLeftRight,
        Sensor::Oscillator1,
        Sensor::Age,
        Sensor::BarrierForward,
        Sensor::BarrierLeftRight,
        Sensor::Random,
        Sensor::Signal0,
        Sensor::Signal0Forward,
        Sensor::Signal0LeftRight,
    ];
}

/// World references a sensor read needs. Everything is borrowed at
/// step-start state; queued effects from earlier agents in the same step
/// are not visible here.
pub struct SensorEnv<'a> {
    pub grid: &'a Grid,
    pub signals: &'a SignalField,
    pub population: &'a Population,
    pub config: &'a SimConfig,
    pub sim_step: u32,
}

/// Read every sensor for `agent`, clamped into `[0, 1]`.
pub fn gather(agent: &Agent, env: &SensorEnv<'_>, rng: &mut Rng32) -> [f32; NUM_SENSORS] {
    let mut values = [0.0f32; NUM_SENSORS];
    for sensor in Sensor::ALL {
        values[sensor as usize] = read(sensor, agent, env, rng).clamp(0.0, 1.0);
    }
    values
}

/// Evaluate one sensor.
pub fn read(sensor: Sensor, agent: &Agent, env: &SensorEnv<'_>, rng: &mut Rng32) -> f32 {
    let size_x = i32::from(env.config.size_x);
    let size_y = i32::from(env.config.size_y);
    let loc = agent.loc;
    let fwd = agent.last_move_dir.offset();
    let right = agent.last_move_dir.rotate90_cw().offset();
    let left = agent.last_move_dir.rotate90_ccw().offset();
    let short_probe = env.config.short_probe_barrier_distance;

    match sensor {
        Sensor::LocX => loc.x as f32 / (size_x - 1) as f32,
        Sensor::LocY => loc.y as f32 / (size_y - 1) as f32,
        Sensor::BoundaryDistX => {
            loc.x.min(size_x - 1 - loc.x) as f32 / (size_x as f32 / 2.0)
        }
        Sensor::BoundaryDistY => {
            loc.y.min(size_y - 1 - loc.y) as f32 / (size_y as f32 / 2.0)
        }
        Sensor::BoundaryDist => {
            let dist_x = loc.x.min(size_x - 1 - loc.x);
            let dist_y = loc.y.min(size_y - 1 - loc.y);
            dist_x.min(dist_y) as f32 / (size_x.min(size_y) as f32 / 2.0)
        }
        Sensor::LastMoveDirX => (fwd.x as f32 + 1.0) / 2.0,
        Sensor::LastMoveDirY => (fwd.y as f32 + 1.0) / 2.0,
        Sensor::GeneticSimForward => {
            let ahead = Coord::new(loc.x + fwd.x, loc.y + fwd.y);
            match env.grid.at(ahead) {
                Some(tag) if env.grid.is_occupied(ahead) => env
                    .population
                    .get(tag)
                    .filter(|other| other.alive)
                    .map_or(0.0, |other| agent.genome.similarity(&other.genome)),
                _ => 0.0,
            }
        }
        Sensor::LongProbePopulationForward => {
            let count = probe_population(env.grid, loc, fwd, agent.long_probe_dist);
            (count as f32 / agent.long_probe_dist as f32).min(1.0)
        }
        Sensor::LongProbeBarrierForward => {
            match probe_barrier(env.grid, loc, fwd, agent.long_probe_dist) {
                Some(dist) => dist as f32 / agent.long_probe_dist as f32,
                None => 1.0,
            }
        }
        Sensor::Population => {
            let mut occupied = 0u32;
            let mut total = 0u32;
            env.grid
                .visit_neighborhood(loc, env.config.population_sensor_radius, &mut |cell| {
                    total += 1;
                    if env.grid.is_occupied(cell) {
                        occupied += 1;
                    }
                });
            if total == 0 {
                0.0
            } else {
                occupied as f32 / total as f32
            }
        }
        Sensor::PopulationForward => {
            let count = probe_population(env.grid, loc, fwd, short_probe);
            (count as f32 / short_probe as f32).min(1.0)
        }
        Sensor::PopulationLeftRight => {
            let right_count = probe_population(env.grid, loc, right, short_probe) as f32;
            let left_count = probe_population(env.grid, loc, left, short_probe) as f32;
            if right_count + left_count == 0.0 {
                0.5
            } else {
                right_count / (right_count + left_count)
            }
        }
        Sensor::Oscillator1 => {
            let period = agent.osc_period;
            let phase = (env.sim_step % period) as f32 / period as f32;
            ((std::f32::consts::TAU * phase).sin() + 1.0) / 2.0
        }
        Sensor::Age => agent.age as f32 / env.config.steps_per_generation as f32,
        Sensor::BarrierForward => {
            if fwd == Coord::new(0, 0) {
                return 1.0;
            }
            match probe_barrier(env.grid, loc, fwd, short_probe) {
                Some(dist) => 1.0 - dist as f32 / (short_probe as f32 + 1.0),
                None => 0.0,
            }
        }
        Sensor::BarrierLeftRight => {
            let right_hit = probe_barrier(env.grid, loc, right, short_probe).is_some();
            let left_hit = probe_barrier(env.grid, loc, left, short_probe).is_some();
            match (right_hit, left_hit) {
                (true, false) => 0.0,
                (false, true) => 1.0,
                _ => 0.5,
            }
        }
        Sensor::Random => rng.next01() as f32,
        Sensor::Signal0 => env
            .signals
            .density(0, loc, env.config.signal_sensor_radius),
        Sensor::Signal0Forward => env.signals.density(
            0,
            Coord::new(loc.x + fwd.x, loc.y + fwd.y),
            env.config.signal_sensor_radius,
        ),
        Sensor::Signal0LeftRight => {
            let right_cell =
                f32::from(env.signals.cell(0, Coord::new(loc.x + right.x, loc.y + right.y)))
                    / 255.0;
            let left_cell =
                f32::from(env.signals.cell(0, Coord::new(loc.x + left.x, loc.y + left.y)))
                    / 255.0;
            if right_cell + left_cell == 0.0 {
                0.5
            } else {
                right_cell / (right_cell + left_cell)
            }
        }
    }
}

/// Count occupied cells stepping `delta` from `start` up to `limit` cells,
/// stopping at the first barrier or boundary. A zero delta probes nothing.
fn probe_population(grid: &Grid, start: Coord, delta: Coord, limit: u32) -> u32 {
    if delta == Coord::new(0, 0) {
        return 0;
    }
    let mut count = 0;
    for step in 1..=limit as i32 {
        let cell = Coord::new(start.x + delta.x * step, start.y + delta.y * step);
        if !grid.is_in_bounds(cell) || grid.is_barrier(cell) {
            break;
        }
        if grid.is_occupied(cell) {
            count += 1;
        }
    }
    count
}

/// Distance to the first barrier or boundary stepping `delta` from `start`,
/// or `None` when nothing is hit within `limit` cells. A zero delta never
/// hits.
fn probe_barrier(grid: &Grid, start: Coord, delta: Coord, limit: u32) -> Option<u32> {
    if delta == Coord::new(0, 0) {
        return None;
    }
    for step in 1..=limit as i32 {
        let cell = Coord::new(start.x + delta.x * step, start.y + delta.y * step);
        if !grid.is_in_bounds(cell) || grid.is_barrier(cell) {
            return Some(step as u32);
        }
    }
    None
}
