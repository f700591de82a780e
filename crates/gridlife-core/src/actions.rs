//! The fixed action set: maps a brain's output levels onto queued world
//! effects and immediate self-modifications.
//!
//! Action levels arrive in `[-1, 1]`. The `Set*` family applies
//! unconditionally and takes effect immediately, including on this step's
//! firing gate; every other action fires only when its level's magnitude
//! beats half the agent's effective responsiveness. Movement contributions
//! accumulate into a float vector that is quantized to one cell at the end;
//! moves and kills are queued on the population, signal emission lands
//! immediately (signals are additive, so ordering only shifts magnitude).

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::grid::Grid;
use crate::population::Population;
use crate::rng::Rng32;
use crate::signals::SignalField;
use crate::{Coord, Direction};

/// Number of actions a brain can drive.
pub const NUM_ACTIONS: usize = 17;

/// Action identifiers; the discriminant is the action's output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    MoveX = 0,
    MoveY = 1,
    MoveForward = 2,
    MoveRightLeft = 3,
    MoveRandom = 4,
    MoveLeft = 5,
    MoveRight = 6,
    MoveReverse = 7,
    MoveEast = 8,
    MoveWest = 9,
    MoveNorth = 10,
    MoveSouth = 11,
    SetOscillatorPeriod = 12,
    SetLongProbeDist = 13,
    SetResponsiveness = 14,
    EmitSignal0 = 15,
    KillForward = 16,
}

/// Mutable world references action execution needs. The grid is read-only
/// here: cell changes go through the population's queues.
pub struct ActionEnv<'a> {
    pub grid: &'a Grid,
    pub signals: &'a mut SignalField,
    pub population: &'a mut Population,
    pub config: &'a SimConfig,
    pub rng: &'a mut Rng32,
}

/// Execute every action for the agent at `index` against its `levels`.
pub fn execute(index: u16, levels: &[f32; NUM_ACTIONS], env: &mut ActionEnv<'_>) {
    let level = |action: Action| levels[action as usize];

    // The Set* family first: responsiveness feeds the firing gate used by
    // everything below it in the same step.
    let (loc, fwd_dir, threshold) = {
        let agent = env.population.agent_mut(index);
        agent.responsiveness = (level(Action::SetResponsiveness) + 1.0) / 2.0;
        agent.osc_period =
            ((1.0 + (level(Action::SetOscillatorPeriod).abs() * 100.0).floor()) as u32).max(2);
        agent.long_probe_dist = ((1.0
            + (level(Action::SetLongProbeDist).abs() * env.config.long_probe_distance as f32)
                .floor()) as u32)
            .max(1);

        let k = env.config.responsiveness_curve_k_factor;
        let effective = 1.0 / (1.0 + (-k * (agent.responsiveness - 0.5) * 8.0).exp());
        (agent.loc, agent.last_move_dir, effective)
    };
    let fires = |value: f32| value.abs() > threshold * 0.5;

    if fires(level(Action::EmitSignal0)) {
        env.signals.emit(0, loc, 1.5);
    }

    if env.config.kill_enable && fires(level(Action::KillForward)) {
        let fwd = fwd_dir.offset();
        if fwd != Coord::new(0, 0) {
            let target = Coord::new(loc.x + fwd.x, loc.y + fwd.y);
            if env.grid.is_occupied(target) {
                if let Some(tag) = env.grid.at(target) {
                    if env.population.get(tag).is_some_and(|victim| victim.alive) {
                        env.population.queue_death(tag);
                    }
                }
            }
        }
    }

    // Accumulate the movement vector.
    let mut move_x = level(Action::MoveX);
    let mut move_y = level(Action::MoveY);
    let add_unit = |dir: Direction, move_x: &mut f32, move_y: &mut f32| {
        let offset = dir.offset();
        *move_x += offset.x as f32;
        *move_y += offset.y as f32;
    };

    let forward = level(Action::MoveForward);
    if fires(forward) {
        let offset = fwd_dir.offset();
        move_x += offset.x as f32 * forward;
        move_y += offset.y as f32 * forward;
    }
    let right_left = level(Action::MoveRightLeft);
    if fires(right_left) {
        let dir = if right_left > 0.0 {
            fwd_dir.rotate90_cw()
        } else {
            fwd_dir.rotate90_ccw()
        };
        add_unit(dir, &mut move_x, &mut move_y);
    }
    if fires(level(Action::MoveRandom)) {
        let dir = Direction::COMPASS[env.rng.next_int(8) as usize];
        add_unit(dir, &mut move_x, &mut move_y);
    }
    if fires(level(Action::MoveLeft)) {
        add_unit(fwd_dir.rotate90_ccw(), &mut move_x, &mut move_y);
    }
    if fires(level(Action::MoveRight)) {
        add_unit(fwd_dir.rotate90_cw(), &mut move_x, &mut move_y);
    }
    if fires(level(Action::MoveReverse)) {
        add_unit(fwd_dir.rotate180(), &mut move_x, &mut move_y);
    }
    if fires(level(Action::MoveEast)) {
        add_unit(Direction::East, &mut move_x, &mut move_y);
    }
    if fires(level(Action::MoveWest)) {
        add_unit(Direction::West, &mut move_x, &mut move_y);
    }
    if fires(level(Action::MoveNorth)) {
        add_unit(Direction::North, &mut move_x, &mut move_y);
    }
    if fires(level(Action::MoveSouth)) {
        add_unit(Direction::South, &mut move_x, &mut move_y);
    }

    // Quantize to a single-cell step and queue it. The last-move direction
    // updates immediately even though the move itself is deferred.
    let dx = if move_x.abs() > 0.5 {
        move_x.signum() as i32
    } else {
        0
    };
    let dy = if move_y.abs() > 0.5 {
        move_y.signum() as i32
    } else {
        0
    };
    if (dx, dy) != (0, 0) {
        let target = Coord::new(loc.x + dx, loc.y + dy);
        if env.grid.is_empty(target) {
            env.population.queue_move(index, target);
            env.population.agent_mut(index).last_move_dir = Direction::from_offset(dx, dy);
        }
    }
}
