//! Survival criteria evaluated at generation end.
//!
//! Each criterion is a predicate over an agent and the world; an agent
//! survives when any active criterion accepts it. An empty criterion list
//! accepts every living agent.

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::config::SimConfig;
use crate::grid::Grid;
use crate::population::Population;
use crate::{Coord, Direction};

/// Selectable survival predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurvivalCriterion {
    /// Within a central disk of radius `min(size_x, size_y) / 4`.
    Circle,
    /// Strictly right of `size_x * 7 / 8`.
    RightEighth,
    /// Strictly left of `size_x / 8`.
    LeftEighth,
    /// Central region thresholded against the half-diagonal.
    CenterWeighted,
    /// Near any of the four corners.
    CornerWeighted,
    /// At least one occupied cell in the radius-1.5 neighborhood.
    Pairs,
    /// At least one occupied 4-connected neighbor.
    Contact,
    /// On the outermost ring of the grid.
    AgainstAnyWall,
    /// Within one cell of any boundary.
    TouchAnyWall,
}

impl SurvivalCriterion {
    /// Whether `agent` satisfies this criterion.
    #[must_use]
    pub fn passes(self, agent: &Agent, grid: &Grid) -> bool {
        let size_x = grid.size_x();
        let size_y = grid.size_y();
        let loc = agent.loc;
        match self {
            SurvivalCriterion::Circle => {
                let center_x = size_x as f32 / 2.0;
                let center_y = size_y as f32 / 2.0;
                let dx = loc.x as f32 - center_x;
                let dy = loc.y as f32 - center_y;
                (dx * dx + dy * dy).sqrt() <= size_x.min(size_y) as f32 / 4.0
            }
            SurvivalCriterion::RightEighth => loc.x > size_x * 7 / 8,
            SurvivalCriterion::LeftEighth => loc.x < size_x / 8,
            SurvivalCriterion::CenterWeighted => {
                let half_x = size_x as f32 / 2.0;
                let half_y = size_y as f32 / 2.0;
                let dx = loc.x as f32 - half_x;
                let dy = loc.y as f32 - half_y;
                let max_diag = (half_x * half_x + half_y * half_y).sqrt();
                1.0 - (dx * dx + dy * dy).sqrt() / max_diag > 0.5
            }
            SurvivalCriterion::CornerWeighted => {
                let limit =
                    0.25 * ((size_x * size_x + size_y * size_y) as f32).sqrt() / 2.0;
                let corners = [
                    Coord::new(0, 0),
                    Coord::new(size_x - 1, 0),
                    Coord::new(0, size_y - 1),
                    Coord::new(size_x - 1, size_y - 1),
                ];
                corners.iter().any(|corner| {
                    let dx = (loc.x - corner.x) as f32;
                    let dy = (loc.y - corner.y) as f32;
                    (dx * dx + dy * dy).sqrt() < limit
                })
            }
            SurvivalCriterion::Pairs => {
                let mut found = false;
                grid.visit_neighborhood(loc, 1.5, &mut |cell| {
                    if cell != loc && grid.is_occupied(cell) {
                        found = true;
                    }
                });
                found
            }
            SurvivalCriterion::Contact => [
                Direction::North,
                Direction::East,
                Direction::South,
                Direction::West,
            ]
            .iter()
            .any(|dir| {
                let offset = dir.offset();
                grid.is_occupied(Coord::new(loc.x + offset.x, loc.y + offset.y))
            }),
            SurvivalCriterion::AgainstAnyWall => {
                loc.x == 0 || loc.y == 0 || loc.x == size_x - 1 || loc.y == size_y - 1
            }
            SurvivalCriterion::TouchAnyWall => {
                loc.x <= 1 || loc.y <= 1 || loc.x >= size_x - 2 || loc.y >= size_y - 2
            }
        }
    }
}

/// Indices of the living agents that satisfy any active criterion, in
/// ascending index order. No active criteria means everyone living
/// survives.
#[must_use]
pub fn survivors(population: &Population, grid: &Grid, config: &SimConfig) -> Vec<u16> {
    population
        .indices()
        .filter(|&index| {
            let agent = population.agent(index);
            if !agent.alive {
                return false;
            }
            config.survival_criteria.is_empty()
                || config
                    .survival_criteria
                    .iter()
                    .any(|criterion| criterion.passes(agent, grid))
        })
        .collect()
}
