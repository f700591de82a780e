//! Barrier patterns written into the grid before agents are placed.
//!
//! Patterns that place randomly draw from the shared PRNG, so the barrier
//! layout is part of the reproducible stream.

use serde::{Deserialize, Serialize};

use crate::grid::{Grid, BARRIER_CELL};
use crate::rng::Rng32;
use crate::Coord;

/// Selectable barrier layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierType {
    #[default]
    None,
    VerticalBarConstant,
    VerticalBarRandom,
    HorizontalBarConstant,
    FiveBlocks,
    FloatingIslands,
    Spots,
}

/// Write the configured pattern into `grid`.
pub fn place(grid: &mut Grid, barrier: BarrierType, rng: &mut Rng32) {
    let size_x = grid.size_x();
    let size_y = grid.size_y();
    match barrier {
        BarrierType::None => {}
        BarrierType::VerticalBarConstant => {
            vertical_bar(grid, size_x / 2);
        }
        BarrierType::VerticalBarRandom => {
            let x = size_x / 4 + rng.next_int((size_x / 2) as u32) as i32;
            vertical_bar(grid, x);
        }
        BarrierType::HorizontalBarConstant => {
            let y = size_y / 2;
            for x in size_x / 4..size_x * 3 / 4 {
                grid.set(Coord::new(x, y), BARRIER_CELL);
            }
        }
        BarrierType::FiveBlocks => {
            let half_w = (size_x / 50).max(1);
            let half_h = (size_y / 6).max(4);
            // Centers come from float quarter-grid expressions, floored.
            let quarter_x = (size_x as f32 * 0.25).floor() as i32;
            let quarter_y = (size_y as f32 * 0.25).floor() as i32;
            let three_quarter_x = (size_x as f32 * 0.75).floor() as i32;
            let three_quarter_y = (size_y as f32 * 0.75).floor() as i32;
            let mid_x = (size_x as f32 * 0.5).floor() as i32;
            let mid_y = (size_y as f32 * 0.5).floor() as i32;
            let centers = [
                (quarter_x, quarter_y),
                (three_quarter_x, quarter_y),
                (quarter_x, three_quarter_y),
                (three_quarter_x, three_quarter_y),
                (mid_x, mid_y),
            ];
            for (cx, cy) in centers {
                for y in cy - half_h..=cy + half_h {
                    for x in cx - half_w..=cx + half_w {
                        grid.set(Coord::new(x, y), BARRIER_CELL);
                    }
                }
            }
        }
        BarrierType::FloatingIslands => {
            let radius = (size_x.min(size_y) / 12).max(2) as f32;
            // Island centers land in the central 70% of the grid; x is
            // drawn before y for each island.
            for _ in 0..5 {
                let x = (size_x as f64 * 0.15 + rng.next01() * size_x as f64 * 0.7) as i32;
                let y = (size_y as f64 * 0.15 + rng.next01() * size_y as f64 * 0.7) as i32;
                fill_disk(grid, Coord::new(x, y), radius);
            }
        }
        BarrierType::Spots => {
            let spacing = (size_x.min(size_y) / 4).max(1);
            let radius = (size_x.min(size_y) / 20).max(1) as f32;
            let mut y = spacing / 2;
            while y < size_y {
                let mut x = spacing / 2;
                while x < size_x {
                    fill_disk(grid, Coord::new(x, y), radius);
                    x += spacing;
                }
                y += spacing;
            }
        }
    }
}

fn vertical_bar(grid: &mut Grid, x: i32) {
    let size_y = grid.size_y();
    for y in size_y / 4..size_y * 3 / 4 {
        grid.set(Coord::new(x, y), BARRIER_CELL);
    }
}

fn fill_disk(grid: &mut Grid, center: Coord, radius: f32) {
    let mut cells = Vec::new();
    grid.visit_neighborhood(center, radius, &mut |cell| cells.push(cell));
    for cell in cells {
        grid.set(cell, BARRIER_CELL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn barrier_count(grid: &Grid) -> usize {
        grid.cells().iter().filter(|&&c| c == BARRIER_CELL).count()
    }

    #[test]
    fn none_leaves_the_grid_untouched() {
        let mut grid = Grid::new(32, 32);
        let mut rng = Rng32::new(1);
        place(&mut grid, BarrierType::None, &mut rng);
        assert_eq!(barrier_count(&grid), 0);
    }

    #[test]
    fn vertical_bar_spans_the_middle_half() {
        let mut grid = Grid::new(32, 32);
        let mut rng = Rng32::new(1);
        place(&mut grid, BarrierType::VerticalBarConstant, &mut rng);
        assert_eq!(barrier_count(&grid), 16);
        for y in 8..24 {
            assert!(grid.is_barrier(Coord::new(16, y)));
        }
        assert!(!grid.is_barrier(Coord::new(16, 7)));
        assert!(!grid.is_barrier(Coord::new(16, 24)));
    }

    #[test]
    fn horizontal_bar_is_the_dual() {
        let mut grid = Grid::new(32, 32);
        let mut rng = Rng32::new(1);
        place(&mut grid, BarrierType::HorizontalBarConstant, &mut rng);
        assert_eq!(barrier_count(&grid), 16);
        for x in 8..24 {
            assert!(grid.is_barrier(Coord::new(x, 16)));
        }
    }

    #[test]
    fn random_bar_is_reproducible_and_in_range() {
        let mut grid_a = Grid::new(32, 32);
        let mut grid_b = Grid::new(32, 32);
        let mut rng_a = Rng32::new(42);
        let mut rng_b = Rng32::new(42);
        place(&mut grid_a, BarrierType::VerticalBarRandom, &mut rng_a);
        place(&mut grid_b, BarrierType::VerticalBarRandom, &mut rng_b);
        assert_eq!(grid_a.cells(), grid_b.cells());
        let bar_x = (0..32)
            .find(|&x| grid_a.is_barrier(Coord::new(x, 8)))
            .expect("bar column");
        assert!((8..24).contains(&bar_x));
    }

    #[test]
    fn five_blocks_places_five_rectangles() {
        let mut grid = Grid::new(100, 100);
        let mut rng = Rng32::new(1);
        place(&mut grid, BarrierType::FiveBlocks, &mut rng);
        // half-size (2, 16): each block is 5 x 33 cells, none overlapping.
        assert_eq!(barrier_count(&grid), 5 * 5 * 33);
        assert!(grid.is_barrier(Coord::new(25, 25)));
        assert!(grid.is_barrier(Coord::new(75, 75)));
        assert!(grid.is_barrier(Coord::new(50, 50)));
    }

    #[test]
    fn floating_islands_consume_the_stream_deterministically() {
        let mut grid_a = Grid::new(64, 64);
        let mut grid_b = Grid::new(64, 64);
        let mut rng_a = Rng32::new(7);
        let mut rng_b = Rng32::new(7);
        place(&mut grid_a, BarrierType::FloatingIslands, &mut rng_a);
        place(&mut grid_b, BarrierType::FloatingIslands, &mut rng_b);
        assert_eq!(grid_a.cells(), grid_b.cells());
        assert!(barrier_count(&grid_a) > 0);
        // Ten draws, two per island.
        assert_eq!(rng_a.next_u32(), rng_b.next_u32());
    }

    #[test]
    fn spots_form_a_regular_lattice() {
        let mut grid = Grid::new(40, 40);
        let mut rng = Rng32::new(1);
        place(&mut grid, BarrierType::Spots, &mut rng);
        // Spacing 10, radius 2: lattice starts at (5, 5).
        assert!(grid.is_barrier(Coord::new(5, 5)));
        assert!(grid.is_barrier(Coord::new(15, 5)));
        assert!(grid.is_barrier(Coord::new(35, 35)));
        assert!(!grid.is_barrier(Coord::new(10, 10)));
    }
}
