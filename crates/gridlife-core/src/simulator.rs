//! Composition root: owns the world state and the generation/step loop.
//!
//! All randomness flows through the single owned PRNG in a fixed order:
//! barriers, then genome generation, then placement, then per-step
//! sensor/action draws in agent-index order, then survival statistics and
//! spawning. Reordering any consumer changes every downstream outcome, so
//! the order itself is part of the public contract.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::actions::{self, ActionEnv};
use crate::agent::{Agent, AgentInfo};
use crate::barriers;
use crate::brain::NeuralNet;
use crate::config::SimConfig;
use crate::genome::{genetic_diversity, Genome};
use crate::grid::{Grid, BARRIER_CELL, EMPTY_CELL};
use crate::population::Population;
use crate::rng::Rng32;
use crate::sensors::{self, SensorEnv};
use crate::signals::SignalField;
use crate::spawner::{self, Survivor};
use crate::survival;
use crate::{Coord, SimError};

/// Placement gives up on an agent after this many random-cell draws.
const PLACEMENT_ATTEMPTS: u32 = 10_000;

/// Summary of one completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: u32,
    /// Agents still alive when the generation ended.
    pub population: usize,
    pub survivors: usize,
    /// `survivors / population`, 0 when nothing survived to be counted.
    pub survival_rate: f32,
    pub genetic_diversity: f32,
    pub genome_length_avg: f32,
    pub genome_length_min: usize,
    pub genome_length_max: usize,
    /// Deaths drained from the kill queue during the generation.
    pub kill_deaths: u32,
}

/// Renderable copy of the world, transferred by value across the host
/// boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub generation: u32,
    pub sim_step: u32,
    pub size_x: u16,
    pub size_y: u16,
    /// Row-major cell tags as little-endian 16-bit words.
    pub grid_bytes: Vec<u8>,
    /// Row-major layer-0 signal magnitudes.
    pub signal_bytes: Vec<u8>,
    /// Row-major RGB triplets; empty and barrier cells are black.
    pub color_bytes: Vec<u8>,
    pub stats: Option<GenerationStats>,
    pub history: Vec<GenerationStats>,
}

/// Reply to an inspect query that found an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectReport {
    pub info: AgentInfo,
    pub network: NeuralNet,
}

/// The evolution core. Owns grid, signals, population, config and the
/// reproducible PRNG.
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimConfig,
    rng: Rng32,
    grid: Grid,
    signals: SignalField,
    population: Population,
    colors: Vec<[u8; 3]>,
    generation: u32,
    sim_step: u32,
    kill_deaths: u32,
    history: Vec<GenerationStats>,
}

impl Simulator {
    /// Validate `config`, then build and populate generation zero.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let rng = config.seeded_rng();
        let grid = Grid::new(config.size_x, config.size_y);
        let signals = SignalField::new(
            config.size_x,
            config.size_y,
            usize::from(config.signal_layers),
        );
        let mut simulator = Self {
            rng,
            grid,
            signals,
            population: Population::new(),
            colors: vec![[0, 0, 0]],
            generation: 0,
            sim_step: 0,
            kill_deaths: 0,
            history: Vec::new(),
            config,
        };
        simulator.init();
        Ok(simulator)
    }

    /// Reset to generation zero: fresh barriers, fresh random genomes.
    fn init(&mut self) {
        self.generation = 0;
        self.sim_step = 0;
        self.kill_deaths = 0;
        self.history.clear();
        self.grid.clear();
        self.signals.clear();
        barriers::place(&mut self.grid, self.config.barrier_type, &mut self.rng);
        let genomes = self.random_genomes();
        self.place_agents(genomes);
        self.rebuild_colors();
    }

    fn random_genomes(&mut self) -> Vec<Genome> {
        (0..self.config.population)
            .map(|_| {
                let length = self.rng.next_range(
                    self.config.genome_initial_length_min,
                    self.config.genome_initial_length_max,
                );
                Genome::random(length as usize, &mut self.rng)
            })
            .collect()
    }

    /// Place one agent per genome at a random empty cell. Each placement
    /// retries random draws up to a fixed budget; exhaustion stops placing
    /// the remaining agents rather than failing the generation.
    fn place_agents(&mut self, genomes: Vec<Genome>) {
        self.population.clear();
        for genome in genomes {
            let Some(loc) = self.random_empty_cell() else {
                break;
            };
            let index = self.population.next_index();
            let agent = Agent::spawn(
                index,
                loc,
                genome,
                usize::from(self.config.max_number_neurons),
                self.config.long_probe_distance,
            );
            self.population.push(agent);
            self.grid.set(loc, index);
        }
    }

    fn random_empty_cell(&mut self) -> Option<Coord> {
        for _ in 0..PLACEMENT_ATTEMPTS {
            let x = self.rng.next_int(u32::from(self.config.size_x)) as i32;
            let y = self.rng.next_int(u32::from(self.config.size_y)) as i32;
            let loc = Coord::new(x, y);
            if self.grid.is_empty(loc) {
                return Some(loc);
            }
        }
        None
    }

    fn rebuild_colors(&mut self) {
        self.colors = std::iter::once([0, 0, 0])
            .chain(
                self.population
                    .indices()
                    .map(|index| self.population.agent(index).genome.color()),
            )
            .collect();
    }

    /// Advance one step: every living agent senses, thinks and acts in
    /// ascending index order, then deaths and moves drain, signals fade and
    /// the step counter increments. Atomic from the host's perspective.
    pub fn step_once(&mut self) {
        for index in self.population.indices() {
            if !self.population.agent(index).alive {
                continue;
            }
            let sensor_values = {
                let env = SensorEnv {
                    grid: &self.grid,
                    signals: &self.signals,
                    population: &self.population,
                    config: &self.config,
                    sim_step: self.sim_step,
                };
                sensors::gather(self.population.agent(index), &env, &mut self.rng)
            };
            let levels = self
                .population
                .agent_mut(index)
                .brain
                .feed_forward(&sensor_values);
            let mut env = ActionEnv {
                grid: &self.grid,
                signals: &mut self.signals,
                population: &mut self.population,
                config: &self.config,
                rng: &mut self.rng,
            };
            actions::execute(index, &levels, &mut env);
            self.population.agent_mut(index).age += 1;
        }

        self.kill_deaths += self.population.drain_deaths(&mut self.grid);
        self.population.drain_moves(&mut self.grid);
        self.signals.fade_all();
        self.sim_step += 1;
    }

    /// Step to the generation boundary, then evaluate and respawn.
    pub fn run_generation(&mut self) -> GenerationStats {
        while self.sim_step < self.config.steps_per_generation {
            self.step_once();
        }
        self.end_generation()
    }

    /// Evaluate survival, record statistics, and build the next
    /// generation's world.
    pub fn end_generation(&mut self) -> GenerationStats {
        let survivor_indices = survival::survivors(&self.population, &self.grid, &self.config);
        let stats = self.generation_stats(&survivor_indices);
        self.history.push(stats.clone());

        let survivors: Vec<Survivor> = survivor_indices
            .iter()
            .map(|&index| {
                let agent = self.population.agent(index);
                Survivor {
                    loc: agent.loc,
                    genome: agent.genome.clone(),
                }
            })
            .collect();
        let genomes = spawner::next_generation(&survivors, &self.config, &mut self.rng);

        self.grid.clear();
        self.signals.clear();
        barriers::place(&mut self.grid, self.config.barrier_type, &mut self.rng);
        self.place_agents(genomes);
        self.rebuild_colors();

        self.generation += 1;
        self.sim_step = 0;
        self.kill_deaths = 0;
        stats
    }

    fn generation_stats(&mut self, survivor_indices: &[u16]) -> GenerationStats {
        let living: Vec<&Agent> = self.population.living().collect();
        let genomes: Vec<&Genome> = living.iter().map(|agent| &agent.genome).collect();
        let diversity = genetic_diversity(&genomes, 100, &mut self.rng);

        let lengths: Vec<usize> = genomes.iter().map(|genome| genome.len()).collect();
        let (length_avg, length_min, length_max) = if lengths.is_empty() {
            (0.0, 0, 0)
        } else {
            (
                lengths.iter().sum::<usize>() as f32 / lengths.len() as f32,
                *lengths.iter().min().unwrap_or(&0),
                *lengths.iter().max().unwrap_or(&0),
            )
        };

        GenerationStats {
            generation: self.generation,
            population: living.len(),
            survivors: survivor_indices.len(),
            survival_rate: if living.is_empty() {
                0.0
            } else {
                survivor_indices.len() as f32 / living.len() as f32
            },
            genetic_diversity: diversity,
            genome_length_avg: length_avg,
            genome_length_min: length_min,
            genome_length_max: length_max,
            kill_deaths: self.kill_deaths,
        }
    }

    /// Agent details at `(x, y)`, or `None` when the cell holds no agent.
    #[must_use]
    pub fn inspect(&self, x: i32, y: i32) -> Option<InspectReport> {
        let loc = Coord::new(x, y);
        if !self.grid.is_occupied(loc) {
            return None;
        }
        let tag = self.grid.at(loc)?;
        let agent = self.population.get(tag)?;
        Some(InspectReport {
            info: AgentInfo::from_agent(agent),
            network: agent.brain.clone(),
        })
    }

    /// Full renderable snapshot, copied out of the live buffers.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        let cells = self.grid.cells();
        let grid_bytes: Vec<u8> = cells
            .par_iter()
            .flat_map_iter(|cell| cell.to_le_bytes())
            .collect();
        let colors = &self.colors;
        let color_bytes: Vec<u8> = cells
            .par_iter()
            .flat_map_iter(|&cell| match cell {
                EMPTY_CELL | BARRIER_CELL => [0, 0, 0],
                index => colors
                    .get(usize::from(index))
                    .copied()
                    .unwrap_or([0, 0, 0]),
            })
            .collect();

        StateSnapshot {
            generation: self.generation,
            sim_step: self.sim_step,
            size_x: self.config.size_x,
            size_y: self.config.size_y,
            grid_bytes,
            signal_bytes: self.signals.layer(0).to_vec(),
            color_bytes,
            stats: self.history.last().cloned(),
            history: self.history.clone(),
        }
    }

    /// Merge a non-structural config update into the running simulation.
    /// Structural changes (grid size, barriers, signal layers) are refused;
    /// callers reset instead.
    pub fn update_config(&mut self, next: SimConfig) -> Result<(), SimError> {
        next.validate()?;
        if self.config.requires_reset(&next) {
            return Err(SimError::InvalidConfig(
                "grid, barrier and signal-layer changes require a reset",
            ));
        }
        self.config = next;
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    #[must_use]
    pub const fn sim_step(&self) -> u32 {
        self.sim_step
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn signals(&self) -> &SignalField {
        &self.signals
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }
}
