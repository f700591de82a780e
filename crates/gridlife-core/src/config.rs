//! Static simulation configuration.

use serde::{Deserialize, Serialize};

use crate::barriers::BarrierType;
use crate::rng::Rng32;
use crate::survival::SurvivalCriterion;
use crate::SimError;

/// All recognized simulation options. Grid dimensions, barrier type and
/// signal layer count are structural: changing them requires a reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of agents spawned each generation.
    pub population: u16,
    /// Steps per generation before survival is evaluated.
    pub steps_per_generation: u32,
    /// Generation count after which a driving host should stop.
    pub max_generations: u32,
    /// Grid width in cells.
    pub size_x: u16,
    /// Grid height in cells.
    pub size_y: u16,
    /// Bounds for initial random genome lengths, inclusive.
    pub genome_initial_length_min: u32,
    pub genome_initial_length_max: u32,
    /// Hard cap on genome length under insertion mutations.
    pub genome_max_length: u16,
    /// Internal neurons available to each brain.
    pub max_number_neurons: u16,
    /// Per-gene probability of a single bit flip.
    pub point_mutation_rate: f64,
    /// Per-child probability of one structural genome edit.
    pub gene_insertion_deletion_rate: f64,
    /// Share of structural edits that delete rather than insert.
    pub deletion_ratio: f64,
    /// Crossover when at least two survivors exist; cloning otherwise.
    pub sexual_reproduction: bool,
    /// Binary tournament by center distance instead of uniform selection.
    pub choose_parents_by_fitness: bool,
    /// Active survival criteria, combined with OR. Empty accepts everyone.
    pub survival_criteria: Vec<SurvivalCriterion>,
    /// Barrier layout written before placement.
    pub barrier_type: BarrierType,
    /// Steepness of the responsiveness firing curve.
    pub responsiveness_curve_k_factor: f32,
    /// Number of pheromone layers.
    pub signal_layers: u16,
    /// Neighborhood radius for signal density sensing.
    pub signal_sensor_radius: f32,
    /// Default and maximum scale for the long probe distance.
    pub long_probe_distance: u32,
    /// Raycast distance for the short barrier/population probes.
    pub short_probe_barrier_distance: u32,
    /// Whether the kill action is honored.
    pub kill_enable: bool,
    /// Seed for the shared PRNG; drawn from entropy when absent.
    pub rng_seed: Option<u32>,
    /// Neighborhood radius for the population density sensor.
    pub population_sensor_radius: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            population: 300,
            steps_per_generation: 300,
            max_generations: 200,
            size_x: 128,
            size_y: 128,
            genome_initial_length_min: 24,
            genome_initial_length_max: 24,
            genome_max_length: 300,
            max_number_neurons: 5,
            point_mutation_rate: 0.001,
            gene_insertion_deletion_rate: 0.0,
            deletion_ratio: 0.5,
            sexual_reproduction: true,
            choose_parents_by_fitness: true,
            survival_criteria: vec![SurvivalCriterion::Circle],
            barrier_type: BarrierType::None,
            responsiveness_curve_k_factor: 2.0,
            signal_layers: 1,
            signal_sensor_radius: 2.0,
            long_probe_distance: 16,
            short_probe_barrier_distance: 4,
            kill_enable: false,
            rng_seed: None,
            population_sensor_radius: 2.5,
        }
    }
}

impl SimConfig {
    /// Validate every option, returning the first violated constraint.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.size_x < 2 || self.size_y < 2 {
            return Err(SimError::InvalidConfig(
                "grid dimensions must be at least 2x2",
            ));
        }
        if self.population == u16::MAX {
            return Err(SimError::InvalidConfig(
                "population must leave room for the barrier sentinel",
            ));
        }
        if self.steps_per_generation == 0 {
            return Err(SimError::InvalidConfig(
                "steps_per_generation must be positive",
            ));
        }
        if self.genome_initial_length_min == 0
            || self.genome_initial_length_min > self.genome_initial_length_max
            || self.genome_initial_length_max > u32::from(self.genome_max_length)
        {
            return Err(SimError::InvalidConfig(
                "genome lengths must satisfy 1 <= min <= max <= genome_max_length",
            ));
        }
        if self.max_number_neurons == 0 {
            return Err(SimError::InvalidConfig(
                "max_number_neurons must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.point_mutation_rate)
            || !(0.0..=1.0).contains(&self.gene_insertion_deletion_rate)
            || !(0.0..=1.0).contains(&self.deletion_ratio)
        {
            return Err(SimError::InvalidConfig(
                "mutation rates and deletion_ratio must lie in [0, 1]",
            ));
        }
        if self.signal_layers == 0 {
            return Err(SimError::InvalidConfig("signal_layers must be positive"));
        }
        if self.long_probe_distance == 0 || self.short_probe_barrier_distance == 0 {
            return Err(SimError::InvalidConfig("probe distances must be positive"));
        }
        if self.signal_sensor_radius <= 0.0
            || self.population_sensor_radius <= 0.0
            || self.responsiveness_curve_k_factor <= 0.0
        {
            return Err(SimError::InvalidConfig(
                "sensor radii and the responsiveness curve factor must be positive",
            ));
        }
        Ok(())
    }

    /// The shared PRNG: seeded when configured, from entropy otherwise.
    #[must_use]
    pub(crate) fn seeded_rng(&self) -> Rng32 {
        match self.rng_seed {
            Some(seed) => Rng32::new(seed),
            None => Rng32::new(rand::random()),
        }
    }

    /// Whether switching to `next` needs a full reset (structural change).
    #[must_use]
    pub fn requires_reset(&self, next: &SimConfig) -> bool {
        self.size_x != next.size_x
            || self.size_y != next.size_y
            || self.barrier_type != next.barrier_type
            || self.signal_layers != next.signal_layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_grid() {
        let config = SimConfig {
            size_x: 1,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_genome_bounds() {
        let config = SimConfig {
            genome_initial_length_min: 10,
            genome_initial_length_max: 5,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
        let config = SimConfig {
            genome_initial_length_max: 1000,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_rates() {
        let config = SimConfig {
            point_mutation_rate: 1.5,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
        let config = SimConfig {
            deletion_ratio: -0.1,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let config = SimConfig {
            rng_seed: Some(123),
            ..SimConfig::default()
        };
        let mut a = config.seeded_rng();
        let mut b = config.seeded_rng();
        assert_eq!(a.next_u32(), b.next_u32());
    }

    #[test]
    fn structural_changes_require_reset() {
        let base = SimConfig::default();
        let mut next = base.clone();
        next.kill_enable = true;
        assert!(!base.requires_reset(&next));
        next.size_x = 64;
        assert!(base.requires_reset(&next));
        let mut next = base.clone();
        next.barrier_type = BarrierType::Spots;
        assert!(base.requires_reset(&next));
    }

    #[test]
    fn round_trips_through_json() {
        let config = SimConfig::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let back: SimConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(config, back);
    }
}
