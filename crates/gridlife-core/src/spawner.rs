//! Produces the next generation's genomes from the survivor pool.

use crate::config::SimConfig;
use crate::genome::Genome;
use crate::rng::Rng32;
use crate::Coord;

/// Snapshot of one survivor taken before the world is cleared for the next
/// generation.
#[derive(Debug, Clone)]
pub struct Survivor {
    pub loc: Coord,
    pub genome: Genome,
}

/// Build `config.population` child genomes. With no survivors the next
/// generation restarts from random genomes; otherwise children come from
/// crossover (sexual, two or more survivors) or cloning, followed by the
/// mutation pipeline.
#[must_use]
pub fn next_generation(
    survivors: &[Survivor],
    config: &SimConfig,
    rng: &mut Rng32,
) -> Vec<Genome> {
    let mut genomes = Vec::with_capacity(usize::from(config.population));
    for _ in 0..config.population {
        let mut child = if survivors.is_empty() {
            let length = rng.next_range(
                config.genome_initial_length_min,
                config.genome_initial_length_max,
            );
            Genome::random(length as usize, rng)
        } else if config.sexual_reproduction && survivors.len() >= 2 {
            let parent1 = select_parent(survivors, config, rng);
            let mut parent2 = select_parent(survivors, config, rng);
            // Prefer a distinct partner; after ten failed draws the child
            // crosses the same parent with itself.
            let mut retries = 0;
            while parent2 == parent1 && retries < 10 {
                parent2 = select_parent(survivors, config, rng);
                retries += 1;
            }
            Genome::crossover(
                &survivors[parent1].genome,
                &survivors[parent2].genome,
                rng,
            )
        } else {
            let parent = select_parent(survivors, config, rng);
            survivors[parent].genome.clone()
        };

        child.apply_point_mutations(config.point_mutation_rate, rng);
        child.apply_insertion_deletion(
            config.gene_insertion_deletion_rate,
            config.deletion_ratio,
            usize::from(config.genome_max_length),
            rng,
        );
        genomes.push(child);
    }
    genomes
}

/// Pick one survivor index. Uniform when fitness-based choice is off or
/// only one survivor remains; otherwise a binary tournament won by the
/// smaller Manhattan distance to the grid center (ties keep the first
/// pick).
fn select_parent(survivors: &[Survivor], config: &SimConfig, rng: &mut Rng32) -> usize {
    let n = survivors.len() as u32;
    if !config.choose_parents_by_fitness || survivors.len() == 1 {
        return rng.next_int(n) as usize;
    }
    let center = Coord::new(
        i32::from(config.size_x) / 2,
        i32::from(config.size_y) / 2,
    );
    let first = rng.next_int(n) as usize;
    let second = rng.next_int(n) as usize;
    let distance = |index: usize| {
        let loc = survivors[index].loc;
        (loc.x - center.x).abs() + (loc.y - center.y).abs()
    };
    if distance(second) < distance(first) {
        second
    } else {
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survivor(x: i32, y: i32, genome: Genome) -> Survivor {
        Survivor {
            loc: Coord::new(x, y),
            genome,
        }
    }

    fn test_config() -> SimConfig {
        SimConfig {
            size_x: 16,
            size_y: 16,
            population: 20,
            genome_initial_length_min: 4,
            genome_initial_length_max: 8,
            genome_max_length: 32,
            point_mutation_rate: 0.0,
            gene_insertion_deletion_rate: 0.0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn empty_pool_restarts_from_random_genomes() {
        let config = test_config();
        let mut rng = Rng32::new(1);
        let genomes = next_generation(&[], &config, &mut rng);
        assert_eq!(genomes.len(), 20);
        for genome in &genomes {
            assert!((4..=8).contains(&genome.len()));
        }
    }

    #[test]
    fn lone_survivor_clones_asexually() {
        let mut config = test_config();
        config.sexual_reproduction = true;
        let mut rng = Rng32::new(2);
        let parent = Genome::random(6, &mut rng);
        let genomes = next_generation(&[survivor(8, 8, parent.clone())], &config, &mut rng);
        assert!(genomes.iter().all(|child| *child == parent));
    }

    #[test]
    fn asexual_mode_clones_a_selected_parent() {
        let mut config = test_config();
        config.sexual_reproduction = false;
        let mut rng = Rng32::new(3);
        let a = Genome::random(4, &mut rng);
        let b = Genome::random(5, &mut rng);
        let pool = [survivor(2, 2, a.clone()), survivor(9, 9, b.clone())];
        let genomes = next_generation(&pool, &config, &mut rng);
        assert!(genomes.iter().all(|child| *child == a || *child == b));
    }

    #[test]
    fn sexual_mode_crosses_two_parents() {
        let mut config = test_config();
        config.sexual_reproduction = true;
        config.choose_parents_by_fitness = false;
        let mut rng = Rng32::new(4);
        let a = Genome::random(10, &mut rng);
        let b = Genome::random(10, &mut rng);
        let pool = [survivor(2, 2, a.clone()), survivor(9, 9, b.clone())];
        let genomes = next_generation(&pool, &config, &mut rng);
        assert_eq!(genomes.len(), 20);
        for child in &genomes {
            assert!(!child.is_empty());
            // Degenerate cuts fall back to one random gene; any longer
            // child is built purely from parent genes.
            if child.len() > 1 {
                for gene in child.genes() {
                    let word = gene.pack();
                    assert!(
                        a.genes().iter().any(|g| g.pack() == word)
                            || b.genes().iter().any(|g| g.pack() == word)
                    );
                }
            }
        }
    }

    #[test]
    fn tournament_prefers_the_center() {
        let mut config = test_config();
        config.sexual_reproduction = false;
        config.choose_parents_by_fitness = true;
        config.population = 200;
        let mut rng = Rng32::new(5);
        let central = Genome::random(4, &mut rng);
        let marginal = Genome::random(4, &mut rng);
        let pool = [
            survivor(8, 8, central.clone()),
            survivor(0, 0, marginal.clone()),
        ];
        let genomes = next_generation(&pool, &config, &mut rng);
        // The central parent wins every tournament it enters, so it is
        // cloned whenever at least one of the two draws picks it.
        let central_children = genomes.iter().filter(|child| **child == central).count();
        let marginal_children = genomes.len() - central_children;
        assert!(central_children > marginal_children);
    }

    #[test]
    fn mutation_pipeline_runs_after_selection() {
        let mut config = test_config();
        config.sexual_reproduction = false;
        config.point_mutation_rate = 1.0;
        let mut rng = Rng32::new(6);
        let parent = Genome::random(6, &mut rng);
        let genomes = next_generation(&[survivor(8, 8, parent.clone())], &config, &mut rng);
        // Every gene flips exactly one bit, so no child matches the parent.
        assert!(genomes.iter().all(|child| *child != parent));
        assert!(genomes.iter().all(|child| child.len() == 6));
    }

    #[test]
    fn output_length_matches_population() {
        let mut config = test_config();
        config.population = 7;
        let mut rng = Rng32::new(7);
        let parent = Genome::random(4, &mut rng);
        let genomes = next_generation(&[survivor(1, 1, parent)], &config, &mut rng);
        assert_eq!(genomes.len(), 7);
    }
}
