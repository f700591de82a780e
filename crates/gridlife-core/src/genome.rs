//! Genome encoding and genetic operators.
//!
//! A gene is one packed 32-bit word describing a single weighted connection
//! between a sensor or internal neuron and an internal neuron or action:
//!
//! ```text
//! [31 source kind][30..24 source id][23 sink kind][22..16 sink id][15..0 weight]
//! ```
//!
//! The codec is a bijection over all 32-bit words; raw IDs are 7 bits wide
//! and remapped modulo the target range only when a network is built.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::rng::Rng32;

/// Where a connection draws its input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// An internal neuron's persistent output.
    Neuron,
    /// One of the fixed sensors.
    Sensor,
}

/// Where a connection delivers its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SinkKind {
    /// An internal neuron accumulator.
    Neuron,
    /// One of the fixed actions.
    Action,
}

/// One structured gene. `weight` is a fixed-point value; the real weight is
/// `weight / 8192`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
    pub source_kind: SourceKind,
    pub source_id: u8,
    pub sink_kind: SinkKind,
    pub sink_id: u8,
    pub weight: i16,
}

impl Gene {
    /// Divisor turning the packed 16-bit weight into a float weight.
    pub const WEIGHT_SCALE: f32 = 8192.0;

    const ID_MASK: u32 = 0x7F;

    /// Decode a packed 32-bit word. Total for any input.
    #[must_use]
    pub fn unpack(raw: u32) -> Self {
        Self {
            source_kind: if raw >> 31 & 1 == 1 {
                SourceKind::Sensor
            } else {
                SourceKind::Neuron
            },
            source_id: (raw >> 24 & Self::ID_MASK) as u8,
            sink_kind: if raw >> 23 & 1 == 1 {
                SinkKind::Action
            } else {
                SinkKind::Neuron
            },
            sink_id: (raw >> 16 & Self::ID_MASK) as u8,
            weight: (raw & 0xFFFF) as u16 as i16,
        }
    }

    /// Encode back into the packed form. `unpack` then `pack` round-trips
    /// exactly for every 32-bit word.
    #[must_use]
    pub fn pack(self) -> u32 {
        let source_kind = u32::from(self.source_kind == SourceKind::Sensor) << 31;
        let source_id = (u32::from(self.source_id) & Self::ID_MASK) << 24;
        let sink_kind = u32::from(self.sink_kind == SinkKind::Action) << 23;
        let sink_id = (u32::from(self.sink_id) & Self::ID_MASK) << 16;
        let weight = u32::from(self.weight as u16);
        source_kind | source_id | sink_kind | sink_id | weight
    }

    /// Real-valued connection weight.
    #[must_use]
    pub fn weight_f(self) -> f32 {
        f32::from(self.weight) / Self::WEIGHT_SCALE
    }

    /// Gene decoded from one uniform random word.
    #[must_use]
    pub fn random(rng: &mut Rng32) -> Self {
        Self::unpack(rng.next_u32())
    }
}

/// Ordered sequence of genes. Equality is elementwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genome {
    genes: Vec<Gene>,
}

impl Genome {
    #[must_use]
    pub fn from_genes(genes: Vec<Gene>) -> Self {
        Self { genes }
    }

    /// `length` genes decoded from uniform random words.
    #[must_use]
    pub fn random(length: usize, rng: &mut Rng32) -> Self {
        Self {
            genes: (0..length).map(|_| Gene::random(rng)).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    #[must_use]
    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    /// Independently for each gene, with probability `rate` flip one
    /// uniformly chosen bit of its packed form.
    pub fn apply_point_mutations(&mut self, rate: f64, rng: &mut Rng32) {
        for gene in &mut self.genes {
            if rng.chance(rate) {
                let bit = rng.next_int(32);
                *gene = Gene::unpack(gene.pack() ^ (1 << bit));
            }
        }
    }

    /// With probability `rate`, delete one random gene (probability
    /// `deletion_ratio`, only when more than one remains) or insert one
    /// random gene at a random position (only below `max_len`). At most one
    /// structural edit per call.
    pub fn apply_insertion_deletion(
        &mut self,
        rate: f64,
        deletion_ratio: f64,
        max_len: usize,
        rng: &mut Rng32,
    ) {
        if !rng.chance(rate) {
            return;
        }
        if rng.chance(deletion_ratio) {
            if self.genes.len() > 1 {
                let idx = rng.next_int(self.genes.len() as u32) as usize;
                self.genes.remove(idx);
            }
        } else if self.genes.len() < max_len {
            let idx = rng.next_int(self.genes.len() as u32 + 1) as usize;
            self.genes.insert(idx, Gene::random(rng));
        }
    }

    /// Single-point crossover: cut points are drawn independently in each
    /// parent, and the child is the first parent's prefix joined to the
    /// second parent's suffix. An empty parent yields a clone of the other;
    /// an empty child is replaced by one random gene.
    #[must_use]
    pub fn crossover(parent1: &Genome, parent2: &Genome, rng: &mut Rng32) -> Genome {
        if parent1.is_empty() {
            return parent2.clone();
        }
        if parent2.is_empty() {
            return parent1.clone();
        }
        let cut1 = rng.next_int(parent1.len() as u32) as usize;
        let cut2 = rng.next_int(parent2.len() as u32) as usize;
        let mut genes = Vec::with_capacity(cut1 + parent2.len().saturating_sub(cut2 + 1));
        genes.extend_from_slice(&parent1.genes[..cut1]);
        genes.extend_from_slice(&parent2.genes[cut2 + 1..]);
        if genes.is_empty() {
            return Genome::random(1, rng);
        }
        Genome { genes }
    }

    /// Jaccard similarity over the sets of packed gene words. Two empty
    /// genomes are identical (1.0); one empty genome shares nothing (0.0).
    #[must_use]
    pub fn similarity(&self, other: &Genome) -> f32 {
        if self.is_empty() && other.is_empty() {
            return 1.0;
        }
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let a: HashSet<u32> = self.genes.iter().map(|g| g.pack()).collect();
        let b: HashSet<u32> = other.genes.iter().map(|g| g.pack()).collect();
        let intersection = a.intersection(&b).count();
        let union = a.len() + b.len() - intersection;
        intersection as f32 / union as f32
    }

    /// Stable color derived from the packed genes, for rendering. The hash
    /// folds each gene with `h = (h << 5) - h + gene`, then maps the low
    /// bits onto hue and the upper bytes onto saturation and lightness.
    #[must_use]
    pub fn color(&self) -> [u8; 3] {
        if self.is_empty() {
            return [128, 128, 128];
        }
        let mut hash: u32 = 0;
        for gene in &self.genes {
            hash = (hash << 5).wrapping_sub(hash).wrapping_add(gene.pack());
        }
        let hue = (hash & 0xFFFF) as f32 / 65535.0 * 360.0;
        let saturation = 0.7 + (hash >> 16 & 0xFF) as f32 / 255.0 * 0.3;
        let lightness = 0.4 + (hash >> 24 & 0xFF) as f32 / 255.0 * 0.2;
        hsl_to_rgb(hue, saturation, lightness)
    }
}

/// Mean pairwise genetic distance (`1 - similarity`) over `samples` random
/// pairs of distinct indices. Populations below two genomes have no pairs
/// and report 0.
#[must_use]
pub fn genetic_diversity(genomes: &[&Genome], samples: usize, rng: &mut Rng32) -> f32 {
    if genomes.len() < 2 {
        return 0.0;
    }
    let n = genomes.len() as u32;
    let mut total = 0.0f32;
    for _ in 0..samples {
        let a = rng.next_int(n) as usize;
        let b = loop {
            let b = rng.next_int(n) as usize;
            if b != a {
                break b;
            }
        };
        total += 1.0 - genomes[a].similarity(genomes[b]);
    }
    total / samples as f32
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> [u8; 3] {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    [
        ((r + m).clamp(0.0, 1.0) * 255.0).round() as u8,
        ((g + m).clamp(0.0, 1.0) * 255.0).round() as u8,
        ((b + m).clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn codec_round_trips_arbitrary_words() {
        let mut rng = Rng32::new(0xC0DE_C0DE);
        for _ in 0..10_000 {
            let raw = RngCore::next_u32(&mut rng);
            assert_eq!(Gene::unpack(raw).pack(), raw);
        }
        for raw in [0, u32::MAX, 0x8000_0000, 0x0080_0000, 0x0000_8000] {
            assert_eq!(Gene::unpack(raw).pack(), raw);
        }
    }

    #[test]
    fn codec_bit_layout() {
        let gene = Gene {
            source_kind: SourceKind::Sensor,
            source_id: 0x7F,
            sink_kind: SinkKind::Neuron,
            sink_id: 0x7F,
            weight: -1,
        };
        assert_eq!(gene.pack(), 0xFF7F_FFFF);
    }

    #[test]
    fn weight_sign_interpretation() {
        assert_eq!(Gene::unpack(0x0000_FFFF).weight, -1);
        assert_eq!(Gene::unpack(0x0000_8000).weight, -32768);
        assert_eq!(Gene::unpack(0x0000_7FFF).weight, 32767);
        assert!((Gene::unpack(0x0000_2000).weight_f() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn point_mutation_flips_exactly_one_bit() {
        let mut rng = Rng32::new(5);
        let mut genome = Genome::random(8, &mut rng);
        let before: Vec<u32> = genome.genes().iter().map(|g| g.pack()).collect();
        genome.apply_point_mutations(1.0, &mut rng);
        for (old, new) in before.iter().zip(genome.genes()) {
            assert_eq!((old ^ new.pack()).count_ones(), 1);
        }
    }

    #[test]
    fn point_mutation_rate_zero_is_identity() {
        let mut rng = Rng32::new(5);
        let mut genome = Genome::random(8, &mut rng);
        let before = genome.clone();
        genome.apply_point_mutations(0.0, &mut rng);
        assert_eq!(genome, before);
    }

    #[test]
    fn insertion_respects_max_length() {
        let mut rng = Rng32::new(9);
        let mut genome = Genome::random(4, &mut rng);
        // deletion_ratio 0 forces the insert branch whenever rate fires
        genome.apply_insertion_deletion(1.0, 0.0, 4, &mut rng);
        assert_eq!(genome.len(), 4);
        genome.apply_insertion_deletion(1.0, 0.0, 8, &mut rng);
        assert_eq!(genome.len(), 5);
    }

    #[test]
    fn deletion_never_empties_the_genome() {
        let mut rng = Rng32::new(13);
        let mut genome = Genome::random(1, &mut rng);
        genome.apply_insertion_deletion(1.0, 1.0, 8, &mut rng);
        assert_eq!(genome.len(), 1);
        let mut genome = Genome::random(3, &mut rng);
        genome.apply_insertion_deletion(1.0, 1.0, 8, &mut rng);
        assert_eq!(genome.len(), 2);
    }

    #[test]
    fn crossover_with_empty_parent_clones_the_other() {
        let mut rng = Rng32::new(21);
        let parent = Genome::random(6, &mut rng);
        let child = Genome::crossover(&parent, &Genome::default(), &mut rng);
        assert_eq!(child, parent);
        let child = Genome::crossover(&Genome::default(), &parent, &mut rng);
        assert_eq!(child, parent);
    }

    #[test]
    fn crossover_child_is_prefix_plus_suffix() {
        let mut rng = Rng32::new(31);
        let parent1 = Genome::random(10, &mut rng);
        let parent2 = Genome::random(10, &mut rng);
        let child = Genome::crossover(&parent1, &parent2, &mut rng);
        assert!(!child.is_empty());
        // Every child gene comes from a parent, unless the cut points
        // produced the single-random-gene fallback.
        if child.len() > 1 {
            for gene in child.genes() {
                let word = gene.pack();
                let from_p1 = parent1.genes().iter().any(|g| g.pack() == word);
                let from_p2 = parent2.genes().iter().any(|g| g.pack() == word);
                assert!(from_p1 || from_p2);
            }
        }
    }

    #[test]
    fn similarity_bounds_and_symmetry() {
        let mut rng = Rng32::new(77);
        let a = Genome::random(12, &mut rng);
        let b = Genome::random(12, &mut rng);
        assert_eq!(a.similarity(&a), 1.0);
        let ab = a.similarity(&b);
        assert!((0.0..=1.0).contains(&ab));
        assert_eq!(ab, b.similarity(&a));
        assert_eq!(Genome::default().similarity(&Genome::default()), 1.0);
        assert_eq!(a.similarity(&Genome::default()), 0.0);
    }

    #[test]
    fn diversity_of_clones_is_zero() {
        let mut rng = Rng32::new(3);
        let genome = Genome::random(8, &mut rng);
        let pop: Vec<&Genome> = vec![&genome; 5];
        assert_eq!(genetic_diversity(&pop, 50, &mut rng), 0.0);
    }

    #[test]
    fn diversity_needs_two_genomes() {
        let mut rng = Rng32::new(3);
        let genome = Genome::random(8, &mut rng);
        assert_eq!(genetic_diversity(&[&genome], 50, &mut rng), 0.0);
        assert_eq!(genetic_diversity(&[], 50, &mut rng), 0.0);
    }

    #[test]
    fn color_is_stable_and_gray_for_empty() {
        let mut rng = Rng32::new(55);
        let genome = Genome::random(10, &mut rng);
        assert_eq!(genome.color(), genome.clone().color());
        assert_eq!(Genome::default().color(), [128, 128, 128]);
    }
}
