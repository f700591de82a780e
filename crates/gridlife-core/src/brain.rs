//! Builds a runnable feed-forward network from a genome.
//!
//! Gene endpoints are resolved into dense index spaces (sensor, action,
//! internal neuron) once at build time; the result is a flat connection
//! list plus a small contiguous array of neuron state. Internal neuron
//! outputs persist between steps, which is how recurrent structure is
//! expressed without cyclic ownership.

use serde::{Deserialize, Serialize};

use crate::genome::{Genome, SinkKind, SourceKind};
use crate::{NUM_ACTIONS, NUM_SENSORS};

/// One resolved connection. IDs are post-remap: sensors in
/// `[0, NUM_SENSORS)`, actions in `[0, NUM_ACTIONS)`, neurons in
/// `[0, max_neurons)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source_kind: SourceKind,
    pub source_id: u16,
    pub sink_kind: SinkKind,
    pub sink_id: u16,
    pub weight: f32,
}

/// Internal neuron state. `driven` marks neurons with at least one inbound
/// connection surviving the prune.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    pub output: f32,
    pub driven: bool,
}

/// Built network: ordered connections plus persistent neuron state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNet {
    pub connections: Vec<Connection>,
    pub neurons: Vec<Neuron>,
}

impl NeuralNet {
    /// Resolve `genome` against `max_neurons` internal neurons, then prune
    /// to a fixed point: no surviving connection reads an undriven neuron.
    #[must_use]
    pub fn build(genome: &Genome, max_neurons: usize) -> Self {
        let mut connections: Vec<Connection> = genome
            .genes()
            .iter()
            .map(|gene| {
                let source_id = match gene.source_kind {
                    SourceKind::Sensor => u16::from(gene.source_id) % NUM_SENSORS as u16,
                    SourceKind::Neuron => u16::from(gene.source_id) % max_neurons as u16,
                };
                let sink_id = match gene.sink_kind {
                    SinkKind::Action => u16::from(gene.sink_id) % NUM_ACTIONS as u16,
                    SinkKind::Neuron => u16::from(gene.sink_id) % max_neurons as u16,
                };
                Connection {
                    source_kind: gene.source_kind,
                    source_id,
                    sink_kind: gene.sink_kind,
                    sink_id,
                    weight: gene.weight_f(),
                }
            })
            .collect();

        // Iterate removal of connections sourced from undriven neurons
        // until an iteration removes nothing. Order of the survivors is the
        // original gene order.
        let driven = loop {
            let mut driven = vec![false; max_neurons];
            for connection in &connections {
                if connection.sink_kind == SinkKind::Neuron {
                    driven[connection.sink_id as usize] = true;
                }
            }
            let before = connections.len();
            connections.retain(|connection| {
                connection.source_kind != SourceKind::Neuron
                    || driven[connection.source_id as usize]
            });
            if connections.len() == before {
                break driven;
            }
        };

        let neurons = driven
            .into_iter()
            .map(|driven| Neuron {
                output: 0.5,
                driven,
            })
            .collect();

        Self {
            connections,
            neurons,
        }
    }

    /// One forward pass: accumulate weighted contributions in connection
    /// order, then squash. Driven neurons latch `tanh` of their
    /// accumulator; everything else keeps its previous output.
    pub fn feed_forward(&mut self, sensors: &[f32; NUM_SENSORS]) -> [f32; NUM_ACTIONS] {
        let mut neuron_acc = vec![0.0f32; self.neurons.len()];
        let mut action_acc = [0.0f32; NUM_ACTIONS];

        for connection in &self.connections {
            let source = match connection.source_kind {
                SourceKind::Sensor => sensors[connection.source_id as usize],
                SourceKind::Neuron => self.neurons[connection.source_id as usize].output,
            };
            let contribution = source * connection.weight;
            match connection.sink_kind {
                SinkKind::Action => action_acc[connection.sink_id as usize] += contribution,
                SinkKind::Neuron => neuron_acc[connection.sink_id as usize] += contribution,
            }
        }

        for (neuron, acc) in self.neurons.iter_mut().zip(&neuron_acc) {
            if neuron.driven {
                neuron.output = acc.tanh();
            }
        }

        let mut levels = [0.0f32; NUM_ACTIONS];
        for (level, acc) in levels.iter_mut().zip(&action_acc) {
            *level = acc.tanh();
        }
        levels
    }
}
