// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Parameter Snapshots
//!
//! The trained-parameter artifact: every bias and every outgoing edge weight,
//! in arena order. Topology is not stored; a snapshot restores into a network
//! built with the same dimensions.
//!
//! ```text
//! NetworkSnapshot
//! ├── version
//! └── layers[LayerId]
//!     ├── biases[neuron]
//!     └── weights[neuron][edge slot]
//! ```

use std::fs;
use std::path::Path;

use neurolab_neural::NeuronValue;
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, NetworkResult};
use crate::topology::Network;

/// Current snapshot format version (increment when the layout changes)
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub biases: Vec<NeuronValue>,
    /// Outgoing edge weights per neuron, in edge slot order
    pub weights: Vec<Vec<NeuronValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub version: u32,
    pub layers: Vec<LayerSnapshot>,
}

impl NetworkSnapshot {
    pub fn to_json(&self) -> NetworkResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| NetworkError::Snapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> NetworkResult<Self> {
        let snapshot: NetworkSnapshot =
            serde_json::from_str(json).map_err(|e| NetworkError::Snapshot(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(NetworkError::Snapshot(format!(
                "version mismatch: file version {}, expected {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(snapshot)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> NetworkResult<()> {
        let json = self.to_json()?;
        fs::write(path.as_ref(), json).map_err(|e| {
            NetworkError::Snapshot(format!("cannot write {}: {}", path.as_ref().display(), e))
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> NetworkResult<Self> {
        let json = fs::read_to_string(path.as_ref()).map_err(|e| {
            NetworkError::Snapshot(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Number of stored weights
    pub fn weight_count(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|layer| layer.weights.iter())
            .map(Vec::len)
            .sum()
    }
}

impl Network {
    /// Copy every bias and edge weight
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            version: SNAPSHOT_VERSION,
            layers: self
                .layers
                .iter()
                .map(|layer| LayerSnapshot {
                    biases: layer.neurons.iter().map(|n| n.bias.to_value()).collect(),
                    weights: layer
                        .neurons
                        .iter()
                        .map(|n| n.edges.iter().map(|e| e.weight.to_value()).collect())
                        .collect(),
                })
                .collect(),
        }
    }

    /// Load biases and weights from `snapshot`
    ///
    /// The whole shape is checked before anything is written, so a rejected
    /// snapshot leaves the network untouched.
    ///
    /// # Errors
    /// `Snapshot` when layer, neuron or edge counts differ, or when a value
    /// does not fit the network's value kind.
    pub fn restore(&mut self, snapshot: &NetworkSnapshot) -> NetworkResult<()> {
        if snapshot.layers.len() != self.layers.len() {
            return Err(NetworkError::Snapshot(format!(
                "snapshot has {} layers, network has {}",
                snapshot.layers.len(),
                self.layers.len()
            )));
        }
        for (layer, stored) in self.layers.iter().zip(&snapshot.layers) {
            if stored.biases.len() != layer.size() || stored.weights.len() != layer.size() {
                return Err(NetworkError::Snapshot(format!(
                    "layer {} holds {} neurons, snapshot holds {}",
                    layer.id,
                    layer.size(),
                    stored.biases.len()
                )));
            }
            for (j, (neuron, weights)) in layer.neurons.iter().zip(&stored.weights).enumerate() {
                if neuron.edges.len() != weights.len() {
                    return Err(NetworkError::Snapshot(format!(
                        "neuron {}[{}] has {} edges, snapshot has {}",
                        layer.id,
                        j,
                        neuron.edges.len(),
                        weights.len()
                    )));
                }
            }
            let mismatch = stored
                .biases
                .iter()
                .chain(stored.weights.iter().flatten())
                .find(|value| !self.kind.matches(value));
            if let Some(value) = mismatch {
                return Err(NetworkError::Snapshot(format!(
                    "{} value in layer {} does not fit the network value kind",
                    value.representation(),
                    layer.id
                )));
            }
        }

        for (layer, stored) in self.layers.iter_mut().zip(&snapshot.layers) {
            for (j, neuron) in layer.neurons.iter_mut().enumerate() {
                neuron.bias.set(stored.biases[j].clone());
                for (edge, weight) in neuron.edges.iter_mut().zip(&stored.weights[j]) {
                    edge.weight.set(weight.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{LayerId, NeuronRef, TopologySettings};

    fn network(dims: &[usize], seed: u64) -> Network {
        let mut settings = TopologySettings::default();
        settings.seed = seed;
        let mut net = Network::new(settings);
        net.initialize(dims).unwrap();
        net
    }

    #[test]
    fn test_snapshot_restores_outputs() {
        let mut a = network(&[2, 3, 1], 1);
        let mut b = network(&[2, 3, 1], 2);
        let input = [NeuronValue::Scalar(0.3), NeuronValue::Scalar(-0.7)];
        assert_ne!(a.evaluate(&input).unwrap(), b.evaluate(&input).unwrap());

        let snapshot = a.snapshot();
        assert_eq!(snapshot.weight_count(), a.edge_count());
        b.restore(&snapshot).unwrap();
        assert_eq!(a.evaluate(&input).unwrap(), b.evaluate(&input).unwrap());
    }

    #[test]
    fn test_json_round_trip() {
        let net = network(&[2, 2], 5);
        let snapshot = net.snapshot();
        let parsed = NetworkSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_shape_mismatch_rejected_untouched() {
        let source = network(&[2, 3, 1], 1);
        let mut target = network(&[2, 2, 1], 2);
        let probe = NeuronRef::new(LayerId(0), 0);
        let before = target.edge_weight(probe, NeuronRef::new(LayerId(1), 0)).cloned();

        assert!(matches!(
            target.restore(&source.snapshot()),
            Err(NetworkError::Snapshot(_))
        ));
        let after = target.edge_weight(probe, NeuronRef::new(LayerId(1), 0)).cloned();
        assert_eq!(before, after);
    }

    #[test]
    fn test_representation_mismatch_rejected() {
        let mut net = network(&[1, 1], 1);
        let mut snapshot = net.snapshot();
        snapshot.layers[1].biases[0] = NeuronValue::Vector(vec![1.0, 2.0]);
        assert!(net.restore(&snapshot).is_err());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut snapshot = network(&[1, 1], 1).snapshot();
        snapshot.version = SNAPSHOT_VERSION + 1;
        let json = snapshot.to_json().unwrap();
        assert!(matches!(
            NetworkSnapshot::from_json(&json),
            Err(NetworkError::Snapshot(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let snapshot = network(&[2, 2, 1], 3).snapshot();
        snapshot.save(&path).unwrap();
        assert_eq!(NetworkSnapshot::load(&path).unwrap(), snapshot);
        assert!(NetworkSnapshot::load(dir.path().join("missing.json")).is_err());
    }
}
