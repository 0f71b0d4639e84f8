// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `neurolab.toml`.

use serde::{Deserialize, Serialize};

/// Learning modes accepted by `training.learning_mode`
pub const LEARNING_MODES: &[&str] = &["standard", "inverse", "bidirectional"];

/// Resampling strategies accepted by `training.resample`
pub const RESAMPLE_STRATEGIES: &[&str] = &["sequential", "shuffle", "bootstrap"];

/// Rib layouts accepted by `recurrent.layout`
pub const RIB_LAYOUTS: &[&str] = &["outin", "parallel"];

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NeurolabConfig {
    pub training: TrainingSection,
    pub topology: TopologySection,
    pub recurrent: RecurrentSection,
    pub logging: LoggingSection,
}

/// Backpropagation and training loop settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainingSection {
    pub learning_rate: f64,
    pub max_iteration: usize,
    /// Termination threshold on the mean output error magnitude
    pub epsilon: f64,
    pub check_threshold: bool,
    pub learn_bias: bool,
    pub learning_mode: String,
    /// `true` averages errors over the whole sample, `false` learns per record
    pub batch: bool,
    pub resample: String,
    pub random_z_data: bool,
    pub seed: u64,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iteration: 1000,
            epsilon: 0.001,
            check_threshold: true,
            learn_bias: true,
            learning_mode: "standard".to_string(),
            batch: false,
            resample: "sequential".to_string(),
            random_z_data: false,
            seed: 0,
        }
    }
}

/// Network shape settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TopologySection {
    /// Hidden layer sizes between the input and output layers
    pub hidden_layers: Vec<usize>,
    pub hidden_activation: String,
    pub output_activation: String,
    /// Initial weights are drawn from `[-weight_range, weight_range)`
    pub weight_range: f64,
    /// 0 means scalar neurons, otherwise vector neurons of this length
    pub vector_len: usize,
    /// 1 for plain neurons, 4 for gated (LSTM) neurons
    pub gate_count: usize,
}

impl Default for TopologySection {
    fn default() -> Self {
        Self {
            hidden_layers: vec![3],
            hidden_activation: "sigmoid".to_string(),
            output_activation: "sigmoid".to_string(),
            weight_range: 1.0,
            vector_len: 0,
            gate_count: 1,
        }
    }
}

/// Time-unrolling settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecurrentSection {
    pub states: usize,
    pub layout: String,
    /// Gated (LSTM) cells on hidden layers
    pub cell: bool,
    /// Applied after the gate fold; empty means none
    pub aux_activation: String,
}

impl Default for RecurrentSection {
    fn default() -> Self {
        Self {
            states: 1,
            layout: "outin".to_string(),
            cell: false,
            aux_activation: String::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    /// Crates logged at debug level regardless of `level`
    pub debug_crates: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug_crates: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: NeurolabConfig = toml::from_str(
            r#"
            [training]
            learning_rate = 0.5

            [recurrent]
            states = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.training.learning_rate, 0.5);
        assert_eq!(config.training.max_iteration, 1000);
        assert_eq!(config.recurrent.states, 3);
        assert_eq!(config.recurrent.layout, "outin");
        assert_eq!(config.topology.hidden_layers, vec![3]);
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = NeurolabConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: NeurolabConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
