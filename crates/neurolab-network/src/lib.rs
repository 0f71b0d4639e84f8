// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neurolab Network
//!
//! Layered networks over the [`neurolab_neural`] value algebra:
//! - **topology**: layer/neuron/edge arena, stacked levels, neighbour queries
//! - **forward**: pull-based evaluation with gate slots
//! - **backprop**: standard and inverse-function backpropagation
//! - **recurrent**: time-unrolled states and LSTM-style gated cells
//! - **training**: the training loop with pause/stop control
//! - **snapshot**: trained-parameter artifacts
//!
//! ## Example
//! ```
//! use neurolab_network::{Network, TopologySettings, Trainer, TrainingConfig, TrainingControl, Record};
//!
//! let mut net = Network::new(TopologySettings::default());
//! net.initialize(&[2, 3, 1])?;
//! let trainer = Trainer::new(TrainingConfig { max_iteration: 10, ..TrainingConfig::default() });
//! let outcome = trainer.train(&mut net, &[Record::scalar(&[0.0, 1.0], &[1.0])], &TrainingControl::new())?;
//! assert_eq!(outcome.iterations, 10);
//! # Ok::<(), neurolab_network::NetworkError>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backprop;
pub mod error;
pub mod forward;
pub mod recurrent;
pub mod snapshot;
pub mod topology;
pub mod training;

pub use backprop::{inverse_error, output_error, Backpropagator, Sample};
pub use error::{NetworkError, NetworkResult};
pub use forward::ForwardTrace;
pub use recurrent::{build_recurrent, fold_gates, CellFunctions, CellSpec, RecurrentSettings, RibLayout};
pub use snapshot::{LayerSnapshot, NetworkSnapshot, SNAPSHOT_VERSION};
pub use topology::{
    Edge, Layer, LayerId, LinkKind, Network, Neuron, NeuronRef, StateSpan, TopologySettings,
};
pub use training::{
    LearningMode, Record, Resample, TerminationReason, Trainer, TrainingConfig, TrainingControl,
    TrainingEvent, TrainingListener, TrainingOutcome, TrainingState,
};
