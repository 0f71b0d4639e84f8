// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neurolab - Neural-network research toolkit
//!
//! A from-scratch backpropagation engine over an abstract neuron value
//! algebra. The same engine trains plain feed-forward stacks, stacked
//! (multi-branch) topologies, time-unrolled recurrent networks with LSTM-style
//! gated cells, and inverse-function (normalizing-flow) objectives.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! neurolab = "0.1"  # Default: full
//! ```
//!
//! ```rust
//! use neurolab::prelude::*;
//!
//! let mut net = Network::new(TopologySettings::default());
//! net.initialize(&[2, 3, 1])?;
//!
//! let records = vec![
//!     Record::scalar(&[0.0, 1.0], &[1.0]),
//!     Record::scalar(&[1.0, 1.0], &[0.0]),
//! ];
//! let trainer = Trainer::new(TrainingConfig { max_iteration: 20, ..TrainingConfig::default() });
//! let outcome = trainer.train(&mut net, &records, &TrainingControl::new())?;
//! assert!(outcome.iterations <= 20);
//! # Ok::<(), neurolab::network::NetworkError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - **`full`** (default): everything below
//! - **`network`**: topology, backpropagation and training runner
//! - **`observability`**: `tracing-subscriber` setup and debug flags
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: neurolab-neural, neurolab-config           │
//! │  (NeuronValue, Weight, activations, configuration)      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Algorithms: neurolab-network                           │
//! │  (topology, forward, backprop, recurrent, training)     │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Infrastructure: neurolab-observability                 │
//! │  (logging initialisation, per-crate debug flags)        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use neurolab_config as config;
pub use neurolab_neural as neural;

// Re-export algorithms
#[cfg(feature = "network")]
pub use neurolab_network as network;

// Re-export infrastructure
#[cfg(feature = "observability")]
pub use neurolab_observability as observability;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_config, validate_config, ConfigMap, NeurolabConfig};
    pub use crate::neural::{ActivationFunction, ActivationKind, NeuronValue, ValueKind, Weight};

    #[cfg(feature = "network")]
    pub use crate::network::{
        build_recurrent, Backpropagator, CellSpec, LearningMode, Network, NetworkSnapshot, Record,
        RecurrentSettings, Resample, RibLayout, TopologySettings, Trainer, TrainingConfig,
        TrainingControl, TrainingEvent, TrainingListener, TrainingState,
    };

    #[cfg(feature = "observability")]
    pub use crate::observability::{init_logging, parse_debug_flags, CrateDebugFlags};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let value = NeuronValue::Scalar(1.0);
        assert_eq!(value.add(&value.zero()), Some(value));
        assert_eq!("logistic".parse::<ActivationKind>().ok(), Some(ActivationKind::Sigmoid));
    }
}
