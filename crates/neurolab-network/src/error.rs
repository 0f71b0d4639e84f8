// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for topology construction, evaluation and training

use neurolab_neural::NeuralError;

use crate::topology::NeuronRef;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetworkError {
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    #[error("Size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Representation mismatch: {0}")]
    RepresentationMismatch(String),

    #[error("Neuron not found: {0}")]
    NeuronNotFound(NeuronRef),

    #[error("A training call is already running on this trainer")]
    AlreadyRunning,

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Neural(#[from] NeuralError),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
