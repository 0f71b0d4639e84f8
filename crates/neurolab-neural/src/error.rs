// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for value algebra and activation operations

/// Error types for neural value operations
///
/// Representation mismatches between two operands are not errors: binary
/// operations return `None` for those. This enum covers programming-time gaps
/// and invalid arguments.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NeuralError {
    #[error("{operation} is not implemented for {representation} values")]
    NotImplemented {
        operation: &'static str,
        representation: &'static str,
    },

    #[error("Slot index {index} out of bounds for indexed value of size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("Activation function '{0}' is not invertible")]
    NotInvertible(&'static str),

    #[error("Unknown activation function: {0}")]
    UnknownActivation(String),
}

pub type NeuralResult<T> = core::result::Result<T, NeuralError>;
