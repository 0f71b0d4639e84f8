// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neurolab Neural Algebra
//!
//! The numeric layer everything else in neurolab is generic over:
//! - **Value**: [`NeuronValue`] (scalar, vector, indexed) and [`Weight`]
//! - **Activation**: activation functions with derivatives and inverses
//!
//! Nothing in this crate logs or performs I/O.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod activation;
pub mod error;
pub mod value;

pub use activation::{
    derivative_or_unit, evaluate_or_identity, inverse_derivative_or_unit, inverse_or_identity,
    ActivationFunction, ActivationKind, Affine, Identity, LeakyRelu, Relu, Sigmoid, Softplus, Tanh,
};
pub use error::{NeuralError, NeuralResult};
pub use value::{IndexedValue, NeuronValue, ValueKind, Weight};
