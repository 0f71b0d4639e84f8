// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Activation Function Library
//!
//! Each function is defined by scalar kernels. The provided methods on
//! [`ActivationFunction`] lift those kernels onto [`NeuronValue`]:
//!
//! - scalars and vectors are mapped element-wise
//! - indexed values unwrap the selected slot, delegate, and rewrap via `renew`
//!
//! ## Adding a New Function
//!
//! 1. Implement `ActivationFunction` for a new type
//! 2. Add a variant to `ActivationKind` and wire it in `build()` / `from_str()`
//! 3. Add tests

use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::NeuralError;
use crate::value::NeuronValue;

/// Activation function with optional inverse
pub trait ActivationFunction: Send + Sync + fmt::Debug {
    /// Human-readable function name
    fn name(&self) -> &'static str;

    fn evaluate_scalar(&self, x: f64) -> f64;

    fn derivative_scalar(&self, x: f64) -> f64;

    /// f⁻¹(y), `None` when not invertible or `y` is outside the range of f
    fn inverse_scalar(&self, _y: f64) -> Option<f64> {
        None
    }

    /// (f⁻¹)'(y)
    fn inverse_derivative_scalar(&self, _y: f64) -> Option<f64> {
        None
    }

    fn is_invertible(&self) -> bool {
        false
    }

    fn evaluate(&self, x: &NeuronValue) -> NeuronValue {
        x.map(|v| self.evaluate_scalar(v))
    }

    fn derivative(&self, x: &NeuronValue) -> NeuronValue {
        x.map(|v| self.derivative_scalar(v))
    }

    fn evaluate_inverse(&self, y: &NeuronValue) -> Option<NeuronValue> {
        y.try_map(|v| self.inverse_scalar(v))
    }

    fn derivative_inverse(&self, y: &NeuronValue) -> Option<NeuronValue> {
        y.try_map(|v| self.inverse_derivative_scalar(v))
    }
}

/// f(x) = x
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl ActivationFunction for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn evaluate_scalar(&self, x: f64) -> f64 {
        x
    }

    fn derivative_scalar(&self, _x: f64) -> f64 {
        1.0
    }

    fn inverse_scalar(&self, y: f64) -> Option<f64> {
        Some(y)
    }

    fn inverse_derivative_scalar(&self, _y: f64) -> Option<f64> {
        Some(1.0)
    }

    fn is_invertible(&self) -> bool {
        true
    }
}

/// f(x) = max(0, x)
#[derive(Debug, Clone, Copy, Default)]
pub struct Relu;

impl ActivationFunction for Relu {
    fn name(&self) -> &'static str {
        "relu"
    }

    fn evaluate_scalar(&self, x: f64) -> f64 {
        x.max(0.0)
    }

    fn derivative_scalar(&self, x: f64) -> f64 {
        if x > 0.0 {
            1.0
        } else {
            0.0
        }
    }
}

/// f(x) = x for x ≥ 0, αx otherwise
#[derive(Debug, Clone, Copy)]
pub struct LeakyRelu {
    pub alpha: f64,
}

impl Default for LeakyRelu {
    fn default() -> Self {
        Self { alpha: 0.01 }
    }
}

impl ActivationFunction for LeakyRelu {
    fn name(&self) -> &'static str {
        "leaky_relu"
    }

    fn evaluate_scalar(&self, x: f64) -> f64 {
        if x >= 0.0 {
            x
        } else {
            self.alpha * x
        }
    }

    fn derivative_scalar(&self, x: f64) -> f64 {
        if x >= 0.0 {
            1.0
        } else {
            self.alpha
        }
    }

    fn inverse_scalar(&self, y: f64) -> Option<f64> {
        if y >= 0.0 {
            Some(y)
        } else if self.alpha != 0.0 {
            Some(y / self.alpha)
        } else {
            None
        }
    }

    fn inverse_derivative_scalar(&self, y: f64) -> Option<f64> {
        if y >= 0.0 {
            Some(1.0)
        } else if self.alpha != 0.0 {
            Some(1.0 / self.alpha)
        } else {
            None
        }
    }

    fn is_invertible(&self) -> bool {
        self.alpha != 0.0
    }
}

/// Logistic sigmoid
#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

#[inline]
fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl ActivationFunction for Sigmoid {
    fn name(&self) -> &'static str {
        "sigmoid"
    }

    fn evaluate_scalar(&self, x: f64) -> f64 {
        logistic(x)
    }

    fn derivative_scalar(&self, x: f64) -> f64 {
        let s = logistic(x);
        s * (1.0 - s)
    }

    fn inverse_scalar(&self, y: f64) -> Option<f64> {
        if y > 0.0 && y < 1.0 {
            Some((y / (1.0 - y)).ln())
        } else {
            None
        }
    }

    fn inverse_derivative_scalar(&self, y: f64) -> Option<f64> {
        if y > 0.0 && y < 1.0 {
            Some(1.0 / (y * (1.0 - y)))
        } else {
            None
        }
    }

    fn is_invertible(&self) -> bool {
        true
    }
}

/// Hyperbolic tangent
#[derive(Debug, Clone, Copy, Default)]
pub struct Tanh;

impl ActivationFunction for Tanh {
    fn name(&self) -> &'static str {
        "tanh"
    }

    fn evaluate_scalar(&self, x: f64) -> f64 {
        x.tanh()
    }

    fn derivative_scalar(&self, x: f64) -> f64 {
        let t = x.tanh();
        1.0 - t * t
    }

    fn inverse_scalar(&self, y: f64) -> Option<f64> {
        if y.abs() < 1.0 {
            Some(y.atanh())
        } else {
            None
        }
    }

    fn inverse_derivative_scalar(&self, y: f64) -> Option<f64> {
        if y.abs() < 1.0 {
            Some(1.0 / (1.0 - y * y))
        } else {
            None
        }
    }

    fn is_invertible(&self) -> bool {
        true
    }
}

/// f(x) = ln(1 + eˣ)
#[derive(Debug, Clone, Copy, Default)]
pub struct Softplus;

impl ActivationFunction for Softplus {
    fn name(&self) -> &'static str {
        "softplus"
    }

    fn evaluate_scalar(&self, x: f64) -> f64 {
        x.exp().ln_1p()
    }

    fn derivative_scalar(&self, x: f64) -> f64 {
        logistic(x)
    }

    fn inverse_scalar(&self, y: f64) -> Option<f64> {
        if y > 0.0 {
            Some(y.exp_m1().ln())
        } else {
            None
        }
    }

    fn inverse_derivative_scalar(&self, y: f64) -> Option<f64> {
        if y > 0.0 {
            Some(1.0 / (1.0 - (-y).exp()))
        } else {
            None
        }
    }

    fn is_invertible(&self) -> bool {
        true
    }
}

/// f(x) = scale·x + shift, a bijection whenever scale ≠ 0
#[derive(Debug, Clone, Copy)]
pub struct Affine {
    pub scale: f64,
    pub shift: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self {
            scale: 1.0,
            shift: 0.0,
        }
    }
}

impl ActivationFunction for Affine {
    fn name(&self) -> &'static str {
        "affine"
    }

    fn evaluate_scalar(&self, x: f64) -> f64 {
        self.scale * x + self.shift
    }

    fn derivative_scalar(&self, _x: f64) -> f64 {
        self.scale
    }

    fn inverse_scalar(&self, y: f64) -> Option<f64> {
        if self.scale != 0.0 {
            Some((y - self.shift) / self.scale)
        } else {
            None
        }
    }

    fn inverse_derivative_scalar(&self, _y: f64) -> Option<f64> {
        if self.scale != 0.0 {
            Some(1.0 / self.scale)
        } else {
            None
        }
    }

    fn is_invertible(&self) -> bool {
        self.scale != 0.0
    }
}

/// Serializable selector for the built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ActivationKind {
    Identity,
    Relu,
    LeakyRelu { alpha: f64 },
    Sigmoid,
    Tanh,
    Softplus,
    Affine { scale: f64, shift: f64 },
}

impl ActivationKind {
    pub fn build(&self) -> Arc<dyn ActivationFunction> {
        match *self {
            ActivationKind::Identity => Arc::new(Identity),
            ActivationKind::Relu => Arc::new(Relu),
            ActivationKind::LeakyRelu { alpha } => Arc::new(LeakyRelu { alpha }),
            ActivationKind::Sigmoid => Arc::new(Sigmoid),
            ActivationKind::Tanh => Arc::new(Tanh),
            ActivationKind::Softplus => Arc::new(Softplus),
            ActivationKind::Affine { scale, shift } => Arc::new(Affine { scale, shift }),
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationKind::Identity => write!(f, "identity"),
            ActivationKind::Relu => write!(f, "relu"),
            ActivationKind::LeakyRelu { .. } => write!(f, "leaky_relu"),
            ActivationKind::Sigmoid => write!(f, "sigmoid"),
            ActivationKind::Tanh => write!(f, "tanh"),
            ActivationKind::Softplus => write!(f, "softplus"),
            ActivationKind::Affine { .. } => write!(f, "affine"),
        }
    }
}

impl FromStr for ActivationKind {
    type Err = NeuralError;

    /// Parse by lowercase name; parameterised functions take their defaults
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "identity" | "linear" | "none" => Ok(ActivationKind::Identity),
            "relu" => Ok(ActivationKind::Relu),
            "leaky_relu" | "leakyrelu" => Ok(ActivationKind::LeakyRelu {
                alpha: LeakyRelu::default().alpha,
            }),
            "sigmoid" | "logistic" => Ok(ActivationKind::Sigmoid),
            "tanh" => Ok(ActivationKind::Tanh),
            "softplus" => Ok(ActivationKind::Softplus),
            "affine" => Ok(ActivationKind::Affine {
                scale: 1.0,
                shift: 0.0,
            }),
            other => Err(NeuralError::UnknownActivation(other.to_string())),
        }
    }
}

/// f(x), or x when no activation is attached
pub fn evaluate_or_identity(activation: Option<&dyn ActivationFunction>, x: &NeuronValue) -> NeuronValue {
    match activation {
        Some(f) => f.evaluate(x),
        None => x.clone(),
    }
}

/// f'(x), or the unit value when no activation is attached
///
/// A missing activation lets error propagate unattenuated.
pub fn derivative_or_unit(activation: Option<&dyn ActivationFunction>, x: &NeuronValue) -> NeuronValue {
    match activation {
        Some(f) => f.derivative(x),
        None => x.unit(),
    }
}

/// f⁻¹(y), or y when no activation is attached
pub fn inverse_or_identity(activation: Option<&dyn ActivationFunction>, y: &NeuronValue) -> Option<NeuronValue> {
    match activation {
        Some(f) => f.evaluate_inverse(y),
        None => Some(y.clone()),
    }
}

/// (f⁻¹)'(y), or the unit value when no activation is attached
pub fn inverse_derivative_or_unit(
    activation: Option<&dyn ActivationFunction>,
    y: &NeuronValue,
) -> Option<NeuronValue> {
    match activation {
        Some(f) => f.derivative_inverse(y),
        None => Some(y.unit()),
    }
}
