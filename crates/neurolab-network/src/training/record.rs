// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use neurolab_neural::NeuronValue;

/// One training example; the trainer only reads it
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub input: Vec<NeuronValue>,
    /// Target output, absent for unsupervised (inverse) training
    pub output: Option<Vec<NeuronValue>>,
}

impl Record {
    pub fn new(input: Vec<NeuronValue>, output: Vec<NeuronValue>) -> Self {
        Self {
            input,
            output: Some(output),
        }
    }

    pub fn unlabelled(input: Vec<NeuronValue>) -> Self {
        Self { input, output: None }
    }

    /// Record of plain scalars
    pub fn scalar(input: &[f64], output: &[f64]) -> Self {
        Self::new(
            input.iter().copied().map(NeuronValue::Scalar).collect(),
            output.iter().copied().map(NeuronValue::Scalar).collect(),
        )
    }

    pub fn has_target(&self) -> bool {
        self.output.is_some()
    }
}
