// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Backpropagation Engine
//!
//! Generic over topology shape: the engine only walks `order`, the
//! neurons' outgoing `edges` and their `incoming` caches, so plain stacks,
//! stacked levels and rib-linked recurrent states all train the same way.
//!
//! ## Standard pass (per gate slot)
//! 1. Output error: `f'(net_j) ⊙ (real_j − out_j)` for every case with a target
//! 2. Hidden error, reverse topological order: `f'(net_j) ⊙ Σ_k err_k · w(j→k)`
//! 3. Bias: `b_j += lr · mean(err_j)`
//! 4. Weight: `w(i→j) += lr · mean(err_j · out_i)`
//!
//! All errors are computed before the first update.
//!
//! ## Inverse pass (normalizing flow)
//! Output error is `−f⁻¹(y) · (f⁻¹)'(y)`, no target needed. Weight deltas use
//! `err_j · out_i / w²` and the bias delta is the mean over incoming edges of
//! `mean(err_j / w²)`. Edges with a zero weight are skipped.

use neurolab_neural::{
    derivative_or_unit, inverse_derivative_or_unit, inverse_or_identity, ActivationFunction,
    NeuronValue,
};
use tracing::{debug, trace, warn};

use crate::forward::{put_slot, ForwardTrace};
use crate::topology::{LayerId, Network, NeuronRef};

/// One evaluated training case: the recorded forward pass plus its target
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub trace: ForwardTrace,
    pub target: Option<Vec<NeuronValue>>,
}

impl Sample {
    pub fn new(trace: ForwardTrace, target: Option<Vec<NeuronValue>>) -> Self {
        Self { trace, target }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Standard,
    Inverse,
}

/// Per-case error of every neuron, indexed by layer then neuron
type CaseErrors = Vec<Vec<Option<NeuronValue>>>;

/// `f'(net_input) ⊙ (real − output)`; no activation means a unit derivative
pub fn output_error(
    activation: Option<&dyn ActivationFunction>,
    net_input: &NeuronValue,
    output: &NeuronValue,
    real: &NeuronValue,
) -> Option<NeuronValue> {
    real.subtract(output)?
        .multiply_derivative(&derivative_or_unit(activation, net_input))
}

/// `−(f⁻¹(y) · (f⁻¹)'(y))`; `None` when `y` is outside the range of `f`
pub fn inverse_error(activation: Option<&dyn ActivationFunction>, output: &NeuronValue) -> Option<NeuronValue> {
    let inverse = inverse_or_identity(activation, output)?;
    let derivative = inverse_derivative_or_unit(activation, output)?;
    Some(inverse.multiply(&derivative)?.negate())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backpropagator {
    pub learning_rate: f64,
    pub learn_bias: bool,
}

impl Default for Backpropagator {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            learn_bias: true,
        }
    }
}

impl Backpropagator {
    pub fn new(learning_rate: f64, learn_bias: bool) -> Self {
        Self {
            learning_rate,
            learn_bias,
        }
    }

    /// One standard squared-error step over `batch`
    ///
    /// Returns the mean output error per output neuron, or `None` when no
    /// case produced an error (no targets, representation mismatch, or a
    /// network with fewer than two layers).
    pub fn learn(&self, net: &mut Network, batch: &[Sample]) -> Option<Vec<NeuronValue>> {
        self.run(net, batch, Pass::Standard)
    }

    /// One inverse-function step over `batch`; targets are ignored
    pub fn learn_inverse(&self, net: &mut Network, batch: &[Sample]) -> Option<Vec<NeuronValue>> {
        self.run(net, batch, Pass::Inverse)
    }

    fn run(&self, net: &mut Network, batch: &[Sample], pass: Pass) -> Option<Vec<NeuronValue>> {
        if net.layer_count() < 2 || net.output_layer().is_none() {
            warn!(
                target: "neurolab::backprop",
                "[BACKPROP] Network has {} layers, nothing to learn",
                net.layer_count()
            );
            return None;
        }

        let gates = net.gate_count();
        let mut merged: Option<Vec<NeuronValue>> = None;
        for gate in 0..gates {
            net.set_gate_index(gate);
            let errors = self.pass(net, batch, gate, pass);
            merged = match (merged, errors) {
                (Some(mut acc), Some(errors)) => {
                    for (slot, error) in acc.iter_mut().zip(errors.iter()) {
                        put_slot(slot, gate, error);
                    }
                    Some(acc)
                }
                (None, errors) => errors,
                (acc, None) => acc,
            };
        }
        net.set_gate_index(0);

        merged.map(|errors| errors.iter().map(|e| e.selected(0)).collect())
    }

    fn pass(&self, net: &mut Network, batch: &[Sample], gate: usize, pass: Pass) -> Option<Vec<NeuronValue>> {
        let output = net.output_layer()?;

        let cases: Vec<(&Sample, CaseErrors)> = batch
            .iter()
            .filter_map(|sample| {
                let target = match pass {
                    Pass::Standard => Some(sample.target.as_deref()?),
                    Pass::Inverse => None,
                };
                self.case_errors(net, &sample.trace, target, gate, pass)
                    .map(|errors| (sample, errors))
            })
            .collect();

        if cases.is_empty() {
            debug!(
                target: "neurolab::backprop",
                "[BACKPROP] No case produced an error (gate {}, {} samples)",
                gate,
                batch.len()
            );
            return None;
        }

        let output_errors: Option<Vec<NeuronValue>> = (0..net.output_size())
            .map(|j| {
                let errors: Vec<NeuronValue> = cases
                    .iter()
                    .filter_map(|(_, errors)| errors[output.0][j].clone())
                    .collect();
                NeuronValue::mean(&errors)
            })
            .collect();

        self.update(net, &cases, gate, pass);
        trace!(
            target: "neurolab::backprop",
            "[BACKPROP] {:?} pass on gate {} used {} of {} cases",
            pass,
            gate,
            cases.len(),
            batch.len()
        );
        output_errors
    }

    /// Errors of every neuron for one case, `None` when the case contributes nothing
    fn case_errors(
        &self,
        net: &Network,
        trace: &ForwardTrace,
        target: Option<&[NeuronValue]>,
        gate: usize,
        pass: Pass,
    ) -> Option<CaseErrors> {
        let output = net.output_layer()?;
        let mut errors: CaseErrors = net.layers.iter().map(|l| vec![None; l.size()]).collect();

        let out_layer = net.layer(output)?;
        let activation = out_layer.activation_for_gate(gate);
        for j in 0..out_layer.size() {
            let out = traced(&trace.outputs, output, j, gate)?;
            errors[output.0][j] = match pass {
                Pass::Standard => {
                    let real = target.and_then(|t| t.get(j)).and_then(|v| net.kind.conform(v));
                    match real {
                        Some(real) => {
                            let net_input = traced(&trace.inputs, output, j, gate)?;
                            output_error(activation, &net_input, &out, &real.selected(gate))
                        }
                        None => None,
                    }
                }
                Pass::Inverse => inverse_error(activation, &out),
            };
        }
        if errors[output.0].iter().all(Option::is_none) {
            return None;
        }

        for &id in net.order.iter().rev() {
            if id == output || net.is_input(id) {
                continue;
            }
            let layer = &net.layers[id.0];
            let activation = layer.activation_for_gate(gate);
            for (j, neuron) in layer.neurons.iter().enumerate() {
                let out = traced(&trace.outputs, id, j, gate)?;
                let mut sum = out.zero();
                for edge in &neuron.edges {
                    // Edges into neurons without an error contribute nothing
                    let Some(err_k) = errors
                        .get(edge.target.layer.0)
                        .and_then(|l| l.get(edge.target.index))
                        .and_then(Option::as_ref)
                    else {
                        continue;
                    };
                    if let Some(next) = err_k
                        .multiply(&edge.weight.value().selected(gate))
                        .and_then(|term| sum.add(&term))
                    {
                        sum = next;
                    }
                }
                let net_input = traced(&trace.inputs, id, j, gate)?;
                let error = sum.multiply_derivative(&derivative_or_unit(activation, &net_input));
                errors[id.0][j] = error;
            }
        }
        Some(errors)
    }

    fn update(&self, net: &mut Network, cases: &[(&Sample, CaseErrors)], gate: usize, pass: Pass) {
        let rate = self.learning_rate;
        let mut bias_deltas: Vec<(NeuronRef, NeuronValue)> = Vec::new();
        let mut weight_deltas: Vec<(NeuronRef, usize, NeuronValue)> = Vec::new();

        for &id in &net.order {
            if net.is_input(id) {
                continue;
            }
            for (j, neuron) in net.layers[id.0].neurons.iter().enumerate() {
                let errors: Vec<(&Sample, &NeuronValue)> = cases
                    .iter()
                    .filter_map(|(sample, errors)| errors[id.0][j].as_ref().map(|e| (*sample, e)))
                    .collect();
                if errors.is_empty() {
                    continue;
                }
                let here = NeuronRef::new(id, j);

                match pass {
                    Pass::Standard => {
                        if self.learn_bias {
                            let plain: Vec<NeuronValue> = errors.iter().map(|(_, e)| (*e).clone()).collect();
                            if let Some(mean) = NeuronValue::mean(&plain) {
                                bias_deltas.push((here, mean.scale(rate)));
                            }
                        }
                        for &(source, slot) in &neuron.incoming {
                            let terms: Vec<NeuronValue> = errors
                                .iter()
                                .filter_map(|(sample, e)| {
                                    let prev = traced(&sample.trace.outputs, source.layer, source.index, gate)?;
                                    e.multiply(&prev)
                                })
                                .collect();
                            if let Some(mean) = NeuronValue::mean(&terms) {
                                weight_deltas.push((source, slot, mean.scale(rate)));
                            }
                        }
                    }
                    Pass::Inverse => {
                        let mut bias_terms = Vec::new();
                        for &(source, slot) in &neuron.incoming {
                            let weight = net.layers[source.layer.0].neurons[source.index].edges[slot]
                                .weight
                                .value()
                                .selected(gate);
                            if has_zero(&weight) {
                                continue;
                            }
                            let Some(squared) = weight.multiply(&weight) else {
                                continue;
                            };
                            let scaled: Vec<(&Sample, NeuronValue)> = errors
                                .iter()
                                .filter_map(|(sample, e)| e.divide(&squared).map(|s| (*sample, s)))
                                .collect();
                            let terms: Vec<NeuronValue> = scaled
                                .iter()
                                .filter_map(|(sample, s)| {
                                    let prev = traced(&sample.trace.outputs, source.layer, source.index, gate)?;
                                    s.multiply(&prev)
                                })
                                .collect();
                            if let Some(mean) = NeuronValue::mean(&terms) {
                                weight_deltas.push((source, slot, mean.scale(rate)));
                            }
                            let plain: Vec<NeuronValue> = scaled.into_iter().map(|(_, s)| s).collect();
                            if let Some(mean) = NeuronValue::mean(&plain) {
                                bias_terms.push(mean);
                            }
                        }
                        if self.learn_bias {
                            if let Some(mean) = NeuronValue::mean(&bias_terms) {
                                bias_deltas.push((here, mean.scale(rate)));
                            }
                        }
                    }
                }
            }
        }

        for (target, delta) in bias_deltas {
            let bias = &mut net.layers[target.layer.0].neurons[target.index].bias;
            bias.select(gate);
            if !bias.accumulate(&delta) {
                debug!(
                    target: "neurolab::backprop",
                    "[BACKPROP] Bias delta for {} has an incompatible representation",
                    target
                );
            }
            bias.select(0);
        }
        for (source, slot, delta) in weight_deltas {
            let weight = &mut net.layers[source.layer.0].neurons[source.index].edges[slot].weight;
            weight.select(gate);
            if !weight.accumulate(&delta) {
                debug!(
                    target: "neurolab::backprop",
                    "[BACKPROP] Weight delta for {} slot {} has an incompatible representation",
                    source,
                    slot
                );
            }
            weight.select(0);
        }
    }
}

/// Recorded value of neuron `j` in `layer` with `gate` selected
fn traced(values: &[Vec<NeuronValue>], layer: LayerId, j: usize, gate: usize) -> Option<NeuronValue> {
    values.get(layer.0)?.get(j).map(|v| v.selected(gate))
}

fn has_zero(value: &NeuronValue) -> bool {
    match value.current() {
        NeuronValue::Scalar(x) => *x == 0.0,
        NeuronValue::Vector(v) => v.iter().any(|x| *x == 0.0),
        NeuronValue::Indexed(_) => false,
    }
}
