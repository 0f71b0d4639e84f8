// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Forward Evaluation
//!
//! Pull-based: each layer, in topological order, reads its sources through
//! the neurons' `incoming` caches.
//!
//! ```text
//! net_j = bias_j + Σ out_src · w(src → j)
//! out_j = f(net_j)
//! ```
//!
//! Networks with K gate slots evaluate every layer K times, one slot at a
//! time. Gated layers then fold their four slots into a cell state and
//! broadcast the displayed output back into every slot.

use neurolab_neural::{evaluate_or_identity, IndexedValue, NeuronValue};

use crate::error::{NetworkError, NetworkResult};
use crate::recurrent::fold_gates;
use crate::topology::{LayerId, Network};

/// Per-layer values recorded by one forward pass, indexed by `LayerId`
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardTrace {
    /// Net input of every neuron
    pub inputs: Vec<Vec<NeuronValue>>,
    /// Activated output of every neuron
    pub outputs: Vec<Vec<NeuronValue>>,
    pub(crate) output_layer: LayerId,
}

impl ForwardTrace {
    pub fn output(&self) -> &[NeuronValue] {
        self.outputs
            .get(self.output_layer.0)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn output_layer(&self) -> LayerId {
        self.output_layer
    }

    pub fn layer_output(&self, layer: LayerId) -> Option<&[NeuronValue]> {
        self.outputs.get(layer.0).map(Vec::as_slice)
    }

    pub fn layer_input(&self, layer: LayerId) -> Option<&[NeuronValue]> {
        self.inputs.get(layer.0).map(Vec::as_slice)
    }
}

impl Network {
    /// Run the network on `input` and return the output layer's values
    pub fn evaluate(&mut self, input: &[NeuronValue]) -> NetworkResult<Vec<NeuronValue>> {
        let trace = self.forward(input)?;
        Ok(trace.output().to_vec())
    }

    /// Run the network on `input` and record every layer's values
    ///
    /// # Errors
    /// - `InvalidTopology` when the network was never initialized
    /// - `SizeMismatch` when `input` does not match the input layers
    /// - `RepresentationMismatch` when values cannot be combined
    pub fn forward(&mut self, input: &[NeuronValue]) -> NetworkResult<ForwardTrace> {
        let output_layer = self
            .output
            .ok_or_else(|| NetworkError::InvalidTopology("network not initialized".to_string()))?;
        let expected = self.input_size();
        if input.len() != expected {
            return Err(NetworkError::SizeMismatch {
                expected,
                actual: input.len(),
            });
        }

        self.load_inputs(input)?;
        let order = self.order.clone();
        for id in order {
            if !self.is_input(id) {
                self.evaluate_layer(id)?;
            }
        }
        self.set_gate_index(0);

        Ok(ForwardTrace {
            inputs: self
                .layers
                .iter()
                .map(|layer| layer.neurons.iter().map(|n| n.input.clone()).collect())
                .collect(),
            outputs: self
                .layers
                .iter()
                .map(|layer| layer.neurons.iter().map(|n| n.output.clone()).collect())
                .collect(),
            output_layer,
        })
    }

    fn load_inputs(&mut self, input: &[NeuronValue]) -> NetworkResult<()> {
        let mut offset = 0;
        let inputs = self.inputs.clone();
        for id in inputs {
            let kind = self.kind.clone();
            let layer = &mut self.layers[id.0];
            for neuron in &mut layer.neurons {
                let value = kind.conform(&input[offset]).ok_or_else(|| {
                    NetworkError::RepresentationMismatch(format!(
                        "input {} ({}) does not fit the network value kind",
                        offset,
                        input[offset].representation()
                    ))
                })?;
                neuron.input = value.clone();
                neuron.output = value;
                offset += 1;
            }
        }
        for id in self.idle_inputs.clone() {
            let zero = self.kind.zero();
            for neuron in &mut self.layers[id.0].neurons {
                neuron.input = zero.clone();
                neuron.output = zero.clone();
            }
        }
        Ok(())
    }

    fn evaluate_layer(&mut self, id: LayerId) -> NetworkResult<()> {
        let gates = self.gate_count();
        let size = self.layers[id.0].size();
        let mut nets = vec![self.kind.zero(); size];
        let mut outs = vec![self.kind.zero(); size];

        for gate in 0..gates {
            self.layers[id.0].gate_index = gate;
            for j in 0..size {
                let net = self.net_input(id, j, gate)?;
                let out = evaluate_or_identity(self.layers[id.0].activation_for_gate(gate), &net);
                put_slot(&mut nets[j], gate, &net);
                put_slot(&mut outs[j], gate, &out);
            }
        }

        let mut cells = vec![None; size];
        if self.layers[id.0].is_gated() {
            for j in 0..size {
                let (cell, displayed) = self.fold_neuron(id, j, &outs[j])?;
                outs[j] = match &outs[j] {
                    NeuronValue::Indexed(iv) => {
                        NeuronValue::Indexed(IndexedValue::broadcast(&displayed, iv.size())?)
                    }
                    _ => displayed,
                };
                cells[j] = Some(cell);
            }
        }

        let layer = &mut self.layers[id.0];
        for (j, neuron) in layer.neurons.iter_mut().enumerate() {
            neuron.input = std::mem::replace(&mut nets[j], NeuronValue::Scalar(0.0));
            neuron.output = std::mem::replace(&mut outs[j], NeuronValue::Scalar(0.0));
            if let Some(cell) = cells[j].take() {
                neuron.cell_state = Some(cell);
            }
        }
        Ok(())
    }

    /// `bias + Σ out_src · w` for gate slot `gate`
    fn net_input(&self, id: LayerId, j: usize, gate: usize) -> NetworkResult<NeuronValue> {
        let neuron = &self.layers[id.0].neurons[j];
        let mut net = neuron.bias.value().selected(gate);
        for (source, slot) in &neuron.incoming {
            let src = &self.layers[source.layer.0].neurons[source.index];
            let weight = src.edges[*slot].weight.value().selected(gate);
            let term = src
                .output
                .selected(gate)
                .multiply(&weight)
                .and_then(|term| net.add(&term));
            net = term.ok_or_else(|| {
                NetworkError::RepresentationMismatch(format!(
                    "edge {} -> {}[{}] cannot be combined",
                    source, id, j
                ))
            })?;
        }
        Ok(net)
    }

    /// Fold the gate slots of neuron `j` in gated layer `id`
    fn fold_neuron(
        &self,
        id: LayerId,
        j: usize,
        gates: &NeuronValue,
    ) -> NetworkResult<(NeuronValue, NeuronValue)> {
        let layer = &self.layers[id.0];
        let neuron = &layer.neurons[j];
        let cell = layer
            .cell
            .as_ref()
            .ok_or_else(|| NetworkError::InvalidTopology(format!("layer {} is not gated", id)))?;
        let slots = gates.as_indexed().map(IndexedValue::slots).ok_or_else(|| {
            NetworkError::RepresentationMismatch(format!(
                "gated neuron {}[{}] holds a {} value",
                id,
                j,
                gates.representation()
            ))
        })?;

        let mut predecessors: Vec<NeuronValue> = neuron
            .incoming
            .iter()
            .filter(|(source, _)| layer.rib_in.contains(&source.layer))
            .filter_map(|(source, _)| {
                let src_layer = &self.layers[source.layer.0];
                if src_layer.is_gated() {
                    src_layer.neurons[source.index].cell_state.clone()
                } else {
                    None
                }
            })
            .collect();
        if predecessors.is_empty() {
            predecessors.extend(neuron.cell_state.iter().cloned());
        }

        let (cell_state, displayed) =
            fold_gates(slots, &predecessors, Some(cell.cell_function())).ok_or_else(|| {
                NetworkError::RepresentationMismatch(format!(
                    "gates of {}[{}] cannot be folded",
                    id, j
                ))
            })?;
        let displayed = evaluate_or_identity(cell.aux_function(), &displayed);
        Ok((cell_state, displayed))
    }
}

/// Store `value` into slot `gate` of `target` (or replace a plain target)
pub(crate) fn put_slot(target: &mut NeuronValue, gate: usize, value: &NeuronValue) {
    match target {
        NeuronValue::Indexed(iv) => {
            let _ = iv.set(gate, value.current().clone());
        }
        plain => *plain = value.clone(),
    }
}
