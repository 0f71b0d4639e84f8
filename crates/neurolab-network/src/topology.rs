// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Network Topology
//!
//! Layers, neurons and weighted edges stored in a flat arena:
//!
//! ```text
//! Network.layers[LayerId] ── Layer.neurons[index] ── Neuron.edges ──> NeuronRef
//! ```
//!
//! Edges live on their source neuron and own their [`Weight`]. Every target
//! neuron keeps an `incoming` list of `(source, slot)` pairs so the forward
//! pass and the weight update can address an edge by position without
//! searching. Layers are linked by *backbone* links (`prev`/`next`) and *rib*
//! links (`rib_in`/`rib_out`, cross-state or cross-stack). There are no
//! back-pointers; everything is addressed by index.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use neurolab_config::TopologySection;
use neurolab_neural::{ActivationFunction, ActivationKind, NeuronValue, ValueKind, Weight};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, NetworkResult};
use crate::recurrent::CellFunctions;

/// Position of a layer in the network arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub usize);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Address of one neuron: layer plus position inside the layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NeuronRef {
    pub layer: LayerId,
    pub index: usize,
}

impl NeuronRef {
    pub fn new(layer: LayerId, index: usize) -> Self {
        Self { layer, index }
    }
}

impl fmt::Display for NeuronRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.layer, self.index)
    }
}

/// How two layers are wired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Feed-forward link, fully connected
    Backbone,
    /// Cross-state or cross-stack link, fully connected
    Rib,
    /// Cross-state link, neuron i to neuron i (layers must have equal size)
    ParallelRib,
}

/// Directed weighted connection, stored on the source neuron
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub target: NeuronRef,
    pub weight: Weight,
}

#[derive(Debug, Clone)]
pub struct Neuron {
    pub(crate) input: NeuronValue,
    pub(crate) output: NeuronValue,
    pub(crate) bias: Weight,
    pub(crate) cell_state: Option<NeuronValue>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) incoming: Vec<(NeuronRef, usize)>,
}

impl Neuron {
    fn new(kind: &ValueKind) -> Self {
        Self {
            input: kind.zero(),
            output: kind.zero(),
            bias: Weight::new(kind.zero()),
            cell_state: None,
            edges: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Net input recorded by the last forward pass
    pub fn input(&self) -> &NeuronValue {
        &self.input
    }

    pub fn output(&self) -> &NeuronValue {
        &self.output
    }

    pub fn bias(&self) -> &Weight {
        &self.bias
    }

    pub fn bias_mut(&mut self) -> &mut Weight {
        &mut self.bias
    }

    /// Cell memory of a gated neuron, `None` before the first evaluation
    pub fn cell_state(&self) -> Option<&NeuronValue> {
        self.cell_state.as_ref()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    /// `(source, slot)` pairs: `slot` indexes the source neuron's `edges`
    pub fn incoming(&self) -> &[(NeuronRef, usize)] {
        &self.incoming
    }

    /// Slot of the outgoing edge to `target`
    pub fn edge_index(&self, target: NeuronRef) -> Option<usize> {
        self.edges.iter().position(|edge| edge.target == target)
    }
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub(crate) neurons: Vec<Neuron>,
    pub(crate) activation: Option<Arc<dyn ActivationFunction>>,
    pub(crate) cell: Option<CellFunctions>,
    pub(crate) gate_index: usize,
    pub(crate) state: usize,
    pub(crate) depth: usize,
    pub(crate) prev: Vec<LayerId>,
    pub(crate) next: Vec<LayerId>,
    pub(crate) rib_in: Vec<LayerId>,
    pub(crate) rib_out: Vec<LayerId>,
}

impl Layer {
    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn size(&self) -> usize {
        self.neurons.len()
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neuron(&self, index: usize) -> Option<&Neuron> {
        self.neurons.get(index)
    }

    pub fn activation(&self) -> Option<&dyn ActivationFunction> {
        self.activation.as_deref()
    }

    pub fn cell(&self) -> Option<&CellFunctions> {
        self.cell.as_ref()
    }

    pub fn is_gated(&self) -> bool {
        self.cell.is_some()
    }

    /// Gate slot currently being evaluated or trained
    pub fn gate_index(&self) -> usize {
        self.gate_index
    }

    /// Time state this layer belongs to
    pub fn state(&self) -> usize {
        self.state
    }

    /// Backbone depth inside its state (0 is the input depth)
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn prev_layers(&self) -> &[LayerId] {
        &self.prev
    }

    pub fn next_layers(&self) -> &[LayerId] {
        &self.next
    }

    pub fn rib_in(&self) -> &[LayerId] {
        &self.rib_in
    }

    pub fn rib_out(&self) -> &[LayerId] {
        &self.rib_out
    }

    /// Position of `neuron` in this layer, `None` when it lives elsewhere
    pub fn index_of(&self, neuron: NeuronRef) -> Option<usize> {
        (neuron.layer == self.id && neuron.index < self.neurons.len()).then_some(neuron.index)
    }

    /// Activation applied when evaluating gate slot `gate`
    pub fn activation_for_gate(&self, gate: usize) -> Option<&dyn ActivationFunction> {
        match &self.cell {
            Some(cell) => Some(cell.gate_function(gate)),
            None => self.activation(),
        }
    }
}

/// Layer ids of one time state, by backbone depth
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSpan {
    /// Depth-0 layer; absent for states fed only through ribs
    pub input: Option<LayerId>,
    /// Depth 1 up to and including the state's output layer
    pub backbone: Vec<LayerId>,
}

impl StateSpan {
    pub fn output(&self) -> Option<LayerId> {
        self.backbone.last().copied()
    }

    /// First layer after the input depth
    pub fn first_hidden(&self) -> Option<LayerId> {
        self.backbone.first().copied()
    }

    pub fn at_depth(&self, depth: usize) -> Option<LayerId> {
        match depth {
            0 => self.input,
            d => self.backbone.get(d - 1).copied(),
        }
    }
}

/// Construction parameters shared by every layer of a network
#[derive(Debug, Clone, PartialEq)]
pub struct TopologySettings {
    pub kind: ValueKind,
    pub hidden_activation: Option<ActivationKind>,
    pub output_activation: Option<ActivationKind>,
    /// Initial weights are drawn from `[-weight_range, weight_range)`
    pub weight_range: f64,
    pub seed: u64,
}

impl Default for TopologySettings {
    fn default() -> Self {
        Self {
            kind: ValueKind::Scalar,
            hidden_activation: Some(ActivationKind::Sigmoid),
            output_activation: Some(ActivationKind::Sigmoid),
            weight_range: 1.0,
            seed: 0,
        }
    }
}

impl TopologySettings {
    /// Settings from the `[topology]` configuration section
    pub fn from_section(section: &TopologySection, seed: u64) -> NetworkResult<Self> {
        let base = match section.vector_len {
            0 => ValueKind::Scalar,
            len => ValueKind::Vector { len },
        };
        let kind = match section.gate_count {
            0 | 1 => base,
            gates => ValueKind::indexed(gates, base),
        };
        Ok(Self {
            kind,
            hidden_activation: Some(section.hidden_activation.parse()?),
            output_activation: Some(section.output_activation.parse()?),
            weight_range: section.weight_range,
            seed,
        })
    }

    /// Same settings with deterministic unit weights, handy in tests
    pub fn with_weight_range(mut self, weight_range: f64) -> Self {
        self.weight_range = weight_range;
        self
    }
}

/// Layered network arena
#[derive(Debug, Clone)]
pub struct Network {
    pub(crate) layers: Vec<Layer>,
    pub(crate) order: Vec<LayerId>,
    pub(crate) inputs: Vec<LayerId>,
    /// Depth-0 layers that exist for shape but never receive record input
    pub(crate) idle_inputs: Vec<LayerId>,
    pub(crate) output: Option<LayerId>,
    pub(crate) states: Vec<StateSpan>,
    pub(crate) kind: ValueKind,
    pub(crate) settings: TopologySettings,
    pub(crate) rng: StdRng,
}

impl Network {
    /// Empty network; call one of the `initialize*` methods before use
    pub fn new(settings: TopologySettings) -> Self {
        Self {
            layers: Vec::new(),
            order: Vec::new(),
            inputs: Vec::new(),
            idle_inputs: Vec::new(),
            output: None,
            states: Vec::new(),
            kind: settings.kind.clone(),
            rng: StdRng::seed_from_u64(settings.seed),
            settings,
        }
    }

    /// Plain feed-forward network: `dims[0]` inputs, `dims[last]` outputs
    ///
    /// # Errors
    /// `InvalidTopology` for fewer than two layers or an empty layer.
    pub fn initialize(&mut self, dims: &[usize]) -> NetworkResult<()> {
        let levels: Vec<Vec<usize>> = dims.iter().map(|&size| vec![size]).collect();
        self.initialize_stacked(&levels)
    }

    /// Stacked network: each depth may hold several parallel layers
    ///
    /// Every layer at depth d is fully connected to every layer at depth d+1.
    /// The first and last depths must hold exactly one layer.
    pub fn initialize_stacked(&mut self, levels: &[Vec<usize>]) -> NetworkResult<()> {
        if levels.len() < 2 {
            return Err(NetworkError::InvalidTopology(format!(
                "at least two layers required, got {}",
                levels.len()
            )));
        }
        if levels[0].len() != 1 || levels[levels.len() - 1].len() != 1 {
            return Err(NetworkError::InvalidTopology(
                "first and last depth must hold exactly one layer".to_string(),
            ));
        }
        if levels.iter().any(|level| level.is_empty() || level.contains(&0)) {
            return Err(NetworkError::InvalidTopology(
                "every depth needs at least one non-empty layer".to_string(),
            ));
        }

        self.clear();
        let last = levels.len() - 1;
        let mut previous: Vec<LayerId> = Vec::new();
        let mut span = StateSpan::default();

        for (depth, level) in levels.iter().enumerate() {
            let activation = self.activation_for_depth(depth, last);
            let current: Vec<LayerId> = level
                .iter()
                .map(|&size| self.add_layer(size, activation, 0, depth))
                .collect();
            for &from in &previous {
                for &to in &current {
                    self.link(from, to, LinkKind::Backbone)?;
                }
            }
            if depth == 0 {
                span.input = current.first().copied();
            } else {
                span.backbone.extend(current.iter().copied());
            }
            previous = current;
        }

        self.inputs = span.input.into_iter().collect();
        self.output = span.output();
        self.states = vec![span];
        self.rebuild_order()
    }

    pub(crate) fn clear(&mut self) {
        self.layers.clear();
        self.order.clear();
        self.inputs.clear();
        self.idle_inputs.clear();
        self.output = None;
        self.states.clear();
        self.rng = StdRng::seed_from_u64(self.settings.seed);
    }

    pub(crate) fn activation_for_depth(&self, depth: usize, last: usize) -> Option<ActivationKind> {
        if depth == 0 {
            None
        } else if depth == last {
            self.settings.output_activation
        } else {
            self.settings.hidden_activation
        }
    }

    /// Append a layer of `size` neurons (no links yet)
    pub fn add_layer(
        &mut self,
        size: usize,
        activation: Option<ActivationKind>,
        state: usize,
        depth: usize,
    ) -> LayerId {
        let id = LayerId(self.layers.len());
        let kind = self.kind.clone();
        self.layers.push(Layer {
            id,
            neurons: (0..size).map(|_| Neuron::new(&kind)).collect(),
            activation: activation.map(|a| a.build()),
            cell: None,
            gate_index: 0,
            state,
            depth,
            prev: Vec::new(),
            next: Vec::new(),
            rib_in: Vec::new(),
            rib_out: Vec::new(),
        });
        id
    }

    /// Wire `from` into `to` and refresh the evaluation order
    ///
    /// A link that would close a cycle is rejected and the network is left unchanged.
    pub fn connect_layers(&mut self, from: LayerId, to: LayerId, kind: LinkKind) -> NetworkResult<()> {
        self.layer_checked(from)?;
        self.layer_checked(to)?;
        if from != to && self.reaches(to, from) {
            return Err(NetworkError::InvalidTopology(format!(
                "linking {} into {} would form a cycle",
                from, to
            )));
        }
        self.link(from, to, kind)?;
        self.rebuild_order()
    }

    /// Whether `target` can be reached from `start` over backbone and rib links
    fn reaches(&self, start: LayerId, target: LayerId) -> bool {
        let mut seen = vec![false; self.layers.len()];
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            let layer = &self.layers[id.0];
            stack.extend(layer.next.iter().chain(layer.rib_out.iter()).copied());
        }
        false
    }

    pub(crate) fn link(&mut self, from: LayerId, to: LayerId, kind: LinkKind) -> NetworkResult<()> {
        let from_size = self.layer_checked(from)?.size();
        let to_size = self.layer_checked(to)?.size();
        if from == to {
            return Err(NetworkError::InvalidTopology(format!(
                "layer {} cannot link to itself",
                from
            )));
        }

        let pairs: Vec<(usize, usize)> = match kind {
            LinkKind::Backbone | LinkKind::Rib => (0..from_size)
                .flat_map(|i| (0..to_size).map(move |j| (i, j)))
                .collect(),
            LinkKind::ParallelRib => {
                if from_size != to_size {
                    return Err(NetworkError::SizeMismatch {
                        expected: from_size,
                        actual: to_size,
                    });
                }
                (0..from_size).map(|i| (i, i)).collect()
            }
        };

        let range = self.settings.weight_range;
        for (i, j) in pairs {
            let value = if range > 0.0 {
                self.kind.random(&mut self.rng, -range, range)
            } else {
                self.kind.unit()
            };
            let source = NeuronRef::new(from, i);
            let target = NeuronRef::new(to, j);
            let slot = {
                let edges = &mut self.layers[from.0].neurons[i].edges;
                edges.push(Edge {
                    target,
                    weight: Weight::new(value),
                });
                edges.len() - 1
            };
            self.layers[to.0].neurons[j].incoming.push((source, slot));
        }

        match kind {
            LinkKind::Backbone => {
                push_unique(&mut self.layers[from.0].next, to);
                push_unique(&mut self.layers[to.0].prev, from);
            }
            LinkKind::Rib | LinkKind::ParallelRib => {
                push_unique(&mut self.layers[from.0].rib_out, to);
                push_unique(&mut self.layers[to.0].rib_in, from);
            }
        }
        Ok(())
    }

    /// Remove every edge from `from` into `to`
    pub fn disconnect_layers(&mut self, from: LayerId, to: LayerId) -> NetworkResult<()> {
        self.layer_checked(from)?;
        self.layer_checked(to)?;

        for neuron in &mut self.layers[from.0].neurons {
            neuron.edges.retain(|edge| edge.target.layer != to);
        }
        let layer = &mut self.layers[from.0];
        layer.next.retain(|&id| id != to);
        layer.rib_out.retain(|&id| id != to);
        let layer = &mut self.layers[to.0];
        layer.prev.retain(|&id| id != from);
        layer.rib_in.retain(|&id| id != from);

        self.rebuild_incoming();
        self.rebuild_order()
    }

    /// Recompute every neuron's `incoming` cache from the edge lists
    pub(crate) fn rebuild_incoming(&mut self) {
        for layer in &mut self.layers {
            for neuron in &mut layer.neurons {
                neuron.incoming.clear();
            }
        }
        let mut pairs = Vec::new();
        for layer in &self.layers {
            for (i, neuron) in layer.neurons.iter().enumerate() {
                for (slot, edge) in neuron.edges.iter().enumerate() {
                    pairs.push((edge.target, NeuronRef::new(layer.id, i), slot));
                }
            }
        }
        for (target, source, slot) in pairs {
            if let Some(neuron) = self
                .layers
                .get_mut(target.layer.0)
                .and_then(|l| l.neurons.get_mut(target.index))
            {
                neuron.incoming.push((source, slot));
            }
        }
    }

    /// Topological order over backbone and rib links
    pub(crate) fn rebuild_order(&mut self) -> NetworkResult<()> {
        let count = self.layers.len();
        let mut in_degree = vec![0usize; count];
        for layer in &self.layers {
            for to in layer.next.iter().chain(layer.rib_out.iter()) {
                in_degree[to.0] += 1;
            }
        }

        let mut ready: VecDeque<LayerId> = (0..count)
            .filter(|&i| in_degree[i] == 0)
            .map(LayerId)
            .collect();
        let mut order = Vec::with_capacity(count);
        while let Some(id) = ready.pop_front() {
            order.push(id);
            let layer = &self.layers[id.0];
            for to in layer.next.iter().chain(layer.rib_out.iter()) {
                in_degree[to.0] -= 1;
                if in_degree[to.0] == 0 {
                    ready.push_back(*to);
                }
            }
        }

        if order.len() != count {
            return Err(NetworkError::InvalidTopology(
                "layer links form a cycle".to_string(),
            ));
        }
        self.order = order;
        Ok(())
    }

    pub(crate) fn layer_checked(&self, id: LayerId) -> NetworkResult<&Layer> {
        self.layers
            .get(id.0)
            .ok_or_else(|| NetworkError::InvalidTopology(format!("unknown layer {}", id)))
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id.0)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn neuron(&self, neuron: NeuronRef) -> Option<&Neuron> {
        self.layers
            .get(neuron.layer.0)
            .and_then(|layer| layer.neurons.get(neuron.index))
    }

    pub fn neuron_mut(&mut self, neuron: NeuronRef) -> NetworkResult<&mut Neuron> {
        self.layers
            .get_mut(neuron.layer.0)
            .and_then(|layer| layer.neurons.get_mut(neuron.index))
            .ok_or(NetworkError::NeuronNotFound(neuron))
    }

    /// Weight of the edge `source -> target`
    pub fn edge_weight(&self, source: NeuronRef, target: NeuronRef) -> Option<&Weight> {
        let neuron = self.neuron(source)?;
        let slot = neuron.edge_index(target)?;
        neuron.edges.get(slot).map(|edge| &edge.weight)
    }

    pub fn edge_weight_mut(&mut self, source: NeuronRef, target: NeuronRef) -> NetworkResult<&mut Weight> {
        let neuron = self.neuron_mut(source)?;
        let slot = neuron
            .edge_index(target)
            .ok_or(NetworkError::NeuronNotFound(target))?;
        Ok(&mut neuron.edges[slot].weight)
    }

    /// Evaluation order (sources before targets)
    pub fn order(&self) -> &[LayerId] {
        &self.order
    }

    /// Layers fed from the record input, in input order
    pub fn input_layers(&self) -> &[LayerId] {
        &self.inputs
    }

    /// Input layers held at zero (later states of an `outin` network)
    pub fn idle_input_layers(&self) -> &[LayerId] {
        &self.idle_inputs
    }

    pub fn output_layer(&self) -> Option<LayerId> {
        self.output
    }

    /// Total number of input values a record must carry
    pub fn input_size(&self) -> usize {
        self.inputs
            .iter()
            .filter_map(|id| self.layer(*id))
            .map(Layer::size)
            .sum()
    }

    pub fn output_size(&self) -> usize {
        self.output
            .and_then(|id| self.layer(id))
            .map_or(0, Layer::size)
    }

    pub fn value_kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn settings(&self) -> &TopologySettings {
        &self.settings
    }

    /// Gate slots per neuron (4 for LSTM networks, 1 otherwise)
    pub fn gate_count(&self) -> usize {
        self.kind.slot_count()
    }

    /// Fed or idle input layer; neither is evaluated nor trained
    pub fn is_input(&self, id: LayerId) -> bool {
        self.inputs.contains(&id) || self.idle_inputs.contains(&id)
    }

    /// Point every layer at gate slot `gate`
    pub fn set_gate_index(&mut self, gate: usize) {
        for layer in &mut self.layers {
            layer.gate_index = gate;
        }
    }

    pub fn states(&self) -> &[StateSpan] {
        &self.states
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, index: usize) -> Option<&StateSpan> {
        self.states.get(index)
    }

    pub fn prev_state(&self, index: usize) -> Option<usize> {
        (index > 0 && index < self.states.len()).then(|| index - 1)
    }

    pub fn next_state(&self, index: usize) -> Option<usize> {
        (index + 1 < self.states.len()).then_some(index + 1)
    }

    /// Targets of `neuron`'s outgoing edges with their weights
    pub fn next_neurons(&self, neuron: NeuronRef) -> Vec<(NeuronRef, &Weight)> {
        self.neuron(neuron)
            .map(|n| n.edges.iter().map(|e| (e.target, &e.weight)).collect())
            .unwrap_or_default()
    }

    /// Sources of every edge into `neuron`, rib sources included
    pub fn prev_neurons_include_outside(&self, neuron: NeuronRef) -> Vec<NeuronRef> {
        self.neuron(neuron)
            .map(|n| n.incoming.iter().map(|(source, _)| *source).collect())
            .unwrap_or_default()
    }

    /// Backbone predecessors plus rib sources of `id`
    pub fn all_prev_layers(&self, id: LayerId) -> Vec<LayerId> {
        self.layer(id)
            .map(|layer| layer.prev.iter().chain(layer.rib_in.iter()).copied().collect())
            .unwrap_or_default()
    }

    /// Backbone successors plus rib targets of `id`
    pub fn next_layers(&self, id: LayerId) -> Vec<LayerId> {
        self.layer(id)
            .map(|layer| layer.next.iter().chain(layer.rib_out.iter()).copied().collect())
            .unwrap_or_default()
    }

    /// Clear the cell memory of every gated neuron
    pub fn reset_cells(&mut self) {
        for layer in &mut self.layers {
            for neuron in &mut layer.neurons {
                neuron.cell_state = None;
            }
        }
    }

    pub fn edge_count(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|layer| layer.neurons.iter())
            .map(|neuron| neuron.edges.len())
            .sum()
    }
}

fn push_unique(ids: &mut Vec<LayerId>, id: LayerId) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}
