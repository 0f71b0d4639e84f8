// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Recurrent / Gated Extension
//!
//! A recurrent network is a sequence of states, each a copy of the same
//! backbone shape, stored in one arena and linked by rib edges:
//!
//! ```text
//! outin:     in0 → h0 → out0 ──rib──► h1 → out1 ──rib──► h2 → out2
//!            (in1, in2 keep the state shape but stay at zero)
//!
//! parallel:  in → h0 → out0
//!                 │rib   │rib
//!                 h1 → out1
//!                 │rib   │rib
//!                 h2 → out2
//! ```
//!
//! Gated (LSTM) layers carry four indexed slots per neuron. Each slot is
//! evaluated separately, then [`fold_gates`] combines them into the cell
//! memory and the displayed output.

use std::str::FromStr;
use std::sync::Arc;

use neurolab_config::RecurrentSection;
use neurolab_neural::{evaluate_or_identity, ActivationFunction, ActivationKind, NeuronValue, ValueKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NetworkError, NetworkResult};
use crate::topology::{LayerId, LinkKind, Network, StateSpan, TopologySettings};

/// Gate slot order inside a gated neuron
pub const FORGET: usize = 0;
pub const INPUT: usize = 1;
pub const OUTPUT: usize = 2;
pub const CELL: usize = 3;

/// Number of slots in a gated neuron
pub const GATE_COUNT: usize = 4;

/// Activation functions of a gated (LSTM) layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellSpec {
    /// Forget, input and output gates
    pub gate_activation: ActivationKind,
    /// Cell gate and the displayed output
    pub cell_activation: ActivationKind,
    /// Applied to the displayed output before it is broadcast
    pub aux_activation: Option<ActivationKind>,
}

impl Default for CellSpec {
    fn default() -> Self {
        Self {
            gate_activation: ActivationKind::Sigmoid,
            cell_activation: ActivationKind::Tanh,
            aux_activation: None,
        }
    }
}

/// Built activation functions of a [`CellSpec`]
#[derive(Debug, Clone)]
pub struct CellFunctions {
    spec: CellSpec,
    gate: Arc<dyn ActivationFunction>,
    cell: Arc<dyn ActivationFunction>,
    aux: Option<Arc<dyn ActivationFunction>>,
}

impl CellFunctions {
    pub fn new(spec: CellSpec) -> Self {
        Self {
            spec,
            gate: spec.gate_activation.build(),
            cell: spec.cell_activation.build(),
            aux: spec.aux_activation.map(|kind| kind.build()),
        }
    }

    pub fn spec(&self) -> &CellSpec {
        &self.spec
    }

    /// Activation used while evaluating slot `gate`
    pub fn gate_function(&self, gate: usize) -> &dyn ActivationFunction {
        if gate == CELL {
            self.cell.as_ref()
        } else {
            self.gate.as_ref()
        }
    }

    pub fn cell_function(&self) -> &dyn ActivationFunction {
        self.cell.as_ref()
    }

    pub fn aux_function(&self) -> Option<&dyn ActivationFunction> {
        self.aux.as_deref()
    }
}

/// Fold the four gate values of one neuron
///
/// `cell = forget * Σ predecessor_cells + input * cell_gate` and
/// `displayed = output * activation(cell)`. An empty predecessor list counts
/// as a zero cell state. Returns `None` on a representation mismatch or when
/// fewer than four gates are given.
pub fn fold_gates(
    gates: &[NeuronValue],
    predecessor_cells: &[NeuronValue],
    activation: Option<&dyn ActivationFunction>,
) -> Option<(NeuronValue, NeuronValue)> {
    if gates.len() < GATE_COUNT {
        return None;
    }
    let forget = gates[FORGET].current();
    let input = gates[INPUT].current();
    let output = gates[OUTPUT].current();
    let cell_gate = gates[CELL].current();

    let mut previous = forget.zero();
    for cell in predecessor_cells {
        previous = previous.add(cell.current())?;
    }

    let cell = forget.multiply(&previous)?.add(&input.multiply(cell_gate)?)?;
    let displayed = output.multiply(&evaluate_or_identity(activation, &cell))?;
    Some((cell, displayed))
}

/// How consecutive states are rib-linked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RibLayout {
    /// State t's output feeds state t+1's first hidden layer
    OutIn,
    /// Every layer from depth 1 feeds its counterpart in the next state
    Parallel,
}

impl FromStr for RibLayout {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "outin" | "out_in" => Ok(RibLayout::OutIn),
            "parallel" => Ok(RibLayout::Parallel),
            other => Err(NetworkError::InvalidTopology(format!(
                "unknown rib layout '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecurrentSettings {
    pub states: usize,
    pub layout: RibLayout,
    /// Gated cells on every hidden layer
    pub cell: Option<CellSpec>,
}

impl Default for RecurrentSettings {
    fn default() -> Self {
        Self {
            states: 1,
            layout: RibLayout::OutIn,
            cell: None,
        }
    }
}

impl RecurrentSettings {
    /// Settings from the `[recurrent]` configuration section
    pub fn from_section(section: &RecurrentSection) -> NetworkResult<Self> {
        let cell = if section.cell {
            let aux = match section.aux_activation.trim() {
                "" => None,
                name => Some(name.parse::<ActivationKind>()?),
            };
            Some(CellSpec {
                aux_activation: aux,
                ..CellSpec::default()
            })
        } else {
            None
        };
        Ok(Self {
            states: section.states,
            layout: section.layout.parse()?,
            cell,
        })
    }
}

/// Build a time-unrolled network of `settings.states` copies of `dims`
///
/// The record input (`dims[0]` values) always feeds state 0. With `outin`
/// every later state still gets a `dims[0]` input layer, held at zero, next
/// to the rib from the previous state's output. With `parallel` only state 0
/// has an input layer.
/// A cell spec switches the whole network to four-slot gated values.
pub fn build_recurrent(
    topology: TopologySettings,
    settings: &RecurrentSettings,
    dims: &[usize],
) -> NetworkResult<Network> {
    if dims.len() < 2 || dims.contains(&0) {
        return Err(NetworkError::InvalidTopology(format!(
            "recurrent network needs at least two non-empty layers, got {:?}",
            dims
        )));
    }
    if settings.states == 0 {
        return Err(NetworkError::InvalidTopology(
            "recurrent network needs at least one state".to_string(),
        ));
    }
    let states = settings.states;

    let mut topology = topology;
    if settings.cell.is_some() {
        topology.kind = ValueKind::indexed(GATE_COUNT, topology.kind.clone());
    }
    let mut net = Network::new(topology);
    let last = dims.len() - 1;

    for state in 0..states {
        let mut span = StateSpan::default();
        let has_input = state == 0 || settings.layout == RibLayout::OutIn;
        if has_input {
            let id = net.add_layer(dims[0], None, state, 0);
            span.input = Some(id);
            if state == 0 {
                net.inputs.push(id);
            } else {
                net.idle_inputs.push(id);
            }
        }

        let mut previous = span.input;
        for (depth, &size) in dims.iter().enumerate().skip(1) {
            let activation = net.activation_for_depth(depth, last);
            let id = net.add_layer(size, activation, state, depth);
            if depth < last {
                if let Some(spec) = settings.cell {
                    net.layers[id.0].cell = Some(CellFunctions::new(spec));
                }
            }
            if let Some(prev) = previous {
                net.link(prev, id, LinkKind::Backbone)?;
            }
            span.backbone.push(id);
            previous = Some(id);
        }

        if let Some(before) = state.checked_sub(1).and_then(|s| net.states.get(s)).cloned() {
            link_states(&mut net, &before, &span, settings.layout)?;
        }
        net.states.push(span);
    }

    net.output = net.states.last().and_then(StateSpan::output);
    net.rebuild_order()?;

    debug!(
        target: "neurolab::recurrent",
        "[RECURRENT] Built {} states ({:?}), {} layers, {} edges",
        states,
        settings.layout,
        net.layer_count(),
        net.edge_count()
    );
    Ok(net)
}

fn link_states(
    net: &mut Network,
    before: &StateSpan,
    after: &StateSpan,
    layout: RibLayout,
) -> NetworkResult<()> {
    match layout {
        RibLayout::OutIn => {
            let from = before.output().ok_or_else(missing_layer)?;
            let to = after.first_hidden().ok_or_else(missing_layer)?;
            net.link(from, to, LinkKind::Rib)
        }
        RibLayout::Parallel => {
            let pairs: Vec<(LayerId, LayerId)> = before
                .backbone
                .iter()
                .copied()
                .zip(after.backbone.iter().copied())
                .collect();
            for (from, to) in pairs {
                net.link(from, to, LinkKind::ParallelRib)?;
            }
            Ok(())
        }
    }
}

fn missing_layer() -> NetworkError {
    NetworkError::InvalidTopology("state without backbone layers".to_string())
}
