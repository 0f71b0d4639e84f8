// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end training over plain, stacked and recurrent topologies

use neurolab_network::{
    build_recurrent, CellSpec, LayerId, Network, NetworkSnapshot, Record, RecurrentSettings,
    RibLayout, TerminationReason, TopologySettings, Trainer, TrainingConfig, TrainingControl,
};
use neurolab_neural::{ActivationKind, NeuronValue};

fn squared_error(net: &mut Network, records: &[Record]) -> f64 {
    records
        .iter()
        .map(|record| {
            let out = net.evaluate(&record.input).unwrap();
            let target = record.output.as_ref().unwrap();
            out.iter()
                .zip(target)
                .map(|(o, t)| {
                    let d = t.subtract(o).unwrap().magnitude();
                    d * d
                })
                .sum::<f64>()
        })
        .sum()
}

fn or_records() -> Vec<Record> {
    vec![
        Record::scalar(&[0.0, 0.0], &[0.0]),
        Record::scalar(&[0.0, 1.0], &[1.0]),
        Record::scalar(&[1.0, 0.0], &[1.0]),
        Record::scalar(&[1.0, 1.0], &[1.0]),
    ]
}

fn trainer(max_iteration: usize, learning_rate: f64) -> Trainer {
    Trainer::new(TrainingConfig {
        learning_rate,
        max_iteration,
        check_threshold: false,
        ..TrainingConfig::default()
    })
}

#[test]
fn test_sigmoid_network_learns_or() {
    let mut net = Network::new(TopologySettings {
        seed: 42,
        ..TopologySettings::default()
    });
    net.initialize(&[2, 3, 1]).unwrap();
    let records = or_records();
    let before = squared_error(&mut net, &records);

    let outcome = trainer(3000, 0.5)
        .train(&mut net, &records, &TrainingControl::new())
        .unwrap();
    assert_eq!(outcome.reason, TerminationReason::MaxIteration);

    let after = squared_error(&mut net, &records);
    assert!(after < before, "error grew: {} -> {}", before, after);
    for record in &records {
        let out = net.evaluate(&record.input).unwrap()[0].as_scalar().unwrap();
        let target = record.output.as_ref().unwrap()[0].as_scalar().unwrap();
        assert!((out - target).abs() < 0.5, "{:?} -> {}", record.input, out);
    }
}

#[test]
fn test_stacked_network_trains_every_stack() {
    let mut net = Network::new(TopologySettings {
        seed: 7,
        ..TopologySettings::default()
    });
    net.initialize_stacked(&[vec![2], vec![2, 2], vec![1]]).unwrap();
    let before = net.snapshot();

    trainer(5, 0.5)
        .train(&mut net, &or_records(), &TrainingControl::new())
        .unwrap();
    let after = net.snapshot();

    for stack in [1, 2] {
        assert_ne!(before.layers[stack].weights, after.layers[stack].weights);
        assert_ne!(before.layers[stack].biases, after.layers[stack].biases);
    }
}

#[test]
fn test_gated_recurrent_network_trains() {
    let settings = RecurrentSettings {
        states: 2,
        layout: RibLayout::Parallel,
        cell: Some(CellSpec::default()),
    };
    let topology = TopologySettings {
        seed: 3,
        output_activation: Some(ActivationKind::Identity),
        ..TopologySettings::default()
    };
    let mut net = build_recurrent(topology, &settings, &[2, 3, 1]).unwrap();
    assert_eq!(net.gate_count(), 4);
    let before = net.snapshot();

    let records = vec![
        Record::scalar(&[0.5, -0.5], &[1.0]),
        Record::scalar(&[-0.5, 0.5], &[0.0]),
    ];
    let outcome = trainer(5, 0.1)
        .train(&mut net, &records, &TrainingControl::new())
        .unwrap();

    assert_eq!(outcome.iterations, 5);
    let error = outcome.error.unwrap();
    assert_eq!(error.len(), 1);
    assert!(net.layers().iter().all(|layer| layer.gate_index() == 0));
    assert_ne!(before, net.snapshot());

    // Memory survives evaluation and is cleared on request
    let hidden = net.state(1).unwrap().first_hidden().unwrap();
    net.evaluate(&records[0].input).unwrap();
    assert!(net.layer(hidden).unwrap().neurons()[0].cell_state().is_some());
    net.reset_cells();
    assert!(net.layer(hidden).unwrap().neurons()[0].cell_state().is_none());
}

#[test]
fn test_outin_recurrent_network_reduces_error() {
    let settings = RecurrentSettings {
        states: 2,
        layout: RibLayout::OutIn,
        cell: None,
    };
    let topology = TopologySettings {
        seed: 5,
        ..TopologySettings::default()
    };
    let mut net = build_recurrent(topology, &settings, &[2, 3, 1]).unwrap();
    // only state 0 reads the record; state 1's input layer stays at zero
    assert_eq!(net.input_size(), 2);
    assert_eq!(net.input_layers().len(), 1);
    assert_eq!(net.idle_input_layers().len(), 1);

    let records = vec![
        Record::scalar(&[1.0, 0.0], &[0.9]),
        Record::scalar(&[0.0, 1.0], &[0.1]),
    ];
    let before = squared_error(&mut net, &records);
    trainer(500, 0.5)
        .train(&mut net, &records, &TrainingControl::new())
        .unwrap();
    assert!(squared_error(&mut net, &records) < before);
}

#[test]
fn test_trained_parameters_survive_json() {
    let mut net = Network::new(TopologySettings {
        seed: 9,
        ..TopologySettings::default()
    });
    net.initialize(&[2, 3, 1]).unwrap();
    trainer(50, 0.5)
        .train(&mut net, &or_records(), &TrainingControl::new())
        .unwrap();

    let json = net.snapshot().to_json().unwrap();
    let mut fresh = Network::new(TopologySettings::default());
    fresh.initialize(&[2, 3, 1]).unwrap();
    fresh.restore(&NetworkSnapshot::from_json(&json).unwrap()).unwrap();

    let input = [NeuronValue::Scalar(1.0), NeuronValue::Scalar(0.0)];
    assert_eq!(net.evaluate(&input).unwrap(), fresh.evaluate(&input).unwrap());
    assert_eq!(fresh.output_layer(), Some(LayerId(2)));
}
