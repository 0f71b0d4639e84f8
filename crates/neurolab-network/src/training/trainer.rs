// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Training Loop
//!
//! ```text
//! Idle ──train()──> Running ──pause()──> Paused ──resume()──> Running
//!                      │                    │
//!                      └──────────┬─────────┘
//!                                 ▼
//!                            Terminated
//! ```
//!
//! One iteration: resample → (random-Z) → forward + learn → notify → check
//! termination → pause point.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use neurolab_neural::NeuronValue;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::config::TrainingConfig;
use super::control::TrainingControl;
use super::listener::{notify, Notification, TrainingEvent, TrainingListener};
use super::record::Record;
use crate::backprop::{Backpropagator, Sample};
use crate::error::{NetworkError, NetworkResult};
use crate::topology::Network;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// `TrainingControl::stop` was called
    Stopped,
    /// An iteration produced no error (no usable targets or records)
    NoError,
    MaxIteration,
    /// Mean error magnitude dropped below epsilon
    Converged,
    /// Mean error magnitude became NaN or infinite
    Diverged,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminationReason::Stopped => "stopped",
            TerminationReason::NoError => "no error computed",
            TerminationReason::MaxIteration => "iteration cap reached",
            TerminationReason::Converged => "converged",
            TerminationReason::Diverged => "error diverged",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    /// Mean output error of the last iteration, per output neuron
    pub error: Option<Vec<NeuronValue>>,
    pub iterations: usize,
    pub reason: TerminationReason,
}

impl TrainingOutcome {
    /// Mean magnitude of `error`
    pub fn error_magnitude(&self) -> Option<f64> {
        self.error.as_deref().and_then(mean_magnitude)
    }
}

pub struct Trainer {
    config: TrainingConfig,
    backprop: Backpropagator,
    listeners: Vec<Arc<dyn TrainingListener>>,
    running: AtomicBool,
}

/// Clears the running flag however `train` exits
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            backprop: Backpropagator::new(config.learning_rate, config.learn_bias),
            config,
            listeners: Vec::new(),
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn backpropagator(&self) -> &Backpropagator {
        &self.backprop
    }

    pub fn add_listener(&mut self, listener: Arc<dyn TrainingListener>) {
        self.listeners.push(listener);
    }

    pub fn with_listener(mut self, listener: Arc<dyn TrainingListener>) -> Self {
        self.add_listener(listener);
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Train `net` on `records` until a termination condition holds
    ///
    /// Weights are updated in place; a stopped call keeps the updates made so far.
    ///
    /// # Errors
    /// - `AlreadyRunning` when this trainer is already inside `train`
    /// - `InvalidTopology` when `net` has fewer than two layers
    pub fn train(
        &self,
        net: &mut Network,
        records: &[Record],
        control: &TrainingControl,
    ) -> NetworkResult<TrainingOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(target: "neurolab::training", "[TRAINER] Rejected re-entrant training call");
            return Err(NetworkError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        if net.layer_count() < 2 || net.output_layer().is_none() {
            return Err(NetworkError::InvalidTopology(format!(
                "training needs at least two layers, network has {}",
                net.layer_count()
            )));
        }

        info!(
            target: "neurolab::training",
            "[TRAINER] Training started: {} records, mode {}, resample {}, lr {}, max_iteration {}",
            records.len(),
            self.config.mode,
            self.config.resample,
            self.config.learning_rate,
            self.config.max_iteration
        );

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        control.begin();
        let mut iteration = 0;
        let mut error: Option<Vec<NeuronValue>> = None;

        let reason = loop {
            if control.is_stop_requested() {
                break TerminationReason::Stopped;
            }
            iteration += 1;

            let order = self.config.resample.indices(records.len(), &mut rng);
            error = self.iterate(net, records, &order, &mut rng);
            let magnitude = error.as_deref().and_then(mean_magnitude);

            let event = TrainingEvent {
                iteration,
                error: magnitude,
                message: match magnitude {
                    Some(m) => format!("iteration {} error {:.6}", iteration, m),
                    None => format!("iteration {} computed no error", iteration),
                },
            };
            debug!(target: "neurolab::training", "[TRAINER] {}", event.message);
            notify(&self.listeners, Notification::Doing, &event);

            if control.is_stop_requested() {
                break TerminationReason::Stopped;
            }
            let Some(magnitude) = magnitude else {
                break TerminationReason::NoError;
            };
            if !magnitude.is_finite() {
                warn!(
                    target: "neurolab::training",
                    "[TRAINER] Error magnitude {} at iteration {}, giving up",
                    magnitude,
                    iteration
                );
                break TerminationReason::Diverged;
            }
            if self.config.max_iteration > 0 && iteration >= self.config.max_iteration {
                break TerminationReason::MaxIteration;
            }
            if self.config.check_threshold && magnitude < self.config.epsilon {
                break TerminationReason::Converged;
            }

            control.pause_point();
        };

        control.finish();
        let outcome = TrainingOutcome {
            error,
            iterations: iteration,
            reason,
        };
        let event = TrainingEvent {
            iteration,
            error: outcome.error_magnitude(),
            message: format!("training finished after {} iterations: {}", iteration, reason),
        };
        info!(target: "neurolab::training", "[TRAINER] {}", event.message);
        notify(&self.listeners, Notification::Done, &event);

        Ok(outcome)
    }

    /// One pass over the resampled records
    fn iterate(
        &self,
        net: &mut Network,
        records: &[Record],
        order: &[usize],
        rng: &mut StdRng,
    ) -> Option<Vec<NeuronValue>> {
        let inputs: Vec<(Vec<NeuronValue>, Option<&[NeuronValue]>)> = order
            .iter()
            .filter_map(|&i| records.get(i))
            .map(|record| {
                let input = if self.config.random_z_data {
                    let kind = net.value_kind().clone();
                    (0..net.input_size()).map(|_| kind.random(rng, 0.0, 1.0)).collect()
                } else {
                    record.input.clone()
                };
                (input, record.output.as_deref())
            })
            .collect();

        if self.config.batch {
            self.learn_batch(net, &inputs)
        } else {
            let errors: Vec<Vec<NeuronValue>> = inputs
                .iter()
                .filter_map(|case| self.learn_batch(net, std::slice::from_ref(case)))
                .collect();
            mean_errors(&errors)
        }
    }

    /// Forward every case, then run the configured passes over them together
    fn learn_batch(
        &self,
        net: &mut Network,
        cases: &[(Vec<NeuronValue>, Option<&[NeuronValue]>)],
    ) -> Option<Vec<NeuronValue>> {
        let mode = self.config.mode;
        let mut standard = None;
        if mode.runs_standard() {
            let samples = evaluate(net, cases);
            standard = self.backprop.learn(net, &samples);
        }
        let mut inverse = None;
        if mode.runs_inverse() {
            let samples = evaluate(net, cases);
            inverse = self.backprop.learn_inverse(net, &samples);
        }
        standard.or(inverse)
    }
}

/// Forward pass per case; failing records are logged and skipped
fn evaluate(net: &mut Network, cases: &[(Vec<NeuronValue>, Option<&[NeuronValue]>)]) -> Vec<Sample> {
    cases
        .iter()
        .filter_map(|(input, target)| match net.forward(input) {
            Ok(trace) => Some(Sample::new(trace, target.map(<[NeuronValue]>::to_vec))),
            Err(e) => {
                warn!(target: "neurolab::training", "[TRAINER] Skipping record: {}", e);
                None
            }
        })
        .collect()
}

/// Per-neuron mean over per-record output errors
fn mean_errors(errors: &[Vec<NeuronValue>]) -> Option<Vec<NeuronValue>> {
    let width = errors.first()?.len();
    (0..width)
        .map(|j| {
            let column: Vec<NeuronValue> = errors.iter().filter_map(|e| e.get(j).cloned()).collect();
            NeuronValue::mean(&column)
        })
        .collect()
}

fn mean_magnitude(errors: &[NeuronValue]) -> Option<f64> {
    if errors.is_empty() {
        return None;
    }
    Some(errors.iter().map(NeuronValue::magnitude).sum::<f64>() / errors.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{LayerId, NeuronRef, TopologySettings};
    use crate::training::{LearningMode, Resample, TrainingState};
    use neurolab_neural::{ActivationKind, ValueKind};
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    fn linear_network() -> Network {
        let mut net = Network::new(TopologySettings {
            kind: ValueKind::Scalar,
            hidden_activation: Some(ActivationKind::Identity),
            output_activation: Some(ActivationKind::Identity),
            weight_range: 0.0,
            seed: 0,
        });
        net.initialize(&[1, 1]).unwrap();
        net
    }

    fn config(max_iteration: usize) -> TrainingConfig {
        TrainingConfig {
            learning_rate: 0.1,
            max_iteration,
            check_threshold: false,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_single_iteration_cap() {
        let mut net = linear_network();
        let trainer = Trainer::new(config(1));
        let outcome = trainer
            .train(&mut net, &[Record::scalar(&[1.0], &[2.0])], &TrainingControl::new())
            .unwrap();
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.reason, TerminationReason::MaxIteration);
        assert_eq!(outcome.error, Some(vec![NeuronValue::Scalar(1.0)]));
    }

    #[test]
    fn test_converges_on_linear_target() {
        let mut net = linear_network();
        let trainer = Trainer::new(TrainingConfig {
            learning_rate: 0.2,
            max_iteration: 0,
            epsilon: 1e-4,
            ..TrainingConfig::default()
        });
        let records = [Record::scalar(&[1.0], &[3.0]), Record::scalar(&[2.0], &[5.0])];
        let outcome = trainer.train(&mut net, &records, &TrainingControl::new()).unwrap();
        assert_eq!(outcome.reason, TerminationReason::Converged);
        let out = net.evaluate(&[NeuronValue::Scalar(3.0)]).unwrap()[0].as_scalar().unwrap();
        assert!((out - 7.0).abs() < 0.05);
    }

    #[test]
    fn test_no_targets_terminates_with_no_error() {
        let mut net = linear_network();
        let trainer = Trainer::new(config(10));
        let outcome = trainer
            .train(&mut net, &[Record::unlabelled(vec![NeuronValue::Scalar(1.0)])], &TrainingControl::new())
            .unwrap();
        assert_eq!(outcome.reason, TerminationReason::NoError);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_invalid_topology_rejected() {
        let mut net = Network::new(TopologySettings::default());
        let result = Trainer::new(config(1)).train(&mut net, &[], &TrainingControl::new());
        assert!(matches!(result, Err(NetworkError::InvalidTopology(_))));
    }

    #[test]
    fn test_bad_record_skipped() {
        let mut net = linear_network();
        let records = [
            Record::scalar(&[1.0, 1.0], &[2.0]),
            Record::scalar(&[1.0], &[2.0]),
        ];
        let outcome = Trainer::new(config(1))
            .train(&mut net, &records, &TrainingControl::new())
            .unwrap();
        assert_eq!(outcome.error, Some(vec![NeuronValue::Scalar(1.0)]));
    }

    #[test]
    fn test_batch_mode_single_update() {
        let mut net = linear_network();
        let trainer = Trainer::new(TrainingConfig {
            batch: true,
            learn_bias: false,
            ..config(1)
        });
        let records = [Record::scalar(&[1.0], &[2.0]), Record::scalar(&[1.0], &[4.0])];
        let outcome = trainer.train(&mut net, &records, &TrainingControl::new()).unwrap();
        // mean error (1 + 3) / 2, one update of 0.1 * 2
        assert_eq!(outcome.error, Some(vec![NeuronValue::Scalar(2.0)]));
        let w = net
            .edge_weight(NeuronRef::new(LayerId(0), 0), NeuronRef::new(LayerId(1), 0))
            .unwrap()
            .value()
            .as_scalar()
            .unwrap();
        assert!((w - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_mode_ignores_targets() {
        let mut net = linear_network();
        let trainer = Trainer::new(TrainingConfig {
            mode: LearningMode::Inverse,
            ..config(1)
        });
        let outcome = trainer
            .train(&mut net, &[Record::unlabelled(vec![NeuronValue::Scalar(2.0)])], &TrainingControl::new())
            .unwrap();
        assert_eq!(outcome.error, Some(vec![NeuronValue::Scalar(-2.0)]));
    }

    #[test]
    fn test_random_z_is_reproducible() {
        let run = || {
            let mut net = linear_network();
            let trainer = Trainer::new(TrainingConfig {
                random_z_data: true,
                resample: Resample::Shuffle,
                seed: 11,
                ..config(3)
            });
            let records = [Record::scalar(&[100.0], &[1.0]), Record::scalar(&[100.0], &[0.0])];
            trainer.train(&mut net, &records, &TrainingControl::new()).unwrap();
            net.snapshot()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_listeners_receive_every_iteration() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let trainer = Trainer::new(config(4)).with_listener(Arc::new(move |_: &TrainingEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let mut net = linear_network();
        trainer
            .train(&mut net, &[Record::scalar(&[1.0], &[2.0])], &TrainingControl::new())
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 4);
        assert!(!trainer.is_running());
    }

    #[test]
    fn test_pause_after_notification_then_resume() {
        let control = TrainingControl::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let trainer = {
            let control = control.clone();
            let seen = seen.clone();
            Arc::new(Trainer::new(config(6)).with_listener(Arc::new(move |event: &TrainingEvent| {
                seen.fetch_add(1, Ordering::SeqCst);
                if event.iteration == 3 {
                    control.pause();
                }
            })))
        };

        let worker = {
            let trainer = trainer.clone();
            let control = control.clone();
            thread::spawn(move || {
                let mut net = linear_network();
                trainer.train(&mut net, &[Record::scalar(&[1.0], &[2.0])], &control)
            })
        };

        assert!(control.wait_for_state(TrainingState::Paused, Duration::from_secs(10)));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert!(trainer.is_running());
        assert!(matches!(
            trainer.train(&mut linear_network(), &[], &TrainingControl::new()),
            Err(NetworkError::AlreadyRunning)
        ));

        control.resume();
        let outcome = worker.join().unwrap().unwrap();
        assert_eq!(outcome.iterations, 6);
        assert_eq!(seen.load(Ordering::SeqCst), 6);
        assert_eq!(control.state(), TrainingState::Terminated);
    }

    #[test]
    fn test_stop_before_train_is_honoured() {
        let control = TrainingControl::new();
        control.stop();
        let mut net = linear_network();
        let trainer = Trainer::new(config(50));
        let outcome = trainer
            .train(&mut net, &[Record::scalar(&[1.0], &[2.0])], &control)
            .unwrap();
        assert_eq!(outcome.reason, TerminationReason::Stopped);
        assert_eq!(outcome.iterations, 0);

        // the stop was consumed; the same token drives the next call
        let outcome = trainer
            .train(&mut net, &[Record::scalar(&[1.0], &[2.0])], &control)
            .unwrap();
        assert_eq!(outcome.reason, TerminationReason::MaxIteration);
        assert_eq!(outcome.iterations, 50);
    }

    #[test]
    fn test_bidirectional_runs_standard_then_inverse() {
        let weight = |net: &Network| {
            net.edge_weight(NeuronRef::new(LayerId(0), 0), NeuronRef::new(LayerId(1), 0))
                .unwrap()
                .value()
                .as_scalar()
                .unwrap()
        };
        let records = [Record::scalar(&[1.0], &[2.0])];

        let mut net = linear_network();
        let trainer = Trainer::new(TrainingConfig {
            mode: LearningMode::Bidirectional,
            learn_bias: false,
            ..config(1)
        });
        let outcome = trainer.train(&mut net, &records, &TrainingControl::new()).unwrap();

        // standard: w = 1 + 0.1 * (2 - 1) * 1 = 1.1
        // inverse on the re-evaluated output y = 1.1: w += 0.1 * (-1.1) * 1 / 1.1^2
        let expected = 1.1 - 1.0 / 11.0;
        assert!((weight(&net) - expected).abs() < 1e-12);
        assert_eq!(outcome.error, Some(vec![NeuronValue::Scalar(1.0)]));

        let mut standard_only = linear_network();
        Trainer::new(TrainingConfig {
            learn_bias: false,
            ..config(1)
        })
        .train(&mut standard_only, &records, &TrainingControl::new())
        .unwrap();
        assert!((weight(&standard_only) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_error_terminates() {
        let mut net = linear_network();
        let outcome = Trainer::new(config(0))
            .train(&mut net, &[Record::scalar(&[1.0], &[f64::NAN])], &TrainingControl::new())
            .unwrap();
        assert_eq!(outcome.reason, TerminationReason::Diverged);
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn test_exploding_error_terminates_without_cap() {
        let mut net = linear_network();
        let trainer = Trainer::new(TrainingConfig {
            learning_rate: 1.0,
            ..config(0)
        });
        let outcome = trainer
            .train(&mut net, &[Record::scalar(&[10.0], &[0.0])], &TrainingControl::new())
            .unwrap();
        assert_eq!(outcome.reason, TerminationReason::Diverged);
        assert!(outcome.iterations < 1000);
    }

    #[test]
    fn test_stop_from_listener() {
        let control = TrainingControl::new();
        let stopper = control.clone();
        let trainer = Trainer::new(config(0)).with_listener(Arc::new(move |event: &TrainingEvent| {
            if event.iteration == 2 {
                stopper.stop();
            }
        }));
        let mut net = linear_network();
        let outcome = trainer
            .train(&mut net, &[Record::scalar(&[1.0], &[2.0])], &control)
            .unwrap();
        assert_eq!(outcome.reason, TerminationReason::Stopped);
        assert_eq!(outcome.iterations, 2);
    }
}
