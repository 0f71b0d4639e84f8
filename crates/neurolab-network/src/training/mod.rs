// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Training Runner
//!
//! Drives the [`Backpropagator`](crate::backprop::Backpropagator) over a
//! record set with cooperative pause/stop control and progress listeners.
//!
//! - **config**: immutable [`TrainingConfig`] read once from a `ConfigMap`
//! - **control**: [`TrainingControl`] token (pause, resume, stop)
//! - **listener**: [`TrainingListener`] progress notifications
//! - **resample**: per-iteration record ordering
//! - **trainer**: the loop itself

pub mod config;
pub mod control;
pub mod listener;
pub mod record;
pub mod resample;
pub mod trainer;

pub use config::{LearningMode, TrainingConfig};
pub use control::{TrainingControl, TrainingState};
pub use listener::{TrainingEvent, TrainingListener};
pub use record::Record;
pub use resample::Resample;
pub use trainer::{TerminationReason, Trainer, TrainingOutcome};
