// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fire-and-forget progress notifications

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

/// Progress snapshot emitted after every iteration and once at the end
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingEvent {
    pub iteration: usize,
    /// Mean output error magnitude, `None` when no error was computed
    pub error: Option<f64>,
    pub message: String,
}

/// Receives training progress; must return promptly
pub trait TrainingListener: Send + Sync {
    fn on_doing(&self, _event: &TrainingEvent) {}

    fn on_done(&self, _event: &TrainingEvent) {}
}

/// Closures receive the per-iteration notifications
impl<F> TrainingListener for F
where
    F: Fn(&TrainingEvent) + Send + Sync,
{
    fn on_doing(&self, event: &TrainingEvent) {
        self(event)
    }
}

#[derive(Clone, Copy)]
pub(crate) enum Notification {
    Doing,
    Done,
}

/// Deliver `event` to every listener; a panicking listener is logged and skipped
pub(crate) fn notify(listeners: &[Arc<dyn TrainingListener>], kind: Notification, event: &TrainingEvent) {
    for listener in listeners {
        let delivered = catch_unwind(AssertUnwindSafe(|| match kind {
            Notification::Doing => listener.on_doing(event),
            Notification::Done => listener.on_done(event),
        }));
        if delivered.is_err() {
            warn!(
                target: "neurolab::training",
                "[TRAINER] Listener panicked on iteration {}, continuing",
                event.iteration
            );
        }
    }
}
