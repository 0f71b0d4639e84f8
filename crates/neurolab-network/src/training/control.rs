// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pause/resume/stop token shared between a training call and its callers
//!
//! The training loop polls the token once per iteration boundary and blocks
//! on the condition variable while a pause is pending. Nothing interrupts an
//! iteration in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrainingState {
    #[default]
    Idle,
    Running,
    Paused,
    Terminated,
}

#[derive(Debug, Default)]
struct ControlInner {
    state: TrainingState,
    stop_requested: bool,
    pause_requested: bool,
}

/// Cheaply clonable handle; every clone controls the same training call
#[derive(Debug, Clone, Default)]
pub struct TrainingControl {
    shared: Arc<(Mutex<ControlInner>, Condvar)>,
}

impl TrainingControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend the loop at the end of the current iteration
    pub fn pause(&self) {
        let (lock, cvar) = &*self.shared;
        lock.lock().pause_requested = true;
        cvar.notify_all();
    }

    pub fn resume(&self) {
        let (lock, cvar) = &*self.shared;
        lock.lock().pause_requested = false;
        cvar.notify_all();
    }

    /// Request cooperative cancellation; also releases a paused loop
    pub fn stop(&self) {
        let (lock, cvar) = &*self.shared;
        lock.lock().stop_requested = true;
        cvar.notify_all();
    }

    pub fn state(&self) -> TrainingState {
        self.shared.0.lock().state
    }

    pub fn is_pause_requested(&self) -> bool {
        self.shared.0.lock().pause_requested
    }

    /// Block until the loop reaches `state`; `false` on timeout
    pub fn wait_for_state(&self, state: TrainingState, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (lock, cvar) = &*self.shared;
        let mut inner = lock.lock();
        while inner.state != state {
            if cvar.wait_until(&mut inner, deadline).timed_out() {
                return inner.state == state;
            }
        }
        true
    }

    /// Enter `Running`; a stop or pause requested before the call started stays pending
    pub(crate) fn begin(&self) {
        let (lock, cvar) = &*self.shared;
        lock.lock().state = TrainingState::Running;
        cvar.notify_all();
    }

    pub(crate) fn is_stop_requested(&self) -> bool {
        self.shared.0.lock().stop_requested
    }

    /// The single suspension point of the training loop
    pub(crate) fn pause_point(&self) {
        let (lock, cvar) = &*self.shared;
        let mut inner = lock.lock();
        if !inner.pause_requested || inner.stop_requested {
            return;
        }
        inner.state = TrainingState::Paused;
        cvar.notify_all();
        while inner.pause_requested && !inner.stop_requested {
            cvar.wait(&mut inner);
        }
        inner.state = TrainingState::Running;
        cvar.notify_all();
    }

    /// Enter `Terminated` and consume the requests of the finished call
    pub(crate) fn finish(&self) {
        let (lock, cvar) = &*self.shared;
        let mut inner = lock.lock();
        inner.state = TrainingState::Terminated;
        inner.stop_requested = false;
        inner.pause_requested = false;
        cvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_lifecycle_states() {
        let control = TrainingControl::new();
        assert_eq!(control.state(), TrainingState::Idle);
        control.begin();
        assert_eq!(control.state(), TrainingState::Running);
        control.finish();
        assert_eq!(control.state(), TrainingState::Terminated);
    }

    #[test]
    fn test_pause_point_blocks_until_resume() {
        let control = TrainingControl::new();
        control.begin();
        control.pause();

        let worker = {
            let control = control.clone();
            thread::spawn(move || {
                control.pause_point();
                control.state()
            })
        };
        assert!(control.wait_for_state(TrainingState::Paused, Duration::from_secs(5)));
        control.resume();
        assert_eq!(worker.join().unwrap(), TrainingState::Running);
    }

    #[test]
    fn test_stop_releases_paused_loop() {
        let control = TrainingControl::new();
        control.begin();
        control.pause();
        let worker = {
            let control = control.clone();
            thread::spawn(move || control.pause_point())
        };
        assert!(control.wait_for_state(TrainingState::Paused, Duration::from_secs(5)));
        control.stop();
        worker.join().unwrap();
        assert!(control.is_stop_requested());
    }

    #[test]
    fn test_pause_point_without_request_returns() {
        let control = TrainingControl::new();
        control.begin();
        control.pause_point();
        assert_eq!(control.state(), TrainingState::Running);
    }

    #[test]
    fn test_requests_before_begin_stay_pending() {
        let control = TrainingControl::new();
        control.stop();
        control.pause();
        control.begin();
        assert!(control.is_stop_requested());
        assert!(control.is_pause_requested());

        control.finish();
        assert!(!control.is_stop_requested());
        assert!(!control.is_pause_requested());
    }

    #[test]
    fn test_wait_for_state_times_out() {
        let control = TrainingControl::new();
        assert!(!control.wait_for_state(TrainingState::Running, Duration::from_millis(20)));
    }
}
