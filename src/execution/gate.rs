//! Pause, resume and run-to-state stepping.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// Stepping mode of a state tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum GateMode {
    /// Children start as soon as their transition is resolved.
    #[default]
    Running,

    /// No further child starts until resumed.
    Paused,

    /// Run normally, then pause right before the state at this path starts.
    RunTo(String),
}

/// Checkpoint every container passes before starting a child.
///
/// The outer controller drives it from another thread; containers block in
/// [`ExecutionGate::pass`] while paused.
#[derive(Debug, Default)]
pub struct ExecutionGate {
    mode: Mutex<GateMode>,
    changed: Condvar,
}

impl ExecutionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> GateMode {
        self.mode.lock().clone()
    }

    pub fn pause(&self) {
        self.set_mode(GateMode::Paused);
    }

    pub fn resume(&self) {
        self.set_mode(GateMode::Running);
    }

    /// Execute normally until the state at `path` is about to start.
    pub fn run_to(&self, path: impl Into<String>) {
        self.set_mode(GateMode::RunTo(path.into()));
    }

    /// Wake every blocked container so it re-checks preemption.
    pub fn wake(&self) {
        self.changed.notify_all();
    }

    fn set_mode(&self, mode: GateMode) {
        tracing::debug!(?mode, "Execution gate mode changed");
        *self.mode.lock() = mode;
        self.changed.notify_all();
    }

    /// Block until the state at `path` may start.
    ///
    /// Returns `false` if preemption was observed while waiting.
    pub(crate) fn pass(
        &self,
        path: &str,
        poll_interval: Duration,
        is_preempted: impl Fn() -> bool,
    ) -> bool {
        let mut mode = self.mode.lock();
        loop {
            if matches!(&*mode, GateMode::RunTo(target) if target == path) {
                tracing::info!(path, "Reached run-to target, pausing");
                *mode = GateMode::Paused;
            }
            if !matches!(*mode, GateMode::Paused) {
                return true;
            }
            if is_preempted() {
                return false;
            }
            self.changed.wait_for(&mut mode, poll_interval);
        }
    }
}
