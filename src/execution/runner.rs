//! Running a state tree on a worker thread.

use super::{execute, ExecutionEnv, ExecutionGate, StateHandle};
use crate::core::Outcome;
use crate::error::EngineError;
use crate::state::State;
use serde_json::Value;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type WorkerResult<S> = (S, Result<Outcome, EngineError>);

/// A finished run: the state tree handed back with its final outcome.
#[derive(Debug)]
pub struct Completed<S> {
    pub state: S,
    pub outcome: Outcome,
}

/// Control over a state tree running on a worker thread.
///
/// Dropping the handle preempts the run and waits for the worker to exit.
pub struct RunHandle<S: State + 'static> {
    root: StateHandle,
    gate: Arc<ExecutionGate>,
    worker: Option<JoinHandle<WorkerResult<S>>>,
}

/// Start executing `state` on a dedicated thread.
///
/// # Example
///
/// ```rust
/// use arbor::builder::{ExecutionStateBuilder, HierarchyStateBuilder};
/// use arbor::core::Transition;
/// use arbor::execution::{spawn, ExecutionEnv};
/// use serde_json::json;
///
/// let leaf = ExecutionStateBuilder::new("A")
///     .outcome(0, "success")
///     .executable(|_ctx| Ok(0))
///     .build()
///     .unwrap();
/// let root = HierarchyStateBuilder::new("ROOT")
///     .outcome(0, "done")
///     .state(leaf)
///     .start_state("A")
///     .transition(Transition::to_outcome("A", 0, "ROOT", 0))
///     .build()
///     .unwrap();
///
/// let run = spawn(root, json!({}), ExecutionEnv::default()).unwrap();
/// let completed = run.join().unwrap();
/// assert_eq!(completed.outcome.name(), "done");
/// ```
pub fn spawn<S: State + 'static>(
    mut state: S,
    input: Value,
    env: ExecutionEnv,
) -> Result<RunHandle<S>, EngineError> {
    let root = state.handle();
    let gate = Arc::clone(env.gate());

    let worker = thread::Builder::new()
        .name(format!("arbor-{}", state.state_id()))
        .spawn(move || {
            let result = execute(&mut state, input, &env);
            if let Err(error) = &result {
                tracing::error!(state_id = %state.state_id(), %error, "State tree failed");
            }
            (state, result)
        })
        .map_err(|e| EngineError::Worker(e.to_string()))?;

    Ok(RunHandle {
        root,
        gate,
        worker: Some(worker),
    })
}

impl<S: State + 'static> RunHandle<S> {
    /// Handle of the root state.
    pub fn handle(&self) -> &StateHandle {
        &self.root
    }

    pub fn gate(&self) -> &Arc<ExecutionGate> {
        &self.gate
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Preempt the whole tree.
    ///
    /// A paused gate is woken so the request is observed right away.
    pub fn stop(&self) {
        self.root.preempt();
        self.gate.wake();
    }

    /// Wait for the run to finish and take the state tree back.
    pub fn join(mut self) -> Result<Completed<S>, EngineError> {
        let worker = self
            .worker
            .take()
            .ok_or_else(|| EngineError::Worker("run already joined".to_string()))?;
        let (state, result) = worker
            .join()
            .map_err(|_| EngineError::Worker("execution thread panicked".to_string()))?;
        let outcome = result?;
        Ok(Completed { state, outcome })
    }
}

impl<S: State + 'static> Drop for RunHandle<S> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.root.preempt();
            self.gate.wake();
            if worker.join().is_err() {
                tracing::warn!(state_id = %self.root.state_id(), "Execution thread panicked");
            }
        }
    }
}
