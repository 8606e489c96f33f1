//! Running state trees and controlling them while they run.
//!
//! [`execute`] runs a state on the calling thread. [`spawn`] runs it on a
//! worker thread and returns a [`RunHandle`] for preemption and stepping.
//! While a tree runs, every state can be observed and preempted through
//! its [`StateHandle`].

mod control;
mod gate;
mod runner;

pub(crate) use control::ExecutionControl;
pub use control::StateHandle;
pub use gate::{ExecutionGate, GateMode};
pub use runner::{spawn, Completed, RunHandle};

use crate::config::EngineConfig;
use crate::core::Outcome;
use crate::error::EngineError;
use crate::state::State;
use serde_json::Value;
use std::sync::Arc;

/// Configuration and stepping gate shared by every state of one run.
#[derive(Clone, Debug, Default)]
pub struct ExecutionEnv {
    config: EngineConfig,
    gate: Arc<ExecutionGate>,
}

impl ExecutionEnv {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            gate: Arc::new(ExecutionGate::new()),
        }
    }

    /// Share an existing gate, e.g. one already handed to a stepping UI.
    pub fn with_gate(mut self, gate: Arc<ExecutionGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gate(&self) -> &Arc<ExecutionGate> {
        &self.gate
    }
}

/// Run `state` to completion on the calling thread.
///
/// `input` must be a JSON object; missing input ports fall back to their
/// defaults. Returns the state's final outcome. Type and configuration
/// errors propagate; runtime faults inside hierarchy states are contained
/// and show up as the `aborted` outcome.
///
/// # Example
///
/// ```rust
/// use arbor::builder::ExecutionStateBuilder;
/// use arbor::core::{DataPort, DataType};
/// use arbor::execution::{execute, ExecutionEnv};
/// use arbor::state::State;
/// use serde_json::json;
///
/// let mut double = ExecutionStateBuilder::new("DOUBLE")
///     .input(DataPort::new(0, "x", DataType::Int))
///     .output(DataPort::new(1, "y", DataType::Int))
///     .outcome(0, "success")
///     .executable(|ctx| {
///         let x: i64 = ctx.input_as("x")?;
///         ctx.set_output("y", x * 2)?;
///         Ok(0)
///     })
///     .build()
///     .unwrap();
///
/// let outcome = execute(&mut double, json!({"x": 21}), &ExecutionEnv::default()).unwrap();
/// assert_eq!(outcome.name(), "success");
/// assert_eq!(double.core().output_data()["y"], json!(42));
/// ```
pub fn execute<S: State + ?Sized>(
    state: &mut S,
    input: Value,
    env: &ExecutionEnv,
) -> Result<Outcome, EngineError> {
    let Value::Object(provided) = input else {
        return Err(EngineError::type_check(
            state.state_id(),
            "input data must be a mapping",
        ));
    };

    let core = state.core_mut();
    let inputs = core.resolve_inputs(&provided);
    let outputs = core.initial_outputs();
    core.prepare(inputs, outputs);

    tracing::info!(state_id = %state.state_id(), "Executing state tree");
    let result = state.run(env);
    state.core_mut().end_run();
    result?;

    state.final_outcome().cloned().ok_or_else(|| {
        EngineError::runtime_fault(state.state_id(), "finished without an outcome")
    })
}
