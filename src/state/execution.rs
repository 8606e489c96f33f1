//! Leaf states wrapping a pluggable executable unit.

use super::{State, StateCore};
use crate::core::{DataMap, Outcome, OutcomeId};
use crate::error::{EngineError, ExecutionFault};
use crate::execution::{ExecutionControl, ExecutionEnv};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The computation performed by a leaf state.
///
/// Implementations read inputs and write outputs through the context and
/// return the id of one of the leaf's declared outcomes. Long-running
/// units are expected to poll [`ExecutionContext::is_preempted`] and return
/// [`Outcome::PREEMPTED_ID`] promptly once it reports `true`.
pub trait Executable: Send {
    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<OutcomeId, ExecutionFault>;
}

impl<F> Executable for F
where
    F: FnMut(&mut ExecutionContext<'_>) -> Result<OutcomeId, ExecutionFault> + Send,
{
    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<OutcomeId, ExecutionFault> {
        self(ctx)
    }
}

/// View of a leaf's data and control while its executable runs.
pub struct ExecutionContext<'a> {
    state_id: &'a str,
    inputs: &'a DataMap,
    outputs: &'a mut DataMap,
    control: &'a ExecutionControl,
}

impl<'a> ExecutionContext<'a> {
    pub fn state_id(&self) -> &str {
        self.state_id
    }

    pub fn inputs(&self) -> &DataMap {
        self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    /// Deserialize an input into a concrete type.
    pub fn input_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, ExecutionFault> {
        let value = self
            .inputs
            .get(name)
            .ok_or_else(|| ExecutionFault::new(format!("no input named '{name}'")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| ExecutionFault::new(format!("input '{name}' has unexpected shape: {e}")))
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    /// Write a declared output port.
    pub fn set_output(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ExecutionFault> {
        match self.outputs.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(ExecutionFault::new(format!("no output named '{name}'"))),
        }
    }

    pub fn is_preempted(&self) -> bool {
        self.control.is_preempted()
    }
}

/// A leaf state: runs its executable once per run.
pub struct ExecutionState {
    pub(crate) core: StateCore,
    executable: Box<dyn Executable>,
}

impl ExecutionState {
    pub(crate) fn new(core: StateCore, executable: Box<dyn Executable>) -> Self {
        Self { core, executable }
    }

    fn fail(&mut self, message: String) -> EngineError {
        self.core.set_final_outcome(Outcome::aborted());
        EngineError::runtime_fault(&self.core.state_id, message)
    }
}

impl State for ExecutionState {
    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn run(&mut self, _env: &ExecutionEnv) -> Result<(), EngineError> {
        self.core.begin_run();

        if self.core.is_preempted() {
            tracing::debug!(state_id = %self.core.state_id, "Preempted before start");
            self.core.set_final_outcome(Outcome::preempted());
            return Ok(());
        }

        self.core.check_input_types()?;

        let result = {
            let core = &mut self.core;
            let mut ctx = ExecutionContext {
                state_id: &core.state_id,
                inputs: &core.input_data,
                outputs: &mut core.output_data,
                control: &core.control,
            };
            self.executable.execute(&mut ctx)
        };

        let outcome_id = match result {
            Ok(id) => id,
            Err(fault) => return Err(self.fail(fault.message().to_string())),
        };
        let Some(outcome) = self.core.outcome(outcome_id).cloned() else {
            return Err(self.fail(format!("returned undeclared outcome {outcome_id}")));
        };

        self.core.check_output_types()?;
        tracing::debug!(state_id = %self.core.state_id, %outcome, "Execution state finished");
        self.core.set_final_outcome(outcome);
        Ok(())
    }
}
