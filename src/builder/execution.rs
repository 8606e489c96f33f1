//! Builder for leaf states.

use crate::builder::error::BuildError;
use crate::core::{DataPort, Outcome, OutcomeId, StateId};
use crate::error::ExecutionFault;
use crate::state::{Executable, ExecutionContext, ExecutionState, StateCore};
use crate::validation::check_state_declarations;
use stillwater::validation::Validation;

/// Fluent builder for an [`ExecutionState`].
pub struct ExecutionStateBuilder {
    state_id: StateId,
    name: Option<String>,
    inputs: Vec<DataPort>,
    outputs: Vec<DataPort>,
    outcomes: Vec<Outcome>,
    executable: Option<Box<dyn Executable>>,
}

impl ExecutionStateBuilder {
    pub fn new(state_id: impl Into<StateId>) -> Self {
        Self {
            state_id: state_id.into(),
            name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            outcomes: Vec::new(),
            executable: None,
        }
    }

    /// Human-readable name; defaults to the state id.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn input(mut self, port: DataPort) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn output(mut self, port: DataPort) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn outcome(mut self, id: OutcomeId, name: impl Into<String>) -> Self {
        self.outcomes.push(Outcome::new(id, name));
        self
    }

    /// Use a closure as the executable.
    pub fn executable<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut ExecutionContext<'_>) -> Result<OutcomeId, ExecutionFault> + Send + 'static,
    {
        self.executable = Some(Box::new(f));
        self
    }

    /// Use any [`Executable`] implementation.
    pub fn unit(mut self, executable: impl Executable + 'static) -> Self {
        self.executable = Some(Box::new(executable));
        self
    }

    /// Build the state.
    /// Returns an error if the executable is missing or declarations are invalid.
    pub fn build(self) -> Result<ExecutionState, BuildError> {
        let executable = self
            .executable
            .ok_or_else(|| BuildError::MissingExecutable(self.state_id.clone()))?;

        let checked =
            check_state_declarations(&self.state_id, &self.inputs, &self.outputs, &[], &self.outcomes);
        if let Validation::Failure(errors) = checked {
            return Err(BuildError::Invalid {
                state_id: self.state_id,
                errors: errors.iter().cloned().collect(),
            });
        }

        let name = self.name.unwrap_or_else(|| self.state_id.clone());
        let core = StateCore::new(self.state_id, name, self.inputs, self.outputs, self.outcomes);
        Ok(ExecutionState::new(core, executable))
    }
}
