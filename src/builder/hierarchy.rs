//! Builder for hierarchy states.

use crate::builder::error::BuildError;
use crate::core::{
    DataFlow, DataPort, ExecutionHistory, Outcome, OutcomeId, ScopedVariable, StateId, Transition,
};
use crate::state::{ContainerState, HierarchyState, State, StateCore, TransitionTable};
use crate::validation::{check_state_declarations, validate_container, ConfigurationError, Topology};
use std::collections::BTreeMap;
use std::sync::Arc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Fluent builder for a [`HierarchyState`].
///
/// `build()` validates the whole graph and reports every violation at once.
///
/// # Example
///
/// ```rust
/// use arbor::builder::{ExecutionStateBuilder, HierarchyStateBuilder};
/// use arbor::core::{DataFlow, DataPort, DataType, Transition};
///
/// let inc = ExecutionStateBuilder::new("INC")
///     .input(DataPort::new(0, "n", DataType::Int))
///     .output(DataPort::new(1, "n", DataType::Int))
///     .outcome(0, "success")
///     .executable(|ctx| {
///         let n: i64 = ctx.input_as("n")?;
///         ctx.set_output("n", n + 1)?;
///         Ok(0)
///     })
///     .build()
///     .unwrap();
///
/// let root = HierarchyStateBuilder::new("ROOT")
///     .input(DataPort::new(0, "n", DataType::Int))
///     .output(DataPort::new(1, "n", DataType::Int))
///     .outcome(0, "done")
///     .state(inc)
///     .start_state("INC")
///     .transition(Transition::to_outcome("INC", 0, "ROOT", 0))
///     .data_flow(DataFlow::new("ROOT", 0, "INC", 0))
///     .data_flow(DataFlow::new("INC", 1, "ROOT", 1))
///     .build()
///     .unwrap();
///
/// assert_eq!(root.container().child_ids().collect::<Vec<_>>(), vec!["INC"]);
/// ```
pub struct HierarchyStateBuilder {
    state_id: StateId,
    name: Option<String>,
    inputs: Vec<DataPort>,
    outputs: Vec<DataPort>,
    scoped: Vec<DataPort>,
    outcomes: Vec<Outcome>,
    children: Vec<Box<dyn State>>,
    start_state: Option<StateId>,
    transitions: Vec<Transition>,
    data_flows: Vec<DataFlow>,
}

impl HierarchyStateBuilder {
    pub fn new(state_id: impl Into<StateId>) -> Self {
        Self {
            state_id: state_id.into(),
            name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            scoped: Vec::new(),
            outcomes: Vec::new(),
            children: Vec::new(),
            start_state: None,
            transitions: Vec::new(),
            data_flows: Vec::new(),
        }
    }

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

    /// Declare a scoped variable, a container-local port usable as both
    /// source and target of data flows.
    pub fn scoped_variable(mut self, port: DataPort) -> Self {
        self.scoped.push(port);
        self
    }

    pub fn outcome(mut self, id: OutcomeId, name: impl Into<String>) -> Self {
        self.outcomes.push(Outcome::new(id, name));
        self
    }

    /// Add a child state.
    pub fn state(mut self, state: impl State + 'static) -> Self {
        self.children.push(Box::new(state));
        self
    }

    pub fn start_state(mut self, state_id: impl Into<StateId>) -> Self {
        self.start_state = Some(state_id.into());
        self
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn data_flow(mut self, flow: DataFlow) -> Self {
        self.data_flows.push(flow);
        self
    }

    /// Build the state.
    /// Returns every configuration error found if the graph is invalid.
    pub fn build(self) -> Result<HierarchyState, BuildError> {
        let mut errors: Vec<ConfigurationError> = Vec::new();

        collect(
            &mut errors,
            check_state_declarations(
                &self.state_id,
                &self.inputs,
                &self.outputs,
                &self.scoped,
                &self.outcomes,
            ),
        );

        let name = self.name.unwrap_or_else(|| self.state_id.clone());
        let core = StateCore::new(
            self.state_id.clone(),
            name,
            self.inputs,
            self.outputs,
            self.outcomes,
        );

        let mut children: BTreeMap<StateId, Box<dyn State>> = BTreeMap::new();
        for mut child in self.children {
            let child_id = child.state_id().to_string();
            // A child sharing the container's id makes data flow endpoints ambiguous.
            if child_id == self.state_id || children.contains_key(&child_id) {
                errors.push(ConfigurationError::DuplicateState {
                    container: self.state_id.clone(),
                    state_id: child_id,
                });
                continue;
            }
            child.core_mut().attach_to(&core);
            children.insert(child_id, child);
        }

        let topology = Topology::of(&core, &children);
        let container = ContainerState {
            core,
            children,
            transitions: Arc::new(TransitionTable::new(topology, self.transitions)),
            data_flows: self.data_flows,
            scoped_variables: self
                .scoped
                .into_iter()
                .map(|port| (port.id, ScopedVariable::new(port)))
                .collect(),
            start_state_id: self.start_state,
            scoped_data: Default::default(),
            history: ExecutionHistory::new(),
        };
        collect(&mut errors, validate_container(&container));

        if !errors.is_empty() {
            return Err(BuildError::Invalid {
                state_id: self.state_id,
                errors,
            });
        }
        Ok(HierarchyState::new(container))
    }
}

fn collect(errors: &mut Vec<ConfigurationError>, checked: Validation<(), NonEmptyVec<ConfigurationError>>) {
    if let Validation::Failure(found) = checked {
        errors.extend(found.iter().cloned());
    }
}
