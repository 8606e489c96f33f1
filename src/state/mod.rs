//! Executable states.
//!
//! Every node of a state tree implements [`State`]: it accepts input data,
//! produces output data and finishes with exactly one outcome. Leaves are
//! [`ExecutionState`]s wrapping a pluggable [`Executable`]; inner nodes are
//! [`HierarchyState`]s that run their children one at a time, following
//! transitions until one of them finishes the container.
//!
//! Runtime fields (input/output data, final outcome, status) are reset at
//! the start of every run.

mod container;
mod execution;
mod hierarchy;
mod transitions;

pub use container::ContainerState;
pub use execution::{Executable, ExecutionContext, ExecutionState};
pub use hierarchy::HierarchyState;
pub use transitions::TransitionEditor;

pub(crate) use transitions::TransitionTable;

use crate::core::{
    DataMap, DataPort, ExecutionStatus, Outcome, OutcomeId, PortId, StateId,
};
use crate::error::EngineError;
use crate::execution::{ExecutionControl, ExecutionEnv, StateHandle};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A node of the state tree.
///
/// Implementors must be `Send` so a whole tree can execute on a worker
/// thread while the controller observes it through [`StateHandle`]s.
pub trait State: Send {
    fn core(&self) -> &StateCore;

    fn core_mut(&mut self) -> &mut StateCore;

    /// Execute the state once.
    ///
    /// Consumes `input_data`, produces `output_data` and sets exactly one
    /// final outcome. Preemption is reported through the `preempted`
    /// outcome, never through an error.
    fn run(&mut self, env: &ExecutionEnv) -> Result<(), EngineError>;

    /// The container view of this state, if it has children.
    fn as_container(&self) -> Option<&ContainerState> {
        None
    }

    fn state_id(&self) -> &str {
        &self.core().state_id
    }

    fn name(&self) -> &str {
        &self.core().name
    }

    fn final_outcome(&self) -> Option<&Outcome> {
        self.core().final_outcome.as_ref()
    }

    fn handle(&self) -> StateHandle {
        self.core().handle()
    }
}

/// Declaration and runtime data shared by every kind of state.
pub struct StateCore {
    pub(crate) state_id: StateId,
    pub(crate) name: String,
    pub(crate) parent_id: Option<StateId>,
    pub(crate) input_ports: BTreeMap<PortId, DataPort>,
    pub(crate) output_ports: BTreeMap<PortId, DataPort>,
    pub(crate) outcomes: BTreeMap<OutcomeId, Outcome>,
    pub(crate) input_data: DataMap,
    pub(crate) output_data: DataMap,
    pub(crate) final_outcome: Option<Outcome>,
    pub(crate) control: Arc<ExecutionControl>,
}

impl StateCore {
    /// Assemble a core from already validated declarations.
    ///
    /// The `aborted` and `preempted` sentinels are added to the outcome set.
    pub(crate) fn new(
        state_id: StateId,
        name: String,
        input_ports: Vec<DataPort>,
        output_ports: Vec<DataPort>,
        outcomes: Vec<Outcome>,
    ) -> Self {
        let outcomes = outcomes
            .into_iter()
            .chain(Outcome::sentinels())
            .map(|outcome| (outcome.id(), outcome))
            .collect();
        Self {
            control: ExecutionControl::new(state_id.clone()),
            state_id,
            name,
            parent_id: None,
            input_ports: input_ports.into_iter().map(|p| (p.id, p)).collect(),
            output_ports: output_ports.into_iter().map(|p| (p.id, p)).collect(),
            outcomes,
            input_data: DataMap::new(),
            output_data: DataMap::new(),
            final_outcome: None,
        }
    }

    pub fn state_id(&self) -> &str {
        &self.state_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the owning container; a non-owning back-reference.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn input_ports(&self) -> &BTreeMap<PortId, DataPort> {
        &self.input_ports
    }

    pub fn output_ports(&self) -> &BTreeMap<PortId, DataPort> {
        &self.output_ports
    }

    /// Declared outcomes, including the reserved sentinels.
    pub fn outcomes(&self) -> &BTreeMap<OutcomeId, Outcome> {
        &self.outcomes
    }

    pub fn outcome(&self, id: OutcomeId) -> Option<&Outcome> {
        self.outcomes.get(&id)
    }

    pub fn input_data(&self) -> &DataMap {
        &self.input_data
    }

    pub fn output_data(&self) -> &DataMap {
        &self.output_data
    }

    pub fn final_outcome(&self) -> Option<&Outcome> {
        self.final_outcome.as_ref()
    }

    pub fn handle(&self) -> StateHandle {
        StateHandle::new(Arc::clone(&self.control))
    }

    pub fn is_preempted(&self) -> bool {
        self.control.is_preempted()
    }

    pub(crate) fn attach_to(&mut self, parent: &StateCore) {
        self.parent_id = Some(parent.state_id.clone());
        self.control.attach_to(&parent.control);
    }

    /// Assign the data a parent resolved for this state's next run.
    pub(crate) fn prepare(&mut self, input_data: DataMap, output_data: DataMap) {
        self.input_data = input_data;
        self.output_data = output_data;
    }

    /// Input mapping for a run, taking provided values over port defaults.
    pub(crate) fn resolve_inputs(&self, provided: &DataMap) -> DataMap {
        self.input_ports
            .values()
            .map(|port| {
                let value = provided
                    .get(&port.name)
                    .cloned()
                    .unwrap_or_else(|| port.initial_value());
                (port.name.clone(), value)
            })
            .collect()
    }

    /// Output mapping seeded with every declared port's initial value.
    pub(crate) fn initial_outputs(&self) -> DataMap {
        self.output_ports
            .values()
            .map(|port| (port.name.clone(), port.initial_value()))
            .collect()
    }

    pub(crate) fn begin_run(&mut self) {
        self.final_outcome = None;
        self.control.set_final_outcome(None);
        self.control.set_status(ExecutionStatus::Active);
    }

    /// Mark the run over and consume any pending preemption request.
    pub(crate) fn end_run(&mut self) {
        self.control.set_status(ExecutionStatus::Finished);
        self.control.clear_preemption();
    }

    pub(crate) fn set_status(&self, status: ExecutionStatus) {
        self.control.set_status(status);
    }

    pub(crate) fn set_final_outcome(&mut self, outcome: Outcome) {
        self.control.set_final_outcome(Some(outcome.clone()));
        self.final_outcome = Some(outcome);
    }

    pub(crate) fn check_input_types(&self) -> Result<(), EngineError> {
        check_types(&self.state_id, "input", &self.input_ports, &self.input_data)
    }

    pub(crate) fn check_output_types(&self) -> Result<(), EngineError> {
        check_types(&self.state_id, "output", &self.output_ports, &self.output_data)
    }
}

fn check_types(
    state_id: &str,
    direction: &str,
    ports: &BTreeMap<PortId, DataPort>,
    data: &DataMap,
) -> Result<(), EngineError> {
    for port in ports.values() {
        if let Some(value) = data.get(&port.name) {
            if !port.data_type.accepts(value) {
                return Err(EngineError::type_check(
                    state_id,
                    format!(
                        "{direction} port '{}' expects {} but holds {value}",
                        port.name, port.data_type
                    ),
                ));
            }
        }
    }
    Ok(())
}
