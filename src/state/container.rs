//! Children, edges and scoped data of a container state.
//!
//! A container owns its children exclusively. While it runs it keeps a
//! run-scoped mapping, the scoped data, seeded from its own inputs and
//! scoped variables. Every finished child's outputs are merged into it twice:
//! under the plain port name and under `<port_name><state_id>`, so that
//! same-named ports of different producers stay distinguishable.

use super::transitions::{TransitionEditor, TransitionTable};
use super::State;
use super::StateCore;
use crate::config::ScopedVariablePolicy;
use crate::core::{
    ChildExecution, DataFlow, DataMap, DataPort, ExecutionHistory, ExecutionStatus, Outcome,
    PortId, ScopedVariable, StateId, Transition,
};
use crate::error::EngineError;
use crate::execution::{ExecutionEnv, StateHandle};
use crate::validation::ConfigurationError;
use chrono::Utc;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Key of a producer-specific entry in the scoped data.
pub(crate) fn scoped_key(port_name: &str, state_id: &str) -> String {
    format!("{port_name}{state_id}")
}

/// The part of a state that owns children, transitions, data flows and
/// scoped variables.
pub struct ContainerState {
    pub(crate) core: StateCore,
    pub(crate) children: BTreeMap<StateId, Box<dyn State>>,
    pub(crate) transitions: Arc<TransitionTable>,
    pub(crate) data_flows: Vec<DataFlow>,
    pub(crate) scoped_variables: BTreeMap<PortId, ScopedVariable>,
    pub(crate) start_state_id: Option<StateId>,
    pub(crate) scoped_data: DataMap,
    pub(crate) history: ExecutionHistory,
}

impl ContainerState {
    pub fn core(&self) -> &StateCore {
        &self.core
    }

    pub fn child(&self, state_id: &str) -> Option<&dyn State> {
        self.children.get(state_id).map(|child| child.as_ref())
    }

    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn start_state_id(&self) -> Option<&str> {
        self.start_state_id.as_deref()
    }

    /// Snapshot of the current transitions.
    pub fn transitions(&self) -> Vec<Transition> {
        self.transitions.snapshot()
    }

    pub fn transition_editor(&self) -> TransitionEditor {
        TransitionEditor::new(Arc::clone(&self.transitions))
    }

    pub fn data_flows(&self) -> &[DataFlow] {
        &self.data_flows
    }

    pub fn scoped_variables(&self) -> &BTreeMap<PortId, ScopedVariable> {
        &self.scoped_variables
    }

    pub fn scoped_variable(&self, name: &str) -> Option<&ScopedVariable> {
        self.scoped_variables.values().find(|v| v.name() == name)
    }

    /// Scoped data of the current or last run.
    pub fn scoped_data(&self) -> &DataMap {
        &self.scoped_data
    }

    /// Children executed in the current or last run.
    pub fn history(&self) -> &ExecutionHistory {
        &self.history
    }

    /// Look up a descendant by a slash-separated path relative to this container.
    pub fn descendant(&self, relative_path: &str) -> Option<&dyn State> {
        let (head, rest) = match relative_path.split_once('/') {
            Some((head, rest)) => (head, Some(rest)),
            None => (relative_path, None),
        };
        let child = self.child(head)?;
        match rest {
            None => Some(child),
            Some(rest) => child.as_container()?.descendant(rest),
        }
    }

    /// Handles of every descendant, keyed by path relative to this container.
    pub fn descendant_handles(&self) -> BTreeMap<String, StateHandle> {
        let mut handles = BTreeMap::new();
        for (id, child) in &self.children {
            handles.insert(id.clone(), child.handle());
            if let Some(container) = child.as_container() {
                for (path, handle) in container.descendant_handles() {
                    handles.insert(format!("{id}/{path}"), handle);
                }
            }
        }
        handles
    }

    /// Port owned by the container itself that can feed a data flow.
    fn own_source_port(&self, port_id: PortId) -> Option<&DataPort> {
        self.core
            .input_ports
            .get(&port_id)
            .or_else(|| self.scoped_variables.get(&port_id).map(ScopedVariable::port))
    }

    /// Port owned by the container itself that can receive a data flow.
    fn own_target_port(&self, port_id: PortId) -> Option<&DataPort> {
        self.core
            .output_ports
            .get(&port_id)
            .or_else(|| self.scoped_variables.get(&port_id).map(ScopedVariable::port))
    }

    pub(crate) fn source_port(&self, flow: &DataFlow) -> Option<&DataPort> {
        if flow.from_state == self.core.state_id {
            self.own_source_port(flow.from_port)
        } else {
            self.child(&flow.from_state)?
                .core()
                .output_ports
                .get(&flow.from_port)
        }
    }

    pub(crate) fn target_port(&self, flow: &DataFlow) -> Option<&DataPort> {
        if flow.to_state == self.core.state_id {
            self.own_target_port(flow.to_port)
        } else {
            self.child(&flow.to_state)?
                .core()
                .input_ports
                .get(&flow.to_port)
        }
    }

    /// Current value at the source of a data flow, if it was produced yet.
    fn source_value(&self, flow: &DataFlow) -> Option<&Value> {
        let port = self.source_port(flow)?;
        if flow.from_state == self.core.state_id {
            self.scoped_data.get(&port.name)
        } else {
            self.scoped_data.get(&scoped_key(&port.name, &flow.from_state))
        }
    }

    fn flow_into(&self, state_id: &str, port_id: PortId) -> Option<&DataFlow> {
        self.data_flows.iter().find(|flow| flow.targets(state_id, port_id))
    }

    /// Seed the scoped data for a new run from inputs and scoped variables.
    pub(crate) fn seed_scoped_data(&mut self, policy: ScopedVariablePolicy) {
        self.scoped_data = self.core.input_data.clone();
        for variable in self.scoped_variables.values_mut() {
            if policy == ScopedVariablePolicy::Reset {
                variable.reset();
            }
            self.scoped_data
                .insert(variable.name().to_string(), variable.value().clone());
        }
        self.history = ExecutionHistory::new();
    }

    /// Resolve a child's input and output mappings from the data flows
    /// targeting it.
    ///
    /// Ports without an incoming flow, or whose producer has not run yet,
    /// keep their default value.
    pub(crate) fn io_for_child(&self, child_id: &str) -> Result<(DataMap, DataMap), EngineError> {
        let child = self.child(child_id).ok_or_else(|| ConfigurationError::UnknownState {
            container: self.core.state_id.clone(),
            state_id: child_id.to_string(),
        })?;

        let mut inputs = DataMap::new();
        for port in child.core().input_ports.values() {
            let value = self
                .flow_into(child_id, port.id)
                .and_then(|flow| self.source_value(flow))
                .cloned()
                .unwrap_or_else(|| port.initial_value());
            inputs.insert(port.name.clone(), value);
        }

        Ok((inputs, child.core().initial_outputs()))
    }

    /// Merge a finished child's outputs into the scoped data and update the
    /// scoped variables its data flows target.
    pub(crate) fn absorb_child_output(&mut self, child_id: &str, output: &DataMap) {
        for (name, value) in output {
            self.scoped_data.insert(name.clone(), value.clone());
            self.scoped_data
                .insert(scoped_key(name, child_id), value.clone());
        }

        let updates: Vec<(PortId, Value)> = self
            .data_flows
            .iter()
            .filter(|flow| flow.from_state == child_id && flow.to_state == self.core.state_id)
            .filter(|flow| self.scoped_variables.contains_key(&flow.to_port))
            .filter_map(|flow| {
                let port = self.source_port(flow)?;
                let value = output.get(&port.name)?;
                Some((flow.to_port, value.clone()))
            })
            .collect();

        for (port_id, value) in updates {
            if let Some(variable) = self.scoped_variables.get_mut(&port_id) {
                tracing::trace!(
                    container = %self.core.state_id,
                    variable = %variable.name(),
                    "Scoped variable updated"
                );
                self.scoped_data
                    .insert(variable.name().to_string(), value.clone());
                variable.set_value(value);
            }
        }
    }

    /// Write the container's output data from the data flows targeting its
    /// output ports.
    pub(crate) fn write_output_data(&mut self) {
        let mut output = std::mem::take(&mut self.core.output_data);
        for port in self.core.output_ports.values() {
            let resolved = self
                .flow_into(&self.core.state_id, port.id)
                .and_then(|flow| self.source_value(flow))
                .cloned();
            match resolved {
                Some(value) => {
                    output.insert(port.name.clone(), value);
                }
                None => {
                    output
                        .entry(port.name.clone())
                        .or_insert_with(|| port.initial_value());
                }
            }
        }
        self.core.output_data = output;
    }

    /// Run one child to completion and record it.
    ///
    /// Panics raised by the child are converted into runtime faults when the
    /// configuration asks for it. On success the child is left in
    /// `WaitingForNextTransition` and its outcome is returned.
    pub(crate) fn run_child(&mut self, child_id: &str, env: &ExecutionEnv) -> Result<Outcome, EngineError> {
        let (inputs, outputs) = self.io_for_child(child_id)?;
        let container_id = self.core.state_id.clone();
        let child = self
            .children
            .get_mut(child_id)
            .ok_or_else(|| ConfigurationError::UnknownState {
                container: container_id.clone(),
                state_id: child_id.to_string(),
            })?;

        child.core_mut().prepare(inputs, outputs);
        let started_at = Utc::now();
        tracing::debug!(container = %container_id, state_id = %child_id, "Starting child state");

        let result = if env.config().contain_panics {
            panic::catch_unwind(AssertUnwindSafe(|| child.run(env))).unwrap_or_else(|payload| {
                Err(EngineError::runtime_fault(child_id, panic_message(payload.as_ref())))
            })
        } else {
            child.run(env)
        };

        let outcome = match result.and_then(|()| {
            child
                .final_outcome()
                .cloned()
                .ok_or_else(|| EngineError::runtime_fault(child_id, "finished without an outcome"))
        }) {
            Ok(outcome) => outcome,
            Err(error) => {
                if error.is_runtime_fault() {
                    child.core_mut().set_final_outcome(Outcome::aborted());
                }
                child.core_mut().end_run();
                return Err(error);
            }
        };

        child.core().set_status(ExecutionStatus::WaitingForNextTransition);
        let output = child.core().output_data.clone();
        tracing::debug!(
            container = %container_id,
            state_id = %child_id,
            %outcome,
            "Child state finished"
        );

        self.absorb_child_output(child_id, &output);
        self.history = self.history.record(ChildExecution {
            state_id: child_id.to_string(),
            outcome: outcome.clone(),
            started_at,
            finished_at: Utc::now(),
        });
        Ok(outcome)
    }

    /// Mark a child as done once the container has moved past it.
    pub(crate) fn release_child(&mut self, child_id: &str) {
        if let Some(child) = self.children.get_mut(child_id) {
            child.core_mut().end_run();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ExecutionStateBuilder, HierarchyStateBuilder};
    use crate::core::{DataType, Transition};
    use crate::state::HierarchyState;
    use serde_json::json;

    fn passthrough(id: &str) -> crate::state::ExecutionState {
        ExecutionStateBuilder::new(id)
            .input(DataPort::new(0, "value", DataType::Int))
            .output(DataPort::new(1, "value", DataType::Int))
            .outcome(0, "success")
            .executable(|ctx| {
                let value: i64 = ctx.input_as("value")?;
                ctx.set_output("value", value + 1)?;
                Ok(0)
            })
            .build()
            .unwrap()
    }

    fn container() -> HierarchyState {
        HierarchyStateBuilder::new("C")
            .input(DataPort::new(0, "start", DataType::Int))
            .output(DataPort::new(1, "first", DataType::Int))
            .output(DataPort::new(2, "second", DataType::Int))
            .scoped_variable(DataPort::new(3, "latest", DataType::Int).with_default(json!(0)))
            .outcome(0, "done")
            .state(passthrough("A"))
            .state(passthrough("B"))
            .start_state("A")
            .transition(Transition::to_state("A", 0, "B"))
            .transition(Transition::to_outcome("B", 0, "C", 0))
            .data_flow(DataFlow::new("C", 0, "A", 0))
            .data_flow(DataFlow::new("A", 1, "B", 0))
            .data_flow(DataFlow::new("A", 1, "C", 1))
            .data_flow(DataFlow::new("B", 1, "C", 2))
            .data_flow(DataFlow::new("B", 1, "C", 3))
            .build()
            .unwrap()
    }

    fn seeded(input: Value) -> HierarchyState {
        let mut state = container();
        let container = state.container_mut();
        container.core.input_data = input.as_object().cloned().unwrap();
        container.core.output_data = container.core.initial_outputs();
        container.seed_scoped_data(ScopedVariablePolicy::Reset);
        state
    }

    #[test]
    fn seed_includes_inputs_and_scoped_variables() {
        let state = seeded(json!({"start": 1}));
        let scoped = state.container().scoped_data();
        assert_eq!(scoped.get("start"), Some(&json!(1)));
        assert_eq!(scoped.get("latest"), Some(&json!(0)));
    }

    #[test]
    fn child_inputs_come_from_container_scoped_data() {
        let state = seeded(json!({"start": 1}));
        let (inputs, outputs) = state.container().io_for_child("A").unwrap();
        assert_eq!(inputs.get("value"), Some(&json!(1)));
        assert_eq!(outputs.get("value"), Some(&Value::Null));
    }

    #[test]
    fn child_inputs_fall_back_to_defaults_before_producer_ran() {
        let state = seeded(json!({"start": 1}));
        let (inputs, _) = state.container().io_for_child("B").unwrap();
        assert_eq!(inputs.get("value"), Some(&Value::Null));
    }

    #[test]
    fn outputs_are_keyed_by_name_and_producer() {
        let mut state = seeded(json!({"start": 1}));
        let output = json!({"value": 2}).as_object().cloned().unwrap();
        state.container_mut().absorb_child_output("A", &output);

        let scoped = state.container().scoped_data();
        assert_eq!(scoped.get("value"), Some(&json!(2)));
        assert_eq!(scoped.get("valueA"), Some(&json!(2)));

        let (inputs, _) = state.container().io_for_child("B").unwrap();
        assert_eq!(inputs.get("value"), Some(&json!(2)));
    }

    #[test]
    fn scoped_variables_follow_data_flows() {
        let mut state = seeded(json!({"start": 1}));
        let output = json!({"value": 9}).as_object().cloned().unwrap();
        state.container_mut().absorb_child_output("B", &output);

        let container = state.container();
        assert_eq!(container.scoped_variable("latest").map(|v| v.value().clone()), Some(json!(9)));
        assert_eq!(container.scoped_data().get("latest"), Some(&json!(9)));
    }

    #[test]
    fn output_data_resolves_per_producer() {
        let mut state = seeded(json!({"start": 1}));
        let container = state.container_mut();
        container.absorb_child_output("A", json!({"value": 2}).as_object().unwrap());
        container.absorb_child_output("B", json!({"value": 3}).as_object().unwrap());
        container.write_output_data();

        let output = container.core().output_data();
        assert_eq!(output.get("first"), Some(&json!(2)));
        assert_eq!(output.get("second"), Some(&json!(3)));
    }

    #[test]
    fn descendant_lookup_follows_paths() {
        let state = container();
        assert_eq!(state.container().descendant("A").map(|s| s.state_id().to_string()), Some("A".to_string()));
        assert!(state.container().descendant("A/X").is_none());
        assert!(state.container().descendant("Z").is_none());
        assert_eq!(state.container().descendant_handles().len(), 2);
    }

    #[test]
    fn scoped_key_concatenates_name_and_id() {
        assert_eq!(scoped_key("out", "A"), "outA");
    }
}
