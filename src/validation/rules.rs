//! Validation rules for state declarations and container graphs.
//!
//! Every rule yields a `Validation` so all violations are reported together.

use super::error::ConfigurationError;
use crate::core::{DataFlow, DataPort, Outcome, OutcomeId, StateId, Transition};
use crate::state::{ContainerState, State, StateCore};
use std::collections::{BTreeMap, BTreeSet};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

pub type Checked = Validation<(), NonEmptyVec<ConfigurationError>>;

fn check(result: Result<(), ConfigurationError>) -> Checked {
    match result {
        Ok(()) => Validation::success(()),
        Err(error) => Validation::fail(error),
    }
}

/// Which states and outcomes a container's transitions may reference.
///
/// Shared by build-time validation and run-time transition edits.
#[derive(Clone, Debug)]
pub(crate) struct Topology {
    container_id: StateId,
    outcomes: BTreeSet<OutcomeId>,
    children: BTreeMap<StateId, BTreeSet<OutcomeId>>,
}

impl Topology {
    pub(crate) fn new(
        container_id: impl Into<StateId>,
        outcomes: BTreeSet<OutcomeId>,
        children: BTreeMap<StateId, BTreeSet<OutcomeId>>,
    ) -> Self {
        Self {
            container_id: container_id.into(),
            outcomes,
            children,
        }
    }

    /// Topology of a container given its own core and its children.
    pub(crate) fn of(core: &StateCore, children: &BTreeMap<StateId, Box<dyn State>>) -> Self {
        let children = children
            .iter()
            .map(|(id, child)| (id.clone(), child.core().outcomes.keys().copied().collect()))
            .collect();
        Self::new(
            core.state_id.clone(),
            core.outcomes.keys().copied().collect(),
            children,
        )
    }

    pub(crate) fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Check one transition against the container's children and outcomes.
    pub(crate) fn check_transition(&self, transition: &Transition) -> Result<(), ConfigurationError> {
        let from_outcomes = self.children.get(&transition.from_state).ok_or_else(|| {
            ConfigurationError::UnknownState {
                container: self.container_id.clone(),
                state_id: transition.from_state.clone(),
            }
        })?;
        if !from_outcomes.contains(&transition.from_outcome) {
            return Err(ConfigurationError::UnknownOutcome {
                state_id: transition.from_state.clone(),
                outcome_id: transition.from_outcome,
            });
        }

        if transition.to_state == self.container_id {
            let to_outcome =
                transition
                    .to_outcome
                    .ok_or_else(|| ConfigurationError::TransitionMissingOutcome {
                        container: self.container_id.clone(),
                        from_state: transition.from_state.clone(),
                        from_outcome: transition.from_outcome,
                    })?;
            if !self.outcomes.contains(&to_outcome) {
                return Err(ConfigurationError::UnknownOutcome {
                    state_id: self.container_id.clone(),
                    outcome_id: to_outcome,
                });
            }
            return Ok(());
        }

        if !self.children.contains_key(&transition.to_state) {
            return Err(ConfigurationError::UnknownState {
                container: self.container_id.clone(),
                state_id: transition.to_state.clone(),
            });
        }
        if transition.to_outcome.is_some() {
            return Err(ConfigurationError::TransitionUnexpectedOutcome {
                from_state: transition.from_state.clone(),
                from_outcome: transition.from_outcome,
                to_state: transition.to_state.clone(),
            });
        }
        Ok(())
    }
}

/// Validate the ports and outcomes a single state declares.
///
/// Port ids are unique across all of a state's ports; port names are unique
/// per direction because data mappings are keyed by name. A scoped variable
/// may not reuse an input's name. User outcomes must not use the reserved
/// negative ids.
pub fn check_state_declarations(
    state_id: &str,
    inputs: &[DataPort],
    outputs: &[DataPort],
    scoped: &[DataPort],
    outcomes: &[Outcome],
) -> Checked {
    let mut checks: Vec<Checked> = Vec::new();

    let mut port_ids = BTreeSet::new();
    for port in inputs.iter().chain(outputs).chain(scoped) {
        if !port_ids.insert(port.id) {
            checks.push(Validation::fail(ConfigurationError::DuplicatePortId {
                state_id: state_id.to_string(),
                port_id: port.id,
            }));
        }
    }

    for ports in [inputs, outputs, scoped] {
        let mut names = BTreeSet::new();
        for port in ports {
            if !names.insert(port.name.as_str()) {
                checks.push(Validation::fail(ConfigurationError::DuplicatePortName {
                    state_id: state_id.to_string(),
                    name: port.name.clone(),
                }));
            }
        }
    }

    // Inputs and scoped variables share the container's scoped data.
    let input_names: BTreeSet<&str> = inputs.iter().map(|p| p.name.as_str()).collect();
    for port in scoped {
        if input_names.contains(port.name.as_str()) {
            checks.push(Validation::fail(ConfigurationError::DuplicatePortName {
                state_id: state_id.to_string(),
                name: port.name.clone(),
            }));
        }
    }

    let mut outcome_ids = BTreeSet::new();
    for outcome in outcomes {
        if outcome.id() < 0 {
            checks.push(Validation::fail(ConfigurationError::ReservedOutcome {
                state_id: state_id.to_string(),
                outcome_id: outcome.id(),
            }));
        } else if !outcome_ids.insert(outcome.id()) {
            checks.push(Validation::fail(ConfigurationError::DuplicateOutcome {
                state_id: state_id.to_string(),
                outcome_id: outcome.id(),
            }));
        }
    }

    Validation::all_vec(checks).map(|_| ())
}

/// Validate a container's start state, transitions and data flows.
pub fn validate_container(container: &ContainerState) -> Checked {
    let mut checks: Vec<Checked> = Vec::new();
    let container_id = container.core.state_id.clone();

    checks.push(check(match &container.start_state_id {
        None => Err(ConfigurationError::MissingStartState {
            container: container_id.clone(),
        }),
        Some(start) if !container.children.contains_key(start) => {
            Err(ConfigurationError::UnknownStartState {
                container: container_id.clone(),
                state_id: start.clone(),
            })
        }
        Some(_) => Ok(()),
    }));

    let topology = container.transitions.topology();
    let mut sources = BTreeSet::new();
    for transition in container.transitions.snapshot() {
        checks.push(check(topology.check_transition(&transition)));
        if !sources.insert((transition.from_state.clone(), transition.from_outcome)) {
            checks.push(Validation::fail(ConfigurationError::DuplicateTransition {
                container: container_id.clone(),
                from_state: transition.from_state,
                from_outcome: transition.from_outcome,
            }));
        }
    }

    let mut targets = BTreeSet::new();
    for flow in &container.data_flows {
        checks.push(check(check_data_flow(container, flow)));
        if !targets.insert((flow.to_state.as_str(), flow.to_port)) {
            checks.push(Validation::fail(ConfigurationError::DuplicateDataFlow {
                container: container_id.clone(),
                to_state: flow.to_state.clone(),
                to_port: flow.to_port,
            }));
        }
    }

    Validation::all_vec(checks).map(|_| ())
}

fn check_data_flow(container: &ContainerState, flow: &DataFlow) -> Result<(), ConfigurationError> {
    let endpoint = |state_id: &StateId, port_id| -> Result<(), ConfigurationError> {
        if *state_id != container.core.state_id && !container.children.contains_key(state_id) {
            return Err(ConfigurationError::UnknownState {
                container: container.core.state_id.clone(),
                state_id: state_id.clone(),
            });
        }
        Err(ConfigurationError::UnknownPort {
            state_id: state_id.clone(),
            port_id,
        })
    };

    let source = match container.source_port(flow) {
        Some(port) => port,
        None => return endpoint(&flow.from_state, flow.from_port),
    };
    let target = match container.target_port(flow) {
        Some(port) => port,
        None => return endpoint(&flow.to_state, flow.to_port),
    };

    if !source.data_type.flows_into(target.data_type) {
        return Err(ConfigurationError::IncompatibleDataFlow {
            from_state: flow.from_state.clone(),
            from_port: flow.from_port,
            to_state: flow.to_state.clone(),
            to_port: flow.to_port,
        });
    }
    Ok(())
}
