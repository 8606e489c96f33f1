//! Configuration errors: a state graph that cannot be executed as declared.

use crate::core::{OutcomeId, PortId, StateId};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("Container '{container}' has no child '{state_id}'")]
    UnknownState { container: StateId, state_id: StateId },

    #[error("State '{state_id}' declares no outcome {outcome_id}")]
    UnknownOutcome { state_id: StateId, outcome_id: OutcomeId },

    #[error("State '{state_id}' declares no suitable port {port_id}")]
    UnknownPort { state_id: StateId, port_id: PortId },

    #[error("Container '{container}' has no start state")]
    MissingStartState { container: StateId },

    #[error("Start state '{state_id}' is not a child of container '{container}'")]
    UnknownStartState { container: StateId, state_id: StateId },

    #[error("Container '{container}' already has a child '{state_id}'")]
    DuplicateState { container: StateId, state_id: StateId },

    #[error("State '{state_id}' declares port id {port_id} more than once")]
    DuplicatePortId { state_id: StateId, port_id: PortId },

    #[error("State '{state_id}' declares port name '{name}' more than once")]
    DuplicatePortName { state_id: StateId, name: String },

    #[error("State '{state_id}' declares outcome {outcome_id} more than once")]
    DuplicateOutcome { state_id: StateId, outcome_id: OutcomeId },

    #[error("State '{state_id}' declares reserved outcome id {outcome_id}")]
    ReservedOutcome { state_id: StateId, outcome_id: OutcomeId },

    #[error("Container '{container}' has more than one transition from {from_state}.{from_outcome}")]
    DuplicateTransition {
        container: StateId,
        from_state: StateId,
        from_outcome: OutcomeId,
    },

    #[error("Container '{container}' has more than one data flow into {to_state}.{to_port}")]
    DuplicateDataFlow {
        container: StateId,
        to_state: StateId,
        to_port: PortId,
    },

    #[error("Transition {from_state}.{from_outcome} into container '{container}' has no target outcome")]
    TransitionMissingOutcome {
        container: StateId,
        from_state: StateId,
        from_outcome: OutcomeId,
    },

    #[error("Transition {from_state}.{from_outcome} into child '{to_state}' must not carry an outcome")]
    TransitionUnexpectedOutcome {
        from_state: StateId,
        from_outcome: OutcomeId,
        to_state: StateId,
    },

    #[error("Data flow {from_state}.{from_port} -> {to_state}.{to_port} connects incompatible types")]
    IncompatibleDataFlow {
        from_state: StateId,
        from_port: PortId,
        to_state: StateId,
        to_port: PortId,
    },
}
