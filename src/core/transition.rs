//! Edges of a container: outcome-triggered transitions and data flows.

use super::outcome::OutcomeId;
use super::port::PortId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a state, unique within its parent's namespace.
pub type StateId = String;

/// Directed edge `(from_state, from_outcome) -> (to_state, to_outcome?)`.
///
/// A transition without `to_outcome` hands control to the child `to_state`.
/// A transition whose `to_state` is the owning container and which carries
/// a `to_outcome` finishes that container with the given outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from_state: StateId,
    pub from_outcome: OutcomeId,
    pub to_state: StateId,
    pub to_outcome: Option<OutcomeId>,
}

impl Transition {
    /// Continue with the sibling `to_state` once `from_state` finishes with `from_outcome`.
    pub fn to_state(
        from_state: impl Into<StateId>,
        from_outcome: OutcomeId,
        to_state: impl Into<StateId>,
    ) -> Self {
        Self {
            from_state: from_state.into(),
            from_outcome,
            to_state: to_state.into(),
            to_outcome: None,
        }
    }

    /// Finish `container` with `to_outcome` once `from_state` finishes with `from_outcome`.
    pub fn to_outcome(
        from_state: impl Into<StateId>,
        from_outcome: OutcomeId,
        container: impl Into<StateId>,
        to_outcome: OutcomeId,
    ) -> Self {
        Self {
            from_state: from_state.into(),
            from_outcome,
            to_state: container.into(),
            to_outcome: Some(to_outcome),
        }
    }

    /// Whether this transition starts at the given `(state, outcome)` pair.
    pub fn matches(&self, state_id: &str, outcome: OutcomeId) -> bool {
        self.from_state == state_id && self.from_outcome == outcome
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_outcome {
            Some(outcome) => write!(
                f,
                "{}.{} -> {}.{}",
                self.from_state, self.from_outcome, self.to_state, outcome
            ),
            None => write!(f, "{}.{} -> {}", self.from_state, self.from_outcome, self.to_state),
        }
    }
}

/// Directed edge `(from_state, from_port) -> (to_state, to_port)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFlow {
    pub from_state: StateId,
    pub from_port: PortId,
    pub to_state: StateId,
    pub to_port: PortId,
}

impl DataFlow {
    pub fn new(
        from_state: impl Into<StateId>,
        from_port: PortId,
        to_state: impl Into<StateId>,
        to_port: PortId,
    ) -> Self {
        Self {
            from_state: from_state.into(),
            from_port,
            to_state: to_state.into(),
            to_port,
        }
    }

    pub fn targets(&self, state_id: &str, port: PortId) -> bool {
        self.to_state == state_id && self.to_port == port
    }
}
