//! Transition set of a container, shared with concurrent editors.
//!
//! The running container and an interactive editor (or a stepper) both
//! access the table; a container with no transition for a child's outcome
//! blocks on the table's condition variable until one is added or the
//! container is preempted.

use crate::core::{OutcomeId, Transition};
use crate::validation::{ConfigurationError, Topology};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct TransitionTable {
    topology: Topology,
    transitions: Mutex<Vec<Transition>>,
    added: Condvar,
}

impl TransitionTable {
    pub(crate) fn new(topology: Topology, transitions: Vec<Transition>) -> Self {
        Self {
            topology,
            transitions: Mutex::new(transitions),
            added: Condvar::new(),
        }
    }

    pub(crate) fn topology(&self) -> &Topology {
        &self.topology
    }

    pub(crate) fn snapshot(&self) -> Vec<Transition> {
        self.transitions.lock().clone()
    }

    pub(crate) fn find(&self, from_state: &str, from_outcome: OutcomeId) -> Option<Transition> {
        find_in(&self.transitions.lock(), from_state, from_outcome)
    }

    fn insert(&self, transition: Transition) -> Result<(), ConfigurationError> {
        self.topology.check_transition(&transition)?;

        let mut transitions = self.transitions.lock();
        if find_in(&transitions, &transition.from_state, transition.from_outcome).is_some() {
            return Err(ConfigurationError::DuplicateTransition {
                container: self.topology.container_id().to_string(),
                from_state: transition.from_state,
                from_outcome: transition.from_outcome,
            });
        }
        tracing::debug!(
            container = %self.topology.container_id(),
            %transition,
            "Transition added"
        );
        transitions.push(transition);
        self.added.notify_all();
        Ok(())
    }

    fn remove(&self, from_state: &str, from_outcome: OutcomeId) -> Option<Transition> {
        let mut transitions = self.transitions.lock();
        let index = transitions
            .iter()
            .position(|t| t.matches(from_state, from_outcome))?;
        Some(transitions.remove(index))
    }

    /// Block until a transition for `(from_state, from_outcome)` exists.
    ///
    /// The check and the wait happen under the same lock, so an insertion
    /// can never slip in between them unnoticed. Each wait is bounded by
    /// `poll_interval`, after which `is_preempted` is consulted again.
    /// Returns `None` once preemption is observed.
    pub(crate) fn wait_for(
        &self,
        from_state: &str,
        from_outcome: OutcomeId,
        poll_interval: Duration,
        is_preempted: impl Fn() -> bool,
    ) -> Option<Transition> {
        let mut transitions = self.transitions.lock();
        loop {
            if let Some(transition) = find_in(&transitions, from_state, from_outcome) {
                return Some(transition);
            }
            if is_preempted() {
                return None;
            }
            self.added.wait_for(&mut transitions, poll_interval);
        }
    }
}

fn find_in(transitions: &[Transition], from_state: &str, from_outcome: OutcomeId) -> Option<Transition> {
    transitions
        .iter()
        .find(|t| t.matches(from_state, from_outcome))
        .cloned()
}

/// Handle for editing a container's transitions, including while it runs.
///
/// # Example
///
/// ```rust
/// use arbor::builder::{ExecutionStateBuilder, HierarchyStateBuilder};
/// use arbor::core::Transition;
///
/// let leaf = ExecutionStateBuilder::new("A")
///     .outcome(0, "success")
///     .executable(|_ctx| Ok(0))
///     .build()
///     .unwrap();
///
/// let root = HierarchyStateBuilder::new("ROOT")
///     .outcome(0, "done")
///     .state(leaf)
///     .start_state("A")
///     .build()
///     .unwrap();
///
/// let editor = root.container().transition_editor();
/// editor.add_transition(Transition::to_outcome("A", 0, "ROOT", 0)).unwrap();
/// assert_eq!(editor.transitions().len(), 1);
/// ```
#[derive(Clone)]
pub struct TransitionEditor {
    table: Arc<TransitionTable>,
}

impl TransitionEditor {
    pub(crate) fn new(table: Arc<TransitionTable>) -> Self {
        Self { table }
    }

    /// Add a transition, waking a container blocked on it.
    ///
    /// Rejected if it references unknown states or outcomes, or if another
    /// transition already leaves the same `(state, outcome)` pair.
    pub fn add_transition(&self, transition: Transition) -> Result<(), ConfigurationError> {
        self.table.insert(transition)
    }

    pub fn remove_transition(&self, from_state: &str, from_outcome: OutcomeId) -> Option<Transition> {
        self.table.remove(from_state, from_outcome)
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.table.snapshot()
    }
}
