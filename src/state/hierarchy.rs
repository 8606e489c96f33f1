//! Hierarchy states: sequential execution of children along transitions.

use super::container::ContainerState;
use super::{State, StateCore};
use crate::core::{Outcome, OutcomeId, StateId, Transition};
use crate::error::EngineError;
use crate::execution::{ExecutionEnv, StateHandle};
use crate::validation::ConfigurationError;
use std::time::Duration;

/// How the child loop of a hierarchy state ended.
enum LoopExit {
    /// A transition led back to the container with this outcome.
    Terminated(OutcomeId),
    Preempted,
}

/// Result of resolving the transition out of a finished child.
enum Resolution {
    Next(Transition),
    Preempted,
}

/// A container that runs its children one at a time.
///
/// Starting at the start state, each child is run to completion, its
/// outputs are merged into the scoped data, and the transition leaving its
/// outcome decides what runs next. The loop ends when a transition leads
/// back to the container itself; that transition's outcome becomes the
/// container's outcome.
///
/// A child outcome without a transition blocks the container until one is
/// added through a [`TransitionEditor`](super::TransitionEditor) or the
/// container is preempted. An unconnected `preempted` outcome propagates
/// immediately. Runtime faults raised by children finish the container with
/// `aborted` instead of propagating further.
pub struct HierarchyState {
    container: ContainerState,
}

impl HierarchyState {
    pub(crate) fn new(container: ContainerState) -> Self {
        Self { container }
    }

    pub fn container(&self) -> &ContainerState {
        &self.container
    }

    pub(crate) fn container_mut(&mut self) -> &mut ContainerState {
        &mut self.container
    }

    /// Look up this state or a descendant by its full path, e.g. `ROOT/A/B`.
    pub fn state_by_path(&self, path: &str) -> Option<&dyn State> {
        match path.split_once('/') {
            None if path == self.state_id() => Some(self),
            Some((head, rest)) if head == self.state_id() => self.container.descendant(rest),
            _ => None,
        }
    }

    pub fn handle_by_path(&self, path: &str) -> Option<StateHandle> {
        self.state_by_path(path).map(|state| state.handle())
    }

    fn run_children(&mut self, env: &ExecutionEnv) -> Result<LoopExit, EngineError> {
        let poll_interval = env.config().poll_interval();
        let own_id = self.container.core.state_id.clone();
        let own_path = self.container.core.handle().path();

        let mut current: StateId = self
            .container
            .start_state_id
            .clone()
            .ok_or_else(|| ConfigurationError::MissingStartState {
                container: own_id.clone(),
            })?;
        let mut waiting: Option<StateId> = None;

        loop {
            let core = &self.container.core;
            let may_start = !core.is_preempted()
                && env.gate().pass(&format!("{own_path}/{current}"), poll_interval, || {
                    core.is_preempted()
                });
            if let Some(previous) = waiting.take() {
                self.container.release_child(&previous);
            }
            if !may_start {
                return Ok(LoopExit::Preempted);
            }

            let outcome = self.container.run_child(&current, env)?;

            let transition = match self.resolve_transition(&current, &outcome, poll_interval) {
                Resolution::Next(transition) => transition,
                Resolution::Preempted => {
                    self.container.release_child(&current);
                    return Ok(LoopExit::Preempted);
                }
            };
            tracing::debug!(container = %own_id, %transition, "Following transition");

            if transition.to_state == own_id {
                self.container.release_child(&current);
                let outcome_id =
                    transition
                        .to_outcome
                        .ok_or_else(|| ConfigurationError::TransitionMissingOutcome {
                            container: own_id.clone(),
                            from_state: transition.from_state.clone(),
                            from_outcome: transition.from_outcome,
                        })?;
                return Ok(LoopExit::Terminated(outcome_id));
            }

            if !self.container.children.contains_key(&transition.to_state) {
                self.container.release_child(&current);
                return Err(ConfigurationError::UnknownState {
                    container: own_id,
                    state_id: transition.to_state,
                }
                .into());
            }

            waiting = Some(current);
            current = transition.to_state;
        }
    }

    fn resolve_transition(&self, child_id: &str, outcome: &Outcome, poll_interval: Duration) -> Resolution {
        let table = &self.container.transitions;
        if let Some(transition) = table.find(child_id, outcome.id()) {
            return Resolution::Next(transition);
        }

        // An unconnected preempted outcome is implicitly connected to the
        // container's own preempted outcome.
        if outcome.is_preempted() {
            return Resolution::Preempted;
        }

        tracing::warn!(
            container = %self.container.core.state_id,
            state_id = %child_id,
            %outcome,
            "No transition for outcome, waiting for one to be added"
        );
        let core = &self.container.core;
        match table.wait_for(child_id, outcome.id(), poll_interval, || core.is_preempted()) {
            Some(transition) => Resolution::Next(transition),
            None => Resolution::Preempted,
        }
    }

    fn exit(&mut self, outcome_id: OutcomeId) -> Result<(), EngineError> {
        let container = &mut self.container;
        container.write_output_data();
        container.core.check_output_types()?;

        if container.core.is_preempted() {
            self.finish_preempted();
            return Ok(());
        }

        let outcome = container
            .core
            .outcome(outcome_id)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownOutcome {
                state_id: container.core.state_id.clone(),
                outcome_id,
            })?;
        tracing::info!(state_id = %container.core.state_id, %outcome, "Hierarchy state finished");
        container.core.set_final_outcome(outcome);
        Ok(())
    }

    fn finish_preempted(&mut self) {
        tracing::info!(state_id = %self.container.core.state_id, "Hierarchy state preempted");
        self.container.core.set_final_outcome(Outcome::preempted());
    }
}

impl State for HierarchyState {
    fn core(&self) -> &StateCore {
        &self.container.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.container.core
    }

    fn as_container(&self) -> Option<&ContainerState> {
        Some(&self.container)
    }

    fn run(&mut self, env: &ExecutionEnv) -> Result<(), EngineError> {
        self.container.core.begin_run();
        self.container.core.check_input_types()?;
        self.container.seed_scoped_data(env.config().scoped_variables);
        tracing::info!(state_id = %self.container.core.state_id, "Starting hierarchy state");

        match self.run_children(env) {
            Ok(LoopExit::Terminated(outcome_id)) => self.exit(outcome_id),
            Ok(LoopExit::Preempted) => {
                self.finish_preempted();
                Ok(())
            }
            Err(error) if error.is_runtime_fault() => {
                tracing::warn!(
                    state_id = %self.container.core.state_id,
                    %error,
                    "Runtime fault contained, hierarchy state aborted"
                );
                self.container.core.set_final_outcome(Outcome::aborted());
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ExecutionStateBuilder, HierarchyStateBuilder};
    use crate::config::EngineConfig;
    use crate::core::{DataFlow, DataPort, DataType, ExecutionStatus};
    use crate::error::ExecutionFault;
    use crate::execution::execute;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn env() -> ExecutionEnv {
        ExecutionEnv::new(EngineConfig::default().with_poll_interval(Duration::from_millis(10)))
    }

    fn leaf(id: &str, outcome: OutcomeId) -> crate::state::ExecutionState {
        ExecutionStateBuilder::new(id)
            .outcome(0, "success")
            .outcome(1, "failure")
            .executable(move |_ctx| Ok(outcome))
            .build()
            .unwrap()
    }

    #[test]
    fn follows_transitions_until_container_finishes() {
        let mut root = HierarchyStateBuilder::new("ROOT")
            .outcome(0, "done")
            .outcome(1, "failed")
            .state(leaf("A", 1))
            .state(leaf("B", 0))
            .state(leaf("X", 0))
            .start_state("A")
            .transition(Transition::to_state("A", 0, "X"))
            .transition(Transition::to_state("A", 1, "B"))
            .transition(Transition::to_outcome("B", 0, "ROOT", 1))
            .transition(Transition::to_outcome("X", 0, "ROOT", 0))
            .build()
            .unwrap();

        let outcome = execute(&mut root, json!({}), &env()).unwrap();

        assert_eq!(outcome.name(), "failed");
        assert_eq!(root.container().history().get_path(), vec!["A", "B"]);
        assert_eq!(
            root.handle_by_path("ROOT/B").map(|h| h.status()),
            Some(ExecutionStatus::Finished)
        );
        assert_eq!(
            root.handle_by_path("ROOT/X").map(|h| h.status()),
            Some(ExecutionStatus::NotStarted)
        );
    }

    #[test]
    fn loops_back_through_transitions() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counting = {
            let counter = Arc::clone(&counter);
            ExecutionStateBuilder::new("COUNT")
                .outcome(0, "again")
                .outcome(1, "enough")
                .executable(move |_ctx| {
                    let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(if seen < 3 { 0 } else { 1 })
                })
                .build()
                .unwrap()
        };

        let mut root = HierarchyStateBuilder::new("ROOT")
            .outcome(0, "done")
            .state(counting)
            .start_state("COUNT")
            .transition(Transition::to_state("COUNT", 0, "COUNT"))
            .transition(Transition::to_outcome("COUNT", 1, "ROOT", 0))
            .build()
            .unwrap();

        let outcome = execute(&mut root, json!({}), &env()).unwrap();
        assert_eq!(outcome.name(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(root.container().history().executions().len(), 3);
    }

    #[test]
    fn unconnected_preempted_outcome_propagates() {
        let preempting = ExecutionStateBuilder::new("A")
            .outcome(0, "success")
            .executable(|_ctx| Ok(Outcome::PREEMPTED_ID))
            .build()
            .unwrap();

        let mut root = HierarchyStateBuilder::new("ROOT")
            .outcome(0, "done")
            .state(preempting)
            .start_state("A")
            .transition(Transition::to_outcome("A", 0, "ROOT", 0))
            .build()
            .unwrap();

        let outcome = execute(&mut root, json!({}), &env()).unwrap();
        assert!(outcome.is_preempted());
    }

    #[test]
    fn wired_aborted_outcome_is_followed() {
        let failing = ExecutionStateBuilder::new("A")
            .outcome(0, "success")
            .executable(|_ctx| Ok(Outcome::ABORTED_ID))
            .build()
            .unwrap();

        let mut root = HierarchyStateBuilder::new("ROOT")
            .outcome(0, "done")
            .outcome(1, "recovered")
            .state(failing)
            .start_state("A")
            .transition(Transition::to_outcome("A", 0, "ROOT", 0))
            .transition(Transition::to_outcome("A", Outcome::ABORTED_ID, "ROOT", 1))
            .build()
            .unwrap();

        let outcome = execute(&mut root, json!({}), &env()).unwrap();
        assert_eq!(outcome.name(), "recovered");
    }

    #[test]
    fn runtime_fault_aborts_parent_only() {
        let faulty = ExecutionStateBuilder::new("F")
            .outcome(0, "success")
            .executable(|_ctx| Err(ExecutionFault::new("device unavailable")))
            .build()
            .unwrap();

        let inner = HierarchyStateBuilder::new("INNER")
            .outcome(0, "done")
            .state(faulty)
            .start_state("F")
            .transition(Transition::to_outcome("F", 0, "INNER", 0))
            .build()
            .unwrap();

        let mut root = HierarchyStateBuilder::new("ROOT")
            .outcome(0, "done")
            .outcome(1, "inner aborted")
            .state(inner)
            .start_state("INNER")
            .transition(Transition::to_outcome("INNER", 0, "ROOT", 0))
            .transition(Transition::to_outcome("INNER", Outcome::ABORTED_ID, "ROOT", 1))
            .build()
            .unwrap();

        let outcome = execute(&mut root, json!({}), &env()).unwrap();

        assert_eq!(outcome.name(), "inner aborted");
        let inner = root.state_by_path("ROOT/INNER").unwrap();
        assert!(inner.final_outcome().is_some_and(Outcome::is_aborted));
    }

    #[test]
    fn panic_in_child_is_contained() {
        let panicking = ExecutionStateBuilder::new("P")
            .outcome(0, "success")
            .executable(|_ctx| -> Result<OutcomeId, ExecutionFault> { panic!("sensor exploded") })
            .build()
            .unwrap();

        let mut root = HierarchyStateBuilder::new("ROOT")
            .outcome(0, "done")
            .state(panicking)
            .start_state("P")
            .transition(Transition::to_outcome("P", 0, "ROOT", 0))
            .build()
            .unwrap();

        let outcome = execute(&mut root, json!({}), &env()).unwrap();
        assert!(outcome.is_aborted());
    }

    #[test]
    fn type_errors_propagate_through_containers() {
        let strict = ExecutionStateBuilder::new("S")
            .input(DataPort::new(0, "count", DataType::Int))
            .outcome(0, "success")
            .executable(|_ctx| Ok(0))
            .build()
            .unwrap();

        let mut root = HierarchyStateBuilder::new("ROOT")
            .input(DataPort::new(0, "count", DataType::Any))
            .outcome(0, "done")
            .state(strict)
            .start_state("S")
            .transition(Transition::to_outcome("S", 0, "ROOT", 0))
            .data_flow(DataFlow::new("ROOT", 0, "S", 0))
            .build()
            .unwrap();

        let error = execute(&mut root, json!({"count": "many"}), &env()).unwrap_err();
        assert!(matches!(error, EngineError::TypeCheck { ref state_id, .. } if state_id == "S"));
    }

    #[test]
    fn path_lookup_requires_own_id_first() {
        let root = HierarchyStateBuilder::new("ROOT")
            .outcome(0, "done")
            .state(leaf("A", 0))
            .start_state("A")
            .transition(Transition::to_outcome("A", 0, "ROOT", 0))
            .build()
            .unwrap();

        assert!(root.state_by_path("ROOT").is_some());
        assert!(root.state_by_path("ROOT/A").is_some());
        assert!(root.state_by_path("A").is_none());
        assert_eq!(root.handle_by_path("ROOT/A").map(|h| h.path()), Some("ROOT/A".to_string()));
    }
}
