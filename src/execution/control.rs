//! Per-state control block shared with the outer controller.

use crate::core::{ExecutionStatus, Outcome, StateId};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Runtime control of one state.
///
/// The state owns its control block; its children only hold a non-owning
/// link to it, so the chain of controls never forms a reference cycle.
pub struct ExecutionControl {
    state_id: StateId,
    parent: RwLock<Weak<ExecutionControl>>,
    preempted: AtomicBool,
    status: Mutex<ExecutionStatus>,
    final_outcome: Mutex<Option<Outcome>>,
}

impl ExecutionControl {
    pub(crate) fn new(state_id: impl Into<StateId>) -> Arc<Self> {
        Arc::new(Self {
            state_id: state_id.into(),
            parent: RwLock::new(Weak::new()),
            preempted: AtomicBool::new(false),
            status: Mutex::new(ExecutionStatus::NotStarted),
            final_outcome: Mutex::new(None),
        })
    }

    pub(crate) fn attach_to(&self, parent: &Arc<ExecutionControl>) {
        *self.parent.write() = Arc::downgrade(parent);
    }

    fn parent(&self) -> Option<Arc<ExecutionControl>> {
        self.parent.read().upgrade()
    }

    /// Whether this state or any of its ancestors was asked to preempt.
    pub(crate) fn is_preempted(&self) -> bool {
        if self.preempted.load(Ordering::SeqCst) {
            return true;
        }
        self.parent().is_some_and(|parent| parent.is_preempted())
    }

    pub(crate) fn clear_preemption(&self) {
        self.preempted.store(false, Ordering::SeqCst);
    }

    pub(crate) fn set_status(&self, status: ExecutionStatus) {
        *self.status.lock() = status;
    }

    pub(crate) fn set_final_outcome(&self, outcome: Option<Outcome>) {
        *self.final_outcome.lock() = outcome;
    }

    fn path(&self) -> String {
        match self.parent() {
            Some(parent) => format!("{}/{}", parent.path(), self.state_id),
            None => self.state_id.clone(),
        }
    }
}

impl fmt::Debug for ExecutionControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionControl")
            .field("state_id", &self.state_id)
            .field("preempted", &self.preempted.load(Ordering::SeqCst))
            .field("status", &*self.status.lock())
            .finish()
    }
}

/// Thread-safe view of a state's execution, handed to the outer controller.
///
/// Handles stay valid while the state executes on another thread, which is
/// how a controller preempts a running tree or watches for a pause point.
#[derive(Clone, Debug)]
pub struct StateHandle {
    control: Arc<ExecutionControl>,
}

impl StateHandle {
    pub(crate) fn new(control: Arc<ExecutionControl>) -> Self {
        Self { control }
    }

    pub fn state_id(&self) -> &str {
        &self.control.state_id
    }

    /// Slash-separated ids from the root down to this state.
    pub fn path(&self) -> String {
        self.control.path()
    }

    /// Request cooperative preemption of this state and its descendants.
    ///
    /// Observed at the next checkpoint; a container blocked on a missing
    /// transition notices it within one poll interval.
    pub fn preempt(&self) {
        tracing::info!(state_id = %self.control.state_id, "Preemption requested");
        self.control.preempted.store(true, Ordering::SeqCst);
    }

    pub fn is_preempted(&self) -> bool {
        self.control.is_preempted()
    }

    pub fn status(&self) -> ExecutionStatus {
        *self.control.status.lock()
    }

    /// The outcome of the last run, or `None` while still running.
    pub fn final_outcome(&self) -> Option<Outcome> {
        self.control.final_outcome.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preemption_cascades_to_descendants() {
        let root = ExecutionControl::new("ROOT");
        let child = ExecutionControl::new("A");
        let grandchild = ExecutionControl::new("B");
        child.attach_to(&root);
        grandchild.attach_to(&child);

        assert!(!grandchild.is_preempted());

        StateHandle::new(Arc::clone(&root)).preempt();
        assert!(child.is_preempted());
        assert!(grandchild.is_preempted());

        root.clear_preemption();
        assert!(!grandchild.is_preempted());
    }

    #[test]
    fn preemption_does_not_cascade_upwards() {
        let root = ExecutionControl::new("ROOT");
        let child = ExecutionControl::new("A");
        child.attach_to(&root);

        StateHandle::new(Arc::clone(&child)).preempt();
        assert!(child.is_preempted());
        assert!(!root.is_preempted());
    }

    #[test]
    fn path_walks_parent_links() {
        let root = ExecutionControl::new("ROOT");
        let child = ExecutionControl::new("A");
        child.attach_to(&root);

        assert_eq!(StateHandle::new(Arc::clone(&child)).path(), "ROOT/A");
        assert_eq!(StateHandle::new(root).path(), "ROOT");
    }

    #[test]
    fn parent_link_does_not_keep_parent_alive() {
        let child = ExecutionControl::new("A");
        {
            let root = ExecutionControl::new("ROOT");
            child.attach_to(&root);
            StateHandle::new(Arc::clone(&root)).preempt();
            assert!(child.is_preempted());
        }
        assert!(!child.is_preempted());
        assert_eq!(StateHandle::new(child).path(), "A");
    }

    #[test]
    fn handle_reports_status_and_outcome() {
        let control = ExecutionControl::new("A");
        let handle = StateHandle::new(Arc::clone(&control));
        assert_eq!(handle.status(), ExecutionStatus::NotStarted);
        assert!(handle.final_outcome().is_none());

        control.set_status(ExecutionStatus::Finished);
        control.set_final_outcome(Some(Outcome::new(0, "done")));
        assert_eq!(handle.status(), ExecutionStatus::Finished);
        assert_eq!(handle.final_outcome(), Some(Outcome::new(0, "done")));
    }
}
