//! Execution history of a container run.
//!
//! Provides immutable tracking of the children a container executed during
//! one run, in execution order.

use super::outcome::Outcome;
use super::transition::StateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single child execution.
///
/// # Example
///
/// ```rust
/// use arbor::core::{ChildExecution, Outcome};
/// use chrono::Utc;
///
/// let now = Utc::now();
/// let execution = ChildExecution {
///     state_id: "A".to_string(),
///     outcome: Outcome::new(0, "success"),
///     started_at: now,
///     finished_at: now,
/// };
/// assert_eq!(execution.elapsed(), std::time::Duration::ZERO);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChildExecution {
    /// The child that was executed
    pub state_id: StateId,
    /// The outcome it finished with
    pub outcome: Outcome,
    /// When the container started the child
    pub started_at: DateTime<Utc>,
    /// When the child returned
    pub finished_at: DateTime<Utc>,
}

impl ChildExecution {
    pub fn elapsed(&self) -> Duration {
        self.finished_at
            .signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Ordered history of child executions.
///
/// History is immutable - the `record` method returns a new history
/// with the execution added.
///
/// # Example
///
/// ```rust
/// use arbor::core::{ChildExecution, ExecutionHistory, Outcome};
/// use chrono::Utc;
///
/// let history = ExecutionHistory::new();
/// let history = history.record(ChildExecution {
///     state_id: "A".to_string(),
///     outcome: Outcome::new(0, "success"),
///     started_at: Utc::now(),
///     finished_at: Utc::now(),
/// });
///
/// assert_eq!(history.get_path(), vec!["A"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionHistory {
    executions: Vec<ChildExecution>,
}

impl ExecutionHistory {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            executions: Vec::new(),
        }
    }

    /// Record an execution, returning a new history.
    ///
    /// This does not mutate the existing history.
    pub fn record(&self, execution: ChildExecution) -> Self {
        let mut executions = self.executions.clone();
        executions.push(execution);
        Self { executions }
    }

    /// Ids of the executed children, in execution order.
    pub fn get_path(&self) -> Vec<&str> {
        self.executions
            .iter()
            .map(|execution| execution.state_id.as_str())
            .collect()
    }

    /// Time between the first child starting and the last child finishing.
    ///
    /// Returns `None` if nothing was executed.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.executions.first(), self.executions.last()) {
            let duration = last.finished_at.signed_duration_since(first.started_at);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Whether the given child was executed at least once.
    pub fn contains(&self, state_id: &str) -> bool {
        self.executions.iter().any(|e| e.state_id == state_id)
    }

    pub fn executions(&self) -> &[ChildExecution] {
        &self.executions
    }

    pub fn last(&self) -> Option<&ChildExecution> {
        self.executions.last()
    }
}
