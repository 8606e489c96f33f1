//! Outcomes: the named exit conditions of a state.
//!
//! Every state finishes with exactly one outcome. Non-negative ids are
//! declared by the state itself; negative ids are reserved for the two
//! sentinels every state carries implicitly, `aborted (-1)` and
//! `preempted (-2)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an outcome, unique within its declaring state.
pub type OutcomeId = i32;

/// Named exit condition of a state.
///
/// Outcomes are immutable once created.
///
/// # Example
///
/// ```rust
/// use arbor::core::Outcome;
///
/// let done = Outcome::new(0, "done");
/// assert!(!done.is_reserved());
///
/// let preempted = Outcome::preempted();
/// assert!(preempted.is_preempted());
/// assert_eq!(preempted.name(), "preempted");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outcome {
    id: OutcomeId,
    name: String,
}

impl Outcome {
    /// Reserved id of the `aborted` outcome.
    pub const ABORTED_ID: OutcomeId = -1;

    /// Reserved id of the `preempted` outcome.
    pub const PREEMPTED_ID: OutcomeId = -2;

    /// Create an outcome with the given id and name.
    pub fn new(id: OutcomeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The `aborted (-1)` sentinel produced when a runtime fault is contained.
    pub fn aborted() -> Self {
        Self::new(Self::ABORTED_ID, "aborted")
    }

    /// The `preempted (-2)` sentinel produced by cooperative preemption.
    pub fn preempted() -> Self {
        Self::new(Self::PREEMPTED_ID, "preempted")
    }

    pub fn id(&self) -> OutcomeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_aborted(&self) -> bool {
        self.id == Self::ABORTED_ID
    }

    pub fn is_preempted(&self) -> bool {
        self.id == Self::PREEMPTED_ID
    }

    /// Whether this outcome uses a reserved (negative) id.
    pub fn is_reserved(&self) -> bool {
        self.id < 0
    }

    /// The sentinel outcomes every state declares implicitly.
    pub(crate) fn sentinels() -> [Outcome; 2] {
        [Self::aborted(), Self::preempted()]
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_use_reserved_ids() {
        assert_eq!(Outcome::aborted().id(), -1);
        assert_eq!(Outcome::preempted().id(), -2);
        assert!(Outcome::aborted().is_reserved());
        assert!(Outcome::aborted().is_aborted());
        assert!(!Outcome::aborted().is_preempted());
    }

    #[test]
    fn declared_outcome_is_not_reserved() {
        let outcome = Outcome::new(3, "retry");
        assert!(!outcome.is_reserved());
        assert_eq!(outcome.name(), "retry");
    }

    #[test]
    fn display_includes_name_and_id() {
        assert_eq!(Outcome::new(0, "done").to_string(), "done(0)");
        assert_eq!(Outcome::preempted().to_string(), "preempted(-2)");
    }

    #[test]
    fn outcome_serializes_correctly() {
        let outcome = Outcome::new(1, "failure");
        let json = serde_json::to_string(&outcome).unwrap();
        let deserialized: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(outcome, deserialized);
    }
}
