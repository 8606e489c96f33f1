//! Execution status of a state as seen by the outer controller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a state is in its execution lifecycle.
///
/// A child moves to `WaitingForNextTransition` as soon as it returns and
/// stays there until its parent has resolved the outgoing transition and
/// moved on. Steppers use this status to detect a pause point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[default]
    NotStarted,
    Active,
    WaitingForNextTransition,
    Finished,
}

impl ExecutionStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Active | Self::WaitingForNextTransition)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Active => "active",
            Self::WaitingForNextTransition => "waiting for next transition",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}
