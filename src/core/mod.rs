//! Core data model of the state machine.
//!
//! This module contains the plain values the runtime operates on:
//! - Outcomes, including the reserved `aborted` / `preempted` sentinels
//! - Typed data ports and scoped variables
//! - Transitions and data flows between the children of a container
//! - Execution status and immutable execution history
//!
//! Nothing in this module performs execution or synchronization.

mod history;
mod outcome;
mod port;
mod status;
mod transition;

pub use history::{ChildExecution, ExecutionHistory};
pub use outcome::{Outcome, OutcomeId};
pub use port::{DataMap, DataPort, DataType, PortId, ScopedVariable};
pub use status::ExecutionStatus;
pub use transition::{DataFlow, StateId, Transition};
