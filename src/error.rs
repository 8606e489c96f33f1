//! Errors surfaced by state execution.

use crate::core::StateId;
use crate::validation::ConfigurationError;
use thiserror::Error;

/// Errors that can occur while executing a state tree.
///
/// Preemption is not an error: it is reported as the `preempted` outcome.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Input or output data does not match the declared ports.
    #[error("Type check failed for state '{state_id}': {reason}")]
    TypeCheck { state_id: StateId, reason: String },

    /// The state graph is broken.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A low-level fault raised while a state was running.
    ///
    /// Contained at the nearest hierarchy state, which finishes `aborted`.
    #[error("Runtime fault in state '{state_id}': {message}")]
    RuntimeFault { state_id: StateId, message: String },

    /// The worker thread executing a state tree could not be started or died.
    #[error("Execution worker failed: {0}")]
    Worker(String),
}

impl EngineError {
    pub(crate) fn type_check(state_id: &str, reason: impl Into<String>) -> Self {
        Self::TypeCheck {
            state_id: state_id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn runtime_fault(state_id: &str, message: impl Into<String>) -> Self {
        Self::RuntimeFault {
            state_id: state_id.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error is contained by a hierarchy state instead of propagated.
    pub fn is_runtime_fault(&self) -> bool {
        matches!(self, Self::RuntimeFault { .. })
    }
}

/// Fault raised by a leaf's executable.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ExecutionFault {
    message: String,
}

impl ExecutionFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
