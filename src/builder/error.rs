//! Build errors for state builders.

use crate::core::StateId;
use crate::validation::ConfigurationError;
use thiserror::Error;

/// Errors that can occur when building states.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("State '{0}' has no executable. Call .executable(f) or .unit(e) before .build()")]
    MissingExecutable(StateId),

    #[error("State '{state_id}' is invalid ({} error(s)): {}", errors.len(), summary(errors))]
    Invalid {
        state_id: StateId,
        errors: Vec<ConfigurationError>,
    },
}

fn summary(errors: &[ConfigurationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
