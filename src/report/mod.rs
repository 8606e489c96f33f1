//! Serializable summary of a finished run.
//!
//! A report captures what a state tree produced: the root's final outcome
//! and output data, the children its container ran, and the status of every
//! descendant. Reports are plain data and can be stored or shipped as JSON.

use crate::core::{DataMap, ExecutionHistory, ExecutionStatus, Outcome, StateId};
use crate::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod error;

pub use error::ReportError;

/// Version identifier for the report format
pub const REPORT_VERSION: u32 = 1;

/// Last known status and outcome of one descendant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DescendantSummary {
    pub status: ExecutionStatus,
    pub final_outcome: Option<Outcome>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Report format version
    pub version: u32,

    /// Unique report identifier
    pub id: String,

    /// When the report was captured
    pub generated_at: DateTime<Utc>,

    pub state_id: StateId,

    pub final_outcome: Option<Outcome>,

    pub output_data: DataMap,

    /// Children run by the root container; empty for a leaf
    pub history: ExecutionHistory,

    /// Descendants keyed by path relative to the root
    pub descendants: BTreeMap<String, DescendantSummary>,
}

impl RunReport {
    /// Capture the current state of `state` and its descendants.
    pub fn capture(state: &dyn State) -> Self {
        let (history, descendants) = match state.as_container() {
            Some(container) => (
                container.history().clone(),
                container
                    .descendant_handles()
                    .into_iter()
                    .map(|(path, handle)| {
                        let summary = DescendantSummary {
                            status: handle.status(),
                            final_outcome: handle.final_outcome(),
                        };
                        (path, summary)
                    })
                    .collect(),
            ),
            None => (ExecutionHistory::new(), BTreeMap::new()),
        };

        Self {
            version: REPORT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            state_id: state.state_id().to_string(),
            final_outcome: state.final_outcome().cloned(),
            output_data: state.core().output_data().clone(),
            history,
            descendants,
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        serde_json::to_string_pretty(self).map_err(|e| ReportError::SerializationFailed(e.to_string()))
    }

    /// Parse a report, rejecting versions this crate cannot read.
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        let report: Self =
            serde_json::from_str(json).map_err(|e| ReportError::DeserializationFailed(e.to_string()))?;
        if report.version != REPORT_VERSION {
            return Err(ReportError::UnsupportedVersion {
                found: report.version,
                supported: REPORT_VERSION,
            });
        }
        Ok(report)
    }
}
