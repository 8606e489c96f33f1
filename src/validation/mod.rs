//! Graph validation using Stillwater's `Validation`.
//!
//! A malformed state graph is reported with every violation at once rather
//! than one error per build attempt. The same transition rules also guard
//! transitions added while a container runs.
//!
//! # Example
//!
//! ```rust
//! use arbor::builder::{BuildError, ExecutionStateBuilder, HierarchyStateBuilder};
//! use arbor::core::Transition;
//! use arbor::validation::ConfigurationError;
//!
//! let leaf = ExecutionStateBuilder::new("A")
//!     .outcome(0, "success")
//!     .executable(|_ctx| Ok(0))
//!     .build()
//!     .unwrap();
//!
//! let result = HierarchyStateBuilder::new("ROOT")
//!     .outcome(0, "done")
//!     .state(leaf)
//!     .transition(Transition::to_state("A", 0, "MISSING"))
//!     .build();
//!
//! match result {
//!     Err(BuildError::Invalid { errors, .. }) => {
//!         assert!(errors.iter().any(|e| matches!(e, ConfigurationError::MissingStartState { .. })));
//!         assert!(errors.iter().any(|e| matches!(e, ConfigurationError::UnknownState { .. })));
//!     }
//!     _ => panic!("expected both errors"),
//! }
//! ```

mod error;
mod rules;

pub use error::ConfigurationError;
pub use rules::{check_state_declarations, validate_container, Checked};

pub(crate) use rules::Topology;
