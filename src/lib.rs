//! Arbor: a hierarchical state machine runtime
//!
//! A state tree is made of leaf states that run a user-supplied executable
//! and hierarchy states that run their children one at a time. Children
//! finish with an outcome; the container follows the transition leaving that
//! outcome to the next child, or finishes itself once a transition leads back
//! to it. Typed data flows carry values between the ports of siblings and
//! their container.
//!
//! # Core Concepts
//!
//! - **Outcome**: How a state finished, including the reserved `aborted` and `preempted`
//! - **Port**: Typed, named input, output or scoped-variable slot
//! - **Transition / DataFlow**: Edges between the children of a container
//! - **Preemption**: Cooperative cancellation reported through the `preempted` outcome
//!
//! The data model in [`core`] is pure; execution, synchronization and
//! logging live in [`state`] and [`execution`].
//!
//! # Example
//!
//! ```rust
//! use arbor::builder::{ExecutionStateBuilder, HierarchyStateBuilder};
//! use arbor::core::{DataFlow, DataPort, DataType, Transition};
//! use arbor::execution::{execute, ExecutionEnv};
//! use arbor::state::State;
//! use serde_json::json;
//!
//! let add_one = ExecutionStateBuilder::new("A")
//!     .input(DataPort::new(0, "x", DataType::Int))
//!     .output(DataPort::new(1, "y", DataType::Int))
//!     .outcome(0, "success")
//!     .executable(|ctx| {
//!         let x: i64 = ctx.input_as("x")?;
//!         ctx.set_output("y", x + 1)?;
//!         Ok(0)
//!     })
//!     .build()
//!     .unwrap();
//!
//! let mut root = HierarchyStateBuilder::new("ROOT")
//!     .input(DataPort::new(0, "in", DataType::Int))
//!     .output(DataPort::new(1, "out", DataType::Int))
//!     .outcome(0, "done")
//!     .state(add_one)
//!     .start_state("A")
//!     .transition(Transition::to_outcome("A", 0, "ROOT", 0))
//!     .data_flow(DataFlow::new("ROOT", 0, "A", 0))
//!     .data_flow(DataFlow::new("A", 1, "ROOT", 1))
//!     .build()
//!     .unwrap();
//!
//! let outcome = execute(&mut root, json!({"in": 41}), &ExecutionEnv::default()).unwrap();
//! assert_eq!(outcome.name(), "done");
//! assert_eq!(root.core().output_data()["out"], json!(42));
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod error;
pub mod execution;
pub mod report;
pub mod state;
pub mod validation;

// Re-export commonly used types
pub use config::EngineConfig;
pub use core::{DataFlow, DataPort, DataType, Outcome, Transition};
pub use error::{EngineError, ExecutionFault};
pub use execution::{execute, spawn, ExecutionEnv, StateHandle};
pub use state::{ExecutionState, HierarchyState, State};
