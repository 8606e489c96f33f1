//! Builder API for constructing state trees.
//!
//! Leaves are built with [`ExecutionStateBuilder`], containers with
//! [`HierarchyStateBuilder`]. Containers take ownership of already built
//! children, so trees are assembled bottom-up. Every `build()` validates
//! what it builds and never returns an invalid state.

pub mod error;
pub mod execution;
pub mod hierarchy;

pub use error::BuildError;
pub use execution::ExecutionStateBuilder;
pub use hierarchy::HierarchyStateBuilder;
