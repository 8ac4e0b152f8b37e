//! Builder API for graphs and machines.
//!
//! Graph and machine construction are fluent and fail with a
//! [`BuildError`] instead of panicking.

pub mod error;
pub mod graph;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use graph::GraphBuilder;
pub use machine::MachineBuilder;
