//! Build errors for transition graphs and machines.

use crate::graph::GraphViolation;
use thiserror::Error;

/// Errors that can occur when building a graph or a machine.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("No states declared. Add at least one state with .state(name, config)")]
    EmptyGraph,

    #[error("State '{0}' is declared more than once")]
    DuplicateState(String),

    #[error("'{0}' is reserved for the machine's sentinel states")]
    ReservedName(String),

    #[error("Transition graph is inconsistent: {}", summarize(.0))]
    InconsistentGraph(Vec<GraphViolation>),
}

fn summarize(violations: &[GraphViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
