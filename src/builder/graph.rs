//! Builder for transition graphs.

use crate::builder::error::BuildError;
use crate::core::{Label, State};
use crate::graph::{StateConfig, TransitionGraph};
use std::collections::HashSet;

/// Collects state declarations in order.
pub struct GraphBuilder<S: State> {
    states: Vec<(String, StateConfig<S>)>,
}

impl<S: State> GraphBuilder<S> {
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    /// Declare a state. `name` must match what [`State::name`] returns for
    /// the variants of that state.
    pub fn state(mut self, name: impl Into<String>, config: StateConfig<S>) -> Self {
        self.states.push((name.into(), config));
        self
    }

    /// Build the graph.
    /// Returns an error for an empty graph, a name declared twice, or a
    /// sentinel name used as an ordinary state.
    pub fn build(self) -> Result<TransitionGraph<S>, BuildError> {
        if self.states.is_empty() {
            return Err(BuildError::EmptyGraph);
        }

        let mut seen = HashSet::new();
        for (name, config) in &self.states {
            if is_reserved(name) {
                return Err(BuildError::ReservedName(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(BuildError::DuplicateState(name.clone()));
            }

            let edges = config.can_enter_from().iter().chain(config.can_leave_to());
            for label in edges {
                if let Label::State(referenced) = label {
                    if is_reserved(referenced) {
                        return Err(BuildError::ReservedName(referenced.clone()));
                    }
                }
            }
        }

        Ok(TransitionGraph::from_states(self.states))
    }
}

impl<S: State> Default for GraphBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn is_reserved(name: &str) -> bool {
    name == Label::INIT_NAME || name == Label::TERMINATE_NAME
}
