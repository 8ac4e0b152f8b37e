//! Cross-checking of `canEnterFrom` against `canLeaveTo`.
//!
//! Uses Stillwater's `Validation` so every inconsistency in the graph is
//! reported in one pass instead of stopping at the first.

use super::TransitionGraph;
use crate::core::{Label, State};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// One inconsistency in a transition graph.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphViolation {
    #[error("'{from}' may leave to '{to}', but '{to}' does not accept entry from '{from}'")]
    LeaveWithoutEnter { from: String, to: String },

    #[error("'{to}' accepts entry from '{from}', but '{from}' may not leave to '{to}'")]
    EnterWithoutLeave { from: String, to: String },

    #[error("'{state}' references undeclared state '{referenced}'")]
    UnknownState { state: String, referenced: String },

    #[error("'{state}' lists FSMInit as an exit")]
    InitInLeaveSet { state: String },

    #[error("'{state}' lists FSMTerminate as an entry")]
    TerminateInEnterSet { state: String },
}

pub(super) fn check<S: State>(
    graph: &TransitionGraph<S>,
) -> Validation<(), NonEmptyVec<GraphViolation>> {
    let mut checks: Vec<Validation<(), NonEmptyVec<GraphViolation>>> = Vec::new();

    for (name, config) in graph.iter() {
        let own = Label::from(name);

        for target in config.can_leave_to() {
            let check = match target {
                Label::Terminate => Validation::success(()),
                Label::Init => Validation::fail(GraphViolation::InitInLeaveSet {
                    state: name.to_string(),
                }),
                Label::State(to) => match graph.get(to) {
                    None => Validation::fail(GraphViolation::UnknownState {
                        state: name.to_string(),
                        referenced: to.clone(),
                    }),
                    Some(entered) if !entered.can_enter_from().contains(&own) => {
                        Validation::fail(GraphViolation::LeaveWithoutEnter {
                            from: name.to_string(),
                            to: to.clone(),
                        })
                    }
                    Some(_) => Validation::success(()),
                },
            };
            checks.push(check);
        }

        for source in config.can_enter_from() {
            let check = match source {
                Label::Init => Validation::success(()),
                Label::Terminate => Validation::fail(GraphViolation::TerminateInEnterSet {
                    state: name.to_string(),
                }),
                Label::State(from) => match graph.get(from) {
                    None => Validation::fail(GraphViolation::UnknownState {
                        state: name.to_string(),
                        referenced: from.clone(),
                    }),
                    Some(left) if !left.can_leave_to().contains(&own) => {
                        Validation::fail(GraphViolation::EnterWithoutLeave {
                            from: from.clone(),
                            to: name.to_string(),
                        })
                    }
                    Some(_) => Validation::success(()),
                },
            };
            checks.push(check);
        }
    }

    Validation::all_vec(checks).map(|_| ())
}
