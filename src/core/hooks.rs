//! Views handed to lifecycle hooks and the failure type for hooks that crash.
//!
//! A hook answers `Ok(true)` to accept, `Ok(false)` to reject the
//! transition. `Err(_)` and panics are not rejections: they are unknown
//! errors and send the machine through recovery.

use super::state::{Label, State};
use serde::{Deserialize, Serialize};
use std::any::Any;
use thiserror::Error;

/// Error type hooks may return.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of every lifecycle hook.
pub type HookResult = Result<bool, HookError>;

/// Derived view of a position in the graph.
///
/// Also the shape of the machine's current-state snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateInfo<S: State> {
    pub state: Label,
    pub data: Option<S>,
    /// `false` only while in Init.
    pub can_update: bool,
    pub can_leave_to: Vec<Label>,
}

/// Arguments for `onEnter` and `onLeave`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeArgs<S: State> {
    pub leaving: StateInfo<S>,
    pub entering: StateInfo<S>,
}

/// Arguments for `onUpdate`.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateArgs<S: State> {
    pub previous: StateInfo<S>,
    pub update: StateInfo<S>,
}

/// Arguments for an override's own callback.
#[derive(Clone, Debug, PartialEq)]
pub struct OverrideArgs<S: State> {
    pub original: StateInfo<S>,
    pub overriding: StateInfo<S>,
}

/// Which hook was running when something went wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookKind {
    OnEnter,
    OnLeave,
    OnUpdate,
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OnEnter => "onEnter",
            Self::OnLeave => "onLeave",
            Self::OnUpdate => "onUpdate",
        };
        f.write_str(name)
    }
}

/// A hook that neither accepted nor rejected.
#[derive(Debug, Error)]
pub enum HookFailure {
    #[error("hook returned an error: {0}")]
    Error(#[source] HookError),

    #[error("hook panicked: {0}")]
    Panic(String),
}

impl HookFailure {
    /// Build from a payload caught by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "non-string panic payload".to_string()
        };
        HookFailure::Panic(message)
    }
}
