//! Core state machine types.
//!
//! This module contains the plain data the runtime is built from:
//! - State definitions via the `State` trait, plus the reserved labels
//! - The bounded debug log
//! - Declared rejection reasons
//! - The views passed to lifecycle hooks
//!
//! Nothing in here owns a machine; the `machine` module wires these
//! types together.

mod hooks;
mod log;
mod rejection;
mod state;

pub use hooks::{
    ChangeArgs, HookError, HookFailure, HookKind, HookResult, OverrideArgs, StateInfo, UpdateArgs,
};
pub use log::{DebugLog, LogEntry, LogOutcome, LoggedData};
pub use rejection::{RejectReason, Severity};
pub use state::{Commit, Envelope, Label, State, StateValue, TransitionKind};
