//! Declared rejections and how they are reported.

use super::Machine;
use crate::core::{
    Envelope, Label, LogOutcome, RejectReason, Severity, State, StateValue, TransitionKind,
};
use tracing::{error, warn};

/// A request the machine refused. State is unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct Rejection<S: State> {
    pub reason: RejectReason,
    pub severity: Severity,
    pub kind: TransitionKind,
    pub message: String,
    /// Label the request targeted.
    pub target: Label,
    /// Payload the request carried.
    pub data: Option<S>,
    /// Value the machine stays in.
    pub current: StateValue<S>,
}

impl<S: State> Rejection<S> {
    pub(crate) fn new(reason: RejectReason, envelope: Envelope<S>, current: StateValue<S>) -> Self {
        let message = describe(reason, envelope.kind, &current.label(), &envelope.target);
        Self {
            reason,
            severity: reason.severity(),
            kind: envelope.kind,
            message,
            target: envelope.target,
            data: envelope.data,
            current,
        }
    }

    pub(crate) fn after_destroy(envelope: Envelope<S>, current: StateValue<S>) -> Self {
        Self::new(RejectReason::AfterFsmDestroy, envelope, current)
    }
}

fn describe(reason: RejectReason, kind: TransitionKind, current: &Label, target: &Label) -> String {
    match reason {
        RejectReason::IllegalChangeSameState => {
            format!("cannot change to '{target}': machine is already in '{current}'")
        }
        RejectReason::NotPermittedToEnter => {
            format!("'{target}' cannot be entered from '{current}'")
        }
        RejectReason::NotPermittedToLeave => format!("'{current}' cannot leave to '{target}'"),
        RejectReason::TerminatedByLeaveCallback => {
            format!("onLeave of '{current}' refused the change to '{target}'")
        }
        RejectReason::TerminatedByEnterCallback => {
            format!("onEnter of '{target}' refused the change from '{current}'")
        }
        RejectReason::IllegalUpdateInit => {
            format!("cannot update '{target}' while in {current}")
        }
        RejectReason::UpdateStateMismatch => {
            format!("cannot update '{target}' while in '{current}'")
        }
        RejectReason::RepeatUpdateFiltered => {
            format!("update of '{target}' repeats the current payload")
        }
        RejectReason::TerminatedByUpdateCallback => {
            format!("onUpdate of '{current}' refused the update")
        }
        RejectReason::OverrideInProduction => {
            format!("override to '{target}' refused outside dev mode")
        }
        RejectReason::AfterFsmDestroy => {
            format!("{kind} to '{target}' submitted after the machine was destroyed")
        }
    }
}

impl<S: State> Machine<S> {
    /// Report a declared rejection: console, debug log, then the
    /// `on_rejected` hook, which always runs.
    pub(crate) fn handle_rejection(&self, rejection: Rejection<S>) {
        let config = self.config();
        let filtered = rejection.severity == Severity::Filtered;

        if config.output_transition_rejection_to_console {
            match rejection.severity {
                Severity::Warn => warn!(
                    machine = %self.id(),
                    reason = %rejection.reason,
                    kind = %rejection.kind,
                    "{}",
                    rejection.message
                ),
                Severity::Error => error!(
                    machine = %self.id(),
                    reason = %rejection.reason,
                    kind = %rejection.kind,
                    "{}",
                    rejection.message
                ),
                Severity::Filtered => {}
            }
        }

        if !filtered || config.record_filtered_updates_to_debug_log {
            let mut log = self.shared.log.borrow_mut();
            log.record(
                rejection.kind,
                rejection.target.clone(),
                rejection.data.as_ref(),
                LogOutcome::Rejected(rejection.reason),
                Some(rejection.message.clone()),
            );
            if config.record_reset_data_to_debug_log {
                let remaining = rejection.current.label();
                let message = format!("remaining in '{remaining}'");
                log.record(
                    TransitionKind::Reset,
                    remaining,
                    rejection.current.data(),
                    LogOutcome::Success,
                    Some(message),
                );
            }
        }

        if let Some(hook) = &self.shared.on_rejected {
            hook(self, &rejection);
        }
    }
}
