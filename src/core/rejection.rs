//! Declared rejection reasons and their severities.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// How loudly a declared rejection is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warn,
    Error,
    /// Expected noise (repeat updates); never printed, logged only on request.
    Filtered,
}

/// Named, expected validation failures. None of these change state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    IllegalChangeSameState,
    NotPermittedToEnter,
    NotPermittedToLeave,
    TerminatedByLeaveCallback,
    TerminatedByEnterCallback,
    #[serde(rename = "illegal_update_FSMInit")]
    IllegalUpdateInit,
    UpdateStateMismatch,
    RepeatUpdateFiltered,
    TerminatedByUpdateCallback,
    OverrideInProduction,
    AfterFsmDestroy,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IllegalChangeSameState => "illegal_change_same_state",
            Self::NotPermittedToEnter => "not_permitted_to_enter",
            Self::NotPermittedToLeave => "not_permitted_to_leave",
            Self::TerminatedByLeaveCallback => "terminated_by_leave_callback",
            Self::TerminatedByEnterCallback => "terminated_by_enter_callback",
            Self::IllegalUpdateInit => "illegal_update_FSMInit",
            Self::UpdateStateMismatch => "update_state_mismatch",
            Self::RepeatUpdateFiltered => "repeat_update_filtered",
            Self::TerminatedByUpdateCallback => "terminated_by_update_callback",
            Self::OverrideInProduction => "override_in_production",
            Self::AfterFsmDestroy => "after_fsm_destroy",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::RepeatUpdateFiltered => Severity::Filtered,
            Self::TerminatedByLeaveCallback
            | Self::TerminatedByEnterCallback
            | Self::TerminatedByUpdateCallback
            | Self::AfterFsmDestroy => Severity::Warn,
            Self::IllegalChangeSameState
            | Self::NotPermittedToEnter
            | Self::NotPermittedToLeave
            | Self::IllegalUpdateInit
            | Self::UpdateStateMismatch
            | Self::OverrideInProduction => Severity::Error,
        }
    }
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_serialize_to_wire_names() {
        let json = serde_json::to_string(&RejectReason::IllegalUpdateInit).unwrap();
        assert_eq!(json, "\"illegal_update_FSMInit\"");

        let json = serde_json::to_string(&RejectReason::NotPermittedToLeave).unwrap();
        assert_eq!(json, format!("\"{}\"", RejectReason::NotPermittedToLeave));
    }

    #[test]
    fn only_repeat_updates_are_filtered() {
        assert_eq!(
            RejectReason::RepeatUpdateFiltered.severity(),
            Severity::Filtered
        );
        assert_ne!(
            RejectReason::UpdateStateMismatch.severity(),
            Severity::Filtered
        );
        assert_eq!(
            RejectReason::TerminatedByEnterCallback.severity(),
            Severity::Warn
        );
    }
}
