//! Bounded, append-only debug log of transition outcomes.
//!
//! Every accepted, rejected or crashed transition leaves one entry. The
//! log is truncated from the front after each append so it only ever
//! holds the most recent entries, in their original order.

use super::rejection::RejectReason;
use super::state::{Label, State, TransitionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Payload stored on a log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub enum LoggedData<S: State> {
    /// No payload (Init, Terminate).
    None,
    Raw(S),
    /// JSON text of the payload, when `stringifyLogTransitionData` is on.
    Stringified(String),
}

/// Outcome recorded for a log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutcome {
    Success,
    Rejected(RejectReason),
    UnknownError,
}

/// Record of a single transition outcome.
///
/// # Example
///
/// ```rust
/// use reactive_fsm::core::{Label, LogEntry, LogOutcome, LoggedData, State, TransitionKind};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Light { Red }
///
/// impl State for Light {
///     fn name(&self) -> &str { "Red" }
/// }
///
/// let entry = LogEntry {
///     kind: TransitionKind::Change,
///     state: Label::from("Red"),
///     data: LoggedData::Raw(Light::Red),
///     result: LogOutcome::Success,
///     timestamp: Utc::now(),
///     message: None,
/// };
/// assert!(entry.is_success());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct LogEntry<S: State> {
    /// Kind of transition attempted
    pub kind: TransitionKind,
    /// Label the transition targeted (or the state the machine stays in,
    /// for `reset`/`recover` entries)
    pub state: Label,
    /// Payload of the transition
    pub data: LoggedData<S>,
    /// Whether it was accepted, rejected or crashed
    pub result: LogOutcome,
    /// When the outcome was recorded
    pub timestamp: DateTime<Utc>,
    /// Human-readable detail
    pub message: Option<String>,
}

impl<S: State> LogEntry<S> {
    pub fn is_success(&self) -> bool {
        matches!(self.result, LogOutcome::Success)
    }
}

/// Ordered, capped log of transition outcomes.
///
/// Capacity `Some(0)` disables logging, `None` keeps everything.
///
/// # Example
///
/// ```rust
/// use reactive_fsm::core::{DebugLog, Label, LogOutcome, State, TransitionKind};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Step { A, B, C }
///
/// impl State for Step {
///     fn name(&self) -> &str {
///         match self {
///             Self::A => "A",
///             Self::B => "B",
///             Self::C => "C",
///         }
///     }
/// }
///
/// let mut log = DebugLog::new(Some(2), false);
/// for step in [Step::A, Step::B, Step::C] {
///     let label = Label::from(step.name());
///     log.record(TransitionKind::Change, label, Some(&step), LogOutcome::Success, None);
/// }
///
/// let labels: Vec<_> = log.entries().iter().map(|e| e.state.to_string()).collect();
/// assert_eq!(labels, vec!["B", "C"]);
/// ```
#[derive(Clone, Debug)]
pub struct DebugLog<S: State> {
    entries: VecDeque<LogEntry<S>>,
    capacity: Option<usize>,
    stringify: bool,
}

impl<S: State> DebugLog<S> {
    pub fn new(capacity: Option<usize>, stringify: bool) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            stringify,
        }
    }

    /// Whether appends are kept at all.
    pub fn is_enabled(&self) -> bool {
        self.capacity != Some(0)
    }

    /// Append an outcome, then drop the oldest entries beyond capacity.
    pub fn record(
        &mut self,
        kind: TransitionKind,
        state: Label,
        data: Option<&S>,
        result: LogOutcome,
        message: Option<String>,
    ) {
        if !self.is_enabled() {
            return;
        }

        let data = match data {
            None => LoggedData::None,
            Some(data) if self.stringify => LoggedData::Stringified(
                serde_json::to_string(data).unwrap_or_else(|_| format!("{data:?}")),
            ),
            Some(data) => LoggedData::Raw(data.clone()),
        };

        self.entries.push_back(LogEntry {
            kind,
            state,
            data,
            result,
            timestamp: Utc::now(),
            message,
        });

        if let Some(max) = self.capacity {
            while self.entries.len() > max {
                self.entries.pop_front();
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the retained entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry<S>> {
        self.entries.iter().cloned().collect()
    }

    /// Time covered by the retained entries.
    ///
    /// Returns `None` when the log is empty.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.entries.front(), self.entries.back()) {
            last.timestamp
                .signed_duration_since(first.timestamp)
                .to_std()
                .ok()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        Initial,
        Processing { step: u32 },
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Initial => "Initial",
                Self::Processing { .. } => "Processing",
            }
        }
    }

    fn push(log: &mut DebugLog<TestState>, step: u32) {
        let data = TestState::Processing { step };
        log.record(
            TransitionKind::Update,
            Label::from("Processing"),
            Some(&data),
            LogOutcome::Success,
            None,
        );
    }

    #[test]
    fn new_log_is_empty() {
        let log: DebugLog<TestState> = DebugLog::new(None, false);
        assert!(log.is_empty());
        assert!(log.duration().is_none());
    }

    #[test]
    fn capacity_keeps_most_recent_entries_in_order() {
        let mut log = DebugLog::new(Some(3), false);
        for step in 0..10 {
            push(&mut log, step);
        }

        assert_eq!(log.len(), 3);
        let steps: Vec<_> = log
            .entries()
            .into_iter()
            .map(|e| match e.data {
                LoggedData::Raw(TestState::Processing { step }) => step,
                other => panic!("unexpected data {other:?}"),
            })
            .collect();
        assert_eq!(steps, vec![7, 8, 9]);
    }

    #[test]
    fn zero_capacity_disables_logging() {
        let mut log = DebugLog::new(Some(0), false);
        push(&mut log, 1);
        assert!(!log.is_enabled());
        assert!(log.is_empty());
    }

    #[test]
    fn unbounded_log_keeps_everything() {
        let mut log = DebugLog::new(None, false);
        for step in 0..500 {
            push(&mut log, step);
        }
        assert_eq!(log.len(), 500);
    }

    #[test]
    fn stringify_stores_json_text() {
        let mut log = DebugLog::new(None, true);
        push(&mut log, 4);

        let entry = &log.entries()[0];
        assert_eq!(
            entry.data,
            LoggedData::Stringified(r#"{"Processing":{"step":4}}"#.to_string())
        );
    }

    #[test]
    fn missing_data_is_logged_as_none() {
        let mut log: DebugLog<TestState> = DebugLog::new(None, false);
        log.record(
            TransitionKind::Init,
            Label::Init,
            None,
            LogOutcome::Success,
            None,
        );
        assert_eq!(log.entries()[0].data, LoggedData::None);
    }

    #[test]
    fn clear_empties_log() {
        let mut log = DebugLog::new(None, false);
        push(&mut log, 1);
        push(&mut log, 2);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn duration_covers_first_to_last_entry() {
        let mut log = DebugLog::new(None, false);
        push(&mut log, 1);
        std::thread::sleep(std::time::Duration::from_millis(10));
        push(&mut log, 2);

        let duration = log.duration();
        assert!(duration.is_some());
        assert!(duration.unwrap() >= std::time::Duration::from_millis(10));
    }

    #[test]
    fn entries_serialize_correctly() {
        let mut log = DebugLog::new(None, false);
        log.record(
            TransitionKind::Change,
            Label::from("Initial"),
            Some(&TestState::Initial),
            LogOutcome::Rejected(RejectReason::NotPermittedToEnter),
            Some("nope".to_string()),
        );

        let json = serde_json::to_string(&log.entries()).unwrap();
        let back: Vec<LogEntry<TestState>> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log.entries());
    }
}
