//! State trait, labels and the committed-value types.
//!
//! User states are a tagged value: the tag is what `State::name` returns,
//! the rest of the variant is payload. The machine adds two reserved
//! labels on top of the user's: `Init` (before any state is entered) and
//! `Terminate` (permanent exit, never stored).

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};

/// Trait for state machine states.
///
/// Each value is one live state: its tag identifies the state, its fields
/// are that state's payload. Updates may only refresh the payload of the
/// current tag; changes move to a different tag.
///
/// # Required Traits
///
/// - `Clone`: committed values are handed to every subscriber
/// - `PartialEq`: payload comparison for the repeat-update filter
/// - `Debug`: diagnostics
/// - `Serialize` + `Deserialize`: stringified debug-log entries
/// - `'static`: states are owned by hooks and streams
///
/// # Example
///
/// ```rust
/// use reactive_fsm::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Door {
///     Open { angle: u8 },
///     Closed,
/// }
///
/// impl State for Door {
///     fn name(&self) -> &str {
///         match self {
///             Self::Open { .. } => "Open",
///             Self::Closed => "Closed",
///         }
///     }
/// }
///
/// assert_eq!(Door::Open { angle: 90 }.name(), "Open");
/// assert!(!Door::Open { angle: 90 }.same_payload(&Door::Open { angle: 45 }));
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// The state's tag. Must match the name it is registered under in the
    /// transition graph.
    fn name(&self) -> &str;

    /// Structural equality of two values of the same tag.
    ///
    /// Used by the repeat-update filter. Default is `==`, which for derived
    /// impls compares every field (nested values included).
    fn same_payload(&self, other: &Self) -> bool {
        self == other
    }
}

/// A position in the transition graph, including the reserved sentinels.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Starting pseudo-state.
    Init,
    /// Pseudo-target meaning "leave the graph permanently".
    Terminate,
    /// An application-defined state.
    State(String),
}

impl Label {
    pub const INIT_NAME: &'static str = "FSMInit";
    pub const TERMINATE_NAME: &'static str = "FSMTerminate";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Init => Self::INIT_NAME,
            Self::Terminate => Self::TERMINATE_NAME,
            Self::State(name) => name,
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(self, Self::Init)
    }

    pub fn is_terminate(&self) -> bool {
        matches!(self, Self::Terminate)
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Label::State(name.to_string())
    }
}

impl From<String> for Label {
    fn from(name: String) -> Self {
        Label::State(name)
    }
}

/// The committed value held by a machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub enum StateValue<S: State> {
    Init,
    Data(S),
}

impl<S: State> StateValue<S> {
    pub fn label(&self) -> Label {
        match self {
            Self::Init => Label::Init,
            Self::Data(data) => Label::State(data.name().to_string()),
        }
    }

    pub fn data(&self) -> Option<&S> {
        match self {
            Self::Init => None,
            Self::Data(data) => Some(data),
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(self, Self::Init)
    }
}

/// Kind of transition that produced a committed value or a log entry.
///
/// `Reset` and `Recover` are bookkeeping kinds that only appear in the
/// debug log; callers never submit them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Init,
    Update,
    Change,
    Override,
    Recover,
    Reset,
}

impl Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Update => "update",
            Self::Change => "change",
            Self::Override => "override",
            Self::Recover => "recover",
            Self::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// The `(kind, value)` pair held by the committed-state holder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Commit<S: State> {
    pub kind: TransitionKind,
    pub value: StateValue<S>,
}

impl<S: State> Commit<S> {
    pub fn new(kind: TransitionKind, value: StateValue<S>) -> Self {
        Self { kind, value }
    }

    pub fn init() -> Self {
        Self::new(TransitionKind::Init, StateValue::Init)
    }
}

/// A transition request as seen by the pipeline, the debug log and the
/// unknown-error hook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Envelope<S: State> {
    pub kind: TransitionKind,
    pub target: Label,
    pub data: Option<S>,
}

impl<S: State> Envelope<S> {
    pub fn update(data: S) -> Self {
        Self {
            kind: TransitionKind::Update,
            target: Label::State(data.name().to_string()),
            data: Some(data),
        }
    }

    pub fn change(data: S) -> Self {
        Self {
            kind: TransitionKind::Change,
            target: Label::State(data.name().to_string()),
            data: Some(data),
        }
    }

    pub fn terminate() -> Self {
        Self {
            kind: TransitionKind::Change,
            target: Label::Terminate,
            data: None,
        }
    }

    pub fn from_commit(commit: &Commit<S>) -> Self {
        Self {
            kind: commit.kind,
            target: commit.value.label(),
            data: commit.value.data().cloned(),
        }
    }
}
