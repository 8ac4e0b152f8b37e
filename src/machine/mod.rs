//! The machine runtime: a single-threaded handle around the committed
//! state, the transition pipeline and the observable streams.
//!
//! # Key Concepts
//!
//! - **Trampoline**: every request enters one FIFO. A request submitted
//!   from inside a hook is queued and only runs after the enclosing
//!   transition settles (commit, rejection or recovery).
//! - **Pipeline**: validates a request against the graph and runs the
//!   hooks. It is rebuilt from the last committed value whenever a hook
//!   crashes or an override is applied.
//! - **Streams**: committed states (with latest-value replay), pre-commit
//!   transition notices, override notices and a teardown notice.

mod broadcast;
mod overrides;
mod pipeline;
mod recovery;
mod rejection;

pub use broadcast::{Broadcast, LatestValue, Subscription};
pub use overrides::{OverrideCallback, OverrideNotice, StateOverride};
pub use recovery::UnknownError;
pub use rejection::Rejection;

use crate::builder::MachineBuilder;
use crate::config::{Direction, MachineConfig};
use crate::core::{
    Commit, DebugLog, Envelope, Label, LogEntry, LogOutcome, State, StateInfo, TransitionKind,
};
use crate::graph::{DiagramCache, TransitionGraph};
use pipeline::{Outcome, Pipeline, TransitionRequest};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt::{self, Display};
use std::rc::Rc;
use tracing::{debug, info, trace};
use uuid::Uuid;

/// Called with every declared rejection.
pub type RejectedHook<S> = Box<dyn Fn(&Machine<S>, &Rejection<S>)>;

/// Called after recovery from a crashed hook.
pub type UnknownErrorHook<S> = Box<dyn Fn(&Machine<S>, &UnknownError<S>)>;

/// Pre-commit "leaving X, entering Y" notice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionNotice {
    pub leaving: Label,
    pub entering: Label,
}

impl Display for TransitionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leaving {} entering {}", self.leaving, self.entering)
    }
}

/// Everything that travels the FIFO.
pub(crate) enum Request<S: State> {
    Transition(TransitionRequest<S>),
    Override {
        state_override: StateOverride<S>,
        reset_log: bool,
    },
}

impl<S: State> Request<S> {
    fn envelope(&self) -> Envelope<S> {
        match self {
            Self::Transition(request) => request.envelope(),
            Self::Override { state_override, .. } => state_override.envelope(),
        }
    }
}

/// Construction inputs collected by [`MachineBuilder`].
pub(crate) struct MachineParts<S: State> {
    pub graph: TransitionGraph<S>,
    pub config: MachineConfig,
    pub dev_mode: bool,
    pub state_override: Option<StateOverride<S>>,
    pub on_rejected: Option<RejectedHook<S>>,
    pub on_unknown_error: Option<UnknownErrorHook<S>>,
}

struct Shared<S: State> {
    id: Uuid,
    graph: TransitionGraph<S>,
    config: MachineConfig,
    dev_mode: bool,
    holder: RefCell<LatestValue<Commit<S>>>,
    pipeline: RefCell<Pipeline>,
    queue: RefCell<VecDeque<Request<S>>>,
    processing: Cell<bool>,
    destroyed: Cell<bool>,
    log: RefCell<DebugLog<S>>,
    diagram: DiagramCache,
    transitions: RefCell<Broadcast<TransitionNotice>>,
    overrides: RefCell<Broadcast<OverrideNotice<S>>>,
    teardown: RefCell<Broadcast<()>>,
    on_rejected: Option<RejectedHook<S>>,
    on_unknown_error: Option<UnknownErrorHook<S>>,
}

/// Clears the processing flag even if a user hook unwinds through the
/// drain loop.
struct ProcessingGuard<'a>(&'a Cell<bool>);

impl<'a> ProcessingGuard<'a> {
    fn engage(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Handle to a running state machine.
///
/// Cloning is cheap and every clone drives the same machine. Hooks
/// receive a handle so they can submit further requests.
///
/// # Example
///
/// ```rust
/// use reactive_fsm::core::{Label, State};
/// use reactive_fsm::graph::{StateConfig, TransitionGraph};
/// use reactive_fsm::machine::Machine;
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
/// let graph = TransitionGraph::builder()
///     .state("Closed", StateConfig::new().enter_from_init().enter_from("Open").leave_to("Open"))
///     .state("Open", StateConfig::new().enter_from("Closed").leave_to("Closed"))
///     .build()
///     .unwrap();
///
/// let machine = Machine::builder(graph).build().unwrap();
/// machine.submit_change(Door::Closed);
/// machine.submit_change(Door::Open { angle: 30 });
/// machine.submit_update(Door::Open { angle: 90 });
///
/// let current = machine.current_state();
/// assert_eq!(current.state, Label::from("Open"));
/// assert_eq!(current.data, Some(Door::Open { angle: 90 }));
/// ```
pub struct Machine<S: State> {
    shared: Rc<Shared<S>>,
}

impl<S: State> Clone for Machine<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<S: State> Machine<S> {
    pub fn builder(graph: TransitionGraph<S>) -> MachineBuilder<S> {
        MachineBuilder::new(graph)
    }

    pub(crate) fn assemble(parts: MachineParts<S>) -> Self {
        let MachineParts {
            graph,
            config,
            dev_mode,
            state_override,
            on_rejected,
            on_unknown_error,
        } = parts;

        let id = Uuid::new_v4();
        let seed = Commit::init();
        let mut log = DebugLog::new(
            config.debug_log_buffer_count,
            config.stringify_log_transition_data,
        );
        log.record(
            TransitionKind::Init,
            Label::Init,
            None,
            LogOutcome::Success,
            None,
        );

        let machine = Self {
            shared: Rc::new(Shared {
                id,
                diagram: DiagramCache::new(config.state_diagram_direction),
                pipeline: RefCell::new(Pipeline::rooted_at(id, &seed, 0)),
                holder: RefCell::new(LatestValue::new(seed)),
                queue: RefCell::new(VecDeque::new()),
                processing: Cell::new(false),
                destroyed: Cell::new(false),
                log: RefCell::new(log),
                transitions: RefCell::new(Broadcast::new()),
                overrides: RefCell::new(Broadcast::new()),
                teardown: RefCell::new(Broadcast::new()),
                graph,
                config,
                dev_mode,
                on_rejected,
                on_unknown_error,
            }),
        };

        info!(machine = %id, dev_mode, states = machine.shared.graph.len(), "machine created");

        if let Some(state_override) = state_override {
            machine.apply_override(state_override, false);
        }

        machine
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn is_dev_mode(&self) -> bool {
        self.shared.dev_mode
    }

    pub fn config(&self) -> &MachineConfig {
        &self.shared.config
    }

    pub fn graph(&self) -> &TransitionGraph<S> {
        &self.shared.graph
    }

    /// Refresh the payload of the current state.
    pub fn submit_update(&self, data: S) {
        self.submit(Request::Transition(TransitionRequest::Update(data)));
    }

    /// Move to the state tagged by `data`.
    pub fn submit_change(&self, data: S) {
        self.submit(Request::Transition(TransitionRequest::Change(data)));
    }

    /// Leave the graph permanently. Legal only from a state whose exits
    /// include Terminate; on success the machine is destroyed.
    pub fn submit_terminate(&self) {
        self.submit(Request::Transition(TransitionRequest::Terminate));
    }

    /// Force the machine into `state_override`, bypassing validation and
    /// lifecycle hooks. Dev mode only.
    ///
    /// `reset_log` defaults to `resetDebugLogOnOverride`.
    pub fn override_current_state(&self, state_override: StateOverride<S>, reset_log: Option<bool>) {
        let reset_log = reset_log.unwrap_or(self.shared.config.reset_debug_log_on_override);
        self.submit(Request::Override {
            state_override,
            reset_log,
        });
    }

    /// Last committed `(kind, value)` pair.
    pub fn committed(&self) -> Commit<S> {
        self.shared.holder.borrow().get().clone()
    }

    /// Snapshot of the current state.
    pub fn current_state(&self) -> StateInfo<S> {
        self.shared.graph.info_for(&self.committed().value)
    }

    /// Stream that yields the current state once, then completes.
    pub fn current_state_once(&self) -> Subscription<StateInfo<S>> {
        Subscription::once(self.current_state())
    }

    /// Committed states: the current one immediately, then every commit.
    pub fn state_changes(&self) -> Subscription<Commit<S>> {
        self.shared.holder.borrow_mut().subscribe()
    }

    /// Pre-commit notices, emitted once a change has passed the graph
    /// check and before `onLeave` runs.
    pub fn transitions(&self) -> Subscription<TransitionNotice> {
        self.shared.transitions.borrow_mut().subscribe()
    }

    pub fn overrides(&self) -> Subscription<OverrideNotice<S>> {
        self.shared.overrides.borrow_mut().subscribe()
    }

    /// Emits once when the machine is destroyed.
    pub fn teardown(&self) -> Subscription<()> {
        self.shared.teardown.borrow_mut().subscribe()
    }

    pub fn debug_log(&self) -> Vec<LogEntry<S>> {
        self.shared.log.borrow().entries()
    }

    /// Diagram text, optionally with `highlight` flagged.
    pub fn state_diagram_definition(&self, highlight: Option<&str>) -> String {
        self.shared.diagram.definition(&self.shared.graph, highlight)
    }

    pub fn state_diagram_direction(&self) -> Direction {
        self.shared.diagram.direction()
    }

    pub fn set_state_diagram_direction(&self, direction: Direction) {
        self.shared.diagram.set_direction(direction);
    }

    /// Number of times the pipeline has been rebuilt.
    pub fn pipeline_generation(&self) -> u64 {
        self.shared.pipeline.borrow().generation()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.destroyed.get()
    }

    /// Tear the machine down. Completes every stream; later submissions
    /// are rejected with `after_fsm_destroy`. Calling it again is a no-op.
    pub fn destroy(&self) {
        if self.shared.destroyed.replace(true) {
            return;
        }

        info!(machine = %self.shared.id, state = %self.committed().value.label(), "machine destroyed");

        let mut teardown = self.shared.teardown.borrow_mut();
        teardown.publish(());
        teardown.close();
        drop(teardown);

        self.shared.holder.borrow_mut().close();
        self.shared.transitions.borrow_mut().close();
        self.shared.overrides.borrow_mut().close();
    }

    fn submit(&self, request: Request<S>) {
        // While a transition is in flight even a destroyed machine queues,
        // so rejections surface in submission order.
        if self.is_destroyed() && !self.shared.processing.get() {
            self.reject_after_destroy(&request);
            return;
        }

        self.shared.queue.borrow_mut().push_back(request);
        if self.shared.processing.get() {
            trace!(machine = %self.shared.id, "request deferred until the current transition settles");
            return;
        }

        let _guard = ProcessingGuard::engage(&self.shared.processing);
        loop {
            let next = self.shared.queue.borrow_mut().pop_front();
            let Some(request) = next else { break };
            self.process(request);
        }
    }

    fn process(&self, request: Request<S>) {
        if self.is_destroyed() {
            self.reject_after_destroy(&request);
            return;
        }

        match request {
            Request::Override {
                state_override,
                reset_log,
            } => self.apply_override(state_override, reset_log),
            Request::Transition(request) => {
                let outcome = self.shared.pipeline.borrow().execute(self, request);
                self.settle(outcome);
            }
        }
    }

    fn settle(&self, outcome: Outcome<S>) {
        match outcome {
            Outcome::Commit(commit) if self.is_destroyed() => {
                let envelope = Envelope::from_commit(&commit);
                self.handle_rejection(Rejection::after_destroy(envelope, self.committed().value));
            }
            Outcome::Commit(commit) => self.commit(commit),
            Outcome::Terminate => {
                self.shared.log.borrow_mut().record(
                    TransitionKind::Change,
                    Label::Terminate,
                    None,
                    LogOutcome::Success,
                    None,
                );
                self.destroy();
            }
            Outcome::Rejected(rejection) => self.handle_rejection(rejection),
            Outcome::Crashed(error) => self.recover(error),
        }
    }

    fn commit(&self, commit: Commit<S>) {
        let label = commit.value.label();
        debug!(machine = %self.shared.id, kind = %commit.kind, state = %label, "transition committed");

        self.shared.log.borrow_mut().record(
            commit.kind,
            label,
            commit.value.data(),
            LogOutcome::Success,
            None,
        );
        self.shared.holder.borrow_mut().set(commit);
    }

    pub(crate) fn notify_transition(&self, leaving: &Label, entering: &Label) {
        let notice = TransitionNotice {
            leaving: leaving.clone(),
            entering: entering.clone(),
        };
        debug!(machine = %self.shared.id, "{notice}");
        self.shared.transitions.borrow_mut().publish(notice);
    }

    fn reject_after_destroy(&self, request: &Request<S>) {
        self.handle_rejection(Rejection::after_destroy(
            request.envelope(),
            self.committed().value,
        ));
    }
}
