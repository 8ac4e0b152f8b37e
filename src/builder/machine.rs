//! Builder for constructing machines.

use crate::builder::error::BuildError;
use crate::config::MachineConfig;
use crate::core::{OverrideArgs, State};
use crate::graph::TransitionGraph;
use crate::machine::{
    Machine, MachineParts, Rejection, RejectedHook, StateOverride, UnknownError, UnknownErrorHook,
};
use stillwater::validation::Validation;
use tracing::warn;

/// Builder for constructing machines with a fluent API.
///
/// # Example
///
/// ```rust
/// use reactive_fsm::config::MachineConfig;
/// use reactive_fsm::graph::{StateConfig, TransitionGraph};
/// use reactive_fsm::machine::Machine;
/// use reactive_fsm::state_enum;
///
/// state_enum! {
///     enum Player {
///         Stopped,
///         Playing { track: u32 },
///     }
/// }
///
/// let graph = TransitionGraph::<Player>::builder()
///     .state("Stopped", StateConfig::new().enter_from_init().enter_from("Playing").leave_to("Playing"))
///     .state("Playing", StateConfig::new().enter_from("Stopped").leave_to("Stopped"))
///     .build()
///     .unwrap();
///
/// let machine = Machine::builder(graph)
///     .config(MachineConfig { filter_repeat_updates: false, ..MachineConfig::default() })
///     .on_rejected(|_, rejection| eprintln!("{}", rejection.message))
///     .build()
///     .unwrap();
///
/// machine.submit_change(Player::Stopped);
/// assert!(!machine.current_state().can_leave_to.is_empty());
/// ```
pub struct MachineBuilder<S: State> {
    graph: TransitionGraph<S>,
    config: MachineConfig,
    dev_mode: bool,
    state_override: Option<StateOverride<S>>,
    on_rejected: Option<RejectedHook<S>>,
    on_unknown_error: Option<UnknownErrorHook<S>>,
}

impl<S: State> MachineBuilder<S> {
    pub fn new(graph: TransitionGraph<S>) -> Self {
        Self {
            graph,
            config: MachineConfig::default(),
            dev_mode: false,
            state_override: None,
            on_rejected: None,
            on_unknown_error: None,
        }
    }

    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    /// Allow overrides. Off by default.
    pub fn dev_mode(mut self, enabled: bool) -> Self {
        self.dev_mode = enabled;
        self
    }

    /// Start in `state_override` instead of Init. Only honored in dev mode.
    pub fn state_override(mut self, state_override: StateOverride<S>) -> Self {
        self.state_override = Some(state_override);
        self
    }

    /// Shorthand for a starting override without a callback.
    pub fn start_in(self, state: S) -> Self {
        self.state_override(StateOverride::new(state))
    }

    /// Shorthand for a starting override with a callback.
    pub fn start_in_with<F>(self, state: S, callback: F) -> Self
    where
        F: Fn(&Machine<S>, &OverrideArgs<S>) + 'static,
    {
        self.state_override(StateOverride::new(state).with_callback(callback))
    }

    pub fn on_rejected<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Machine<S>, &Rejection<S>) + 'static,
    {
        self.on_rejected = Some(Box::new(hook));
        self
    }

    pub fn on_unknown_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Machine<S>, &UnknownError<S>) + 'static,
    {
        self.on_unknown_error = Some(Box::new(hook));
        self
    }

    /// Build the machine.
    /// Returns an error if `enforce_graph_consistency` is set and the graph
    /// fails the consistency check; otherwise violations are only logged.
    pub fn build(self) -> Result<Machine<S>, BuildError> {
        if let Validation::Failure(errors) = self.graph.check_consistency() {
            if self.config.enforce_graph_consistency {
                return Err(BuildError::InconsistentGraph(
                    errors.iter().cloned().collect(),
                ));
            }
            for violation in errors.iter() {
                warn!(%violation, "transition graph inconsistency");
            }
        }

        Ok(Machine::assemble(MachineParts {
            graph: self.graph,
            config: self.config,
            dev_mode: self.dev_mode,
            state_override: self.state_override,
            on_rejected: self.on_rejected,
            on_unknown_error: self.on_unknown_error,
        }))
    }
}
