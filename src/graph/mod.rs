//! The transition graph: per-state entry/exit sets and lifecycle hooks.
//!
//! A graph is fixed once built. `canEnterFrom` and `canLeaveTo` are
//! declared independently per state and are only cross-checked when
//! asked to (see [`TransitionGraph::check_consistency`]).

mod consistency;
mod diagram;

pub use consistency::GraphViolation;
pub use diagram::{highlight, render, DiagramCache, DIAGRAM_KIND, HIGHLIGHT_STYLE};

use crate::builder::GraphBuilder;
use crate::core::{ChangeArgs, HookResult, Label, State, StateInfo, StateValue, UpdateArgs};
use crate::machine::Machine;
use std::collections::HashMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// `onEnter` / `onLeave` hook.
pub type ChangeHook<S> = Box<dyn Fn(&Machine<S>, &ChangeArgs<S>) -> HookResult>;

/// `onUpdate` hook.
pub type UpdateHook<S> = Box<dyn Fn(&Machine<S>, &UpdateArgs<S>) -> HookResult>;

/// Declaration of a single state.
///
/// # Example
///
/// ```rust
/// use reactive_fsm::core::Label;
/// use reactive_fsm::graph::StateConfig;
/// # use reactive_fsm::core::State;
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// # enum Step { A }
/// # impl State for Step { fn name(&self) -> &str { "A" } }
///
/// let config: StateConfig<Step> = StateConfig::new()
///     .enter_from_init()
///     .leave_to("B")
///     .on_enter(|_machine, args| {
///         println!("entering {}", args.entering.state);
///         Ok(true)
///     });
///
/// assert!(config.can_enter_from().contains(&Label::Init));
/// assert!(config.has_on_enter());
/// ```
pub struct StateConfig<S: State> {
    can_enter_from: Vec<Label>,
    can_leave_to: Vec<Label>,
    on_enter: Option<ChangeHook<S>>,
    on_leave: Option<ChangeHook<S>>,
    on_update: Option<UpdateHook<S>>,
}

impl<S: State> StateConfig<S> {
    pub fn new() -> Self {
        Self {
            can_enter_from: Vec::new(),
            can_leave_to: Vec::new(),
            on_enter: None,
            on_leave: None,
            on_update: None,
        }
    }

    /// Permit entering this state from `label`.
    pub fn enter_from(mut self, label: impl Into<Label>) -> Self {
        let label = label.into();
        if !self.can_enter_from.contains(&label) {
            self.can_enter_from.push(label);
        }
        self
    }

    pub fn enter_from_init(self) -> Self {
        self.enter_from(Label::Init)
    }

    /// Permit leaving this state towards `label`.
    pub fn leave_to(mut self, label: impl Into<Label>) -> Self {
        let label = label.into();
        if !self.can_leave_to.contains(&label) {
            self.can_leave_to.push(label);
        }
        self
    }

    pub fn leave_to_terminate(self) -> Self {
        self.leave_to(Label::Terminate)
    }

    pub fn on_enter<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Machine<S>, &ChangeArgs<S>) -> HookResult + 'static,
    {
        self.on_enter = Some(Box::new(hook));
        self
    }

    pub fn on_leave<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Machine<S>, &ChangeArgs<S>) -> HookResult + 'static,
    {
        self.on_leave = Some(Box::new(hook));
        self
    }

    pub fn on_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Machine<S>, &UpdateArgs<S>) -> HookResult + 'static,
    {
        self.on_update = Some(Box::new(hook));
        self
    }
}

impl<S: State> StateConfig<S> {
    pub fn can_enter_from(&self) -> &[Label] {
        &self.can_enter_from
    }

    pub fn can_leave_to(&self) -> &[Label] {
        &self.can_leave_to
    }

    pub fn has_on_enter(&self) -> bool {
        self.on_enter.is_some()
    }

    pub fn has_on_leave(&self) -> bool {
        self.on_leave.is_some()
    }

    pub fn has_on_update(&self) -> bool {
        self.on_update.is_some()
    }

    pub(crate) fn enter_hook(&self) -> Option<&ChangeHook<S>> {
        self.on_enter.as_ref()
    }

    pub(crate) fn leave_hook(&self) -> Option<&ChangeHook<S>> {
        self.on_leave.as_ref()
    }

    pub(crate) fn update_hook(&self) -> Option<&UpdateHook<S>> {
        self.on_update.as_ref()
    }
}

impl<S: State> Default for StateConfig<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable set of state declarations, in declaration order.
pub struct TransitionGraph<S: State> {
    states: Vec<(String, StateConfig<S>)>,
    index: HashMap<String, usize>,
}

impl<S: State> TransitionGraph<S> {
    pub fn builder() -> GraphBuilder<S> {
        GraphBuilder::new()
    }
}

impl<S: State> TransitionGraph<S> {
    /// Assemble from already-validated parts. Names must be unique.
    pub(crate) fn from_states(states: Vec<(String, StateConfig<S>)>) -> Self {
        let index = states
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        Self { states, index }
    }

    pub fn get(&self, name: &str) -> Option<&StateConfig<S>> {
        self.index.get(name).map(|&i| &self.states[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateConfig<S>)> {
        self.states
            .iter()
            .map(|(name, config)| (name.as_str(), config))
    }

    /// Declared exits of `label`. Init and Terminate have none; undeclared
    /// states have none.
    pub fn can_leave_to(&self, label: &Label) -> &[Label] {
        match label {
            Label::State(name) => self.get(name).map(|c| c.can_leave_to()).unwrap_or(&[]),
            Label::Init | Label::Terminate => &[],
        }
    }

    /// Declared entries of `label`.
    pub fn can_enter_from(&self, label: &Label) -> &[Label] {
        match label {
            Label::State(name) => self.get(name).map(|c| c.can_enter_from()).unwrap_or(&[]),
            Label::Init | Label::Terminate => &[],
        }
    }

    /// States that list Init in their enter set, in declaration order.
    pub fn init_exits(&self) -> Vec<Label> {
        self.iter()
            .filter(|(_, config)| config.can_enter_from().contains(&Label::Init))
            .map(|(name, _)| Label::from(name))
            .collect()
    }

    /// Derived view of `label` carrying `data`. Init reports the states
    /// that may be entered from it.
    pub fn info(&self, label: Label, data: Option<S>) -> StateInfo<S> {
        let can_leave_to = match label {
            Label::Init => self.init_exits(),
            _ => self.can_leave_to(&label).to_vec(),
        };
        StateInfo {
            can_update: matches!(label, Label::State(_)),
            can_leave_to,
            state: label,
            data,
        }
    }

    pub fn info_for(&self, value: &StateValue<S>) -> StateInfo<S> {
        self.info(value.label(), value.data().cloned())
    }

    /// Cross-check every leave edge against its target's enter set and
    /// vice versa, accumulating all problems.
    pub fn check_consistency(&self) -> Validation<(), NonEmptyVec<GraphViolation>> {
        consistency::check(self)
    }
}
