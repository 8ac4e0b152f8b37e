//! Dev-mode forced commits.
//!
//! An override skips every filter and lifecycle hook. It still travels the
//! request FIFO, so it never interleaves with a transition in flight.

use super::rejection::Rejection;
use super::Machine;
use crate::core::{
    Commit, Envelope, Label, LogOutcome, OverrideArgs, RejectReason, State, StateValue,
    TransitionKind,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Callback carried by an override, run after the value is committed.
pub type OverrideCallback<S> = Box<dyn Fn(&Machine<S>, &OverrideArgs<S>)>;

/// Value to force the machine into.
///
/// # Example
///
/// ```rust
/// use reactive_fsm::machine::StateOverride;
/// # use reactive_fsm::core::State;
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// # enum Wizard { Step { index: u8 } }
/// # impl State for Wizard { fn name(&self) -> &str { "Step" } }
///
/// let jump = StateOverride::new(Wizard::Step { index: 4 })
///     .with_callback(|_machine, args| println!("jumped from {}", args.original.state));
/// assert_eq!(jump.state, Wizard::Step { index: 4 });
/// ```
pub struct StateOverride<S: State> {
    pub state: S,
    callback: Option<OverrideCallback<S>>,
}

impl<S: State> StateOverride<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            callback: None,
        }
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Machine<S>, &OverrideArgs<S>) + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn envelope(&self) -> Envelope<S> {
        Envelope {
            kind: TransitionKind::Override,
            target: Label::from(self.state.name()),
            data: Some(self.state.clone()),
        }
    }
}

impl<S: State> fmt::Debug for StateOverride<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateOverride")
            .field("state", &self.state)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Published on the override stream before the value is committed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct OverrideNotice<S: State> {
    pub original: StateValue<S>,
    pub overriding: S,
}

impl<S: State> Machine<S> {
    pub(crate) fn apply_override(&self, state_override: StateOverride<S>, reset_log: bool) {
        let envelope = state_override.envelope();
        let original = self.committed().value;

        if !self.shared.dev_mode {
            self.handle_rejection(Rejection::new(
                RejectReason::OverrideInProduction,
                envelope,
                original,
            ));
            return;
        }

        let StateOverride { state, callback } = state_override;
        let label = envelope.target;
        info!(
            machine = %self.shared.id,
            from = %original.label(),
            to = %label,
            reset_log,
            "overriding current state"
        );

        self.shared.overrides.borrow_mut().publish(OverrideNotice {
            original: original.clone(),
            overriding: state.clone(),
        });

        let commit = Commit::new(TransitionKind::Override, StateValue::Data(state.clone()));
        self.rebuild_pipeline(&commit);

        {
            let mut log = self.shared.log.borrow_mut();
            if reset_log {
                log.clear();
            }
            log.record(
                TransitionKind::Override,
                label.clone(),
                Some(&state),
                LogOutcome::Success,
                None,
            );
        }

        self.shared.holder.borrow_mut().set(commit);

        if let Some(callback) = callback {
            let graph = self.graph();
            let args = OverrideArgs {
                original: graph.info_for(&original),
                overriding: graph.info(label, Some(state)),
            };
            callback(self, &args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{StateConfig, TransitionGraph};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum Checkout {
        Cart { items: u32 },
        Payment,
        Receipt,
    }

    impl State for Checkout {
        fn name(&self) -> &str {
            match self {
                Self::Cart { .. } => "Cart",
                Self::Payment => "Payment",
                Self::Receipt => "Receipt",
            }
        }
    }

    fn graph(hook_calls: &Rc<RefCell<u32>>) -> TransitionGraph<Checkout> {
        let (enter, leave) = (Rc::clone(hook_calls), Rc::clone(hook_calls));
        TransitionGraph::<Checkout>::builder()
            .state(
                "Cart",
                StateConfig::new()
                    .enter_from_init()
                    .leave_to("Payment")
                    .on_leave(move |_, _| {
                        *leave.borrow_mut() += 1;
                        Ok(true)
                    }),
            )
            .state("Payment", StateConfig::new().enter_from("Cart").leave_to("Receipt"))
            .state(
                "Receipt",
                StateConfig::new().enter_from("Payment").on_enter(move |_, _| {
                    *enter.borrow_mut() += 1;
                    Ok(true)
                }),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn override_commits_without_running_hooks() {
        let calls = Rc::new(RefCell::new(0));
        let machine = Machine::builder(graph(&calls)).dev_mode(true).build().unwrap();
        let mut notices = machine.overrides();

        machine.submit_change(Checkout::Cart { items: 2 });
        machine.override_current_state(StateOverride::new(Checkout::Receipt), None);

        assert_eq!(*calls.borrow(), 0);
        assert_eq!(
            machine.committed(),
            Commit::new(TransitionKind::Override, StateValue::Data(Checkout::Receipt))
        );
        assert_eq!(
            notices.drain(),
            vec![OverrideNotice {
                original: StateValue::Data(Checkout::Cart { items: 2 }),
                overriding: Checkout::Receipt,
            }]
        );
        assert_eq!(machine.pipeline_generation(), 1);
    }

    #[test]
    fn override_resets_log_by_default() {
        let calls = Rc::new(RefCell::new(0));
        let machine = Machine::builder(graph(&calls)).dev_mode(true).build().unwrap();
        machine.submit_change(Checkout::Cart { items: 1 });

        machine.override_current_state(StateOverride::new(Checkout::Payment), None);

        let log = machine.debug_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, TransitionKind::Override);
        assert_eq!(log[0].state, Label::from("Payment"));
    }

    #[test]
    fn override_can_keep_log() {
        let calls = Rc::new(RefCell::new(0));
        let machine = Machine::builder(graph(&calls)).dev_mode(true).build().unwrap();
        machine.submit_change(Checkout::Cart { items: 1 });

        machine.override_current_state(StateOverride::new(Checkout::Payment), Some(false));

        assert_eq!(machine.debug_log().len(), 3);
    }

    #[test]
    fn override_callback_sees_both_states() {
        let calls = Rc::new(RefCell::new(0));
        let machine = Machine::builder(graph(&calls)).dev_mode(true).build().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        machine.override_current_state(
            StateOverride::new(Checkout::Payment).with_callback(move |machine, args| {
                sink.borrow_mut().push((
                    args.original.state.clone(),
                    args.overriding.state.clone(),
                    machine.current_state().state,
                ));
            }),
            None,
        );

        assert_eq!(
            *seen.borrow(),
            vec![(Label::Init, Label::from("Payment"), Label::from("Payment"))]
        );
    }

    #[test]
    fn override_outside_dev_mode_is_rejected() {
        let calls = Rc::new(RefCell::new(0));
        let reasons = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reasons);
        let machine = Machine::builder(graph(&calls))
            .on_rejected(move |_, r| sink.borrow_mut().push(r.reason))
            .build()
            .unwrap();

        machine.override_current_state(StateOverride::new(Checkout::Payment), None);

        assert_eq!(*reasons.borrow(), vec![RejectReason::OverrideInProduction]);
        assert!(machine.committed().value.is_init());
        assert_eq!(machine.pipeline_generation(), 0);
    }

    #[test]
    fn configured_override_seeds_the_machine() {
        let calls = Rc::new(RefCell::new(0));
        let machine = Machine::builder(graph(&calls))
            .dev_mode(true)
            .state_override(StateOverride::new(Checkout::Payment))
            .build()
            .unwrap();

        assert_eq!(machine.current_state().state, Label::from("Payment"));
        machine.submit_change(Checkout::Receipt);
        assert_eq!(machine.current_state().state, Label::from("Receipt"));
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn override_queued_from_hook_runs_after_transition() {
        let graph = TransitionGraph::<Checkout>::builder()
            .state(
                "Cart",
                StateConfig::new()
                    .enter_from_init()
                    .on_enter(|machine, _| {
                        machine.override_current_state(StateOverride::new(Checkout::Receipt), Some(false));
                        Ok(true)
                    }),
            )
            .build()
            .unwrap();
        let machine = Machine::builder(graph).dev_mode(true).build().unwrap();
        let mut states = machine.state_changes();

        machine.submit_change(Checkout::Cart { items: 1 });

        let kinds: Vec<_> = states.drain().into_iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TransitionKind::Init,
                TransitionKind::Change,
                TransitionKind::Override
            ]
        );
    }
}
