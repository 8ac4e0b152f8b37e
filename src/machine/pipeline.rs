//! Transition pipeline: validation filters and lifecycle hook execution.
//!
//! `execute` never mutates the machine. It returns an [`Outcome`] and the
//! caller applies it, so a crash inside a hook can never leave a partial
//! commit behind.

use super::recovery::UnknownError;
use super::rejection::Rejection;
use super::Machine;
use crate::core::{
    ChangeArgs, Commit, Envelope, HookFailure, HookKind, HookResult, Label, RejectReason, State,
    StateValue, TransitionKind, UpdateArgs,
};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, trace};
use uuid::Uuid;

/// Validated requests handled by the pipeline.
pub(crate) enum TransitionRequest<S: State> {
    Update(S),
    Change(S),
    Terminate,
}

impl<S: State> TransitionRequest<S> {
    pub(crate) fn envelope(&self) -> Envelope<S> {
        match self {
            Self::Update(data) => Envelope::update(data.clone()),
            Self::Change(data) => Envelope::change(data.clone()),
            Self::Terminate => Envelope::terminate(),
        }
    }
}

/// Result of running one request through the pipeline.
pub(crate) enum Outcome<S: State> {
    Commit(Commit<S>),
    /// Accepted exit to Terminate; nothing is committed.
    Terminate,
    Rejected(Rejection<S>),
    Crashed(UnknownError<S>),
}

enum Verdict {
    Accept,
    Reject,
    Crash(HookFailure),
}

/// Runs a hook, turning panics into failures.
fn run_hook<F>(hook: F) -> Verdict
where
    F: FnOnce() -> HookResult,
{
    match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(true)) => Verdict::Accept,
        Ok(Ok(false)) => Verdict::Reject,
        Ok(Err(error)) => Verdict::Crash(HookFailure::Error(error)),
        Err(payload) => Verdict::Crash(HookFailure::from_panic(payload)),
    }
}

fn rejected<S: State>(
    reason: RejectReason,
    envelope: Envelope<S>,
    current: &StateValue<S>,
) -> Outcome<S> {
    Outcome::Rejected(Rejection::new(reason, envelope, current.clone()))
}

fn crashed<S: State>(hook: HookKind, envelope: Envelope<S>, failure: HookFailure) -> Outcome<S> {
    Outcome::Crashed(UnknownError {
        hook,
        envelope,
        failure,
    })
}

/// One incarnation of the pipeline. Replaced wholesale on recovery and
/// on override.
pub(crate) struct Pipeline {
    generation: u64,
}

impl Pipeline {
    pub(crate) fn rooted_at<S: State>(machine: Uuid, root: &Commit<S>, generation: u64) -> Self {
        debug!(
            machine = %machine,
            generation,
            kind = %root.kind,
            state = %root.value.label(),
            "pipeline started"
        );
        Self { generation }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn execute<S: State>(
        &self,
        machine: &Machine<S>,
        request: TransitionRequest<S>,
    ) -> Outcome<S> {
        trace!(
            machine = %machine.id(),
            generation = self.generation,
            "executing request"
        );

        let current = machine.committed().value;
        match request {
            TransitionRequest::Update(data) => self.update(machine, &current, data),
            TransitionRequest::Change(data) => self.change(machine, &current, data),
            TransitionRequest::Terminate => self.terminate(machine, &current),
        }
    }

    fn update<S: State>(
        &self,
        machine: &Machine<S>,
        current: &StateValue<S>,
        data: S,
    ) -> Outcome<S> {
        let envelope = Envelope::update(data.clone());

        let current_data = match current {
            StateValue::Init => return rejected(RejectReason::IllegalUpdateInit, envelope, current),
            StateValue::Data(current_data) => current_data,
        };

        if current_data.name() != data.name() {
            return rejected(RejectReason::UpdateStateMismatch, envelope, current);
        }

        if machine.config().filter_repeat_updates && current_data.same_payload(&data) {
            return rejected(RejectReason::RepeatUpdateFiltered, envelope, current);
        }

        let graph = machine.graph();
        if let Some(hook) = graph.get(data.name()).and_then(|c| c.update_hook()) {
            let args = UpdateArgs {
                previous: graph.info_for(current),
                update: graph.info(envelope.target.clone(), Some(data.clone())),
            };
            match run_hook(|| hook(machine, &args)) {
                Verdict::Accept => {}
                Verdict::Reject => {
                    return rejected(RejectReason::TerminatedByUpdateCallback, envelope, current)
                }
                Verdict::Crash(failure) => return crashed(HookKind::OnUpdate, envelope, failure),
            }
        }

        Outcome::Commit(Commit::new(TransitionKind::Update, StateValue::Data(data)))
    }

    fn change<S: State>(
        &self,
        machine: &Machine<S>,
        current: &StateValue<S>,
        data: S,
    ) -> Outcome<S> {
        let envelope = Envelope::change(data.clone());
        let leaving = current.label();
        let target = envelope.target.clone();

        if leaving == target {
            return rejected(RejectReason::IllegalChangeSameState, envelope, current);
        }

        let graph = machine.graph();
        let args = ChangeArgs {
            leaving: graph.info_for(current),
            entering: graph.info(target.clone(), Some(data.clone())),
        };

        match current {
            StateValue::Data(_) => {
                if !graph.can_leave_to(&leaving).contains(&target) {
                    return rejected(RejectReason::NotPermittedToLeave, envelope, current);
                }
                machine.notify_transition(&leaving, &target);

                if let Some(hook) = graph.get(leaving.as_str()).and_then(|c| c.leave_hook()) {
                    match run_hook(|| hook(machine, &args)) {
                        Verdict::Accept => {}
                        Verdict::Reject => {
                            return rejected(
                                RejectReason::TerminatedByLeaveCallback,
                                envelope,
                                current,
                            )
                        }
                        Verdict::Crash(failure) => {
                            return crashed(HookKind::OnLeave, envelope, failure)
                        }
                    }
                }
            }
            StateValue::Init => {
                if !graph.can_enter_from(&target).contains(&Label::Init) {
                    return rejected(RejectReason::NotPermittedToEnter, envelope, current);
                }
                machine.notify_transition(&leaving, &target);
            }
        }

        if let Some(hook) = graph.get(target.as_str()).and_then(|c| c.enter_hook()) {
            match run_hook(|| hook(machine, &args)) {
                Verdict::Accept => {}
                Verdict::Reject => {
                    return rejected(RejectReason::TerminatedByEnterCallback, envelope, current)
                }
                Verdict::Crash(failure) => return crashed(HookKind::OnEnter, envelope, failure),
            }
        }

        Outcome::Commit(Commit::new(TransitionKind::Change, StateValue::Data(data)))
    }

    fn terminate<S: State>(
        &self,
        machine: &Machine<S>,
        current: &StateValue<S>,
    ) -> Outcome<S> {
        let envelope = Envelope::terminate();
        let leaving = current.label();
        let graph = machine.graph();

        if current.is_init() || !graph.can_leave_to(&leaving).contains(&Label::Terminate) {
            return rejected(RejectReason::NotPermittedToLeave, envelope, current);
        }
        machine.notify_transition(&leaving, &Label::Terminate);

        if let Some(hook) = graph.get(leaving.as_str()).and_then(|c| c.leave_hook()) {
            let args = ChangeArgs {
                leaving: graph.info_for(current),
                entering: graph.info(Label::Terminate, None),
            };
            match run_hook(|| hook(machine, &args)) {
                Verdict::Accept => {}
                Verdict::Reject => {
                    return rejected(RejectReason::TerminatedByLeaveCallback, envelope, current)
                }
                Verdict::Crash(failure) => return crashed(HookKind::OnLeave, envelope, failure),
            }
        }

        Outcome::Terminate
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{HookKind, Label, RejectReason, State, StateValue};
    use crate::graph::{StateConfig, TransitionGraph};
    use crate::machine::Machine;
    use serde::{Deserialize, Serialize};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum Job {
        Queued { priority: u8 },
        Running { pct: u8 },
        Done,
    }

    impl State for Job {
        fn name(&self) -> &str {
            match self {
                Self::Queued { .. } => "Queued",
                Self::Running { .. } => "Running",
                Self::Done => "Done",
            }
        }
    }

    type Calls = Rc<RefCell<Vec<String>>>;

    fn traced_graph(calls: &Calls) -> TransitionGraph<Job> {
        let (c1, c2, c3, c4, c5) = (
            Rc::clone(calls),
            Rc::clone(calls),
            Rc::clone(calls),
            Rc::clone(calls),
            Rc::clone(calls),
        );
        TransitionGraph::<Job>::builder()
            .state(
                "Queued",
                StateConfig::new()
                    .enter_from_init()
                    .leave_to("Running")
                    .on_enter(move |_, a| {
                        c1.borrow_mut().push(format!("enter {}", a.entering.state));
                        Ok(true)
                    })
                    .on_leave(move |_, a| {
                        c2.borrow_mut().push(format!("leave {}", a.leaving.state));
                        Ok(true)
                    }),
            )
            .state(
                "Running",
                StateConfig::new()
                    .enter_from("Queued")
                    .leave_to("Done")
                    .on_enter(move |_, a| {
                        c3.borrow_mut().push(format!("enter {}", a.entering.state));
                        Ok(true)
                    })
                    .on_update(move |_, a| {
                        c4.borrow_mut().push(format!("update {:?}", a.update.data));
                        Ok(true)
                    }),
            )
            .state(
                "Done",
                StateConfig::new().enter_from("Running").on_enter(move |_, a| {
                    c5.borrow_mut().push(format!("enter {}", a.entering.state));
                    Ok(true)
                }),
            )
            .build()
            .unwrap()
    }

    fn machine_with(
        graph: TransitionGraph<Job>,
    ) -> (Machine<Job>, Rc<RefCell<Vec<RejectReason>>>) {
        let reasons = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reasons);
        let machine = Machine::builder(graph)
            .on_rejected(move |_, r| sink.borrow_mut().push(r.reason))
            .build()
            .unwrap();
        (machine, reasons)
    }

    #[test]
    fn leave_runs_before_enter() {
        let calls: Calls = Rc::default();
        let (machine, _) = machine_with(traced_graph(&calls));

        machine.submit_change(Job::Queued { priority: 1 });
        machine.submit_change(Job::Running { pct: 0 });

        assert_eq!(
            *calls.borrow(),
            vec!["enter Queued", "leave Queued", "enter Running"]
        );
    }

    #[test]
    fn update_hook_fires_only_for_matching_tag() {
        let calls: Calls = Rc::default();
        let (machine, reasons) = machine_with(traced_graph(&calls));

        machine.submit_change(Job::Queued { priority: 1 });
        machine.submit_change(Job::Running { pct: 0 });
        calls.borrow_mut().clear();

        machine.submit_update(Job::Queued { priority: 2 });
        machine.submit_update(Job::Running { pct: 50 });

        assert_eq!(
            *calls.borrow(),
            vec!["update Some(Running { pct: 50 })".to_string()]
        );
        assert_eq!(*reasons.borrow(), vec![RejectReason::UpdateStateMismatch]);
    }

    #[test]
    fn update_in_init_is_rejected() {
        let calls: Calls = Rc::default();
        let (machine, reasons) = machine_with(traced_graph(&calls));

        machine.submit_update(Job::Queued { priority: 1 });

        assert_eq!(*reasons.borrow(), vec![RejectReason::IllegalUpdateInit]);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn repeat_update_is_filtered_before_hook() {
        let calls: Calls = Rc::default();
        let (machine, reasons) = machine_with(traced_graph(&calls));

        machine.submit_change(Job::Queued { priority: 1 });
        machine.submit_change(Job::Running { pct: 10 });
        calls.borrow_mut().clear();
        machine.submit_update(Job::Running { pct: 10 });

        assert_eq!(*reasons.borrow(), vec![RejectReason::RepeatUpdateFiltered]);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn hooks_returning_false_reject_with_matching_reason() {
        let graph = TransitionGraph::<Job>::builder()
            .state(
                "Queued",
                StateConfig::new()
                    .enter_from_init()
                    .leave_to("Running")
                    .on_update(|_, _| Ok(false))
                    .on_leave(|_, a| Ok(a.entering.data != Some(Job::Running { pct: 13 }))),
            )
            .state(
                "Running",
                StateConfig::new()
                    .enter_from("Queued")
                    .on_enter(|_, a| Ok(a.entering.data != Some(Job::Running { pct: 99 }))),
            )
            .build()
            .unwrap();
        let (machine, reasons) = machine_with(graph);

        machine.submit_change(Job::Queued { priority: 1 });
        machine.submit_update(Job::Queued { priority: 2 });
        machine.submit_change(Job::Running { pct: 13 });
        machine.submit_change(Job::Running { pct: 99 });

        assert_eq!(
            *reasons.borrow(),
            vec![
                RejectReason::TerminatedByUpdateCallback,
                RejectReason::TerminatedByLeaveCallback,
                RejectReason::TerminatedByEnterCallback,
            ]
        );
        assert_eq!(
            machine.committed().value,
            StateValue::Data(Job::Queued { priority: 1 })
        );
    }

    #[test]
    fn leave_permission_is_checked_before_hooks() {
        let calls: Calls = Rc::default();
        let (machine, reasons) = machine_with(traced_graph(&calls));

        machine.submit_change(Job::Queued { priority: 1 });
        machine.submit_change(Job::Done);

        assert_eq!(*reasons.borrow(), vec![RejectReason::NotPermittedToLeave]);
        assert_eq!(*calls.borrow(), vec!["enter Queued"]);
    }

    #[test]
    fn same_state_change_is_rejected() {
        let calls: Calls = Rc::default();
        let (machine, reasons) = machine_with(traced_graph(&calls));

        machine.submit_change(Job::Queued { priority: 1 });
        machine.submit_change(Job::Queued { priority: 5 });

        assert_eq!(*reasons.borrow(), vec![RejectReason::IllegalChangeSameState]);
    }

    #[test]
    fn enter_args_describe_both_ends() {
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let graph = TransitionGraph::<Job>::builder()
            .state("Queued", StateConfig::new().enter_from_init().leave_to("Running"))
            .state(
                "Running",
                StateConfig::new().enter_from("Queued").on_enter(move |_, a| {
                    *sink.borrow_mut() = Some(a.clone());
                    Ok(true)
                }),
            )
            .build()
            .unwrap();
        let (machine, _) = machine_with(graph);

        machine.submit_change(Job::Queued { priority: 3 });
        machine.submit_change(Job::Running { pct: 1 });

        let args = seen.borrow().clone().unwrap();
        assert_eq!(args.leaving.state, Label::from("Queued"));
        assert_eq!(args.leaving.data, Some(Job::Queued { priority: 3 }));
        assert_eq!(args.entering.state, Label::from("Running"));
        assert_eq!(args.entering.data, Some(Job::Running { pct: 1 }));
    }

    #[test]
    fn crashing_hook_reports_hook_kind() {
        let kinds = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&kinds);
        let graph = TransitionGraph::<Job>::builder()
            .state(
                "Queued",
                StateConfig::new()
                    .enter_from_init()
                    .on_update(|_, _| Err("bad payload".into())),
            )
            .build()
            .unwrap();
        let machine = Machine::builder(graph)
            .on_unknown_error(move |_, e| sink.borrow_mut().push(e.hook))
            .build()
            .unwrap();

        machine.submit_change(Job::Queued { priority: 1 });
        machine.submit_update(Job::Queued { priority: 2 });

        assert_eq!(*kinds.borrow(), vec![HookKind::OnUpdate]);
        assert_eq!(machine.pipeline_generation(), 1);
    }

    #[test]
    fn only_restarts_start_a_new_generation() {
        let calls: Calls = Rc::default();
        let (machine, reasons) = machine_with(traced_graph(&calls));

        machine.submit_change(Job::Queued { priority: 1 });
        machine.submit_change(Job::Queued { priority: 2 });
        machine.submit_change(Job::Running { pct: 0 });

        assert_eq!(reasons.borrow().len(), 1);
        assert_eq!(machine.pipeline_generation(), 0);
    }
}
