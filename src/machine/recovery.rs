//! Supervision of the transition pipeline.
//!
//! A hook that returns an error or panics is an undeclared failure. The
//! pipeline is replaced by a fresh generation rooted at the last committed
//! value, so the machine keeps serving requests in the state it was in.

use super::pipeline::Pipeline;
use super::Machine;
use crate::core::{Commit, Envelope, HookFailure, HookKind, LogOutcome, State, TransitionKind};
use thiserror::Error;
use tracing::error;

/// A lifecycle hook crashed while handling a request.
#[derive(Debug, Error)]
#[error("{hook} hook crashed during {} to '{}'", .envelope.kind, .envelope.target)]
pub struct UnknownError<S: State> {
    pub hook: HookKind,
    /// The request that was being handled.
    pub envelope: Envelope<S>,
    #[source]
    pub failure: HookFailure,
}

impl<S: State> Machine<S> {
    /// Replace the pipeline with a new generation rooted at `root`.
    pub(crate) fn rebuild_pipeline(&self, root: &Commit<S>) -> u64 {
        let generation = self.shared.pipeline.borrow().generation() + 1;
        *self.shared.pipeline.borrow_mut() = Pipeline::rooted_at(self.shared.id, root, generation);
        generation
    }

    pub(crate) fn recover(&self, failure: UnknownError<S>) {
        let committed = self.committed();
        let message = format!("{failure}: {}", failure.failure);

        error!(
            machine = %self.shared.id,
            hook = %failure.hook,
            kind = %failure.envelope.kind,
            target = %failure.envelope.target,
            "{message}"
        );

        self.shared.log.borrow_mut().record(
            failure.envelope.kind,
            failure.envelope.target.clone(),
            failure.envelope.data.as_ref(),
            LogOutcome::UnknownError,
            Some(message),
        );

        let generation = self.rebuild_pipeline(&committed);

        if self.shared.config.record_reset_data_to_debug_log {
            let label = committed.value.label();
            let message = format!("pipeline restarted (generation {generation}) in '{label}'");
            self.shared.log.borrow_mut().record(
                TransitionKind::Recover,
                label,
                committed.value.data(),
                LogOutcome::Success,
                Some(message),
            );
        }

        if let Some(hook) = &self.shared.on_unknown_error {
            hook(self, &failure);
        }
    }
}
