//! Reviewer assignment service shell: dependencies and instrumentation.
//!
//! Operations live in sibling modules as separate `impl` blocks; each runs
//! its mutations inside exactly one unit of work and reports to the
//! configured [`AssignmentObserver`] once the outcome is known.

use super::{
    AssignmentError, AssignmentObserver, AssignmentOperation, AssignmentResult,
    CandidateSelector, NoopObserver,
};
use crate::assignment::ports::UnitOfWork;
use mockable::Clock;
use std::sync::Arc;
use std::time::Instant;

/// Reviewer assignment orchestration service.
#[derive(Clone)]
pub struct ReviewerAssignmentService<S, C>
where
    S: UnitOfWork,
    C: Clock + Send + Sync,
{
    pub(super) store: Arc<S>,
    pub(super) clock: Arc<C>,
    pub(super) selector: CandidateSelector,
    pub(super) observer: Arc<dyn AssignmentObserver>,
}

impl<S, C> ReviewerAssignmentService<S, C>
where
    S: UnitOfWork,
    C: Clock + Send + Sync,
{
    /// Creates a service without instrumentation.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            store,
            clock,
            selector: CandidateSelector::new(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Replaces the observer notified about committed changes.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn AssignmentObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Reports `result` for `operation` and hands it back.
    pub(super) fn finish<T>(
        &self,
        operation: AssignmentOperation,
        started: Instant,
        result: AssignmentResult<T>,
    ) -> AssignmentResult<T> {
        let error = result.as_ref().err().map(AssignmentError::code);
        if let Some(code) = error {
            tracing::debug!(operation = operation.as_str(), %code, "operation rejected");
        }
        self.observer
            .operation_finished(operation, started.elapsed(), error);
        result
    }
}
