// src/task/handle.rs

//! The [`Task`] handle and its structural API.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::condition::Condition;
use crate::errors::{OpflowError, Result, TaskError};
use crate::observer::Observer;
use crate::task::{FnWork, TaskContext, TaskOutcome, TaskState, Work};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mutable structural state of a task, guarded by one mutex.
///
/// The lifecycle state lives in `TaskInner::state` (a watch channel so that
/// dependents can await it), but it is only ever changed while this mutex is
/// held.
pub(super) struct TaskCore {
    pub(super) cancelled: bool,
    pub(super) dependencies: Vec<Task>,
    pub(super) conditions: Vec<Arc<dyn Condition>>,
    pub(super) observers: Vec<Arc<dyn Observer>>,
    pub(super) errors: Vec<TaskError>,
}

pub(super) struct TaskInner {
    pub(super) id: TaskId,
    pub(super) name: String,
    pub(super) work: Box<dyn Work>,
    pub(super) core: Mutex<TaskCore>,
    pub(super) state: watch::Sender<TaskState>,
    pub(super) token: CancellationToken,
}

/// A schedulable unit of asynchronous work.
///
/// `Task` is a cheap handle: clones refer to the same task, and equality is
/// identity.
#[derive(Clone)]
pub struct Task {
    pub(super) inner: Arc<TaskInner>,
}

impl Task {
    pub fn new(name: impl Into<String>, work: impl Work) -> Self {
        let (state, _) = watch::channel(TaskState::Initialized);
        Self {
            inner: Arc::new(TaskInner {
                id: TaskId::next(),
                name: name.into(),
                work: Box::new(work),
                core: Mutex::new(TaskCore {
                    cancelled: false,
                    dependencies: Vec::new(),
                    conditions: Vec::new(),
                    observers: Vec::new(),
                    errors: Vec::new(),
                }),
                state,
                token: CancellationToken::new(),
            }),
        }
    }

    /// Shorthand for a task whose body is a closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = std::result::Result<(), TaskError>> + Send + 'static,
    {
        Self::new(name, FnWork::new(f))
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> TaskState {
        *self.inner.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    pub fn is_cancelled(&self) -> bool {
        self.core().cancelled
    }

    /// Snapshot of the accumulated errors.
    pub fn errors(&self) -> Vec<TaskError> {
        self.core().errors.clone()
    }

    /// Snapshot of the current dependencies. Empty once the task finished,
    /// since finishing releases them.
    pub fn dependencies(&self) -> Vec<Task> {
        self.core().dependencies.clone()
    }

    /// How the task ended, or `None` while it is still running.
    pub fn outcome(&self) -> Option<TaskOutcome> {
        if !self.is_finished() {
            return None;
        }
        let core = self.core();
        let outcome = if core.cancelled {
            TaskOutcome::Cancelled(core.errors.clone())
        } else if core.errors.is_empty() {
            TaskOutcome::Succeeded
        } else {
            TaskOutcome::Failed(core.errors.clone())
        };
        Some(outcome)
    }

    /// Exclusivity categories declared by this task's conditions, in
    /// attachment order, without duplicates.
    pub fn mutual_exclusion_categories(&self) -> Vec<String> {
        let core = self.core();
        let mut categories: Vec<String> = Vec::new();
        for condition in core.conditions.iter().filter(|c| c.is_mutually_exclusive()) {
            let name = condition.name();
            if !categories.iter().any(|c| c == name) {
                categories.push(name.to_string());
            }
        }
        categories
    }

    /// Make this task wait for `other` to finish.
    ///
    /// Only allowed while the task is `Initialized` or `Pending`.
    pub fn add_dependency(&self, other: &Task) -> Result<()> {
        if self == other {
            return Err(OpflowError::SelfDependency(self.name().to_string()));
        }
        let mut core = self.core();
        self.ensure_state(TaskState::accepts_dependencies, "add a dependency")?;
        if !core.dependencies.contains(other) {
            trace!(task = %self, dependency = %other, "dependency added");
            core.dependencies.push(other.clone());
        }
        Ok(())
    }

    /// Attach a precondition. Only allowed while `Initialized` or `Pending`.
    pub fn add_condition(&self, condition: impl Condition) -> Result<()> {
        self.attach_condition(Arc::new(condition))
    }

    pub fn attach_condition(&self, condition: Arc<dyn Condition>) -> Result<()> {
        let mut core = self.core();
        self.ensure_state(TaskState::accepts_dependencies, "add a condition")?;
        core.conditions.push(condition);
        Ok(())
    }

    /// Attach a lifecycle observer. Only allowed before execution begins.
    pub fn add_observer(&self, observer: impl Observer) -> Result<()> {
        self.attach_observer(Arc::new(observer))
    }

    pub fn attach_observer(&self, observer: Arc<dyn Observer>) -> Result<()> {
        let mut core = self.core();
        self.ensure_state(|s| s < TaskState::Executing, "add an observer")?;
        core.observers.push(observer);
        Ok(())
    }

    /// Called by a queue once submission wiring is complete.
    pub(crate) fn will_enqueue(&self) -> Result<()> {
        let core = self.core();
        self.ensure_state(|s| s == TaskState::Initialized, "be enqueued")?;
        self.set_state(&core, TaskState::Pending);
        Ok(())
    }

    /// Prerequisite tasks supplied by the attached conditions.
    pub(crate) fn condition_dependencies(&self) -> Vec<Task> {
        let conditions = self.core().conditions.clone();
        conditions
            .iter()
            .filter_map(|condition| condition.dependency_for(self))
            .collect()
    }

    /// Announce a new task produced by this one to every observer (the owning
    /// queue's observer submits it).
    pub fn produce_task(&self, task: Task) -> Result<()> {
        let observers = {
            let core = self.core();
            self.ensure_state(|s| s < TaskState::Finishing, "produce a task")?;
            core.observers.clone()
        };
        debug!(task = %self, produced = %task, "task produced a new task");
        for observer in &observers {
            observer.on_produce(self, &task);
        }
        Ok(())
    }

    pub fn cancel(&self) {
        self.cancel_inner(None);
    }

    pub fn cancel_with_error(&self, error: TaskError) {
        self.cancel_inner(Some(error));
    }

    fn cancel_inner(&self, error: Option<TaskError>) {
        if self.state() >= TaskState::Finishing {
            return;
        }

        // Let the work kind react first (a group cancels its children).
        self.inner.work.on_cancel(self);

        {
            let mut core = self.core();
            if self.state() >= TaskState::Finishing {
                return;
            }
            if let Some(error) = error {
                core.errors.push(error);
            }
            if !core.cancelled {
                debug!(task = %self, state = %self.state(), "task cancelled");
            }
            core.cancelled = true;
        }

        self.inner.token.cancel();
    }

    /// Finish the task with additional errors.
    ///
    /// Idempotent: only the first call has any effect. Observers are notified
    /// in attachment order with the full accumulated error list, after which
    /// dependencies, conditions and observers are released.
    pub fn finish(&self, errors: Vec<TaskError>) {
        let (observers, all_errors) = {
            let mut core = self.core();
            if self.state() >= TaskState::Finishing {
                return;
            }
            core.errors.extend(errors);
            self.set_state(&core, TaskState::Finishing);
            (std::mem::take(&mut core.observers), core.errors.clone())
        };

        debug!(task = %self, errors = all_errors.len(), "task finishing");
        for observer in &observers {
            observer.on_finish(self, &all_errors);
        }

        let mut core = self.core();
        core.dependencies.clear();
        core.conditions.clear();
        self.set_state(&core, TaskState::Finished);
    }

    /// Resolves once the task reaches [`TaskState::Finished`].
    pub async fn wait_until_finished(&self) {
        let mut rx = self.inner.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|state| state.is_finished()).await;
    }

    pub(super) fn token(&self) -> &CancellationToken {
        &self.inner.token
    }

    pub(super) fn core(&self) -> MutexGuard<'_, TaskCore> {
        self.inner.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change state. The caller proves it holds the structural lock by
    /// passing the guard.
    pub(super) fn set_state(&self, _core: &TaskCore, next: TaskState) {
        let current = self.state();
        debug_assert!(
            current.can_transition_to(next),
            "illegal transition {} -> {} for task {}",
            current,
            next,
            self
        );
        trace!(task = %self, from = %current, to = %next, "state transition");
        self.inner.state.send_replace(next);
    }

    fn ensure_state(&self, allowed: impl Fn(TaskState) -> bool, action: &'static str) -> Result<()> {
        let state = self.state();
        if allowed(state) {
            Ok(())
        } else {
            Err(OpflowError::InvalidState {
                task: self.name().to_string(),
                state,
                action,
            })
        }
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.inner.name, self.inner.id)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::observer::BlockObserver;
    use crate::task::NoopWork;

    #[test]
    fn finish_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let task = Task::new("once", NoopWork);
        let seen = Arc::clone(&calls);
        task.add_observer(BlockObserver::new().on_finish(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

        task.finish(vec![TaskError::execution_failed("first")]);
        task.finish(vec![TaskError::execution_failed("second")]);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(task.errors(), vec![TaskError::execution_failed("first")]);
        assert_eq!(task.state(), TaskState::Finished);
    }

    #[test]
    fn structural_changes_rejected_after_finish() {
        let task = Task::new("done", NoopWork);
        let other = Task::new("other", NoopWork);
        task.finish(Vec::new());

        let err = task.add_dependency(&other).unwrap_err();
        assert!(matches!(
            err,
            OpflowError::InvalidState {
                state: TaskState::Finished,
                ..
            }
        ));
        assert!(task.add_observer(BlockObserver::new()).is_err());
        assert!(task.produce_task(other).is_err());
    }

    #[test]
    fn self_dependency_rejected_and_duplicates_ignored() {
        let a = Task::new("a", NoopWork);
        let b = Task::new("b", NoopWork);

        assert!(matches!(
            a.add_dependency(&a),
            Err(OpflowError::SelfDependency(_))
        ));

        a.add_dependency(&b).unwrap();
        a.add_dependency(&b).unwrap();
        assert_eq!(a.dependencies(), vec![b]);
    }

    #[test]
    fn cancel_records_error_and_outcome() {
        let task = Task::new("cancel-me", NoopWork);
        task.cancel_with_error(TaskError::execution_failed("stop"));
        assert!(task.is_cancelled());
        assert!(task.token().is_cancelled());
        assert_eq!(task.outcome(), None);

        task.finish(Vec::new());
        assert_eq!(
            task.outcome(),
            Some(TaskOutcome::Cancelled(vec![TaskError::execution_failed(
                "stop"
            )]))
        );

        // Too late to cancel again.
        task.cancel_with_error(TaskError::execution_failed("ignored"));
        assert_eq!(task.errors().len(), 1);
    }

    #[test]
    fn ids_are_unique_and_display_includes_name() {
        let a = Task::new("alpha", NoopWork);
        let b = Task::new("alpha", NoopWork);
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
        assert!(a.to_string().starts_with("alpha#"));
    }
}
