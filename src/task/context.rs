// src/task/context.rs

use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::errors::{Result, TaskError};
use crate::task::Task;

/// Handle passed to a work body for the duration of one execution.
///
/// It carries the cancellation token of the owning task, so every suspension
/// point in a body can race its wait against [`TaskContext::cancelled`].
#[derive(Debug, Clone)]
pub struct TaskContext {
    task: Task,
    errors: Arc<Mutex<Vec<TaskError>>>,
}

impl TaskContext {
    pub(crate) fn new(task: Task) -> Self {
        Self {
            task,
            errors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The task being executed.
    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.is_cancelled()
    }

    /// Resolves once the task is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.task.token().cancelled()
    }

    /// Clone of the task's cancellation token, for handing to spawned helpers.
    pub fn token(&self) -> CancellationToken {
        self.task.token().clone()
    }

    /// Hand a new task to the queue that runs this one.
    ///
    /// The produced task goes through the ordinary submission path and is
    /// not a dependency of the producer.
    pub fn produce(&self, task: Task) -> Result<()> {
        self.task.produce_task(task)
    }

    /// Record an error without stopping the body. Recorded errors are
    /// reported at finish, ahead of the error the body returns (if any).
    pub fn record_error(&self, error: TaskError) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }

    pub(crate) fn take_errors(&self) -> Vec<TaskError> {
        std::mem::take(&mut *self.errors.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
