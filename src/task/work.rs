// src/task/work.rs

//! The work body of a task.
//!
//! Every task kind (closure, delay, group, lifted future, permission request)
//! implements [`Work`]. The lifecycle driver calls [`Work::execute`] at most
//! once, after dependencies finished and conditions were satisfied, and
//! finishes the task with whatever the body returned plus any errors it
//! recorded on its [`TaskContext`].

use std::fmt;
use std::future::Future;

use async_trait::async_trait;

use crate::errors::TaskError;
use crate::task::{Task, TaskContext};

/// Work performed by a task.
#[async_trait]
pub trait Work: Send + Sync + 'static {
    /// Run the body. Long-running bodies should watch `ctx.cancelled()` and
    /// return promptly once it resolves.
    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError>;

    /// Hook invoked synchronously when the owning task is cancelled, before
    /// the task's own cancellation flag is raised.
    fn on_cancel(&self, _task: &Task) {}
}

/// Work that does nothing. Used for barrier tasks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWork;

#[async_trait]
impl Work for NoopWork {
    async fn execute(&self, _ctx: TaskContext) -> Result<(), TaskError> {
        Ok(())
    }
}

/// Work backed by a closure returning a future.
///
/// ```no_run
/// use opflow::task::{FnWork, Task, TaskContext};
///
/// let task = Task::new("hello", FnWork::new(|_ctx: TaskContext| async { Ok(()) }));
/// ```
pub struct FnWork<F> {
    f: F,
}

impl<F> FnWork<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnWork<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnWork").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Work for FnWork<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError> {
        (self.f)(ctx).await
    }
}
