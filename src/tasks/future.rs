// src/tasks/future.rs

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::errors::TaskError;
use crate::task::{TaskContext, Work};

/// Lifts an external future (a network fetch, a file read) into a task.
///
/// The future is polled at most once to completion. Cancelling the task
/// drops it wherever it is suspended.
pub struct FutureWork {
    future: Mutex<Option<BoxFuture<'static, Result<(), TaskError>>>>,
}

impl FutureWork {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Self {
            future: Mutex::new(Some(future.boxed())),
        }
    }
}

impl std::fmt::Debug for FutureWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FutureWork").finish_non_exhaustive()
    }
}

#[async_trait]
impl Work for FutureWork {
    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError> {
        let future = self
            .future
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(future) = future else {
            return Err(TaskError::execution_failed("future already consumed"));
        };

        tokio::select! {
            result = future => result,
            _ = ctx.cancelled() => {
                debug!(task = %ctx.task(), "future dropped on cancellation");
                Ok(())
            }
        }
    }
}
