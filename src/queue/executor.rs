// src/queue/executor.rs

//! Pluggable executor abstraction.
//!
//! A queue never polls task futures itself: once a task is wired into the
//! graph, its lifecycle driver is handed to an [`Executor`].
//!
//! - [`TokioExecutor`] is the default and spawns onto a tokio runtime.
//! - Tests can provide their own `Executor` that, for example, counts spawns
//!   or runs drivers on a dedicated runtime.

use std::future::Future;
use std::pin::Pin;

use tokio::runtime::Handle;

/// A task's lifecycle driver, ready to be polled to completion.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Trait abstracting where lifecycle drivers run.
pub trait Executor: Send + Sync {
    /// Start polling `future`. Must not block.
    fn spawn(&self, future: TaskFuture);
}

/// Executor backed by tokio.
///
/// Without a handle it spawns onto the runtime of the caller, so `submit`
/// must then be called from within a runtime.
#[derive(Debug, Clone, Default)]
pub struct TokioExecutor {
    handle: Option<Handle>,
}

impl TokioExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn onto a specific runtime regardless of the caller's context.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

impl Executor for TokioExecutor {
    fn spawn(&self, future: TaskFuture) {
        match &self.handle {
            Some(handle) => {
                handle.spawn(future);
            }
            None => {
                tokio::spawn(future);
            }
        }
    }
}
