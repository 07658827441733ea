// src/observer/mod.rs

//! Lifecycle observers.
//!
//! An [`Observer`] is a spectator attached to a single task. It is told when
//! the task starts executing, whenever it produces a new task, and when it
//! finishes (always exactly once, whatever the outcome).
//!
//! ```text
//! Task ──► on_start ──► on_produce* ──► on_finish(errors)
//!   │                                        ▲
//!   └── conditions failed / cancelled ───────┘   (on_start skipped)
//! ```
//!
//! Hooks run synchronously on the task's driver with no task lock held; an
//! observer that needs to wait should spawn.

use std::sync::Arc;

use crate::errors::TaskError;
use crate::task::Task;

pub mod activity;
pub mod background;
pub mod block;
pub mod log;
pub mod timeout;

pub use activity::{ActivityIndicator, ActivityObserver};
pub use background::{AppPhase, BackgroundObserver, BackgroundTaskProvider, BackgroundToken};
pub use block::BlockObserver;
pub use log::LogObserver;
pub use timeout::TimeoutObserver;

/// Receives lifecycle notifications for a task.
pub trait Observer: Send + Sync + 'static {
    /// The task is about to execute its work.
    fn on_start(&self, _task: &Task) {}

    /// The task produced `produced` for scheduling.
    fn on_produce(&self, _task: &Task, _produced: &Task) {}

    /// The task finished with the given accumulated errors.
    fn on_finish(&self, _task: &Task, _errors: &[TaskError]) {}
}

impl<O: Observer + ?Sized> Observer for Arc<O> {
    fn on_start(&self, task: &Task) {
        (**self).on_start(task);
    }

    fn on_produce(&self, task: &Task, produced: &Task) {
        (**self).on_produce(task, produced);
    }

    fn on_finish(&self, task: &Task, errors: &[TaskError]) {
        (**self).on_finish(task, errors);
    }
}
