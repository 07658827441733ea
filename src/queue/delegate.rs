// src/queue/delegate.rs

use crate::errors::TaskError;
use crate::queue::Queue;
use crate::task::Task;

/// Per-queue hooks around submission and completion.
///
/// Both hooks are optional. They run synchronously: `will_add` on the
/// submitting caller (after the task is wired into the graph, before it is
/// handed to the executor) and `did_finish` on the finishing task's driver.
pub trait QueueDelegate: Send + Sync + 'static {
    fn will_add(&self, _queue: &Queue, _task: &Task) {}

    fn did_finish(&self, _queue: &Queue, _task: &Task, _errors: &[TaskError]) {}
}
