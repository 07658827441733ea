#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opflow::errors::TaskError;
use opflow::queue::{ExclusivityRegistry, Queue};
use opflow::task::{Task, TaskContext};
use opflow::tasks::DelayWork;

pub use opflow_test_utils::init_tracing;

/// Queue with its own exclusivity registry, so tests never share chains.
pub fn isolated_queue(name: &str) -> Queue {
    Queue::builder()
        .name(name)
        .registry(ExclusivityRegistry::new())
        .build()
}

/// Task that waits `ms` milliseconds.
pub fn delay_task(name: &str, ms: u64) -> Task {
    Task::new(name, DelayWork::interval(Duration::from_millis(ms)))
}

/// Task that counts its executions and then sleeps `ms`.
pub fn counting_task(name: &str, ms: u64, runs: &Arc<AtomicUsize>) -> Task {
    let runs = Arc::clone(runs);
    Task::from_fn(name, move |ctx: TaskContext| {
        let runs = Arc::clone(&runs);
        async move {
            runs.fetch_add(1, Ordering::SeqCst);
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
                _ = ctx.cancelled() => {}
            }
            Ok(())
        }
    })
}

/// Task that fails with `message` immediately.
pub fn failing_task(name: &str, message: &str) -> Task {
    let message = message.to_string();
    Task::from_fn(name, move |_ctx: TaskContext| {
        let message = message.clone();
        async move { Err(TaskError::execution_failed(message)) }
    })
}
