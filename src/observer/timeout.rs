// src/observer/timeout.rs

use std::time::Duration;

use tracing::warn;

use crate::errors::TaskError;
use crate::observer::Observer;
use crate::task::Task;

/// Cancels a task that is still running `timeout` after it started,
/// recording [`TaskError::TimedOut`] first.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutObserver {
    timeout: Duration,
}

impl TimeoutObserver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Observer for TimeoutObserver {
    fn on_start(&self, task: &Task) {
        let task = task.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            tokio::select! {
                _ = task.wait_until_finished() => {}
                _ = tokio::time::sleep(timeout) => {
                    if !task.is_finished() && !task.is_cancelled() {
                        warn!(task = %task, ?timeout, "task timed out; cancelling");
                        task.cancel_with_error(TaskError::TimedOut { timeout });
                    }
                }
            }
        });
    }
}
