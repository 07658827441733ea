// src/observer/log.rs

use tracing::{debug, info, warn};

use crate::errors::TaskError;
use crate::observer::Observer;
use crate::task::Task;

/// Emits a `tracing` event for every lifecycle hook.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_start(&self, task: &Task) {
        info!(task = %task.name(), id = %task.id(), "task started");
    }

    fn on_produce(&self, task: &Task, produced: &Task) {
        debug!(task = %task.name(), produced = %produced, "task produced a new task");
    }

    fn on_finish(&self, task: &Task, errors: &[TaskError]) {
        if errors.is_empty() && !task.is_cancelled() {
            info!(task = %task.name(), id = %task.id(), "task finished");
        } else {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            warn!(
                task = %task.name(),
                id = %task.id(),
                cancelled = task.is_cancelled(),
                errors = ?messages,
                "task finished unsuccessfully"
            );
        }
    }
}
