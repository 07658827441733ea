// src/task/state.rs

//! Task lifecycle states and outcomes.

use std::fmt;

use crate::errors::TaskError;

/// Lifecycle state of a [`Task`](crate::task::Task).
///
/// States are ordered: a task only ever moves forward through this list,
/// possibly skipping states (e.g. a task whose conditions fail goes straight
/// from `EvaluatingConditions` to `Finishing`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskState {
    /// Created, not yet submitted to a queue.
    Initialized,
    /// Submitted; waiting for dependencies to finish.
    Pending,
    /// All dependencies finished; conditions are being evaluated.
    EvaluatingConditions,
    /// Conditions satisfied; waiting for an execution slot.
    Ready,
    /// Work body is running.
    Executing,
    /// Finish has begun; observers are being notified.
    Finishing,
    /// Terminal.
    Finished,
}

impl TaskState {
    pub fn is_finished(self) -> bool {
        self == TaskState::Finished
    }

    /// Whether the structural graph (dependencies, conditions) may still be
    /// modified in this state.
    pub fn accepts_dependencies(self) -> bool {
        self <= TaskState::Pending
    }

    /// Legal forward transitions.
    pub(crate) fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Initialized, Pending)
                | (Pending, EvaluatingConditions)
                | (EvaluatingConditions, Ready)
                | (Ready, Executing)
                | (Finishing, Finished)
        ) || (next == Finishing && self < Finishing)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Initialized => "initialized",
            TaskState::Pending => "pending",
            TaskState::EvaluatingConditions => "evaluating conditions",
            TaskState::Ready => "ready",
            TaskState::Executing => "executing",
            TaskState::Finishing => "finishing",
            TaskState::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Summary of how a finished task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Finished without errors and without being cancelled.
    Succeeded,
    /// Finished with errors (condition or execution failures).
    Failed(Vec<TaskError>),
    /// Cancelled; carries whatever errors were accumulated.
    Cancelled(Vec<TaskError>),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded)
    }
}
