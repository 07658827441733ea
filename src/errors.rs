// src/errors.rs

//! Crate-wide error types.
//!
//! - [`OpflowError`] covers misuse of the structural API (wiring a task in the
//!   wrong state), configuration problems and IO.
//! - [`TaskError`] is what tasks accumulate and report at finish. Condition
//!   failures and work failures land in the same list and are indistinguishable
//!   to observers apart from their variant.

use std::time::Duration;

use thiserror::Error;

use crate::task::TaskState;

#[derive(Error, Debug)]
pub enum OpflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("task '{task}' cannot {action} while {state}")]
    InvalidState {
        task: String,
        state: TaskState,
        action: &'static str,
    },

    #[error("task '{0}' cannot depend on itself")]
    SelfDependency(String),
}

pub type Result<T> = std::result::Result<T, OpflowError>;

/// Error accumulated by a task and reported once, at finish.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// A precondition did not hold.
    #[error("condition '{condition}' failed: {detail}")]
    ConditionFailed { condition: String, detail: String },

    /// The work body itself failed.
    #[error("execution failed: {message}")]
    ExecutionFailed { message: String },

    /// The task ran past its deadline and was cancelled.
    ///
    /// This is an execution failure injected by
    /// [`TimeoutObserver`](crate::observer::TimeoutObserver) right before it
    /// cancels the task.
    #[error("execution failed: timed out after {timeout:?}")]
    TimedOut { timeout: Duration },
}

impl TaskError {
    pub fn condition_failed(condition: impl Into<String>, detail: impl Into<String>) -> Self {
        TaskError::ConditionFailed {
            condition: condition.into(),
            detail: detail.into(),
        }
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        TaskError::ExecutionFailed {
            message: message.into(),
        }
    }

    /// Name of the failing condition, if this is a condition failure.
    pub fn condition(&self) -> Option<&str> {
        match self {
            TaskError::ConditionFailed { condition, .. } => Some(condition),
            _ => None,
        }
    }

    /// `true` for failures of the work body, including timeouts.
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            TaskError::ExecutionFailed { .. } | TaskError::TimedOut { .. }
        )
    }
}

impl From<OpflowError> for TaskError {
    fn from(err: OpflowError) -> Self {
        TaskError::execution_failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_message_names_task_and_state() {
        let err = OpflowError::InvalidState {
            task: "fetch".to_string(),
            state: TaskState::Executing,
            action: "add a dependency",
        };
        assert_eq!(
            err.to_string(),
            "task 'fetch' cannot add a dependency while executing"
        );
    }

    #[test]
    fn timeouts_count_as_execution_failures() {
        let timeout = TaskError::TimedOut {
            timeout: Duration::from_secs(3),
        };
        assert!(timeout.is_execution_failure());
        assert_eq!(timeout.condition(), None);
        assert_eq!(timeout.to_string(), "execution failed: timed out after 3s");

        let cond = TaskError::condition_failed("Calendar", "denied");
        assert!(!cond.is_execution_failure());
        assert_eq!(cond.condition(), Some("Calendar"));
    }
}
