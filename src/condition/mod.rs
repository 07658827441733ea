// src/condition/mod.rs

//! Preconditions gating task execution.
//!
//! A [`Condition`] is consulted twice:
//!
//! 1. at submission, [`Condition::dependency_for`] may hand the queue an
//!    extra prerequisite task (e.g. "ask for calendar access") which becomes
//!    a dependency of the task and is submitted alongside it;
//! 2. once every dependency finished, [`Condition::evaluate`] decides whether
//!    the task may run.
//!
//! Conditions flagged [`Condition::is_mutually_exclusive`] additionally put
//! the task into the exclusivity category named by [`Condition::name`].

use async_trait::async_trait;

use crate::errors::TaskError;
use crate::task::Task;

pub mod exclusive;
pub mod no_cancelled;
pub mod permission;

pub use exclusive::MutuallyExclusive;
pub use no_cancelled::NoCancelledDependencies;
pub use permission::{PermissionCondition, PermissionProvider, PermissionStatus};

/// Result of evaluating a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionResult {
    Satisfied,
    Failed(TaskError),
}

impl ConditionResult {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, ConditionResult::Satisfied)
    }
}

/// A requirement that must hold before a task runs.
#[async_trait]
pub trait Condition: Send + Sync + 'static {
    /// Name of the requirement. For exclusive conditions this is also the
    /// exclusivity category key.
    fn name(&self) -> &str;

    /// Whether tasks carrying this condition must run one at a time.
    fn is_mutually_exclusive(&self) -> bool {
        false
    }

    /// Optional prerequisite task. Called once, at submission, by the queue.
    fn dependency_for(&self, _task: &Task) -> Option<Task> {
        None
    }

    /// Decide whether `task` may run. Called once, after all of the task's
    /// dependencies finished.
    async fn evaluate(&self, task: &Task) -> ConditionResult;
}
