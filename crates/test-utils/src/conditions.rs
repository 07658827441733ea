use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use opflow::condition::{Condition, ConditionResult};
use opflow::errors::TaskError;
use opflow::task::{Task, TaskState};

/// Always fails with a fixed detail.
pub struct FailingCondition {
    name: String,
    detail: String,
}

impl FailingCondition {
    pub fn new(name: &str, detail: &str) -> Self {
        Self {
            name: name.to_string(),
            detail: detail.to_string(),
        }
    }
}

#[async_trait]
impl Condition for FailingCondition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, _task: &Task) -> ConditionResult {
        ConditionResult::Failed(TaskError::condition_failed(&self.name, &self.detail))
    }
}

/// Satisfied condition that records, at evaluation time, the state of every
/// dependency of the evaluated task and how often it was evaluated.
#[derive(Clone, Default)]
pub struct ProbeCondition {
    evaluations: Arc<AtomicUsize>,
    seen_dependency_states: Arc<Mutex<Vec<TaskState>>>,
}

impl ProbeCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub fn seen_dependency_states(&self) -> Vec<TaskState> {
        self.seen_dependency_states.lock().unwrap().clone()
    }
}

#[async_trait]
impl Condition for ProbeCondition {
    fn name(&self) -> &str {
        "Probe"
    }

    async fn evaluate(&self, task: &Task) -> ConditionResult {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        let states = task.dependencies().iter().map(Task::state).collect::<Vec<_>>();
        self.seen_dependency_states.lock().unwrap().extend(states);
        ConditionResult::Satisfied
    }
}

/// Condition that supplies a fixed prerequisite task at submission.
pub struct PrerequisiteCondition {
    prerequisite: Task,
}

impl PrerequisiteCondition {
    pub fn new(prerequisite: Task) -> Self {
        Self { prerequisite }
    }
}

#[async_trait]
impl Condition for PrerequisiteCondition {
    fn name(&self) -> &str {
        "Prerequisite"
    }

    fn dependency_for(&self, _task: &Task) -> Option<Task> {
        Some(self.prerequisite.clone())
    }

    async fn evaluate(&self, _task: &Task) -> ConditionResult {
        if self.prerequisite.is_finished() {
            ConditionResult::Satisfied
        } else {
            ConditionResult::Failed(TaskError::condition_failed(
                "Prerequisite",
                "prerequisite not finished",
            ))
        }
    }
}
