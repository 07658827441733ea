// src/condition/no_cancelled.rs

use async_trait::async_trait;

use crate::condition::{Condition, ConditionResult};
use crate::errors::TaskError;
use crate::task::Task;

/// Fails if any dependency of the task ended cancelled.
///
/// Finishing a dependency (with or without errors) never blocks a dependent
/// on its own; attach this condition to opt into failure propagation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCancelledDependencies;

impl NoCancelledDependencies {
    pub const NAME: &'static str = "NoCancelledDependencies";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Condition for NoCancelledDependencies {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn evaluate(&self, task: &Task) -> ConditionResult {
        let cancelled: Vec<String> = task
            .dependencies()
            .iter()
            .filter(|dep| dep.is_cancelled())
            .map(|dep| dep.name().to_string())
            .collect();

        if cancelled.is_empty() {
            ConditionResult::Satisfied
        } else {
            ConditionResult::Failed(TaskError::condition_failed(
                Self::NAME,
                format!("cancelled dependencies: {}", cancelled.join(", ")),
            ))
        }
    }
}
