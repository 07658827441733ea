// src/condition/exclusive.rs

use async_trait::async_trait;

use crate::condition::{Condition, ConditionResult};
use crate::task::Task;

/// Tag used for anything that presents UI to the user (alerts, permission
/// prompts). Only one such task runs at a time.
pub const ALERT_TAG: &str = "Alert";

/// Marks a task as mutually exclusive with every other task carrying the
/// same tag. Always satisfied; the queue turns the tag into dependency edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutuallyExclusive {
    category: String,
}

impl MutuallyExclusive {
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self {
            category: format!("MutuallyExclusive<{}>", tag.as_ref()),
        }
    }

    /// The UI presentation category.
    pub fn alert() -> Self {
        Self::new(ALERT_TAG)
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

#[async_trait]
impl Condition for MutuallyExclusive {
    fn name(&self) -> &str {
        &self.category
    }

    fn is_mutually_exclusive(&self) -> bool {
        true
    }

    async fn evaluate(&self, _task: &Task) -> ConditionResult {
        ConditionResult::Satisfied
    }
}
