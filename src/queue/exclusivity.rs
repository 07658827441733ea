// src/queue/exclusivity.rs

//! Mutual exclusion by dependency chaining.
//!
//! Each category maps to the ordered list of unfinished tasks registered
//! under it. Registering a task makes it depend on the current tail of every
//! chain it joins, so tasks in one category run strictly one after another,
//! in registration order, without any lock being held while they execute.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::trace;

use crate::errors::Result;
use crate::task::{Task, TaskId};

#[derive(Debug, Default)]
pub struct ExclusivityRegistry {
    categories: Mutex<HashMap<String, Vec<Task>>>,
}

static SHARED: OnceLock<Arc<ExclusivityRegistry>> = OnceLock::new();

impl ExclusivityRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Process-wide registry used by queues that were not given one.
    ///
    /// Initialised on first use; every caller gets the same instance.
    pub fn shared() -> Arc<Self> {
        Arc::clone(SHARED.get_or_init(ExclusivityRegistry::new))
    }

    /// Append `task` to each category chain, making it depend on the
    /// previous tail of that chain.
    ///
    /// The whole registration happens in one critical section, so two
    /// concurrent registrations in the same category are totally ordered.
    pub fn register(&self, task: &Task, categories: &[String]) -> Result<()> {
        let mut map = self.lock();
        for category in categories {
            let chain = map.entry(category.clone()).or_default();
            if let Some(previous) = chain.last().filter(|prev| *prev != task) {
                task.add_dependency(previous)?;
            }
            trace!(task = %task, category = %category, position = chain.len(), "registered exclusive task");
            chain.push(task.clone());
        }
        Ok(())
    }

    /// Remove `task` from each category chain. Empty chains are dropped.
    pub fn deregister(&self, task: &Task, categories: &[String]) {
        let mut map = self.lock();
        for category in categories {
            if let Some(chain) = map.get_mut(category) {
                chain.retain(|t| t != task);
                if chain.is_empty() {
                    map.remove(category);
                }
            }
        }
    }

    /// Ids of the tasks currently queued under `category`, oldest first.
    pub fn chain(&self, category: &str) -> Vec<TaskId> {
        self.lock()
            .get(category)
            .map(|chain| chain.iter().map(Task::id).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Task>>> {
        self.categories.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
