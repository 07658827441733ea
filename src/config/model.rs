// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Pipeline file exactly as read from TOML, before validation.
///
/// ```toml
/// [queue]
/// name = "main"
/// max_concurrent_tasks = 4
///
/// [task.fetch]
/// delay_ms = 200
/// exclusive = ["network"]
/// timeout_ms = 1000
///
/// [task.parse]
/// after = ["fetch"]
/// require_uncancelled_dependencies = true
/// ```
///
/// All sections are optional at this stage; validation decides what is
/// acceptable (see [`ConfigFile`]).
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub queue: QueueConfig,

    /// All tasks from `[task.<name>]`, keyed by name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated pipeline file.
///
/// Only obtainable through `ConfigFile::try_from(raw)`, which checks that
/// the task graph is non-empty, references only known tasks and is acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub queue: QueueConfig,
    pub task: BTreeMap<String, TaskConfig>,
    order: Vec<String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        queue: QueueConfig,
        task: BTreeMap<String, TaskConfig>,
        order: Vec<String>,
    ) -> Self {
        Self { queue, task, order }
    }

    /// Task names in a topological order of their `after` edges.
    pub fn order(&self) -> &[String] {
        &self.order
    }
}

/// `[queue]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_name")]
    pub name: String,

    /// Upper bound on concurrently executing tasks. Unbounded if absent.
    #[serde(default)]
    pub max_concurrent_tasks: Option<usize>,
}

fn default_queue_name() -> String {
    "main".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_queue_name(),
            max_concurrent_tasks: None,
        }
    }
}

/// `[task.<name>]` section.
///
/// Each task is a timed step: it waits `delay_ms` (honouring cancellation)
/// and then succeeds, or fails with `fail` if set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// This task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub delay_ms: u64,

    /// Mutual-exclusion tags. Tasks sharing a tag never run concurrently.
    #[serde(default)]
    pub exclusive: Vec<String>,

    /// Cancel the task if it is still running after this many milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Skip this task if any of its `after` dependencies was cancelled.
    #[serde(default)]
    pub require_uncancelled_dependencies: bool,

    /// Make the step fail with this message once its delay elapsed.
    #[serde(default)]
    pub fail: Option<String>,
}

impl TaskConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
