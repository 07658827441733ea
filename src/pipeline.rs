// src/pipeline.rs

//! Turn a validated pipeline file into tasks and run them on a queue.
//!
//! Every `[task.<name>]` becomes one [`Task`] whose body waits `delay_ms`
//! and then succeeds (or fails with `fail`). `after` edges become task
//! dependencies, `exclusive` tags become [`MutuallyExclusive`] conditions,
//! `require_uncancelled_dependencies` adds [`NoCancelledDependencies`] and
//! `timeout_ms` attaches a [`TimeoutObserver`].

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::condition::{MutuallyExclusive, NoCancelledDependencies};
use crate::config::{ConfigFile, TaskConfig};
use crate::errors::{OpflowError, Result, TaskError};
use crate::observer::{LogObserver, TimeoutObserver};
use crate::queue::Queue;
use crate::task::{Task, TaskContext, TaskOutcome, Work};
use crate::tasks::DelayWork;

/// Body of a configured step.
#[derive(Debug, Clone)]
struct StepWork {
    delay: DelayWork,
    fail: Option<String>,
}

#[async_trait]
impl Work for StepWork {
    async fn execute(&self, ctx: TaskContext) -> std::result::Result<(), TaskError> {
        self.delay.execute(ctx.clone()).await?;
        if ctx.is_cancelled() {
            return Ok(());
        }
        match &self.fail {
            Some(message) => Err(TaskError::execution_failed(message.clone())),
            None => Ok(()),
        }
    }
}

/// Tasks built from a [`ConfigFile`], in submission order.
#[derive(Debug)]
pub struct Pipeline {
    tasks: Vec<(String, Task)>,
}

impl Pipeline {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut by_name: HashMap<&str, Task> = HashMap::new();
        let mut tasks = Vec::with_capacity(cfg.order().len());

        for name in cfg.order() {
            let task_cfg = cfg
                .task
                .get(name)
                .ok_or_else(|| OpflowError::TaskNotFound(name.clone()))?;
            let task = build_task(name, task_cfg)?;

            for dep in &task_cfg.after {
                let dep_task = by_name
                    .get(dep.as_str())
                    .ok_or_else(|| OpflowError::TaskNotFound(dep.clone()))?;
                task.add_dependency(dep_task)?;
            }

            by_name.insert(name.as_str(), task.clone());
            tasks.push((name.clone(), task));
        }

        Ok(Self { tasks })
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().map(|(_, task)| task)
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|(task_name, _)| task_name == name)
            .map(|(_, task)| task)
    }

    /// Submit every task in topological order and wait for all of them.
    ///
    /// Topological submission keeps exclusivity chains consistent with the
    /// `after` edges, so a chain never makes a task wait for one of its own
    /// dependents.
    pub async fn run(&self, queue: &Queue) -> Result<PipelineReport> {
        info!(queue = %queue.name(), tasks = self.tasks.len(), "running pipeline");
        queue.submit_batch(self.tasks().cloned(), true).await?;

        let entries = self
            .tasks
            .iter()
            .map(|(name, task)| {
                let outcome = task
                    .outcome()
                    .unwrap_or_else(|| TaskOutcome::Failed(task.errors()));
                (name.clone(), outcome)
            })
            .collect();
        Ok(PipelineReport { entries })
    }
}

fn build_task(name: &str, cfg: &TaskConfig) -> Result<Task> {
    let task = Task::new(
        name,
        StepWork {
            delay: DelayWork::interval(cfg.delay()),
            fail: cfg.fail.clone(),
        },
    );

    for tag in &cfg.exclusive {
        task.add_condition(MutuallyExclusive::new(tag))?;
    }
    if cfg.require_uncancelled_dependencies {
        task.add_condition(NoCancelledDependencies::new())?;
    }

    task.add_observer(LogObserver)?;
    if let Some(timeout) = cfg.timeout() {
        task.add_observer(TimeoutObserver::new(timeout))?;
    }

    debug!(task = %task, after = ?cfg.after, exclusive = ?cfg.exclusive, "built pipeline task");
    Ok(task)
}

/// Per-task outcomes of a pipeline run, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub entries: Vec<(String, TaskOutcome)>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.entries.iter().all(|(_, outcome)| outcome.is_success())
    }

    pub fn outcome(&self, name: &str) -> Option<&TaskOutcome> {
        self.entries
            .iter()
            .find(|(task, _)| task == name)
            .map(|(_, outcome)| outcome)
    }

    /// Names of tasks that did not succeed.
    pub fn unsuccessful(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, outcome) in &self.entries {
            match outcome {
                TaskOutcome::Succeeded => writeln!(f, "  ok        {name}")?,
                TaskOutcome::Failed(errors) => {
                    writeln!(f, "  failed    {name}")?;
                    for error in errors {
                        writeln!(f, "              {error}")?;
                    }
                }
                TaskOutcome::Cancelled(errors) => {
                    writeln!(f, "  cancelled {name}")?;
                    for error in errors {
                        writeln!(f, "              {error}")?;
                    }
                }
            }
        }
        Ok(())
    }
}
