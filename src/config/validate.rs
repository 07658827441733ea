// src/config/validate.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig};
use crate::errors::{OpflowError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = OpflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let order = validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.queue, raw.task, order))
    }
}

/// Check a raw config and return its tasks in topological order.
fn validate_raw_config(cfg: &RawConfigFile) -> Result<Vec<String>> {
    ensure_has_tasks(cfg)?;
    validate_queue_config(cfg)?;
    validate_task_settings(cfg)?;
    validate_task_dependencies(cfg)?;
    topological_order(&cfg.task)
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(OpflowError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_queue_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.queue.name.trim().is_empty() {
        return Err(OpflowError::ConfigError(
            "[queue].name must not be empty".to_string(),
        ));
    }
    if cfg.queue.max_concurrent_tasks == Some(0) {
        return Err(OpflowError::ConfigError(
            "[queue].max_concurrent_tasks must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_settings(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.timeout_ms == Some(0) {
            return Err(OpflowError::ConfigError(format!(
                "task '{}' has timeout_ms = 0; it must be >= 1",
                name
            )));
        }
        if let Some(tag) = task.exclusive.iter().find(|tag| tag.trim().is_empty()) {
            return Err(OpflowError::ConfigError(format!(
                "task '{}' has an empty exclusive tag ({:?})",
                name, tag
            )));
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(OpflowError::TaskNotFound(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(OpflowError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

/// Edge direction is dep -> task: for `[task.B] after = ["A"]` we add A -> B.
fn topological_order(tasks: &BTreeMap<String, TaskConfig>) -> Result<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in tasks.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(OpflowError::DagCycle(format!(
            "cycle detected in task DAG involving task '{}'",
            cycle.node_id()
        ))),
    }
}
