#![allow(dead_code)]

use std::collections::BTreeMap;

use opflow::config::{ConfigFile, QueueConfig, RawConfigFile, TaskConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                queue: QueueConfig::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn queue_name(mut self, name: &str) -> Self {
        self.config.queue.name = name.to_string();
        self
    }

    pub fn max_concurrent_tasks(mut self, limit: usize) -> Self {
        self.config.queue.max_concurrent_tasks = Some(limit);
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.task.delay_ms = delay_ms;
        self
    }

    pub fn exclusive(mut self, tag: &str) -> Self {
        self.task.exclusive.push(tag.to_string());
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.task.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn require_uncancelled_dependencies(mut self) -> Self {
        self.task.require_uncancelled_dependencies = true;
        self
    }

    pub fn fail(mut self, message: &str) -> Self {
        self.task.fail = Some(message.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

impl Default for TaskConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
