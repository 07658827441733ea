// src/queue/core.rs

//! The [`Queue`]: accepts tasks, wires them into the graph and hands their
//! lifecycle drivers to an [`Executor`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use futures::future::join_all;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::errors::{OpflowError, Result, TaskError};
use crate::observer::Observer;
use crate::queue::{ExclusivityRegistry, Executor, QueueDelegate, TokioExecutor};
use crate::task::{Task, TaskId, TaskState};

const DEFAULT_QUEUE_NAME: &str = "opflow";

/// A scheduler for [`Task`]s.
///
/// `Queue` is a cheap handle; clones share the same set of tasks.
#[derive(Clone)]
pub struct Queue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    name: String,
    registry: Arc<ExclusivityRegistry>,
    executor: Arc<dyn Executor>,
    limiter: Option<Arc<Semaphore>>,
    delegate: RwLock<Option<Arc<dyn QueueDelegate>>>,
    active: Mutex<HashMap<TaskId, Task>>,
    idle: Notify,
}

/// Builder for [`Queue`].
///
/// Defaults: the shared [`ExclusivityRegistry`], a [`TokioExecutor`] on the
/// caller's runtime, no concurrency limit and no delegate.
#[derive(Default)]
pub struct QueueBuilder {
    name: Option<String>,
    registry: Option<Arc<ExclusivityRegistry>>,
    executor: Option<Arc<dyn Executor>>,
    max_concurrent_tasks: Option<usize>,
    delegate: Option<Arc<dyn QueueDelegate>>,
}

impl QueueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the `[queue]` section of a pipeline file.
    pub fn from_config(config: &QueueConfig) -> Self {
        let mut builder = Self::new().name(config.name.clone());
        if let Some(limit) = config.max_concurrent_tasks {
            builder = builder.max_concurrent_tasks(limit);
        }
        builder
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn registry(mut self, registry: Arc<ExclusivityRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Bound how many tasks of this queue may execute at once. `0` means
    /// unbounded.
    pub fn max_concurrent_tasks(mut self, limit: usize) -> Self {
        self.max_concurrent_tasks = (limit > 0).then_some(limit);
        self
    }

    pub fn delegate(mut self, delegate: Arc<dyn QueueDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn build(self) -> Queue {
        Queue {
            inner: Arc::new(QueueInner {
                name: self.name.unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string()),
                registry: self.registry.unwrap_or_else(ExclusivityRegistry::shared),
                executor: self
                    .executor
                    .unwrap_or_else(|| Arc::new(TokioExecutor::new()) as Arc<dyn Executor>),
                limiter: self
                    .max_concurrent_tasks
                    .map(|limit| Arc::new(Semaphore::new(limit))),
                delegate: RwLock::new(self.delegate),
                active: Mutex::new(HashMap::new()),
                idle: Notify::new(),
            }),
        }
    }
}

impl Queue {
    /// A queue with default settings. See [`QueueBuilder`].
    pub fn new() -> Self {
        QueueBuilder::new().build()
    }

    pub fn builder() -> QueueBuilder {
        QueueBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn registry(&self) -> &Arc<ExclusivityRegistry> {
        &self.inner.registry
    }

    pub fn set_delegate(&self, delegate: Option<Arc<dyn QueueDelegate>>) {
        *self
            .inner
            .delegate
            .write()
            .unwrap_or_else(PoisonError::into_inner) = delegate;
    }

    /// Submit a task.
    ///
    /// All structural work happens synchronously on the caller:
    ///
    /// 1. attach the queue's own observer (delegate forwarding, resubmission
    ///    of produced tasks);
    /// 2. turn every condition-supplied prerequisite into a dependency and
    ///    submit it as well;
    /// 3. register exclusive categories, which may chain the task behind
    ///    earlier ones;
    /// 4. mark the task pending, tell the delegate, spawn its driver.
    ///
    /// Only `Initialized` tasks can be submitted.
    pub fn submit(&self, task: Task) -> Result<()> {
        let state = task.state();
        if state != TaskState::Initialized {
            return Err(OpflowError::InvalidState {
                task: task.name().to_string(),
                state,
                action: "be submitted",
            });
        }

        task.attach_observer(Arc::new(QueueObserver {
            queue: self.clone(),
        }))?;

        for prerequisite in task.condition_dependencies() {
            task.add_dependency(&prerequisite)?;
            if prerequisite.state() == TaskState::Initialized {
                debug!(task = %task, prerequisite = %prerequisite, "submitting condition prerequisite");
                self.submit(prerequisite)?;
            }
        }

        let categories = task.mutual_exclusion_categories();
        if !categories.is_empty() {
            self.inner.registry.register(&task, &categories)?;
            task.attach_observer(Arc::new(ExclusivityObserver {
                registry: Arc::clone(&self.inner.registry),
                categories,
            }))?;
        }

        task.will_enqueue()?;
        self.active().insert(task.id(), task.clone());

        if let Some(delegate) = self.delegate() {
            delegate.will_add(self, &task);
        }

        debug!(queue = %self.inner.name, task = %task, "task submitted");
        let limiter = self.inner.limiter.clone();
        self.inner.executor.spawn(Box::pin(task.drive(limiter)));
        Ok(())
    }

    /// Submit `tasks` in order. With `wait_until_finished`, resolves only
    /// once every one of them (not their injected prerequisites) finished.
    pub async fn submit_batch(
        &self,
        tasks: impl IntoIterator<Item = Task>,
        wait_until_finished: bool,
    ) -> Result<()> {
        let tasks: Vec<Task> = tasks.into_iter().collect();
        for task in &tasks {
            self.submit(task.clone())?;
        }
        if wait_until_finished {
            join_all(tasks.iter().map(Task::wait_until_finished)).await;
        }
        Ok(())
    }

    /// Cancel every unfinished task in this queue.
    pub fn cancel_all(&self) {
        let tasks: Vec<Task> = self.active().values().cloned().collect();
        debug!(queue = %self.inner.name, count = tasks.len(), "cancelling all tasks");
        for task in tasks {
            task.cancel();
        }
    }

    /// Number of submitted tasks that have not finished yet.
    pub fn task_count(&self) -> usize {
        self.active().len()
    }

    pub fn is_idle(&self) -> bool {
        self.task_count() == 0
    }

    /// Resolves once no submitted task is left unfinished.
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn delegate(&self) -> Option<Arc<dyn QueueDelegate>> {
        self.inner
            .delegate
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn active(&self) -> MutexGuard<'_, HashMap<TaskId, Task>> {
        self.inner.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.inner.name)
            .field("tasks", &self.task_count())
            .finish_non_exhaustive()
    }
}

/// Attached to every submitted task. Holds a strong handle to the queue;
/// the cycle through `active` is broken when the task finishes and drops
/// its observers.
struct QueueObserver {
    queue: Queue,
}

impl Observer for QueueObserver {
    fn on_produce(&self, task: &Task, produced: &Task) {
        if let Err(err) = self.queue.submit(produced.clone()) {
            warn!(task = %task, produced = %produced, error = %err, "could not submit produced task");
        }
    }

    fn on_finish(&self, task: &Task, errors: &[TaskError]) {
        if let Some(delegate) = self.queue.delegate() {
            delegate.did_finish(&self.queue, task, errors);
        }

        let now_idle = {
            let mut active = self.queue.active();
            active.remove(&task.id());
            active.is_empty()
        };
        if now_idle {
            self.queue.inner.idle.notify_waiters();
        }
    }
}

/// Removes a finished task from its exclusivity chains.
struct ExclusivityObserver {
    registry: Arc<ExclusivityRegistry>,
    categories: Vec<String>,
}

impl Observer for ExclusivityObserver {
    fn on_finish(&self, task: &Task, _errors: &[TaskError]) {
        self.registry.deregister(task, &self.categories);
    }
}
