// src/tasks/group.rs

//! Composite tasks.
//!
//! A [`Group`] is a task that runs a nested graph of child tasks on a private
//! [`Queue`]. Two internal no-op barriers frame the children:
//!
//! ```text
//!            ┌──► child ──┐
//!  starter ──┼──► child ──┼──► finisher ──► group finishes
//!            └──► child ──┘
//! ```
//!
//! The private queue's delegate wires every task it sees (children, tasks
//! they produce, prerequisites injected by their conditions) between the two
//! barriers, and collects their errors as they finish.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::{OpflowError, Result, TaskError};
use crate::queue::{ExclusivityRegistry, Queue, QueueDelegate};
use crate::task::{NoopWork, Task, TaskContext, TaskState, Work};

#[derive(Default)]
struct GroupState {
    started: bool,
    cancelled: bool,
    /// Children added before the group started.
    held: Vec<Task>,
    /// Every task submitted to the private queue except the finisher.
    members: Vec<Task>,
    errors: Vec<TaskError>,
    /// Set once the children's errors were handed to the group task.
    collected: bool,
}

struct GroupShared {
    queue: Queue,
    starter: Task,
    finisher: Task,
    state: Mutex<GroupState>,
}

impl GroupShared {
    fn state(&self) -> MutexGuard<'_, GroupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_barrier(&self, task: &Task) -> bool {
        *task == self.starter || *task == self.finisher
    }
}

/// A task made of child tasks.
///
/// Submit [`Group::task`] to a queue like any other task. The group finishes
/// once every child (and everything the children produced) finished, with
/// the children's errors concatenated in completion order.
#[derive(Clone)]
pub struct Group {
    task: Task,
    shared: Arc<GroupShared>,
}

impl Group {
    /// An empty group using the shared exclusivity registry.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_registry(name, ExclusivityRegistry::shared())
    }

    pub fn with_children(name: impl Into<String>, children: impl IntoIterator<Item = Task>) -> Self {
        let group = Self::new(name);
        group.shared.state().held.extend(children);
        group
    }

    /// An empty group whose private queue uses `registry`.
    pub fn with_registry(name: impl Into<String>, registry: Arc<ExclusivityRegistry>) -> Self {
        let name = name.into();
        let shared = Arc::new_cyclic(|weak: &Weak<GroupShared>| GroupShared {
            queue: Queue::builder()
                .name(format!("{name}.children"))
                .registry(registry)
                .delegate(Arc::new(GroupDelegate {
                    group: weak.clone(),
                }))
                .build(),
            starter: Task::new(format!("{name}.start"), NoopWork),
            finisher: Task::new(format!("{name}.finish"), NoopWork),
            state: Mutex::new(GroupState::default()),
        });
        let task = Task::new(
            name,
            GroupWork {
                shared: Arc::clone(&shared),
            },
        );
        Self { task, shared }
    }

    /// The schedulable task representing this group.
    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn is_started(&self) -> bool {
        self.shared.state().started
    }

    /// Add a child.
    ///
    /// Before the group starts the child is held back; afterwards it is
    /// submitted to the private queue right away. Fails once the group (or
    /// its finishing barrier) is past the point of accepting new work, in
    /// which case the child is left untouched.
    pub fn add_child(&self, child: Task) -> Result<()> {
        let state = self.task.state();
        if state >= TaskState::Finishing {
            return Err(self.rejected(state, "add a child"));
        }

        {
            let mut group = self.shared.state();
            if !group.started {
                if group.cancelled {
                    drop(group);
                    debug!(group = %self.task, child = %child, "group cancelled; child cancelled");
                    child.cancel();
                    child.finish(Vec::new());
                } else {
                    group.held.push(child);
                }
                return Ok(());
            }
        }

        let child_state = child.state();
        if child_state != TaskState::Initialized {
            return Err(OpflowError::InvalidState {
                task: child.name().to_string(),
                state: child_state,
                action: "be submitted",
            });
        }
        // The finisher's own lock makes this fail once it left `Pending`;
        // once it succeeds the group cannot finish ahead of the child.
        if self.shared.finisher.add_dependency(&child).is_err() {
            return Err(self.rejected(TaskState::Finishing, "add a child"));
        }
        self.shared.queue.submit(child)
    }

    /// Add an error to the group's own error list.
    ///
    /// Fails once the children's errors were collected into the group task.
    pub fn aggregate_error(&self, error: TaskError) -> Result<()> {
        let mut group = self.shared.state();
        if group.collected {
            return Err(self.rejected(self.task.state(), "aggregate an error"));
        }
        group.errors.push(error);
        Ok(())
    }

    fn rejected(&self, state: TaskState, action: &'static str) -> OpflowError {
        OpflowError::InvalidState {
            task: self.task.name().to_string(),
            state,
            action,
        }
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group").field("task", &self.task).finish_non_exhaustive()
    }
}

struct GroupWork {
    shared: Arc<GroupShared>,
}

#[async_trait]
impl Work for GroupWork {
    async fn execute(&self, ctx: TaskContext) -> std::result::Result<(), TaskError> {
        let shared = &self.shared;
        let held = {
            let mut state = shared.state();
            state.started = true;
            std::mem::take(&mut state.held)
        };
        debug!(group = %ctx.task(), children = held.len(), "group starting");

        shared.queue.submit(shared.starter.clone())?;
        for child in held {
            if let Err(err) = shared.queue.submit(child) {
                warn!(group = %ctx.task(), error = %err, "could not submit child");
                ctx.record_error(err.into());
            }
        }
        shared.queue.submit(shared.finisher.clone())?;

        shared.finisher.wait_until_finished().await;

        let errors = {
            let mut state = shared.state();
            state.collected = true;
            std::mem::take(&mut state.errors)
        };
        debug!(group = %ctx.task(), errors = errors.len(), "group children finished");
        for error in errors {
            ctx.record_error(error);
        }
        Ok(())
    }

    fn on_cancel(&self, task: &Task) {
        let (members, held) = {
            let mut state = self.shared.state();
            state.cancelled = true;
            (state.members.clone(), std::mem::take(&mut state.held))
        };
        debug!(group = %task, members = members.len(), held = held.len(), "cancelling children");

        for member in members {
            member.cancel();
        }
        // Never submitted, so nothing else would ever finish them.
        for child in held {
            child.cancel();
            child.finish(Vec::new());
        }
    }
}

/// Delegate of the private queue. Keeps every task between the barriers.
struct GroupDelegate {
    group: Weak<GroupShared>,
}

impl QueueDelegate for GroupDelegate {
    fn will_add(&self, _queue: &Queue, task: &Task) {
        let Some(shared) = self.group.upgrade() else {
            return;
        };
        if *task == shared.finisher {
            return;
        }

        if let Err(err) = shared.finisher.add_dependency(task) {
            warn!(task = %task, error = %err, "task added after the group began finishing");
        }
        if *task != shared.starter {
            if let Err(err) = task.add_dependency(&shared.starter) {
                warn!(task = %task, error = %err, "could not chain task behind group start");
            }
        }

        let cancelled = {
            let mut state = shared.state();
            state.members.push(task.clone());
            state.cancelled
        };
        if cancelled {
            task.cancel();
        }
    }

    fn did_finish(&self, _queue: &Queue, task: &Task, errors: &[TaskError]) {
        let Some(shared) = self.group.upgrade() else {
            return;
        };
        if shared.is_barrier(task) || errors.is_empty() {
            return;
        }
        shared.state().errors.extend_from_slice(errors);
    }
}
