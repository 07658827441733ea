// src/task/lifecycle.rs

//! Lifecycle driver: the future a queue hands to its executor for each task.
//!
//! ```text
//! Pending ──(all deps Finished)──► EvaluatingConditions
//!    │                                  │ any Failed ──────────────┐
//!    │ cancelled                        ▼                          │
//!    │                                Ready ──(slot acquired)──► Executing
//!    │                                  │ cancelled                │
//!    └──────────────────────────────────┴──────────► Finishing ◄───┘
//!                                                       │
//!                                                    Finished
//! ```

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::condition::ConditionResult;
use crate::errors::TaskError;
use crate::task::{Task, TaskContext, TaskState};

impl Task {
    /// Drive the task from `Pending` to `Finished`.
    ///
    /// `limiter` bounds how many tasks of one queue may be `Executing` at
    /// once; a permit is held until the task finishes.
    pub(crate) async fn drive(self, limiter: Option<Arc<Semaphore>>) {
        if !self.wait_for_dependencies().await {
            debug!(task = %self, "task cancelled while pending");
            self.finish(Vec::new());
            return;
        }

        let failures = self.evaluate_conditions().await;
        if !failures.is_empty() {
            debug!(
                task = %self,
                failures = failures.len(),
                "conditions not satisfied; finishing without executing"
            );
            self.finish(failures);
            return;
        }

        if !self.advance(TaskState::EvaluatingConditions, TaskState::Ready) {
            self.finish(Vec::new());
            return;
        }

        let _permit = match limiter {
            Some(semaphore) => tokio::select! {
                permit = semaphore.acquire_owned() => permit.ok(),
                _ = self.token().cancelled() => None,
            },
            None => None,
        };

        if !self.advance(TaskState::Ready, TaskState::Executing) {
            debug!(task = %self, "task cancelled before executing");
            self.finish(Vec::new());
            return;
        }

        let observers = self.core().observers.clone();
        for observer in &observers {
            observer.on_start(&self);
        }

        let ctx = TaskContext::new(self.clone());
        let result = self.inner.work.execute(ctx.clone()).await;

        let mut errors = ctx.take_errors();
        if let Err(err) = result {
            errors.push(err);
        }
        self.finish(errors);
    }

    /// Wait until every dependency is finished, then move to
    /// `EvaluatingConditions`.
    ///
    /// The "all finished" check and the transition happen under the
    /// structural lock, so a dependency added concurrently is either seen
    /// here or rejected by `add_dependency`. A cancelled task still waits for
    /// its dependencies before leaving `Pending`; exclusivity chains rely on
    /// it.
    ///
    /// Returns `false` if the task was cancelled (or finished externally).
    async fn wait_for_dependencies(&self) -> bool {
        loop {
            let blocker = {
                let core = self.core();
                if self.state() != TaskState::Pending {
                    return false;
                }
                match core.dependencies.iter().find(|dep| !dep.is_finished()) {
                    Some(dep) => dep.clone(),
                    None if core.cancelled => return false,
                    None => {
                        self.set_state(&core, TaskState::EvaluatingConditions);
                        return true;
                    }
                }
            };

            trace!(task = %self, waiting_on = %blocker, "waiting for dependency");
            blocker.wait_until_finished().await;
        }
    }

    /// Evaluate every condition concurrently and collect all failures.
    async fn evaluate_conditions(&self) -> Vec<TaskError> {
        let conditions = self.core().conditions.clone();
        if conditions.is_empty() {
            return Vec::new();
        }

        let results = join_all(conditions.iter().map(|condition| condition.evaluate(self))).await;

        results
            .into_iter()
            .filter_map(|result| match result {
                ConditionResult::Satisfied => None,
                ConditionResult::Failed(err) => Some(err),
            })
            .collect()
    }

    /// Move `from -> to` unless the task was cancelled or left `from`.
    fn advance(&self, from: TaskState, to: TaskState) -> bool {
        let core = self.core();
        if core.cancelled || self.state() != from {
            return false;
        }
        self.set_state(&core, to);
        true
    }
}
