// src/condition/permission.rs

//! Conditions backed by an external permission (calendar, location, photos,
//! push notifications, ...).
//!
//! The scheduler does not know how permissions are obtained. A
//! [`PermissionProvider`] reports the current status and can prompt the user;
//! [`PermissionCondition`] turns that into a prerequisite request task plus a
//! check.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::condition::{Condition, ConditionResult, MutuallyExclusive};
use crate::errors::TaskError;
use crate::task::{Task, TaskContext, Work};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// The user has not been asked yet.
    NotDetermined,
    Granted,
    Denied,
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionStatus::NotDetermined => "not determined",
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
        };
        f.write_str(s)
    }
}

/// Source of a permission.
#[async_trait]
pub trait PermissionProvider: Send + Sync + 'static {
    /// Name of the permission, used as the condition name.
    fn name(&self) -> &str;

    fn status(&self) -> PermissionStatus;

    /// Prompt for the permission. On return `status()` reflects the answer.
    async fn request(&self) -> Result<(), TaskError>;
}

/// Requires a permission to be granted.
///
/// At submission it injects a request task (mutually exclusive with every
/// other alert) that prompts only if the user has not been asked yet.
pub struct PermissionCondition {
    provider: Arc<dyn PermissionProvider>,
}

impl PermissionCondition {
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        Self { provider }
    }
}

impl fmt::Debug for PermissionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionCondition")
            .field("permission", &self.provider.name())
            .finish()
    }
}

#[async_trait]
impl Condition for PermissionCondition {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn dependency_for(&self, _task: &Task) -> Option<Task> {
        let request = Task::new(
            format!("request {} permission", self.provider.name()),
            PermissionRequest {
                provider: Arc::clone(&self.provider),
            },
        );
        if let Err(err) = request.add_condition(MutuallyExclusive::alert()) {
            warn!(error = %err, "could not mark permission request as an alert");
        }
        Some(request)
    }

    async fn evaluate(&self, _task: &Task) -> ConditionResult {
        match self.provider.status() {
            PermissionStatus::Granted => ConditionResult::Satisfied,
            status => ConditionResult::Failed(TaskError::condition_failed(
                self.provider.name(),
                format!("permission {status}"),
            )),
        }
    }
}

/// Work that prompts for a permission if it has not been determined yet.
struct PermissionRequest {
    provider: Arc<dyn PermissionProvider>,
}

#[async_trait]
impl Work for PermissionRequest {
    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError> {
        if self.provider.status() != PermissionStatus::NotDetermined {
            return Ok(());
        }

        debug!(permission = %self.provider.name(), "prompting for permission");
        tokio::select! {
            result = self.provider.request() => result,
            _ = ctx.cancelled() => Ok(()),
        }
    }
}
