// src/task/mod.rs

//! Tasks: the unit of schedulable work.
//!
//! - [`handle`] holds the [`Task`] handle and its structural API
//!   (dependencies, conditions, observers, cancel, finish).
//! - [`lifecycle`] contains the driver future that walks a submitted task
//!   through its states.
//! - [`state`] defines [`TaskState`] and [`TaskOutcome`].
//! - [`work`] defines the [`Work`] trait implemented by every task kind.
//! - [`context`] provides the [`TaskContext`] handed to work bodies.

pub mod context;
pub mod handle;
mod lifecycle;
pub mod state;
pub mod work;

pub use context::TaskContext;
pub use handle::{Task, TaskId};
pub use state::{TaskOutcome, TaskState};
pub use work::{FnWork, NoopWork, Work};
