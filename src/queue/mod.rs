// src/queue/mod.rs

//! Scheduling layer.
//!
//! - [`core`] holds the [`Queue`] and its builder: submission, graph
//!   expansion and hand-off to an executor.
//! - [`exclusivity`] provides the [`ExclusivityRegistry`] that serializes
//!   tasks sharing a mutual-exclusion category.
//! - [`executor`] is the [`Executor`] seam and the default tokio-backed
//!   implementation.
//! - [`delegate`] defines the optional per-queue [`QueueDelegate`] hooks.

pub mod core;
pub mod delegate;
pub mod exclusivity;
pub mod executor;

pub use self::core::{Queue, QueueBuilder};
pub use delegate::QueueDelegate;
pub use exclusivity::ExclusivityRegistry;
pub use executor::{Executor, TaskFuture, TokioExecutor};
