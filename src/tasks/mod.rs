// src/tasks/mod.rs

//! Ready-made task kinds.
//!
//! - [`DelayWork`]: wait for an interval or until a deadline.
//! - [`FutureWork`]: run an arbitrary future as a task body.
//! - [`Group`]: a composite task running children on a private queue.

pub mod delay;
pub mod future;
pub mod group;

pub use delay::DelayWork;
pub use future::FutureWork;
pub use group::Group;
