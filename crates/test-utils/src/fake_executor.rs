use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use opflow::queue::{Executor, TaskFuture};

/// Executor that counts how many drivers it was handed and spawns them on
/// the ambient tokio runtime.
#[derive(Clone, Default)]
pub struct CountingExecutor {
    spawned: Arc<AtomicUsize>,
}

impl CountingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }
}

impl Executor for CountingExecutor {
    fn spawn(&self, future: TaskFuture) {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(future);
    }
}
