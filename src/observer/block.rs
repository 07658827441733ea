// src/observer/block.rs

use std::fmt;

use crate::errors::TaskError;
use crate::observer::Observer;
use crate::task::Task;

type StartHandler = Box<dyn Fn(&Task) + Send + Sync>;
type ProduceHandler = Box<dyn Fn(&Task, &Task) + Send + Sync>;
type FinishHandler = Box<dyn Fn(&Task, &[TaskError]) + Send + Sync>;

/// Observer built from optional closures.
///
/// ```no_run
/// use opflow::observer::BlockObserver;
///
/// let observer = BlockObserver::new()
///     .on_start(|task| println!("{task} started"))
///     .on_finish(|task, errors| println!("{task} finished with {} errors", errors.len()));
/// ```
#[derive(Default)]
pub struct BlockObserver {
    start: Option<StartHandler>,
    produce: Option<ProduceHandler>,
    finish: Option<FinishHandler>,
}

impl BlockObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl Fn(&Task) + Send + Sync + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    pub fn on_produce(mut self, f: impl Fn(&Task, &Task) + Send + Sync + 'static) -> Self {
        self.produce = Some(Box::new(f));
        self
    }

    pub fn on_finish(mut self, f: impl Fn(&Task, &[TaskError]) + Send + Sync + 'static) -> Self {
        self.finish = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for BlockObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockObserver")
            .field("start", &self.start.is_some())
            .field("produce", &self.produce.is_some())
            .field("finish", &self.finish.is_some())
            .finish()
    }
}

impl Observer for BlockObserver {
    fn on_start(&self, task: &Task) {
        if let Some(f) = &self.start {
            f(task);
        }
    }

    fn on_produce(&self, task: &Task, produced: &Task) {
        if let Some(f) = &self.produce {
            f(task, produced);
        }
    }

    fn on_finish(&self, task: &Task, errors: &[TaskError]) {
        if let Some(f) = &self.finish {
            f(task, errors);
        }
    }
}
