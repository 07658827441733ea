// src/tasks/delay.rs

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tracing::trace;

use crate::errors::TaskError;
use crate::task::{TaskContext, Work};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delay {
    Interval(Duration),
    Until(SystemTime),
}

/// Work that simply waits, either for a fixed interval or until a wall-clock
/// instant. Returns immediately once the task is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWork {
    delay: Delay,
}

impl DelayWork {
    pub fn interval(interval: Duration) -> Self {
        Self {
            delay: Delay::Interval(interval),
        }
    }

    /// Wait until `deadline`. A deadline in the past completes immediately.
    pub fn until(deadline: SystemTime) -> Self {
        Self {
            delay: Delay::Until(deadline),
        }
    }

    fn remaining(&self) -> Duration {
        match self.delay {
            Delay::Interval(interval) => interval,
            Delay::Until(deadline) => deadline
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO),
        }
    }
}

#[async_trait]
impl Work for DelayWork {
    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return Ok(());
        }

        tokio::select! {
            _ = tokio::time::sleep(remaining) => {}
            _ = ctx.cancelled() => {
                trace!(task = %ctx.task(), "delay interrupted by cancellation");
            }
        }
        Ok(())
    }
}
