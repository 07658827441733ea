// src/observer/activity.rs

//! Reference-counted activity indicator (e.g. a "network busy" spinner).
//!
//! Every [`ActivityObserver`] whose task starts bumps the count; finishing
//! drops it. The indicator becomes visible as soon as the count is non-zero
//! and hides only after `hide_delay` of continuous inactivity, so back-to-back
//! tasks do not make it flicker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::trace;

use crate::errors::TaskError;
use crate::observer::Observer;
use crate::task::Task;

pub const DEFAULT_HIDE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Counter {
    active: usize,
    /// Bumped on every change; a pending hide only applies if it still
    /// matches.
    epoch: u64,
}

/// Shared visibility state. Create one per indicator and hand clones of the
/// `Arc` to observers.
#[derive(Debug)]
pub struct ActivityIndicator {
    hide_delay: Duration,
    counter: Mutex<Counter>,
    visible: watch::Sender<bool>,
}

impl ActivityIndicator {
    pub fn new(hide_delay: Duration) -> Arc<Self> {
        let (visible, _) = watch::channel(false);
        Arc::new(Self {
            hide_delay,
            counter: Mutex::new(Counter::default()),
            visible,
        })
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    pub fn active_count(&self) -> usize {
        self.counter().active
    }

    /// Watch visibility changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.visible.subscribe()
    }

    pub fn activity_started(&self) {
        let mut counter = self.counter();
        counter.active += 1;
        counter.epoch += 1;
        self.visible.send_if_modified(|visible| !std::mem::replace(visible, true));
    }

    /// Must be called from within a tokio runtime: hiding is deferred.
    pub fn activity_ended(self: &Arc<Self>) {
        let epoch = {
            let mut counter = self.counter();
            counter.active = counter.active.saturating_sub(1);
            counter.epoch += 1;
            if counter.active > 0 {
                return;
            }
            counter.epoch
        };

        let me = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(me.hide_delay).await;
            me.hide_if_idle(epoch);
        });
    }

    fn hide_if_idle(&self, epoch: u64) {
        let counter = self.counter();
        if counter.active == 0 && counter.epoch == epoch {
            trace!("activity indicator hidden");
            self.visible.send_if_modified(|visible| std::mem::replace(visible, false));
        }
    }

    fn counter(&self) -> std::sync::MutexGuard<'_, Counter> {
        self.counter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps an [`ActivityIndicator`] visible while its task executes.
///
/// Attach a fresh observer per task.
#[derive(Debug)]
pub struct ActivityObserver {
    indicator: Arc<ActivityIndicator>,
    started: AtomicBool,
}

impl ActivityObserver {
    pub fn new(indicator: Arc<ActivityIndicator>) -> Self {
        Self {
            indicator,
            started: AtomicBool::new(false),
        }
    }
}

impl Observer for ActivityObserver {
    fn on_start(&self, _task: &Task) {
        if !self.started.swap(true, Ordering::SeqCst) {
            self.indicator.activity_started();
        }
    }

    fn on_finish(&self, _task: &Task, _errors: &[TaskError]) {
        // Tasks that never started never counted.
        if self.started.swap(false, Ordering::SeqCst) {
            self.indicator.activity_ended();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn hides_only_after_delay_without_new_activity() {
        let indicator = ActivityIndicator::new(Duration::from_secs(1));
        assert!(!indicator.is_visible());

        indicator.activity_started();
        assert!(indicator.is_visible());
        indicator.activity_ended();
        assert_eq!(indicator.active_count(), 0);

        // New activity inside the hide window keeps it visible.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(indicator.is_visible());
        indicator.activity_started();
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(indicator.is_visible());

        indicator.activity_ended();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(!indicator.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_activity_counts() {
        let indicator = ActivityIndicator::new(Duration::from_millis(100));
        indicator.activity_started();
        indicator.activity_started();
        indicator.activity_ended();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(indicator.is_visible());
        assert_eq!(indicator.active_count(), 1);

        indicator.activity_ended();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!indicator.is_visible());
    }
}
