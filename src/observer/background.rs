// src/observer/background.rs

//! Keep a task alive while the application is backgrounded.
//!
//! The host platform is abstracted as a [`BackgroundTaskProvider`] that hands
//! out opaque tokens. A [`BackgroundObserver`] holds a token whenever the app
//! is in the background and its task has not finished yet.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::TaskError;
use crate::observer::Observer;
use crate::task::Task;

/// Opaque handle for a unit of long-running background work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackgroundToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    Foreground,
    Background,
}

/// Platform hook for long-running background work.
pub trait BackgroundTaskProvider: Send + Sync + 'static {
    fn begin_background_task(&self, name: &str) -> BackgroundToken;
    fn end_background_task(&self, token: BackgroundToken);
}

#[derive(Debug)]
struct PhaseState {
    in_background: bool,
    token: Option<BackgroundToken>,
    finished: bool,
}

pub struct BackgroundObserver {
    provider: Arc<dyn BackgroundTaskProvider>,
    state: Mutex<PhaseState>,
}

impl BackgroundObserver {
    /// Create an observer for an app currently in `phase`. If that is
    /// already the background, a token is taken immediately.
    pub fn new(provider: Arc<dyn BackgroundTaskProvider>, phase: AppPhase) -> Arc<Self> {
        let observer = Arc::new(Self {
            provider,
            state: Mutex::new(PhaseState {
                in_background: false,
                token: None,
                finished: false,
            }),
        });
        if phase == AppPhase::Background {
            observer.did_enter_background();
        }
        observer
    }

    pub fn did_enter_background(&self) {
        let mut state = self.state();
        if state.finished || state.in_background {
            return;
        }
        state.in_background = true;
        if state.token.is_none() {
            let token = self.provider.begin_background_task("BackgroundObserver");
            debug!(?token, "background task started");
            state.token = Some(token);
        }
    }

    pub fn did_enter_foreground(&self) {
        let mut state = self.state();
        if !state.in_background {
            return;
        }
        state.in_background = false;
        self.end_token(&mut state);
    }

    /// Whether a background token is currently held.
    pub fn holds_token(&self) -> bool {
        self.state().token.is_some()
    }

    /// Follow phase transitions published on `phases` until the task
    /// finishes or the sender goes away.
    pub fn follow(self: &Arc<Self>, mut phases: watch::Receiver<AppPhase>) -> JoinHandle<()> {
        let me = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                if me.state().finished {
                    break;
                }
                let phase = *phases.borrow_and_update();
                match phase {
                    AppPhase::Background => me.did_enter_background(),
                    AppPhase::Foreground => me.did_enter_foreground(),
                }
                if phases.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    fn end_token(&self, state: &mut PhaseState) {
        if let Some(token) = state.token.take() {
            debug!(?token, "background task ended");
            self.provider.end_background_task(token);
        }
    }

    fn state(&self) -> MutexGuard<'_, PhaseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Observer for BackgroundObserver {
    fn on_finish(&self, _task: &Task, _errors: &[TaskError]) {
        let mut state = self.state();
        state.finished = true;
        self.end_token(&mut state);
    }
}
