use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use opflow::condition::{PermissionProvider, PermissionStatus};
use opflow::errors::TaskError;
use opflow::observer::{BackgroundTaskProvider, BackgroundToken};

/// Permission provider that answers a request with a preset decision.
pub struct FakePermissionProvider {
    name: String,
    status: Mutex<PermissionStatus>,
    answer: PermissionStatus,
    requests: AtomicUsize,
}

impl FakePermissionProvider {
    /// Starts `NotDetermined`; a request changes the status to `answer`.
    pub fn answering(name: &str, answer: PermissionStatus) -> Self {
        Self::with_status(name, PermissionStatus::NotDetermined, answer)
    }

    pub fn with_status(name: &str, status: PermissionStatus, answer: PermissionStatus) -> Self {
        Self {
            name: name.to_string(),
            status: Mutex::new(status),
            answer,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionProvider for FakePermissionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> PermissionStatus {
        *self.status.lock().unwrap()
    }

    async fn request(&self) -> Result<(), TaskError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.status.lock().unwrap() = self.answer;
        Ok(())
    }
}

/// Background provider that hands out sequential tokens and remembers which
/// ones are still open.
#[derive(Default)]
pub struct FakeBackgroundProvider {
    next: AtomicU64,
    open: Mutex<Vec<BackgroundToken>>,
    ended: Mutex<Vec<BackgroundToken>>,
}

impl FakeBackgroundProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_tokens(&self) -> Vec<BackgroundToken> {
        self.open.lock().unwrap().clone()
    }

    pub fn ended_tokens(&self) -> Vec<BackgroundToken> {
        self.ended.lock().unwrap().clone()
    }
}

impl BackgroundTaskProvider for FakeBackgroundProvider {
    fn begin_background_task(&self, _name: &str) -> BackgroundToken {
        let token = BackgroundToken(self.next.fetch_add(1, Ordering::SeqCst));
        self.open.lock().unwrap().push(token);
        token
    }

    fn end_background_task(&self, token: BackgroundToken) {
        self.open.lock().unwrap().retain(|t| *t != token);
        self.ended.lock().unwrap().push(token);
    }
}
