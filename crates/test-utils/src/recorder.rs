use std::sync::{Arc, Mutex};

use opflow::errors::TaskError;
use opflow::observer::Observer;
use opflow::queue::{Queue, QueueDelegate};
use opflow::task::Task;
use tokio::time::Instant;

/// One recorded lifecycle notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started(String),
    Produced { task: String, produced: String },
    Finished { task: String, errors: Vec<TaskError> },
    WillAdd(String),
    DidFinish(String),
}

#[derive(Debug, Clone)]
pub struct Stamped {
    pub at: Instant,
    pub event: Event,
}

/// Shared, ordered log of lifecycle notifications.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Stamped>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh observer writing into this recorder.
    pub fn observer(&self) -> RecordingObserver {
        RecordingObserver {
            recorder: self.clone(),
        }
    }

    /// A queue delegate writing into this recorder.
    pub fn delegate(&self) -> Arc<RecordingDelegate> {
        Arc::new(RecordingDelegate {
            recorder: self.clone(),
        })
    }

    pub fn push(&self, event: Event) {
        self.events.lock().unwrap().push(Stamped {
            at: Instant::now(),
            event,
        });
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.event.clone())
            .collect()
    }

    /// Position of the first event equal to `event`.
    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn started_at(&self, name: &str) -> Option<Instant> {
        self.find(|e| matches!(e, Event::Started(n) if n == name))
    }

    pub fn finished_at(&self, name: &str) -> Option<Instant> {
        self.find(|e| matches!(e, Event::Finished { task, .. } if task == name))
    }

    /// Names of tasks in the order they started.
    pub fn start_order(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Started(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    fn find(&self, pred: impl Fn(&Event) -> bool) -> Option<Instant> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|s| pred(&s.event))
            .map(|s| s.at)
    }
}

/// Observer recording every hook by task name.
pub struct RecordingObserver {
    recorder: Recorder,
}

impl Observer for RecordingObserver {
    fn on_start(&self, task: &Task) {
        self.recorder.push(Event::Started(task.name().to_string()));
    }

    fn on_produce(&self, task: &Task, produced: &Task) {
        self.recorder.push(Event::Produced {
            task: task.name().to_string(),
            produced: produced.name().to_string(),
        });
    }

    fn on_finish(&self, task: &Task, errors: &[TaskError]) {
        self.recorder.push(Event::Finished {
            task: task.name().to_string(),
            errors: errors.to_vec(),
        });
    }
}

/// Queue delegate recording `will_add` and `did_finish` by task name.
pub struct RecordingDelegate {
    recorder: Recorder,
}

impl QueueDelegate for RecordingDelegate {
    fn will_add(&self, _queue: &Queue, task: &Task) {
        self.recorder.push(Event::WillAdd(task.name().to_string()));
    }

    fn did_finish(&self, _queue: &Queue, task: &Task, _errors: &[TaskError]) {
        self.recorder.push(Event::DidFinish(task.name().to_string()));
    }
}
