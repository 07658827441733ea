// tests/exclusivity.rs

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opflow::condition::MutuallyExclusive;
use opflow::queue::{ExclusivityRegistry, Queue};
use opflow::task::{Task, TaskContext, TaskOutcome, TaskState};
use opflow::tasks::Group;
use opflow_test_utils::recorder::Recorder;
use opflow_test_utils::with_timeout;

use crate::common::{delay_task, init_tracing};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_category_tasks_never_overlap() {
    init_tracing();
    let registry = ExclusivityRegistry::new();
    let queue = Queue::builder().registry(Arc::clone(&registry)).build();
    let recorder = Recorder::new();

    let p = delay_task("P", 80);
    let q = delay_task("Q", 10);
    for t in [&p, &q] {
        t.add_condition(MutuallyExclusive::new("X")).unwrap();
        t.add_observer(recorder.observer()).unwrap();
    }

    queue.submit(p.clone()).unwrap();
    queue.submit(q.clone()).unwrap();
    assert_eq!(registry.chain("MutuallyExclusive<X>"), vec![p.id(), q.id()]);

    with_timeout(q.wait_until_finished()).await;
    with_timeout(p.wait_until_finished()).await;

    assert!(recorder.started_at("Q").unwrap() >= recorder.finished_at("P").unwrap());
    with_timeout(queue.wait_until_idle()).await;
    assert!(registry.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn category_runs_in_registration_order_one_at_a_time() {
    let registry = ExclusivityRegistry::new();
    let queue = Queue::builder().registry(registry).build();
    let recorder = Recorder::new();
    let running = Arc::new(AtomicUsize::new(0));
    let overlap = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<Task> = (0..5)
        .map(|i| {
            let running = Arc::clone(&running);
            let overlap = Arc::clone(&overlap);
            let t = Task::from_fn(format!("t{i}"), move |_ctx: TaskContext| {
                let running = Arc::clone(&running);
                let overlap = Arc::clone(&overlap);
                async move {
                    if running.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlap.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            });
            t.add_condition(MutuallyExclusive::new("disk")).unwrap();
            t.add_observer(recorder.observer()).unwrap();
            t
        })
        .collect();

    with_timeout(queue.submit_batch(tasks, true)).await.unwrap();

    assert_eq!(overlap.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.start_order(), vec!["t0", "t1", "t2", "t3", "t4"]);
}

#[tokio::test]
async fn different_categories_do_not_wait_for_each_other() {
    let queue = Queue::builder().registry(ExclusivityRegistry::new()).build();
    let slow = delay_task("slow", 10_000);
    slow.add_condition(MutuallyExclusive::new("A")).unwrap();
    let fast = delay_task("fast", 1);
    fast.add_condition(MutuallyExclusive::new("B")).unwrap();

    queue.submit(slow.clone()).unwrap();
    queue.submit(fast.clone()).unwrap();

    with_timeout(fast.wait_until_finished()).await;
    assert!(!slow.is_finished());
    slow.cancel();
    with_timeout(slow.wait_until_finished()).await;
}

#[tokio::test]
async fn alert_category_is_shared_across_queues_with_one_registry() {
    let registry = ExclusivityRegistry::new();
    let first = Queue::builder().registry(Arc::clone(&registry)).build();
    let second = Queue::builder().registry(Arc::clone(&registry)).build();

    let a = delay_task("alert-a", 20);
    let b = delay_task("alert-b", 1);
    a.add_condition(MutuallyExclusive::alert()).unwrap();
    b.add_condition(MutuallyExclusive::alert()).unwrap();

    first.submit(a.clone()).unwrap();
    second.submit(b.clone()).unwrap();
    assert_eq!(b.dependencies(), vec![a.clone()]);

    with_timeout(b.wait_until_finished()).await;
    assert!(a.is_finished());
}

/// Running and peak execution counts shared by a set of tasks.
#[derive(Clone, Default)]
struct Occupancy {
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Occupancy {
    fn task(&self, name: &str, ms: u64, category: &str) -> Task {
        let occupancy = self.clone();
        let t = Task::from_fn(name, move |ctx: TaskContext| {
            let occupancy = occupancy.clone();
            async move {
                let now = occupancy.running.fetch_add(1, Ordering::SeqCst) + 1;
                occupancy.peak.fetch_max(now, Ordering::SeqCst);
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
                    _ = ctx.cancelled() => {}
                }
                occupancy.running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        });
        t.add_condition(MutuallyExclusive::new(category)).unwrap();
        t
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[tokio::test(start_paused = true)]
async fn cancelling_a_queued_chain_member_keeps_the_category_exclusive() {
    let queue = Queue::builder().registry(ExclusivityRegistry::new()).build();
    let occupancy = Occupancy::default();
    let recorder = Recorder::new();

    let p = occupancy.task("P", 300, "X");
    let q = occupancy.task("Q", 100, "X");
    let r = occupancy.task("R", 100, "X");
    for t in [&p, &q, &r] {
        t.add_observer(recorder.observer()).unwrap();
    }
    queue
        .submit_batch([p.clone(), q.clone(), r.clone()], false)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(p.state(), TaskState::Executing);
    q.cancel();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(q.state(), TaskState::Pending);
    assert_eq!(r.state(), TaskState::Pending);

    queue.wait_until_idle().await;

    assert_eq!(occupancy.peak(), 1);
    assert_eq!(q.outcome(), Some(TaskOutcome::Cancelled(Vec::new())));
    assert_eq!(r.outcome(), Some(TaskOutcome::Succeeded));
    assert!(recorder.started_at("R").unwrap() >= recorder.finished_at("P").unwrap());
    assert_eq!(recorder.start_order(), vec!["P", "R"]);
}

#[tokio::test(start_paused = true)]
async fn cancelling_a_group_child_keeps_siblings_exclusive() {
    let registry = ExclusivityRegistry::new();
    let queue = Queue::builder().registry(Arc::clone(&registry)).build();
    let occupancy = Occupancy::default();

    let group = Group::with_registry("G", registry);
    let a = occupancy.task("a", 300, "X");
    let b = occupancy.task("b", 100, "X");
    let c = occupancy.task("c", 100, "X");
    for t in [&a, &b, &c] {
        group.add_child(t.clone()).unwrap();
    }
    queue.submit(group.task().clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(a.state(), TaskState::Executing);
    b.cancel();

    group.task().wait_until_finished().await;

    assert_eq!(occupancy.peak(), 1);
    assert!(b.is_cancelled() && b.is_finished());
    assert_eq!(c.outcome(), Some(TaskOutcome::Succeeded));
    assert_eq!(group.task().outcome(), Some(TaskOutcome::Succeeded));
}
