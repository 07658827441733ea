// tests/group.rs

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opflow::errors::{OpflowError, TaskError};
use opflow::observer::BlockObserver;
use opflow::queue::ExclusivityRegistry;
use opflow::task::{Task, TaskContext, TaskOutcome, TaskState};
use opflow::tasks::Group;
use opflow_test_utils::recorder::Recorder;
use opflow_test_utils::with_timeout;

use crate::common::{counting_task, delay_task, failing_task, init_tracing, isolated_queue};

fn isolated_group(name: &str, children: Vec<Task>) -> Group {
    let group = Group::with_registry(name, ExclusivityRegistry::new());
    for child in children {
        group.add_child(child).unwrap();
    }
    group
}

#[tokio::test]
async fn group_finishes_after_children_with_concatenated_errors() {
    init_tracing();
    let queue = isolated_queue("outer");
    let recorder = Recorder::new();

    let c1 = failing_task("C1", "first");
    let c2 = Task::from_fn("C2", |_ctx: TaskContext| async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Err(TaskError::execution_failed("second"))
    });
    c1.add_observer(recorder.observer()).unwrap();
    c2.add_observer(recorder.observer()).unwrap();

    let group = isolated_group("G", vec![c1.clone(), c2.clone()]);
    group.task().add_observer(recorder.observer()).unwrap();

    with_timeout(queue.submit_batch([group.task().clone()], true))
        .await
        .unwrap();

    assert!(c1.is_finished() && c2.is_finished());
    let group_finished = recorder.finished_at("G").unwrap();
    assert!(group_finished >= recorder.finished_at("C1").unwrap());
    assert!(group_finished >= recorder.finished_at("C2").unwrap());
    assert_eq!(
        group.task().errors(),
        vec![
            TaskError::execution_failed("first"),
            TaskError::execution_failed("second"),
        ]
    );
}

#[tokio::test]
async fn children_do_not_start_before_the_group() {
    let queue = isolated_queue("outer");
    let runs = Arc::new(AtomicUsize::new(0));
    let child = counting_task("child", 0, &runs);
    let gate = delay_task("gate", 30);

    let group = Group::with_children("G", [child.clone()]);
    group.task().add_dependency(&gate).unwrap();

    queue.submit(gate.clone()).unwrap();
    queue.submit(group.task().clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(!group.is_started());
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    with_timeout(group.task().wait_until_finished()).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(group.task().outcome(), Some(TaskOutcome::Succeeded));
}

#[tokio::test]
async fn child_added_after_start_delays_completion() {
    let queue = isolated_queue("outer");
    let long = delay_task("long", 50);
    let group = isolated_group("G", vec![long.clone()]);

    queue.submit(group.task().clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(group.is_started());

    let late = failing_task("late", "late failure");
    group.add_child(late.clone()).unwrap();

    with_timeout(group.task().wait_until_finished()).await;
    assert!(late.is_finished());
    assert_eq!(
        group.task().errors(),
        vec![TaskError::execution_failed("late failure")]
    );
}

#[tokio::test]
async fn produced_task_inside_group_delays_group_completion() {
    let queue = isolated_queue("outer");
    let produced = delay_task("produced", 40);
    let producer = {
        let produced = produced.clone();
        Task::from_fn("producer", move |ctx: TaskContext| {
            let produced = produced.clone();
            async move {
                ctx.produce(produced)?;
                Ok::<(), TaskError>(())
            }
        })
    };
    let group = isolated_group("G", vec![producer.clone()]);

    with_timeout(queue.submit_batch([group.task().clone()], true))
        .await
        .unwrap();

    assert!(producer.is_finished());
    assert!(produced.is_finished());
    assert_eq!(group.task().outcome(), Some(TaskOutcome::Succeeded));
}

#[tokio::test]
async fn cancelling_group_cancels_running_children() {
    let queue = isolated_queue("outer");
    let a = delay_task("a", 10_000);
    let b = delay_task("b", 10_000);
    let group = isolated_group("G", vec![a.clone(), b.clone()]);

    queue.submit(group.task().clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    group.task().cancel();

    with_timeout(group.task().wait_until_finished()).await;
    assert!(a.is_cancelled() && a.is_finished());
    assert!(b.is_cancelled() && b.is_finished());
    assert!(matches!(
        group.task().outcome(),
        Some(TaskOutcome::Cancelled(_))
    ));
}

#[tokio::test]
async fn cancelling_group_before_start_finishes_held_children() {
    let runs = Arc::new(AtomicUsize::new(0));
    let child = counting_task("child", 0, &runs);
    let group = isolated_group("G", vec![child.clone()]);

    group.task().cancel();
    assert!(child.is_cancelled());
    with_timeout(child.wait_until_finished()).await;

    // Children added to a cancelled group are cancelled right away.
    let late = counting_task("late", 0, &runs);
    group.add_child(late.clone()).unwrap();
    assert!(late.is_cancelled() && late.is_finished());
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn aggregated_errors_are_reported_with_child_errors() {
    let queue = isolated_queue("outer");
    let group = isolated_group("G", vec![failing_task("child", "child failed")]);
    group
        .aggregate_error(TaskError::execution_failed("setup failed"))
        .unwrap();

    with_timeout(queue.submit_batch([group.task().clone()], true))
        .await
        .unwrap();

    assert_eq!(
        group.task().errors(),
        vec![
            TaskError::execution_failed("setup failed"),
            TaskError::execution_failed("child failed"),
        ]
    );
}

#[tokio::test]
async fn nested_groups_propagate_errors_outwards() {
    let queue = isolated_queue("outer");
    let inner = isolated_group("inner", vec![failing_task("leaf", "leaf failed")]);
    let outer = isolated_group("outer", vec![inner.task().clone()]);

    with_timeout(queue.submit_batch([outer.task().clone()], true))
        .await
        .unwrap();

    assert_eq!(
        outer.task().errors(),
        vec![TaskError::execution_failed("leaf failed")]
    );
}

#[tokio::test]
async fn adding_child_to_finished_group_fails() {
    let queue = isolated_queue("outer");
    let group = isolated_group("G", Vec::new());
    with_timeout(queue.submit_batch([group.task().clone()], true))
        .await
        .unwrap();

    assert!(group.add_child(delay_task("too-late", 1)).is_err());
}

#[tokio::test]
async fn child_added_as_last_sibling_finishes_is_awaited() {
    let queue = isolated_queue("outer");
    let last = delay_task("last", 20);
    let group = isolated_group("G", vec![last.clone()]);
    let late = failing_task("late", "late failure");

    let adder = group.clone();
    let late_child = late.clone();
    last.add_observer(BlockObserver::new().on_finish(move |_, _| {
        adder.add_child(late_child.clone()).unwrap();
    }))
    .unwrap();

    with_timeout(queue.submit_batch([group.task().clone()], true))
        .await
        .unwrap();

    assert_eq!(late.state(), TaskState::Finished);
    assert_eq!(
        group.task().errors(),
        vec![TaskError::execution_failed("late failure")]
    );
}

#[tokio::test]
async fn aggregating_after_collection_fails() {
    let queue = isolated_queue("outer");
    let group = isolated_group("G", vec![delay_task("child", 1)]);
    with_timeout(queue.submit_batch([group.task().clone()], true))
        .await
        .unwrap();

    let err = group
        .aggregate_error(TaskError::execution_failed("too late"))
        .unwrap_err();
    assert!(matches!(err, OpflowError::InvalidState { .. }));
    assert_eq!(group.task().outcome(), Some(TaskOutcome::Succeeded));
}
