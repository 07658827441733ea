// tests/pipeline_run.rs

use std::time::Duration;

use opflow::errors::TaskError;
use opflow::pipeline::Pipeline;
use opflow::queue::{ExclusivityRegistry, QueueBuilder};
use opflow::task::TaskOutcome;
use opflow_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use opflow_test_utils::init_tracing;

#[tokio::test(start_paused = true)]
async fn pipeline_reports_every_outcome() {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .queue_name("ci")
        .max_concurrent_tasks(2)
        .with_task("fetch", TaskConfigBuilder::new().delay_ms(100).build())
        .with_task(
            "slow",
            TaskConfigBuilder::new()
                .delay_ms(10_000)
                .timeout_ms(500)
                .build(),
        )
        .with_task(
            "parse",
            TaskConfigBuilder::new()
                .after("fetch")
                .fail("bad payload")
                .build(),
        )
        .with_task(
            "publish",
            TaskConfigBuilder::new()
                .after("slow")
                .require_uncancelled_dependencies()
                .build(),
        )
        .with_task("report", TaskConfigBuilder::new().after("parse").build())
        .build();

    let pipeline = Pipeline::from_config(&cfg).unwrap();
    let queue = QueueBuilder::from_config(&cfg.queue)
        .registry(ExclusivityRegistry::new())
        .build();
    assert_eq!(queue.name(), "ci");

    let report = pipeline.run(&queue).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.outcome("fetch"), Some(&TaskOutcome::Succeeded));
    assert_eq!(
        report.outcome("slow"),
        Some(&TaskOutcome::Cancelled(vec![TaskError::TimedOut {
            timeout: Duration::from_millis(500)
        }]))
    );
    assert_eq!(
        report.outcome("parse"),
        Some(&TaskOutcome::Failed(vec![TaskError::execution_failed(
            "bad payload"
        )]))
    );
    // A failed dependency does not block; a cancelled one does when asked.
    assert_eq!(report.outcome("report"), Some(&TaskOutcome::Succeeded));
    assert!(matches!(
        report.outcome("publish"),
        Some(TaskOutcome::Failed(errors)) if errors[0].condition().is_some()
    ));

    let mut unsuccessful = report.unsuccessful();
    unsuccessful.sort();
    assert_eq!(unsuccessful, vec!["parse", "publish", "slow"]);
    assert!(report.to_string().contains("failed    parse"));
}

#[tokio::test(start_paused = true)]
async fn exclusive_steps_run_one_after_another() {
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "a",
            TaskConfigBuilder::new().delay_ms(300).exclusive("db").build(),
        )
        .with_task(
            "b",
            TaskConfigBuilder::new().delay_ms(300).exclusive("db").build(),
        )
        .build();

    let pipeline = Pipeline::from_config(&cfg).unwrap();
    let queue = QueueBuilder::new()
        .registry(ExclusivityRegistry::new())
        .build();

    let started = tokio::time::Instant::now();
    let report = pipeline.run(&queue).await.unwrap();

    assert!(report.is_success());
    assert!(started.elapsed() >= Duration::from_millis(600));
    let b = pipeline.get("b").unwrap();
    assert!(b.is_finished());
}
