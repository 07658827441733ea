// src/lib.rs

//! `opflow`: an in-process scheduler for DAGs of asynchronous tasks.
//!
//! Tasks carry explicit dependencies, preconditions that may inject
//! prerequisite tasks, mutual-exclusion categories enforced by dependency
//! chaining, and lifecycle observers. A [`queue::Queue`] wires submitted
//! tasks into the graph and drives them on tokio; a [`tasks::Group`] nests a
//! whole graph inside one task.

pub mod cli;
pub mod condition;
pub mod config;
pub mod errors;
pub mod logging;
pub mod observer;
pub mod pipeline;
pub mod queue;
pub mod task;
pub mod tasks;

use anyhow::{bail, Result};
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::pipeline::Pipeline;
use crate::queue::QueueBuilder;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the pipeline file, builds its tasks, runs them on a
/// queue configured from `[queue]` and prints a per-task summary. Fails if
/// any task did not succeed.
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_and_validate(&args.config)?;

    if let Some(limit) = args.max_concurrent {
        cfg.queue.max_concurrent_tasks = Some(usize::try_from(limit)?);
    }

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let pipeline = Pipeline::from_config(&cfg)?;
    let queue = QueueBuilder::from_config(&cfg.queue).build();

    let report = pipeline.run(&queue).await?;
    println!("opflow: {} tasks on queue '{}'", report.entries.len(), queue.name());
    print!("{report}");

    if !report.is_success() {
        bail!(
            "{} task(s) did not succeed: {}",
            report.unsuccessful().len(),
            report.unsuccessful().join(", ")
        );
    }
    Ok(())
}

/// Print the queue settings and every task in submission order.
fn print_dry_run(cfg: &ConfigFile) {
    println!("opflow dry-run");
    println!("  queue.name = {:?}", cfg.queue.name);
    match cfg.queue.max_concurrent_tasks {
        Some(limit) => println!("  queue.max_concurrent_tasks = {limit}"),
        None => println!("  queue.max_concurrent_tasks = unbounded"),
    }
    println!();

    println!("tasks ({}), in submission order:", cfg.order().len());
    for name in cfg.order() {
        let Some(task) = cfg.task.get(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      delay: {:?}", task.delay());
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if !task.exclusive.is_empty() {
            println!("      exclusive: {:?}", task.exclusive);
        }
        if let Some(timeout) = task.timeout() {
            println!("      timeout: {timeout:?}");
        }
        if task.require_uncancelled_dependencies {
            println!("      require_uncancelled_dependencies: true");
        }
        if let Some(ref message) = task.fail {
            println!("      fail: {message}");
        }
    }

    debug!("dry-run complete (no execution)");
}
