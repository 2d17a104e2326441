// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod graph;
pub mod logging;
pub mod task;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::GraphFile;

pub use crate::errors::TaskGraphError;
pub use crate::exec::{CommandOutput, CommandWork, InlineExecutor, TokioExecutor, WorkExecutor};
pub use crate::graph::{StateCounts, TaskGraph};
pub use crate::task::{
    Task, TaskContext, TaskDelegate, TaskError, TaskId, TaskOutput, TaskState, TaskTarget,
    TaskWork, TracingDelegate,
};

/// High-level entry point used by `main.rs`.
///
/// Loads the graph file, builds one command task per `[task.<name>]`, runs
/// the graph to a settled state (retrying failed rounds as configured) and
/// reports the outcome. Ctrl-C cancels the graph.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = Path::new(&args.config);
    let cfg = load_and_validate(config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let mut executor = TokioExecutor::current()?;
    if let Some(max) = args.max_concurrency.or(cfg.graph.max_concurrency) {
        executor = executor.with_max_concurrency(max);
    }
    let retries = args.retries.unwrap_or(cfg.graph.retries);

    let name = graph_name(&cfg, config_path);
    let graph = build_graph(&cfg, &name, executor)?;

    // Held here for the whole run: tasks only keep a weak reference.
    let delegate = Arc::new(TracingDelegate);
    for task in graph.all_tasks() {
        task.set_delegate(&delegate);
    }

    info!(graph = %graph.name(), tasks = graph.all_tasks().len(), retries, "running task graph");
    graph.start();

    let counts = drive_graph(&graph, retries, tokio::signal::ctrl_c()).await;

    print_summary(&graph, &counts);

    if graph.has_unfinished_tasks() {
        return Err(anyhow!(
            "graph '{}' did not finish: {}",
            graph.name(),
            counts
        ));
    }
    Ok(())
}

/// Wait for a started graph to settle, retrying failed rounds up to
/// `retries` times.
///
/// `interrupt` resolving to `Ok(())` cancels the graph, which is then
/// awaited to settle. If it resolves to an error instead, interruption is
/// unavailable for the rest of the run and the graph keeps going.
pub async fn drive_graph<F>(graph: &TaskGraph, retries: u32, interrupt: F) -> StateCounts
where
    F: Future<Output = std::io::Result<()>>,
{
    let interrupted = async {
        if let Err(e) = interrupt.await {
            warn!(graph = %graph.name(), error = %e, "failed to listen for Ctrl+C; running without it");
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(interrupted);

    let mut round = 0u32;
    loop {
        let counts = tokio::select! {
            counts = graph.wait_settled() => counts,
            () = &mut interrupted => {
                info!(graph = %graph.name(), "interrupted; cancelling graph");
                graph.cancel();
                return graph.wait_settled().await;
            }
        };

        if counts.failed == 0 || round >= retries {
            return counts;
        }
        round += 1;
        info!(graph = %graph.name(), round, failed = counts.failed, "retrying failed tasks");
        graph.retry();
    }
}

/// Build a graph with one `CommandWork` task per configured task.
///
/// Tasks are added in the file's topological order so every prerequisite is
/// already a member when its dependents are added.
pub fn build_graph<E: WorkExecutor + 'static>(
    cfg: &GraphFile,
    name: &str,
    executor: E,
) -> Result<TaskGraph> {
    let mut graph = TaskGraph::named(name, executor);
    let mut by_name: HashMap<&str, Task> = HashMap::new();

    for task_name in cfg.insertion_order() {
        let section = cfg
            .task
            .get(task_name)
            .ok_or_else(|| TaskGraphError::TaskNotFound(task_name.clone()))?;

        let task = Task::builder()
            .name(task_name.as_str())
            .work(CommandWork::on_current_runtime(section.cmd.as_str())?)
            .build();

        let prerequisites = section
            .after
            .iter()
            .map(|dep| {
                by_name
                    .get(dep.as_str())
                    .ok_or_else(|| TaskGraphError::TaskNotFound(dep.clone()))
            })
            .collect::<std::result::Result<Vec<&Task>, _>>()?;

        graph.try_add_task(&task, &prerequisites)?;
        debug!(task = %task_name, after = ?section.after, "task defined");
        by_name.insert(task_name.as_str(), task);
    }

    Ok(graph)
}

/// `[graph].name`, else the config file stem, else `taskgraph`.
fn graph_name(cfg: &GraphFile, config_path: &Path) -> String {
    cfg.graph
        .name
        .clone()
        .or_else(|| {
            config_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "taskgraph".to_string())
}

fn print_dry_run(cfg: &GraphFile) {
    println!("taskgraph dry-run");
    if let Some(ref name) = cfg.graph.name {
        println!("  graph.name = {name}");
    }
    if let Some(max) = cfg.graph.max_concurrency {
        println!("  graph.max_concurrency = {max}");
    }
    println!("  graph.retries = {}", cfg.graph.retries);
    println!();

    println!("tasks ({}), in start order:", cfg.task.len());
    for name in cfg.insertion_order() {
        let Some(task) = cfg.task.get(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      cmd: {}", task.cmd);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_summary(graph: &TaskGraph, counts: &StateCounts) {
    println!("{}: {}", graph.name(), counts);
    for task in graph.all_tasks() {
        match task.state() {
            TaskState::Finished => {}
            TaskState::Failed => {
                let error = task
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                println!("  {} failed: {}", task.name(), error);
            }
            state => println!("  {} {}", task.name(), state),
        }
    }
}
