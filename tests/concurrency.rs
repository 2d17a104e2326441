// tests/concurrency.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use taskgraph::{InlineExecutor, Task, TaskGraph, TokioExecutor};
use taskgraph_test_utils::{init_tracing, with_timeout};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fan_in_starts_dependent_exactly_once() {
    init_tracing();

    for round in 0..50 {
        let executor = TokioExecutor::current().unwrap();
        let mut graph = TaskGraph::named(format!("fan-in-{round}"), executor);
        let runs = Arc::new(AtomicUsize::new(0));

        let width = 8;
        let roots: Vec<Task> = (0..width)
            .map(|i| {
                Task::from_fn(format!("root-{i}"), |ctx| {
                    ctx.finish();
                })
            })
            .collect();
        for root in &roots {
            graph.add_task(root, &[]);
        }

        let counter = Arc::clone(&runs);
        let sink = Task::from_fn("sink", move |ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            ctx.finish();
        });
        let prereqs: Vec<&Task> = roots.iter().collect();
        graph.add_task(&sink, &prereqs);

        graph.start();
        let counts = with_timeout(graph.wait_settled()).await;

        assert_eq!(counts.finished, width + 1, "round {round}: {counts}");
        assert_eq!(runs.load(Ordering::SeqCst), 1, "round {round}");
        assert!(sink.is_finished());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn max_concurrency_bounds_running_bodies() {
    init_tracing();
    let executor = TokioExecutor::current().unwrap().with_max_concurrency(2);
    assert_eq!(executor.max_concurrency(), Some(2));
    let mut graph = TaskGraph::named("bounded", executor);

    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for i in 0..8 {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        let task = Task::from_fn(format!("t{i}"), move |ctx| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            running.fetch_sub(1, Ordering::SeqCst);
            ctx.finish();
        });
        graph.add_task(&task, &[]);
    }

    assert_eq!(graph.start(), 8);
    let counts = with_timeout(graph.wait_settled()).await;

    assert_eq!(counts.finished, 8);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_body_observes_cancellation() {
    init_tracing();
    let mut graph = TaskGraph::on_current_runtime("cancel-async").unwrap();
    let handle = tokio::runtime::Handle::current();
    let observed = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&observed);

    let task = Task::from_fn("waits", move |ctx| {
        let seen = Arc::clone(&seen);
        handle.spawn(async move {
            ctx.cancelled().await;
            seen.fetch_add(1, Ordering::SeqCst);
            ctx.finish();
        });
    });
    graph.add_task(&task, &[]);

    graph.start();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!graph.is_settled());

    graph.cancel();
    let counts = with_timeout(graph.wait_settled()).await;
    assert_eq!(counts.cancelled, 1);

    with_timeout(async {
        while observed.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(task.is_cancelled());
}

#[test]
fn long_inline_chain_does_not_recurse() {
    init_tracing();
    let mut graph = TaskGraph::named("chain", InlineExecutor::new());
    let mut previous: Option<Task> = None;
    let mut last = None;

    for i in 0..20_000 {
        let task = Task::new(format!("link-{i}"));
        match &previous {
            Some(p) => graph.add_task(&task, &[p]),
            None => graph.add_task(&task, &[]),
        }
        last = Some(task.clone());
        previous = Some(task);
    }

    graph.start();

    assert!(last.unwrap().is_finished());
    assert!(!graph.has_unfinished_tasks());

    // Cancelling a finished chain walks all of it and changes nothing.
    graph.all_tasks()[0].cancel();
    assert_eq!(graph.state_counts().finished, 20_000);
}

#[test]
fn long_chain_cancel_and_retry_are_iterative() {
    init_tracing();
    let exec = taskgraph_test_utils::ManualExecutor::new();
    let mut graph = TaskGraph::named("chain-walk", exec.clone());
    let mut previous: Option<Task> = None;

    for i in 0..20_000 {
        let task = Task::new(format!("link-{i}"));
        match &previous {
            Some(p) => graph.add_task(&task, &[p]),
            None => graph.add_task(&task, &[]),
        }
        previous = Some(task);
    }

    graph.cancel();
    assert_eq!(graph.state_counts().cancelled, 20_000);

    graph.retry();
    let counts = graph.state_counts();
    assert_eq!(counts.executing, 1);
    assert_eq!(counts.pending, 19_999);
    assert_eq!(exec.queued(), 1);
}
