// tests/scenarios.rs

use std::sync::Arc;

use anyhow::anyhow;
use taskgraph::{Task, TaskGraph, TaskState};
use taskgraph_test_utils::{
    DelegateEvent, EventCapture, ManualExecutor, ParkedBodies, RecordingDelegate, init_tracing,
};

fn manual_graph() -> (TaskGraph, ManualExecutor) {
    init_tracing();
    let executor = ManualExecutor::new();
    (TaskGraph::named("scenarios", executor.clone()), executor)
}

#[test]
fn fresh_task_is_ready() {
    let task = Task::new("fresh");
    assert_eq!(task.state(), TaskState::Ready);
    assert!(task.is_ready());
}

#[test]
fn task_with_prerequisites_is_pending_after_add() {
    let (mut graph, _exec) = manual_graph();
    let a = Task::new("a");
    let b = Task::new("b");
    graph.add_task(&a, &[]);
    graph.add_task(&b, &[&a]);

    assert!(a.is_ready());
    assert_eq!(b.state(), TaskState::Pending);
}

#[test]
fn linear_chain_starts_dependent_automatically() {
    let (mut graph, exec) = manual_graph();
    let a = Task::from_fn("a", |ctx| {
        ctx.finish_with_result(42i32);
    });
    let b = Task::from_fn("b", |ctx| {
        let upstream = ctx.task().prerequisite_tasks()[0].result_as::<i32>();
        match upstream {
            Some(v) => ctx.finish_with_result(*v + 1),
            None => ctx.fail_with_error(anyhow!("missing upstream result")),
        };
    });
    graph.add_task(&a, &[]);
    graph.add_task(&b, &[&a]);

    assert_eq!(graph.start(), 1);
    assert!(a.is_executing());
    assert!(b.is_pending());
    assert_eq!(exec.queued(), 1);

    // A's body finishes with 42; B is started without further caller action.
    assert!(exec.run_next());
    assert!(a.is_finished());
    assert_eq!(a.result_as::<i32>().as_deref(), Some(&42));
    assert!(a.finish_date().is_some());
    assert!(b.is_executing());

    exec.run_until_idle();
    assert!(b.is_finished());
    assert_eq!(b.result_as::<i32>().as_deref(), Some(&43));
    assert!(!graph.has_unfinished_tasks());
}

fn fan_in(first: &str, second: &str) {
    let (mut graph, exec) = manual_graph();
    let parked = ParkedBodies::new();
    let a = parked.task("a");
    let b = parked.task("b");
    let c = parked.task("c");
    graph.add_task(&a, &[]);
    graph.add_task(&b, &[]);
    graph.add_task(&c, &[&a, &b]);

    assert_eq!(graph.start(), 2);
    exec.run_until_idle();

    assert!(parked.take(first).finish());
    exec.run_until_idle();
    assert!(c.is_pending(), "c must wait for {second}");
    assert_eq!(parked.runs("c"), 0);

    assert!(parked.take(second).finish());
    assert!(c.is_executing());
    exec.run_until_idle();
    assert_eq!(parked.runs("c"), 1);

    parked.take("c").finish();
    assert!(!graph.has_unfinished_tasks());
    assert_eq!(parked.runs("c"), 1);
}

#[test]
fn fan_in_waits_for_all_prerequisites_a_first() {
    fan_in("a", "b");
}

#[test]
fn fan_in_waits_for_all_prerequisites_b_first() {
    fan_in("b", "a");
}

#[test]
fn failure_blocks_downstream_until_retried() {
    let (mut graph, exec) = manual_graph();
    let parked = ParkedBodies::new();
    let a = parked.task("a");
    let b = parked.task("b");
    graph.add_task(&a, &[]);
    graph.add_task(&b, &[&a]);

    graph.start();
    exec.run_until_idle();
    assert!(parked.take("a").fail_with_error(anyhow!("disk full")));

    assert!(a.is_failed());
    assert!(graph.has_failed_tasks());
    assert!(a.error().is_some_and(|e| e.to_string() == "disk full"));
    assert!(a.result().is_none());
    exec.run_until_idle();
    assert!(b.is_pending());
    assert_eq!(parked.runs("b"), 0);

    a.retry();
    assert!(a.is_executing());
    assert!(a.error().is_none(), "retry clears the previous outcome");
    assert!(b.is_pending());
    exec.run_until_idle();

    parked.take("a").finish_with_result(1i32);
    assert!(b.is_executing());
    assert!(!graph.has_failed_tasks());
}

#[test]
fn completion_is_idempotent_and_delegate_runs_once() {
    let (mut graph, exec) = manual_graph();
    let outcomes = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = Arc::clone(&outcomes);
    let task = Task::from_fn("twice", move |ctx| {
        let mut seen = seen.lock().unwrap();
        seen.push(ctx.finish_with_result(1i32));
        seen.push(ctx.finish_with_result(2i32));
        seen.push(ctx.fail_with_error(anyhow!("too late")));
    });
    let delegate = Arc::new(RecordingDelegate::new());
    task.set_delegate(&delegate);
    graph.add_task(&task, &[]);

    graph.start();
    exec.run_until_idle();

    assert_eq!(*outcomes.lock().unwrap(), vec![true, false, false]);
    assert!(task.is_finished());
    assert_eq!(task.result_as::<i32>().as_deref(), Some(&1));
    assert!(task.error().is_none());
    assert_eq!(
        delegate.events(),
        vec![DelegateEvent::Finished("twice".to_string(), Some(1))]
    );

    // Direct completion on a finished task is also ignored.
    assert!(!task.finish());
    assert_eq!(delegate.count(), 1);
}

#[test]
fn cancellation_propagates_through_unstarted_chain() {
    let (mut graph, exec) = manual_graph();
    let a = Task::new("a");
    let b = Task::new("b");
    let c = Task::new("c");
    graph.add_task(&a, &[]);
    graph.add_task(&b, &[&a]);
    graph.add_task(&c, &[&b]);

    a.cancel();

    assert!(a.is_cancelled());
    assert!(b.is_cancelled());
    assert!(c.is_cancelled());
    assert_eq!(exec.queued(), 0);
    assert!(graph.has_unfinished_tasks());
    assert!(!graph.has_failed_tasks());
}

#[test]
fn cancellation_reaches_chain_in_prerequisite_order() {
    let (mut graph, _exec) = manual_graph();
    let a = Task::new("a");
    let b = Task::new("b");
    let c = Task::new("c");
    graph.add_task(&a, &[]);
    graph.add_task(&b, &[&a]);
    graph.add_task(&c, &[&b]);

    let capture = EventCapture::new();
    {
        let _guard = capture.set_default();
        a.cancel();
    }

    assert_eq!(capture.field_values("task cancelled", "task"), vec!["a", "b", "c"]);
    assert_eq!(
        capture.field_values("task cancelled", "from"),
        vec!["Ready", "Pending", "Pending"]
    );

    // Already cancelled: a second walk logs nothing new.
    let again = EventCapture::new();
    {
        let _guard = again.set_default();
        a.cancel();
    }
    assert!(again.field_values("task cancelled", "task").is_empty());
}

#[test]
fn cancel_does_not_touch_finished_tasks_but_reaches_past_them() {
    let (mut graph, exec) = manual_graph();
    let parked = ParkedBodies::new();
    let a = parked.task("a");
    let b = parked.task("b");
    let c = parked.task("c");
    graph.add_task(&a, &[]);
    graph.add_task(&b, &[&a]);
    graph.add_task(&c, &[&b]);

    graph.start();
    exec.run_until_idle();
    parked.take("a").finish();
    exec.run_until_idle();

    graph.cancel();
    assert!(a.is_finished());
    assert!(b.is_cancelled());
    assert!(c.is_cancelled());

    // The parked body of b sees the cancellation and its late completion is
    // discarded.
    let ctx = parked.take("b");
    assert!(ctx.is_cancelled());
    assert!(!ctx.finish());
    assert!(b.is_cancelled());
}

#[test]
fn cancelled_body_that_never_ran_is_skipped() {
    let (mut graph, exec) = manual_graph();
    let parked = ParkedBodies::new();
    let a = parked.task("a");
    graph.add_task(&a, &[]);

    graph.start();
    a.cancel();
    exec.run_until_idle();

    assert_eq!(parked.runs("a"), 0);
    assert!(a.is_cancelled());
}

#[test]
fn retry_after_cancel_restores_ready_roots_and_pending_dependents() {
    let (mut graph, exec) = manual_graph();
    let parked = ParkedBodies::new();
    let a = parked.task("a");
    let b = parked.task("b");
    let c = parked.task("c");
    graph.add_task(&a, &[]);
    graph.add_task(&b, &[&a]);
    graph.add_task(&c, &[&b]);

    graph.cancel();
    graph.retry();

    assert!(a.is_executing(), "root with no prerequisites restarts");
    assert!(b.is_pending());
    assert!(c.is_pending());

    exec.run_until_idle();
    parked.take("a").finish();
    exec.run_until_idle();
    parked.take("b").finish();
    exec.run_until_idle();
    parked.take("c").finish();
    assert!(!graph.has_unfinished_tasks());
}

#[test]
fn retry_of_failed_task_with_finished_prerequisites_restarts_it() {
    let (mut graph, exec) = manual_graph();
    let parked = ParkedBodies::new();
    let a = parked.task("a");
    let b = parked.task("b");
    let c = parked.task("c");
    graph.add_task(&a, &[]);
    graph.add_task(&b, &[&a]);
    graph.add_task(&c, &[&b]);

    graph.start();
    exec.run_until_idle();
    parked.take("a").finish();
    exec.run_until_idle();
    parked.take("b").fail_with_error(anyhow!("flaky"));
    assert!(c.is_pending());

    b.retry();
    assert!(a.is_finished(), "retry never resets finished tasks");
    assert!(b.is_executing());
    assert!(c.is_pending());

    exec.run_until_idle();
    assert_eq!(parked.runs("b"), 2);
    parked.take("b").finish();
    assert!(c.is_executing());
}

#[test]
fn retry_on_finished_task_still_reaches_dependents() {
    let (mut graph, exec) = manual_graph();
    let parked = ParkedBodies::new();
    let a = parked.task("a");
    let b = parked.task("b");
    graph.add_task(&a, &[]);
    graph.add_task(&b, &[&a]);

    graph.start();
    exec.run_until_idle();
    parked.take("a").finish();
    exec.run_until_idle();
    b.cancel();
    assert!(b.is_cancelled());

    // a is Finished and unaffected; b is Cancelled with all prerequisites
    // finished, so it becomes Ready and starts.
    a.retry();
    assert!(a.is_finished());
    assert!(b.is_executing());
}
