mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pipewright::errors::PipelineError;
use pipewright::graph::task::{action, StageReport, Task};
use pipewright::graph::{Scheduler, TaskGraph};

use common::{event_log, recording};

#[test]
fn duplicate_names_are_rejected() {
    let log = event_log();
    let mut graph = TaskGraph::new();
    graph.register("styles", &[], recording(&log, "styles", Duration::ZERO)).unwrap();

    let err = graph
        .register("styles", &[], recording(&log, "styles", Duration::ZERO))
        .unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateTask(name) if name == "styles"));
}

#[test]
fn dependencies_must_exist_at_registration() {
    let log = event_log();
    let mut graph = TaskGraph::new();

    let err = graph
        .register("markup", &["styles"], recording(&log, "markup", Duration::ZERO))
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::UnknownDependency { task, dependency }
            if task == "markup" && dependency == "styles"
    ));
}

#[tokio::test]
async fn unknown_target_fails_before_anything_runs() {
    let log = event_log();
    let mut graph = TaskGraph::new();
    graph.register("styles", &[], recording(&log, "styles", Duration::ZERO)).unwrap();

    let err = Scheduler::new(graph).run(&["nope"]).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnknownTarget(name) if name == "nope"));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cycles_are_reported_before_any_task_executes() {
    let invocations = Arc::new(AtomicUsize::new(0));

    let counted = |invocations: &Arc<AtomicUsize>| {
        let invocations = Arc::clone(invocations);
        action(move || {
            let invocations = Arc::clone(&invocations);
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok(StageReport::default())
            }
        })
    };

    let graph = TaskGraph::from_tasks(vec![
        Task::new("a", ["c"], counted(&invocations)),
        Task::new("b", ["a"], counted(&invocations)),
        Task::new("c", ["b"], counted(&invocations)),
    ])
    .unwrap();

    let err = Scheduler::new(graph).run(&["a"]).await.unwrap_err();
    match err {
        PipelineError::Cycle(path) => {
            assert!(path.contains("a") && path.contains(" -> "), "path was {path:?}");
        }
        other => panic!("expected cycle, got {other:?}"),
    }
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}
