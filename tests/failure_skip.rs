mod common;

use std::time::Duration;

use pipewright::errors::PipelineError;
use pipewright::graph::{Scheduler, TaskGraph, TaskStatus};

use common::{event_log, failing, recording, Event};

/// One failing branch: its dependents are skipped, the independent branch
/// still completes, and the aggregate error names the failed task.
#[tokio::test]
async fn failure_skips_dependents_but_not_siblings() {
    let log = event_log();

    let mut graph = TaskGraph::new();
    graph.register("bundle", &[], failing(&log, "bundle")).unwrap();
    graph
        .register("markup", &["bundle"], recording(&log, "markup", Duration::ZERO))
        .unwrap();
    graph
        .register("inline", &["markup"], recording(&log, "inline", Duration::ZERO))
        .unwrap();
    graph.register("images", &[], recording(&log, "images", Duration::ZERO)).unwrap();

    let err = Scheduler::new(graph)
        .run(&["inline", "images"])
        .await
        .unwrap_err();

    let PipelineError::RunFailure(failure) = err else {
        panic!("expected run failure, got {err:?}");
    };

    assert_eq!(failure.failures.len(), 1);
    assert_eq!(failure.failures[0].task, "bundle");

    assert_eq!(failure.statuses["bundle"], TaskStatus::Failed);
    assert_eq!(failure.statuses["markup"], TaskStatus::Skipped);
    assert_eq!(failure.statuses["inline"], TaskStatus::Skipped);
    assert_eq!(failure.statuses["images"], TaskStatus::Done);

    let events = log.lock().unwrap().clone();
    assert!(!events.contains(&Event::Started("markup".into())));
    assert!(!events.contains(&Event::Started("inline".into())));
    assert!(events.contains(&Event::Finished("images".into())));
}

#[tokio::test]
async fn multiple_failures_are_all_reported() {
    let log = event_log();

    let mut graph = TaskGraph::new();
    graph.register("styles", &[], failing(&log, "styles")).unwrap();
    graph.register("bundle", &[], failing(&log, "bundle")).unwrap();
    graph.register("copy", &[], recording(&log, "copy", Duration::ZERO)).unwrap();

    let err = Scheduler::new(graph)
        .run(&["styles", "bundle", "copy"])
        .await
        .unwrap_err();

    let PipelineError::RunFailure(failure) = err else {
        panic!("expected run failure, got {err:?}");
    };

    let mut failed: Vec<&str> = failure.failures.iter().map(|f| f.task.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["bundle", "styles"]);
    assert_eq!(failure.statuses["copy"], TaskStatus::Done);
}

/// A panicking action is contained like a failure rather than tearing down
/// the run.
#[tokio::test]
async fn panics_are_contained_as_failures() {
    use pipewright::graph::task::{action, StageReport};

    let log = event_log();

    let mut graph = TaskGraph::new();
    graph
        .register(
            "exploding",
            &[],
            action(|| async {
                assert!(false, "boom");
                Ok(StageReport::default())
            }),
        )
        .unwrap();
    graph
        .register("dependent", &["exploding"], recording(&log, "dependent", Duration::ZERO))
        .unwrap();
    graph.register("bystander", &[], {
        let log = std::sync::Arc::clone(&log);
        action(move || {
            let log = std::sync::Arc::clone(&log);
            async move {
                log.lock().unwrap().push(Event::Finished("bystander".into()));
                Ok(StageReport::default())
            }
        })
    })
    .unwrap();

    let err = Scheduler::new(graph)
        .run(&["dependent", "bystander"])
        .await
        .unwrap_err();

    let PipelineError::RunFailure(failure) = err else {
        panic!("expected run failure, got {err:?}");
    };
    assert_eq!(failure.statuses["exploding"], TaskStatus::Failed);
    assert_eq!(failure.statuses["dependent"], TaskStatus::Skipped);
    assert_eq!(failure.statuses["bystander"], TaskStatus::Done);
}
