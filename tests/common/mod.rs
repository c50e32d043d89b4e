#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pipewright::graph::task::{action, StageReport, TaskAction};

/// What a recording task appends to the shared log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(String),
    Finished(String),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// An action that records start and finish around an optional sleep, so tests
/// can assert both ordering and overlap.
pub fn recording(log: &EventLog, name: &'static str, delay: Duration) -> TaskAction {
    let log = Arc::clone(log);
    action(move || {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(Event::Started(name.to_string()));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            log.lock().unwrap().push(Event::Finished(name.to_string()));
            Ok(StageReport::default())
        }
    })
}

/// An action that fails after recording its start.
pub fn failing(log: &EventLog, name: &'static str) -> TaskAction {
    let log = Arc::clone(log);
    action(move || {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(Event::Started(name.to_string()));
            Err(pipewright::errors::TransformError::MissingEntry(
                name.into(),
            ))
        }
    })
}

/// Index of the first matching event, panicking when absent.
pub fn position(events: &[Event], needle: &Event) -> usize {
    events
        .iter()
        .position(|e| e == needle)
        .unwrap_or_else(|| panic!("event {needle:?} not found in {events:?}"))
}
