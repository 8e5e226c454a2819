use std::sync::{Arc, Mutex};

use sift::progress::{ProgressState, ProgressTracker, StatusFile, StatusSink};

#[derive(Clone)]
struct Recording {
    states: Arc<Mutex<Vec<ProgressState>>>,
}

impl Recording {
    fn new() -> Self {
        Self {
            states: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn last(&self) -> ProgressState {
        self.states.lock().unwrap().last().cloned().expect("no updates")
    }
}

impl StatusSink for Recording {
    fn write(&self, state: &ProgressState) {
        self.states.lock().unwrap().push(state.clone());
    }
}

#[test]
fn update_emits_full_state() {
    let sink = Recording::new();
    let tracker = ProgressTracker::new(Box::new(sink.clone()));

    tracker.update("Consolidating 40 ideas...", Some(15.0));
    let s = sink.last();
    assert_eq!(s.message, "Consolidating 40 ideas...");
    assert_eq!(s.progress, Some(15.0));
    assert!(!s.complete);
    assert!(!s.error);
    assert!(s.elapsed_seconds >= 0.0);
    assert!(s.eta_seconds.is_some());
    assert!(s.timestamp_ms > 0);
}

#[test]
fn zero_progress_has_no_eta() {
    let sink = Recording::new();
    let tracker = ProgressTracker::new(Box::new(sink.clone()));

    tracker.update("Starting consolidation...", Some(0.0));
    assert_eq!(sink.last().eta_seconds, None);

    tracker.update("thinking", None);
    assert_eq!(sink.last().eta_seconds, None);
}

#[test]
fn complete_pins_progress_and_eta() {
    let sink = Recording::new();
    let tracker = ProgressTracker::new(Box::new(sink.clone()));

    tracker.complete("Complete: 7 ideas, 3 problems, 2 workflows");
    let s = sink.last();
    assert!(s.complete);
    assert!(!s.error);
    assert_eq!(s.progress, Some(100.0));
    assert_eq!(s.eta_seconds, Some(0.0));
}

#[test]
fn fail_marks_error_without_completing() {
    let sink = Recording::new();
    let tracker = ProgressTracker::new(Box::new(sink.clone()));

    tracker.fail("Error: oracle returned 401");
    let s = sink.last();
    assert!(s.error);
    assert!(!s.complete);
    assert_eq!(s.message, "Error: oracle returned 401");
}

#[test]
fn status_file_writes_parseable_json_and_cleans_temp() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("consolidation_status.json");
    let tracker = ProgressTracker::new(Box::new(StatusFile::new(&path)));

    tracker.update("Ideas pass 1: batch 2/4", Some(27.5));

    let raw = std::fs::read_to_string(&path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v["message"], "Ideas pass 1: batch 2/4");
    assert_eq!(v["progress"], 27.5);
    assert_eq!(v["complete"], false);
    assert_eq!(v["error"], false);
    assert!(v["pid"].as_u64().unwrap() > 0);

    // rename leaves no temp file behind
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn status_file_replaces_prior_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("status.json");
    let tracker = ProgressTracker::new(Box::new(StatusFile::new(&path)));

    tracker.update("first", Some(10.0));
    tracker.complete("done");

    let v: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(v["message"], "done");
    assert_eq!(v["complete"], true);
}

#[test]
fn status_file_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("data").join("status.json");
    let tracker = ProgressTracker::new(Box::new(StatusFile::new(&path)));

    tracker.update("creating dirs", Some(1.0));
    assert!(path.exists());
}
