//! Full monitor cycles against an in-memory remote source.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use driftwatch::error::MonitorError;
use driftwatch::history::HistoryStore;
use driftwatch::monitor::MonitorService;
use driftwatch::notify::{NotificationHub, Report};
use tempfile::TempDir;

use crate::support::{test_config, MemorySource, RecordingNotifier};

const TARGET: &str = "/web/stages";

fn recording_service(history_file: &Path) -> (MonitorService, Rc<RefCell<Vec<Report>>>) {
    let (channel, sent) = RecordingNotifier::boxed();
    let mut hub = NotificationHub::new();
    hub.push(channel);
    let service = MonitorService::new(test_config(TARGET, history_file))
        .unwrap()
        .with_hub(hub);
    (service, sent)
}

fn seeded_source() -> MemorySource {
    let source = MemorySource::new();
    source.put("/web/stages/index.html", b"<html>");
    source.put("/web/stages/img/logo.png", b"png-bytes");
    source.put("/web/stages/img/icons/ok.svg", b"<svg>");
    source
}

#[test]
fn first_cycle_reports_every_file_as_new() {
    let temp = TempDir::new().unwrap();
    let history_file = temp.path().join("history.json");
    let (service, sent) = recording_service(&history_file);
    let source = seeded_source();

    let outcome = service.run_cycle_with(&source).unwrap();

    assert_eq!(outcome.scanned, 3);
    assert_eq!(outcome.changes.added.len(), 3);
    assert!(outcome.changes.modified.is_empty());
    assert!(outcome.changes.deleted.is_empty());
    assert_eq!(outcome.changes.unchanged, 0);
    assert_eq!(outcome.notified, 1);
    assert!(history_file.exists());

    let reports = sent.borrow();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].subject.contains("3 changes"));
    assert!(reports[0].body.contains("+ /web/stages/img/logo.png"));
}

#[test]
fn second_cycle_without_changes_stays_quiet() {
    let temp = TempDir::new().unwrap();
    let history_file = temp.path().join("history.json");
    let (service, sent) = recording_service(&history_file);
    let source = seeded_source();

    service.run_cycle_with(&source).unwrap();
    sent.borrow_mut().clear();

    let outcome = service.run_cycle_with(&source).unwrap();

    assert!(outcome.changes.is_empty());
    assert_eq!(outcome.changes.unchanged, 3);
    assert_eq!(outcome.notified, 0);
    assert!(sent.borrow().is_empty());
}

#[test]
fn content_change_is_detected_even_at_the_same_size() {
    let temp = TempDir::new().unwrap();
    let history_file = temp.path().join("history.json");
    let (service, sent) = recording_service(&history_file);
    let source = seeded_source();

    service.run_cycle_with(&source).unwrap();
    source.put("/web/stages/index.html", b"<HTML>");

    let outcome = service.run_cycle_with(&source).unwrap();

    assert_eq!(outcome.changes.modified.len(), 1);
    assert_eq!(outcome.changes.modified[0].path, "/web/stages/index.html");
    assert!(outcome.changes.added.is_empty());
    assert!(sent.borrow().last().unwrap().subject.contains("1 change"));
}

#[test]
fn missing_file_is_reported_as_deleted() {
    let temp = TempDir::new().unwrap();
    let history_file = temp.path().join("history.json");
    let (service, _sent) = recording_service(&history_file);
    let source = seeded_source();

    service.run_cycle_with(&source).unwrap();
    source.remove("/web/stages/img/logo.png");

    let outcome = service.run_cycle_with(&source).unwrap();

    assert_eq!(
        outcome.changes.deleted,
        vec!["/web/stages/img/logo.png".to_string()]
    );
    assert_eq!(outcome.changes.unchanged, 2);
}

#[test]
fn unreadable_known_file_keeps_its_previous_record() {
    let temp = TempDir::new().unwrap();
    let history_file = temp.path().join("history.json");
    let (service, _sent) = recording_service(&history_file);
    let source = seeded_source();

    service.run_cycle_with(&source).unwrap();
    source.poison_read("/web/stages/index.html");

    let outcome = service.run_cycle_with(&source).unwrap();

    // Still listed, so it must not surface as deleted or modified.
    assert!(outcome.changes.is_empty());
    let snapshot = HistoryStore::new(history_file).load().unwrap();
    assert!(snapshot.files.contains_key("/web/stages/index.html"));
}

#[test]
fn unreadable_new_file_is_left_out_of_the_snapshot() {
    let temp = TempDir::new().unwrap();
    let history_file = temp.path().join("history.json");
    let (service, sent) = recording_service(&history_file);
    let source = MemorySource::new();

    service.run_cycle_with(&source).unwrap();
    source.put("/web/stages/partial.bin", b"half-uploaded");
    source.poison_read("/web/stages/partial.bin");

    let outcome = service.run_cycle_with(&source).unwrap();

    assert_eq!(outcome.scanned, 1);
    assert!(outcome.changes.is_empty());
    assert!(sent.borrow().is_empty());
    let snapshot = HistoryStore::new(history_file).load().unwrap();
    assert!(snapshot.is_empty());
}

#[test]
fn listing_failure_aborts_the_cycle_before_any_diff() {
    let temp = TempDir::new().unwrap();
    let history_file = temp.path().join("history.json");
    let (service, sent) = recording_service(&history_file);
    let source = seeded_source();
    source.refuse_listings();

    let err = service.run_cycle_with(&source).unwrap_err();

    assert!(matches!(err, MonitorError::TransportError(_)));
    assert!(sent.borrow().is_empty());
    assert!(!history_file.exists());
}

#[test]
fn corrupt_history_is_treated_as_a_first_run() {
    let temp = TempDir::new().unwrap();
    let history_file = temp.path().join("history.json");
    fs::write(&history_file, "{ not json").unwrap();
    let (service, _sent) = recording_service(&history_file);
    let source = seeded_source();

    let outcome = service.run_cycle_with(&source).unwrap();

    assert_eq!(outcome.changes.added.len(), 3);
    // The cycle rewrites the file, so the next load is clean again.
    let snapshot = HistoryStore::new(history_file).load().unwrap();
    assert_eq!(snapshot.len(), 3);
}

#[test]
fn dry_run_never_notifies_or_persists() {
    let temp = TempDir::new().unwrap();
    let history_file = temp.path().join("history.json");
    let (service, sent) = recording_service(&history_file);
    let service = service.with_dry_run(true);
    let source = seeded_source();

    let outcome = service.run_cycle_with(&source).unwrap();

    assert_eq!(outcome.changes.added.len(), 3);
    assert_eq!(outcome.notified, 0);
    assert!(sent.borrow().is_empty());
    assert!(!history_file.exists());
}

#[test]
fn hidden_and_excluded_names_are_pruned_from_the_walk() {
    let temp = TempDir::new().unwrap();
    let history_file = temp.path().join("history.json");
    let (service, _sent) = recording_service(&history_file);
    let source = MemorySource::new();
    source.put("/web/stages/.git/config", b"[core]");
    source.put("/web/stages/upload.tmp", b"partial");
    source.put("/web/stages/ok.txt", b"done");

    let outcome = service.run_cycle_with(&source).unwrap();

    assert_eq!(outcome.scanned, 1);
    assert_eq!(outcome.changes.added.len(), 1);
    assert_eq!(outcome.changes.added[0].path, "/web/stages/ok.txt");
}

#[test]
fn include_pattern_narrows_files_but_still_walks_directories() {
    let temp = TempDir::new().unwrap();
    let history_file = temp.path().join("history.json");
    let mut config = test_config(TARGET, &history_file);
    config.monitor.include = "*.png".to_string();
    let service = MonitorService::new(config).unwrap();
    let source = MemorySource::new();
    source.put("/web/stages/readme.txt", b"text");
    source.put("/web/stages/img/logo.png", b"png-bytes");

    let outcome = service.run_cycle_with(&source).unwrap();

    assert_eq!(outcome.scanned, 1);
    assert_eq!(outcome.changes.added[0].path, "/web/stages/img/logo.png");
}
