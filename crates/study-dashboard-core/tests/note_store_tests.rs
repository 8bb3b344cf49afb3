//! Note store integration tests.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use study_dashboard_core::models::{NoteFields, SaveOutcome};
use study_dashboard_core::store::{Dataset, NoteStore, Table};

const DATASET: &str = "\
ID,age,sexe,objectives,tasks,comments,madrs_score_bl
P1,34,1,sleep,,first visit,22
P2,51,2,,,,30
P3,47,2,,journal,,18
";

fn setup_store() -> (tempfile::TempDir, PathBuf, NoteStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patients.csv");
    fs::write(&path, DATASET).unwrap();
    let store = NoteStore::new(&path);
    (dir, path, store)
}

#[test]
fn test_save_then_load_round_trip() {
    let (_dir, _path, store) = setup_store();
    let notes = NoteFields::new(
        "Walk 20 minutes, 3x per week",
        "Call a friend\nKeep a mood diary",
        "Says \"feeling better\", sleeps 7h",
    );

    store.save_notes("P2", &notes).unwrap();
    assert_eq!(store.load_notes("P2"), notes);
}

#[test]
fn test_update_keeps_other_rows_and_columns() {
    let (_dir, path, store) = setup_store();
    let before = Table::read(&path).unwrap().table;

    store
        .save_notes("P3", &NoteFields::new("run", "journal", "ok"))
        .unwrap();

    let after = Table::read(&path).unwrap().table;
    assert_eq!(after.headers, before.headers);
    assert_eq!(after.rows[0], before.rows[0]);
    assert_eq!(after.rows[1], before.rows[1]);
    assert_eq!(after.rows[2], vec!["P3", "47", "2", "run", "journal", "ok", "18"]);
}

#[test]
fn test_unknown_id_appends_exactly_one_row() {
    let (_dir, path, store) = setup_store();
    let before = Table::read(&path).unwrap().table;

    let outcome = store
        .save_notes("P99", &NoteFields::new("o", "t", "c"))
        .unwrap();
    assert_eq!(outcome, SaveOutcome::Appended);

    let after = Table::read(&path).unwrap().table;
    assert_eq!(after.len(), before.len() + 1);
    assert_eq!(&after.rows[..before.len()], &before.rows[..]);
    assert_eq!(after.rows[3], vec!["P99", "", "", "o", "t", "c", ""]);
}

#[test]
fn test_load_unknown_id_is_empty() {
    let (_dir, _path, store) = setup_store();
    let notes = store.load_notes("P99");
    assert_eq!(notes.values(), ["", "", ""]);
}

#[test]
fn test_saved_dataset_still_validates() {
    let (_dir, path, store) = setup_store();
    store
        .save_notes("P4", &NoteFields::new("a", "", ""))
        .unwrap();
    store
        .save_notes("P1", &NoteFields::new("b", "", ""))
        .unwrap();

    let ds = Dataset::load(&path).unwrap();
    assert_eq!(ds.len(), 4);
    assert_eq!(ds.get("P1").unwrap().notes.objectives, "b");
    assert_eq!(ds.get("P1").unwrap().demographics.age, Some(34.0));
}

#[test]
fn test_latin1_file_rewritten_as_utf8() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patients.csv");
    fs::write(&path, b"ID,comorbidities\nP1,Hypertension art\xE9rielle\n").unwrap();

    let store = NoteStore::new(&path);
    store
        .save_notes("P1", &NoteFields::new("marcher", "", ""))
        .unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("Hypertension artérielle"));
    assert_eq!(store.load_notes("P1").objectives, "marcher");
}

#[test]
fn test_concurrent_saves_lose_nothing() {
    let (_dir, path, store) = setup_store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let id = format!("N{i}");
                let notes = NoteFields::new(format!("goal {i}"), "", "");
                store.save_notes(&id, &notes).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let ds = Dataset::load(&path).unwrap();
    assert_eq!(ds.len(), 3 + 8);
    for i in 0..8 {
        let id = format!("N{i}");
        assert_eq!(store.load_notes(&id).objectives, format!("goal {i}"));
    }
}

#[test]
fn test_null_marker_id_never_written() {
    let (_dir, path, store) = setup_store();
    assert!(store.save_notes("NA", &NoteFields::new("o", "", "")).is_err());

    let ds = Dataset::load(&path).unwrap();
    assert!(ds.load_failure().is_none());
    assert_eq!(ds.len(), 3);
}
