// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, params};
use std::fs;
use taskledger::commands::migrate::{Outcome, checksum, run_migrations};
use taskledger::db;
use tempfile::tempdir;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn status_of(conn: &Connection, file: &str) -> Option<(String, Option<String>)> {
    conn.query_row(
        "SELECT status, error FROM schema_migrations WHERE filename=?1",
        params![file],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .ok()
}

#[test]
fn applies_in_order_then_skips() {
    let conn = setup();
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("002_seed.sql"),
        "INSERT INTO labels(name) VALUES('urgent');",
    )
    .unwrap();
    fs::write(
        dir.path().join("001_labels.sql"),
        "CREATE TABLE labels(id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    )
    .unwrap();
    fs::write(dir.path().join("README.md"), "not a migration").unwrap();

    let first = run_migrations(&conn, dir.path()).unwrap();
    let names: Vec<&str> = first.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, vec!["001_labels.sql", "002_seed.sql"]);
    assert!(
        first
            .iter()
            .all(|r| matches!(r.outcome, Outcome::Applied { .. }))
    );
    assert_eq!(
        first[0].checksum,
        checksum("CREATE TABLE labels(id INTEGER PRIMARY KEY, name TEXT NOT NULL);")
    );

    let second = run_migrations(&conn, dir.path()).unwrap();
    assert!(second.iter().all(|r| r.outcome == Outcome::Skipped));
    let labels: i64 = conn
        .query_row("SELECT COUNT(*) FROM labels", [], |r| r.get(0))
        .unwrap();
    assert_eq!(labels, 1);
}

#[test]
fn failure_rolls_back_and_stops_the_run() {
    let conn = setup();
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("001_ok.sql"),
        "CREATE TABLE a(id INTEGER PRIMARY KEY);",
    )
    .unwrap();
    fs::write(
        dir.path().join("002_bad.sql"),
        "CREATE TABLE b(id INTEGER PRIMARY KEY); INSERT INTO nowhere VALUES(1);",
    )
    .unwrap();
    fs::write(
        dir.path().join("003_never.sql"),
        "CREATE TABLE c(id INTEGER PRIMARY KEY);",
    )
    .unwrap();

    let results = run_migrations(&conn, dir.path()).unwrap();
    assert_eq!(results.len(), 2);
    assert!(matches!(results[1].outcome, Outcome::Failed { .. }));

    let (status, error) = status_of(&conn, "002_bad.sql").unwrap();
    assert_eq!(status, "failed");
    assert!(error.unwrap().contains("nowhere"));
    assert!(status_of(&conn, "003_never.sql").is_none());

    // Partial work of the failed file is gone.
    let b_exists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='b'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(b_exists, 0);

    // Fixing the file lets a later run pick it up again.
    fs::write(
        dir.path().join("002_bad.sql"),
        "CREATE TABLE b(id INTEGER PRIMARY KEY);",
    )
    .unwrap();
    let results = run_migrations(&conn, dir.path()).unwrap();
    let outcomes: Vec<bool> = results
        .iter()
        .map(|r| matches!(r.outcome, Outcome::Applied { .. }))
        .collect();
    assert_eq!(outcomes, vec![false, true, true]);
    assert_eq!(status_of(&conn, "002_bad.sql").unwrap().0, "applied");
}

#[test]
fn edited_applied_migration_is_an_error() {
    let conn = setup();
    let dir = tempdir().unwrap();
    let file = dir.path().join("001_a.sql");
    fs::write(&file, "CREATE TABLE a(id INTEGER PRIMARY KEY);").unwrap();
    run_migrations(&conn, dir.path()).unwrap();

    fs::write(&file, "CREATE TABLE a(id INTEGER PRIMARY KEY, x TEXT);").unwrap();
    let err = run_migrations(&conn, dir.path()).unwrap_err();
    assert!(err.to_string().contains("changed after it was applied"), "{err}");
}
