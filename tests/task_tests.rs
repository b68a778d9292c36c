// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::{Connection, params};
use taskledger::commands::columns::list_columns;
use taskledger::commands::notifications::list_notifications;
use taskledger::commands::projects::{Split, create_project};
use taskledger::commands::tasks::{
    NewTask, add_task, comment_on_task, load_task, move_task, query_tasks,
};
use taskledger::commands::users::list_users;
use taskledger::deadline::DeadlineStatus;
use taskledger::models::Priority;
use taskledger::{cli, commands, db, utils};

fn setup() -> (Connection, i64) {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute("INSERT INTO organizations(name) VALUES('Acme')", [])
        .unwrap();
    for name in ["ana", "bruno", "carla"] {
        conn.execute("INSERT INTO users(name) VALUES(?1)", params![name])
            .unwrap();
    }
    let project = create_project(
        &conn,
        1,
        "Website",
        "1000".parse().unwrap(),
        Split::default(),
        None,
    )
    .unwrap();
    (conn, project)
}

fn run(conn: &Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["taskledger"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    match matches.subcommand() {
        Some(("task", sub)) => commands::tasks::handle(conn, sub),
        Some(("column", sub)) => commands::columns::handle(conn, sub),
        Some(("config", sub)) => commands::config::handle(conn, sub),
        _ => panic!("command not parsed"),
    }
}

fn user(conn: &Connection, name: &str) -> i64 {
    utils::id_for_user(conn, name).unwrap()
}

#[test]
fn tasks_land_in_the_first_column() {
    let (conn, project) = setup();
    run(
        &conn,
        &[
            "task", "add", "--project", "Website", "--title", "Landing page", "--assignee", "ANA",
            "--priority", "high", "--due", "2024-06-10",
        ],
    )
    .unwrap();
    let (column, priority, assignee): (String, String, i64) = conn
        .query_row(
            "SELECT c.name, t.priority, t.assignee_id FROM tasks t
             JOIN board_columns c ON c.id=t.column_id WHERE t.project_id=?1",
            params![project],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(column, "To Do");
    assert_eq!(priority, "high");
    assert_eq!(assignee, user(&conn, "ana"));

    let inbox = list_notifications(&conn, user(&conn, "ana"), true).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, "assigned");
}

#[test]
fn bad_priority_or_due_date_is_rejected() {
    let (conn, _) = setup();
    assert!(run(
        &conn,
        &["task", "add", "--project", "Website", "--title", "X", "--priority", "asap"],
    )
    .is_err());
    assert!(run(
        &conn,
        &["task", "add", "--project", "Website", "--title", "X", "--due", "next week"],
    )
    .is_err());
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM tasks", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn project_without_columns_cannot_take_tasks() {
    let (conn, project) = setup();
    conn.execute(
        "DELETE FROM board_columns WHERE project_id=?1",
        params![project],
    )
    .unwrap();
    let err = add_task(&conn, project, &NewTask::titled("Orphan"), None).unwrap_err();
    assert!(err.to_string().contains("no board columns"), "{err}");
}

#[test]
fn columns_append_after_the_last_one() {
    let (conn, project) = setup();
    run(
        &conn,
        &["column", "add", "--project", "Website", "--name", "Review"],
    )
    .unwrap();
    let position: i64 = conn
        .query_row(
            "SELECT position FROM board_columns WHERE project_id=?1 AND name='Review'",
            params![project],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(position, 3);
}

#[test]
fn mentions_notify_known_users_except_the_author() {
    let (conn, project) = setup();
    let ana = user(&conn, "ana");
    let mut t = NewTask::titled("Copy review");
    t.description = Some("@bruno please check with @Carla and @ghost. Thanks @ana".into());
    let task = add_task(&conn, project, &t, Some(ana)).unwrap();

    assert!(list_notifications(&conn, ana, false).unwrap().is_empty());
    let bruno = list_notifications(&conn, user(&conn, "bruno"), false).unwrap();
    assert_eq!(bruno.len(), 1);
    assert_eq!(bruno[0].kind, "mention");
    assert_eq!(bruno[0].task_id, Some(task));
    assert_eq!(
        list_notifications(&conn, user(&conn, "carla"), false)
            .unwrap()
            .len(),
        1
    );

    let notified = comment_on_task(&conn, task, "ping @bruno @bruno", Some(ana)).unwrap();
    assert_eq!(notified, vec![user(&conn, "bruno")]);
    assert_eq!(
        list_notifications(&conn, user(&conn, "bruno"), true)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn deadlines_are_flagged_relative_to_now() {
    let (conn, project) = setup();
    let now = NaiveDate::from_ymd_opt(2024, 6, 10)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    for (title, due) in [
        ("late", "2024-06-01"),
        ("soon", "2024-06-10 12:00"),
        ("tomorrow", "2024-06-11T12:00:00"),
        ("later", "2024-06-20"),
    ] {
        let mut t = NewTask::titled(title);
        t.due_date = Some(due.into());
        add_task(&conn, project, &t, None).unwrap();
    }
    let mut done = NewTask::titled("shipped");
    done.due_date = Some("2024-06-01".into());
    let done_id = add_task(&conn, project, &done, None).unwrap();
    move_task(&conn, done_id, "done").unwrap();

    let rows = query_tasks(&conn, project, None, now).unwrap();
    let status = |title: &str| rows.iter().find(|r| r.title == title).unwrap().deadline;
    assert_eq!(status("late"), Some(DeadlineStatus::Overdue));
    assert_eq!(status("soon"), Some(DeadlineStatus::Urgent));
    assert_eq!(status("tomorrow"), Some(DeadlineStatus::Warning));
    assert_eq!(status("later"), None);
    assert_eq!(status("shipped"), None);
}

#[test]
fn config_values_are_validated() {
    let (conn, _) = setup();
    run(&conn, &["config", "set", "currency", "eur"]).unwrap();
    assert_eq!(utils::get_currency(&conn).unwrap(), "EUR");
    assert!(run(&conn, &["config", "set", "currency", "EURO"]).is_err());
    assert!(run(&conn, &["config", "set", "locale", "fr-FR"]).is_err());
    assert!(run(&conn, &["config", "set", "theme", "dark"]).is_err());

    run(&conn, &["config", "set", "locale", "de-DE"]).unwrap();
    assert_eq!(
        utils::display_money(&conn, "1234.5".parse().unwrap()).unwrap(),
        "1.234,50 €"
    );
}

#[test]
fn moving_through_done_tracks_completion() {
    let (conn, project) = setup();
    let mut t = NewTask::titled("Ship it");
    t.priority = Priority::Urgent;
    let id = add_task(&conn, project, &t, None).unwrap();

    let task = load_task(&conn, id).unwrap();
    assert_eq!(task.project_id, project);
    assert_eq!(task.priority, Priority::Urgent);
    assert!(task.completed_at.is_none());

    move_task(&conn, id, " DONE ").unwrap();
    let first = load_task(&conn, id).unwrap().completed_at;
    assert!(first.is_some());
    move_task(&conn, id, "Done").unwrap();
    assert_eq!(load_task(&conn, id).unwrap().completed_at, first);

    move_task(&conn, id, "in progress").unwrap();
    let task = load_task(&conn, id).unwrap();
    assert!(task.completed_at.is_none());
    let columns = list_columns(&conn, project).unwrap();
    assert_eq!(columns[1].id, task.column_id);
    assert!(!columns[1].is_done && columns[2].is_done);

    assert!(move_task(&conn, id, "Archive").is_err());
    assert!(load_task(&conn, 9999).is_err());
}

#[test]
fn users_are_listed_by_name() {
    let (conn, _) = setup();
    let names: Vec<String> = list_users(&conn)
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, vec!["ana", "bruno", "carla"]);
}
