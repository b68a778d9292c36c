// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::Connection;
use rust_decimal::Decimal;
use taskledger::{allocation, cli, commands, db};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute("INSERT INTO organizations(name) VALUES('Acme')", [])
        .unwrap();
    conn
}

fn run(conn: &Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["taskledger"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    match matches.subcommand() {
        Some(("project", sub)) => commands::projects::handle(conn, sub),
        Some(("expense", sub)) => commands::expenses::handle(conn, sub),
        _ => panic!("command not parsed"),
    }
}

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn project_id(conn: &Connection) -> i64 {
    conn.query_row("SELECT id FROM projects WHERE name='Website'", [], |r| {
        r.get(0)
    })
    .unwrap()
}

#[test]
fn budget_expenses_and_split_end_to_end() {
    let conn = setup();
    run(
        &conn,
        &[
            "project", "add", "--org", "Acme", "--name", " Website ", "--budget", "10000",
            "--company", "50", "--team", "40", "--finder", "10",
        ],
    )
    .unwrap();
    run(
        &conn,
        &["expense", "add", "--project", "Website", "--amount", "3000", "--date", "2024-01-05"],
    )
    .unwrap();
    run(
        &conn,
        &[
            "expense", "add", "--project", "Website", "--amount", "1000", "--kind", "overhead",
            "--date", "2024-01-06",
        ],
    )
    .unwrap();

    let id = project_id(&conn);
    let fin = allocation::load_financials(&conn, id).unwrap().unwrap();
    assert_eq!(fin.total_expenses, d("4000"));
    assert_eq!(fin.gross_profit, d("6000"));
    assert!(!fin.is_frozen);
    assert_eq!(fin.company_earnings, d("3000"));
    assert_eq!(fin.team_pool, d("2400"));
    assert_eq!(fin.finder_commission, d("600"));

    let p = allocation::load_project(&conn, id).unwrap();
    assert_eq!(p.direct_expenses, d("3000"));
    assert_eq!(p.overhead_expenses, d("1000"));
}

#[test]
fn rejected_split_changes_nothing() {
    let conn = setup();
    run(
        &conn,
        &["project", "add", "--org", "Acme", "--name", "Website", "--budget", "10000"],
    )
    .unwrap();

    let err = run(
        &conn,
        &[
            "project", "split", "--project", "Website", "--company", "60", "--team", "30",
            "--finder", "9",
        ],
    )
    .unwrap_err();
    assert!(err.to_string().contains("must add up to 100%"), "{err}");

    let p = allocation::load_project(&conn, project_id(&conn)).unwrap();
    assert_eq!(p.company_share_pct, d("50"));
    assert_eq!(p.team_share_pct, d("40"));
    assert_eq!(p.finder_commission_pct, d("10"));

    run(
        &conn,
        &[
            "project", "split", "--project", "Website", "--company", "60", "--team", "30",
            "--finder", "10",
        ],
    )
    .unwrap();
    let fin = allocation::load_financials(&conn, project_id(&conn))
        .unwrap()
        .unwrap();
    assert_eq!(fin.company_earnings, d("6000"));
    assert_eq!(fin.team_pool, d("3000"));
}

#[test]
fn project_add_rejects_bad_split_before_insert() {
    let conn = setup();
    let err = run(
        &conn,
        &[
            "project", "add", "--org", "Acme", "--name", "Website", "--budget", "100",
            "--company", "70", "--team", "40",
        ],
    )
    .unwrap_err();
    assert!(err.to_string().contains("120"), "{err}");
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM projects", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn freezing_suspends_the_split() {
    let conn = setup();
    run(
        &conn,
        &["project", "add", "--org", "Acme", "--name", "Website", "--budget", "10000"],
    )
    .unwrap();
    run(&conn, &["project", "freeze", "--project", "Website"]).unwrap();

    let id = project_id(&conn);
    let fin = allocation::load_financials(&conn, id).unwrap().unwrap();
    assert!(fin.is_frozen);
    assert_eq!(fin.gross_profit, d("10000"));
    assert!(fin.company_earnings.is_zero());
    assert!(fin.team_pool.is_zero());

    run(&conn, &["project", "unfreeze", "--project", &id.to_string()]).unwrap();
    let fin = allocation::load_financials(&conn, id).unwrap().unwrap();
    assert!(!fin.is_frozen);
    assert_eq!(fin.team_pool, d("4000"));
}

#[test]
fn new_projects_get_a_default_board() {
    let conn = setup();
    run(
        &conn,
        &["project", "add", "--org", "Acme", "--name", "Website", "--budget", "1"],
    )
    .unwrap();
    let mut stmt = conn
        .prepare("SELECT name, is_done FROM board_columns ORDER BY position")
        .unwrap();
    let cols: Vec<(String, bool)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(
        cols,
        vec![
            ("To Do".to_string(), false),
            ("In Progress".to_string(), false),
            ("Done".to_string(), true),
        ]
    );
}

#[test]
fn project_card_names_the_finder() {
    let conn = setup();
    conn.execute("INSERT INTO users(name) VALUES('carla')", [])
        .unwrap();
    run(
        &conn,
        &[
            "project", "add", "--org", "Acme", "--name", "Website", "--budget", "10000",
            "--finder-user", "Carla",
        ],
    )
    .unwrap();
    let id = project_id(&conn);
    let card = commands::projects::project_card(&conn, id).unwrap();
    assert_eq!(card.finder.as_deref(), Some("carla"));
    assert_eq!(card.finder_commission, Some(d("1000")));

    conn.execute("DELETE FROM users WHERE name='carla'", [])
        .unwrap();
    let card = commands::projects::project_card(&conn, id).unwrap();
    assert!(card.finder.is_none());

    run(&conn, &["project", "freeze", "--project", "Website"]).unwrap();
    let card = commands::projects::project_card(&conn, id).unwrap();
    assert!(card.finder_commission.is_none());
}
