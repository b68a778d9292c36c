// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use std::fs;
use taskledger::commands::doctor::find_issues;
use taskledger::commands::projects::{Split, create_project, set_project_frozen};
use taskledger::commands::tasks::{NewTask, add_task, move_task};
use taskledger::models::CommissionStatus;
use taskledger::rollup::{
    CommissionFilter, commission_totals, filter_commissions, load_org_commissions,
    load_org_financials, rollup,
};
use taskledger::{cli, commands, db};
use tempfile::tempdir;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Two projects in Acme, one in another org that must never leak in.
fn setup() -> (Connection, i64, i64) {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute("INSERT INTO organizations(name) VALUES('Acme')", [])
        .unwrap();
    conn.execute("INSERT INTO organizations(name) VALUES('Other')", [])
        .unwrap();
    conn.execute("INSERT INTO users(name) VALUES('ana')", []).unwrap();
    let ana = conn.last_insert_rowid();

    let web = create_project(&conn, 1, "Website", d("10000"), Split::default(), None).unwrap();
    conn.execute(
        "INSERT INTO expenses(project_id, date, kind, amount) VALUES (?1,'2024-01-01','direct','4000')",
        params![web],
    )
    .unwrap();
    let app = create_project(&conn, 1, "App", d("5000"), Split::default(), None).unwrap();
    create_project(&conn, 2, "Elsewhere", d("99999"), Split::default(), None).unwrap();

    for (project, title) in [(web, "Design"), (web, "Build"), (app, "Spike")] {
        let mut t = NewTask::titled(title);
        t.assignee_id = Some(ana);
        add_task(&conn, project, &t, None).unwrap();
    }
    (conn, web, app)
}

#[test]
fn rollup_sums_every_project_of_the_org() {
    let (conn, _, app) = setup();
    set_project_frozen(&conn, app, true).unwrap();

    let records = load_org_financials(&conn, 1).unwrap();
    assert_eq!(records.len(), 2);
    let totals = rollup(&records);
    assert_eq!(totals.projects, 2);
    assert_eq!(totals.frozen_projects, 1);
    assert_eq!(totals.total_budget, d("15000"));
    assert_eq!(totals.total_expenses, d("4000"));
    assert_eq!(totals.total_gross_profit, d("11000"));

    let mut reversed = records.clone();
    reversed.reverse();
    assert_eq!(rollup(&reversed), totals);
}

#[test]
fn commissions_filter_by_status_and_project() {
    let (conn, web, app) = setup();
    let done: i64 = conn
        .query_row("SELECT id FROM tasks WHERE title='Design'", [], |r| r.get(0))
        .unwrap();
    move_task(&conn, done, "Done").unwrap();

    let records = load_org_commissions(&conn, 1).unwrap();
    assert_eq!(records.len(), 3);

    let confirmed = filter_commissions(
        &records,
        &CommissionFilter {
            status: Some(CommissionStatus::Confirmed),
            project_id: None,
        },
    );
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].task_title, "Design");

    let in_web = filter_commissions(
        &records,
        &CommissionFilter {
            status: None,
            project_id: Some(web),
        },
    );
    assert_eq!(in_web.len(), 2);

    // Website pool 2400 over two tasks; App pool 2000 over one.
    let totals = commission_totals(&records);
    assert_eq!(totals.confirmed, d("1200"));
    assert_eq!(totals.pending, d("3200"));
    assert!(totals.frozen.is_zero());
    assert!(
        filter_commissions(&records, &CommissionFilter::default())
            .iter()
            .all(|r| r.project_id == web || r.project_id == app)
    );
}

fn export(conn: &Connection, format: &str, out: &str) -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches_from([
        "taskledger",
        "export",
        "commissions",
        "--org",
        "Acme",
        "--format",
        format,
        "--out",
        out,
    ]);
    let (_, sub) = matches.subcommand().unwrap();
    commands::exporter::handle(conn, sub)
}

#[test]
fn export_commissions_csv_and_json() {
    let (conn, _, _) = setup();
    let dir = tempdir().unwrap();

    let csv_path = dir.path().join("commissions.csv");
    export(&conn, "csv", csv_path.to_str().unwrap()).unwrap();
    let text = fs::read_to_string(&csv_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,project,task,user,amount,status,manual_override"
    );
    assert_eq!(lines.count(), 3);
    let mut rdr = csv::Reader::from_path(&csv_path).unwrap();
    let first = rdr.records().next().unwrap().unwrap();
    assert_eq!(&first[1], "App");
    assert_eq!(&first[2], "Spike");
    assert_eq!(first[4].parse::<Decimal>().unwrap(), d("2000"));
    assert_eq!(&first[5], "pending");
    assert_eq!(&first[6], "false");

    let json_path = dir.path().join("commissions.json");
    export(&conn, "JSON", json_path.to_str().unwrap()).unwrap();
    let items: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["project"], "App");
    assert_eq!(
        items[0]["amount"].as_str().unwrap().parse::<Decimal>().unwrap(),
        d("2000")
    );
    assert_eq!(items[0]["status"], "pending");

    assert!(export(&conn, "xml", dir.path().join("x").to_str().unwrap()).is_err());
}

#[test]
fn doctor_reports_inconsistencies() {
    let (conn, web, app) = setup();
    assert!(find_issues(&conn).unwrap().is_empty());

    conn.execute(
        "UPDATE projects SET team_share_pct='45' WHERE id=?1",
        params![web],
    )
    .unwrap();
    conn.execute(
        "DELETE FROM board_columns WHERE project_id=?1",
        params![app],
    )
    .unwrap();
    conn.execute("UPDATE user_wallets SET balance='7'", [])
        .unwrap();

    let kinds: Vec<String> = find_issues(&conn)
        .unwrap()
        .into_iter()
        .map(|row| row[0].clone())
        .collect();
    assert!(kinds.contains(&"split_mismatch".to_string()));
    assert!(kinds.contains(&"no_columns".to_string()));
    assert!(kinds.contains(&"wallet_drift".to_string()));
    assert!(!kinds.contains(&"stale_commission".to_string()));
}
