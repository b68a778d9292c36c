// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::tasks::query_tasks;
use crate::deadline::{DueDate, parse_due};
use crate::rollup::{commission_totals, load_org_commissions, load_org_financials, rollup};
use crate::utils::{display_money, id_for_org, maybe_print_json, pretty_table};
use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use rusqlite::{Connection, params};
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("org", sub)) => org(conn, sub)?,
        Some(("deadlines", sub)) => deadlines(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn org(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let org_id = id_for_org(conn, sub.get_one::<String>("org").unwrap())?;
    let records = load_org_financials(conn, org_id)?;
    let totals = rollup(&records);
    let commissions = commission_totals(&load_org_commissions(conn, org_id)?);

    if maybe_print_json(
        json_flag,
        jsonl_flag,
        &serde_json::json!({
            "projects": records,
            "totals": totals,
            "commissions": commissions,
        }),
    )? {
        return Ok(());
    }

    let mut rows = Vec::new();
    for r in &records {
        rows.push(vec![
            r.project_name.clone(),
            display_money(conn, r.budget)?,
            display_money(conn, r.total_expenses)?,
            display_money(conn, r.gross_profit)?,
            if r.is_frozen { "yes".into() } else { String::new() },
        ]);
    }
    rows.push(vec![
        format!("TOTAL ({} projects)", totals.projects),
        display_money(conn, totals.total_budget)?,
        display_money(conn, totals.total_expenses)?,
        display_money(conn, totals.total_gross_profit)?,
        totals.frozen_projects.to_string(),
    ]);
    println!(
        "{}",
        pretty_table(
            &["Project", "Budget", "Expenses", "Gross Profit", "Frozen"],
            rows
        )
    );
    println!(
        "Commissions: pending {} · confirmed {} · frozen {}",
        display_money(conn, commissions.pending)?,
        display_money(conn, commissions.confirmed)?,
        display_money(conn, commissions.frozen)?
    );
    Ok(())
}

#[derive(Serialize)]
struct DeadlineRow {
    project: String,
    task_id: i64,
    title: String,
    assignee: String,
    due_date: String,
    deadline: String,
}

fn deadlines(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let org_id = id_for_org(conn, sub.get_one::<String>("org").unwrap())?;
    let now: NaiveDateTime = match sub.get_one::<String>("now") {
        Some(s) => match parse_due(s)? {
            DueDate::DateTime(dt) => dt,
            DueDate::Date(d) => d.and_hms_opt(0, 0, 0).unwrap_or_default(),
        },
        None => Local::now().naive_local(),
    };

    let mut stmt = conn.prepare("SELECT id, name FROM projects WHERE org_id=?1 ORDER BY name")?;
    let projects = stmt
        .query_map(params![org_id], |r| {
            Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut data = Vec::new();
    for (project_id, project) in projects {
        for t in query_tasks(conn, project_id, None, now)? {
            if let Some(status) = t.deadline {
                data.push(DeadlineRow {
                    project: project.clone(),
                    task_id: t.id,
                    title: t.title,
                    assignee: t.assignee,
                    due_date: t.due_date,
                    deadline: status.to_string(),
                });
            }
        }
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows = data
            .iter()
            .map(|d| {
                vec![
                    d.project.clone(),
                    d.task_id.to_string(),
                    d.title.clone(),
                    d.assignee.clone(),
                    d.due_date.clone(),
                    d.deadline.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Project", "Task", "Title", "Assignee", "Due", "Status"],
                rows
            )
        );
    }
    Ok(())
}
