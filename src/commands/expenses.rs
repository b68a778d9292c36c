// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::allocation::recalculate_in;
use crate::models::ExpenseKind;
use crate::utils::{
    display_money, id_for_project, maybe_print_json, parse_date, parse_decimal, pretty_table,
};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Record an expense and recalculate the project in the same transaction.
pub fn add_expense(
    conn: &Connection,
    project_id: i64,
    date: NaiveDate,
    kind: ExpenseKind,
    amount: Decimal,
    note: Option<&str>,
) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO expenses(project_id, date, kind, amount, note) VALUES (?1,?2,?3,?4,?5)",
        params![project_id, date.to_string(), kind.as_str(), amount.to_string(), note],
    )?;
    let id = tx.last_insert_rowid();
    recalculate_in(&tx, project_id, Local::now().naive_local())?;
    tx.commit()?;
    Ok(id)
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project_id = id_for_project(conn, sub.get_one::<String>("project").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let kind: ExpenseKind = sub.get_one::<String>("kind").unwrap().parse()?;
    let date = match sub.get_one::<String>("date") {
        Some(d) => parse_date(d)?,
        None => Local::now().date_naive(),
    };
    let note = sub
        .get_one::<String>("note")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());
    add_expense(conn, project_id, date, kind, amount, note)?;
    println!(
        "Recorded {} expense of {} on {}",
        kind.as_str(),
        display_money(conn, amount)?,
        date
    );
    Ok(())
}

#[derive(Serialize)]
struct ExpenseRow {
    id: i64,
    date: String,
    kind: String,
    amount: String,
    note: String,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let project_id = id_for_project(conn, sub.get_one::<String>("project").unwrap())?;
    let mut stmt = conn.prepare(
        "SELECT id, date, kind, amount, COALESCE(note,'') FROM expenses
         WHERE project_id=?1 ORDER BY date, id",
    )?;
    let data = stmt
        .query_map(params![project_id], |r| {
            Ok(ExpenseRow {
                id: r.get(0)?,
                date: r.get(1)?,
                kind: r.get(2)?,
                amount: r.get(3)?,
                note: r.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows = data
            .iter()
            .map(|e| {
                vec![
                    e.id.to_string(),
                    e.date.clone(),
                    e.kind.clone(),
                    e.amount.clone(),
                    e.note.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Date", "Kind", "Amount", "Note"], rows)
        );
    }
    Ok(())
}
