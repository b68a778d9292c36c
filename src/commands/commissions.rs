// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commission::{CommissionEditor, SqliteStore};
use crate::models::CommissionStatus;
use crate::rollup::{CommissionFilter, commission_totals, filter_commissions, load_org_commissions};
use crate::utils::{display_money, id_for_org, id_for_project, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Context, Result, bail};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("reset", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let mut editor = CommissionEditor::open(SqliteStore::new(conn), id)?;
            let rec = editor
                .reset()
                .with_context(|| format!("Could not reset commission #{}", id))?;
            println!(
                "Commission #{} recalculated: {} ({})",
                id,
                display_money(conn, rec.amount)?,
                rec.status
            );
        }
        _ => {}
    }
    Ok(())
}

fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let amount = match sub.get_one::<String>("amount") {
        Some(s) => Some(parse_decimal(s)?),
        None => None,
    };
    let status = match sub.get_one::<String>("status") {
        Some(s) => Some(s.parse::<CommissionStatus>()?),
        None => None,
    };
    if amount.is_none() && status.is_none() {
        bail!("Nothing to change: pass --amount and/or --status");
    }

    let mut editor = CommissionEditor::open(SqliteStore::new(conn), id)?;
    let draft = editor.begin_edit()?;
    if let Some(a) = amount {
        draft.amount = a;
    }
    if let Some(s) = status {
        draft.status = s;
    }
    let rec = editor
        .save()
        .with_context(|| format!("Could not update commission #{}", id))?;
    println!(
        "Commission #{} set to {} ({}), excluded from recalculation until reset",
        id,
        display_money(conn, rec.amount)?,
        rec.status
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let org_id = id_for_org(conn, sub.get_one::<String>("org").unwrap())?;
    let filter = CommissionFilter {
        status: match sub.get_one::<String>("status") {
            Some(s) => Some(s.parse()?),
            None => None,
        },
        project_id: match sub.get_one::<String>("project") {
            Some(p) => Some(id_for_project(conn, p)?),
            None => None,
        },
    };
    let records = load_org_commissions(conn, org_id)?;
    let shown = filter_commissions(&records, &filter);
    if maybe_print_json(json_flag, jsonl_flag, &shown)? {
        return Ok(());
    }
    let mut rows = Vec::new();
    for r in &shown {
        rows.push(vec![
            r.id.to_string(),
            r.project_name.clone(),
            r.task_title.clone(),
            r.user_name.clone(),
            display_money(conn, r.amount)?,
            r.status.to_string(),
            if r.manual_override { "manual".into() } else { "auto".into() },
        ]);
    }
    println!(
        "{}",
        pretty_table(
            &["ID", "Project", "Task", "User", "Amount", "Status", "Mode"],
            rows
        )
    );
    let totals = commission_totals(shown.iter().copied());
    println!(
        "Pending {} · Confirmed {} · Frozen {}",
        display_money(conn, totals.pending)?,
        display_money(conn, totals.confirmed)?,
        display_money(conn, totals.frozen)?
    );
    Ok(())
}
