// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::rollup::load_org_commissions;
use crate::utils::id_for_org;
use anyhow::{Result, bail};
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("commissions", sub)) => export_commissions(conn, sub),
        _ => Ok(()),
    }
}

fn export_commissions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().trim().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap().trim();
    let org_id = id_for_org(conn, sub.get_one::<String>("org").unwrap())?;
    let records = load_org_commissions(conn, org_id)?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "id", "project", "task", "user", "amount", "status", "manual_override",
            ])?;
            for r in &records {
                wtr.write_record([
                    r.id.to_string(),
                    r.project_name.clone(),
                    r.task_title.clone(),
                    r.user_name.clone(),
                    r.amount.to_string(),
                    r.status.to_string(),
                    r.manual_override.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let items: Vec<_> = records
                .iter()
                .map(|r| {
                    json!({
                        "id": r.id, "project": r.project_name, "task": r.task_title,
                        "user": r.user_name, "amount": r.amount.to_string(),
                        "status": r.status, "manual_override": r.manual_override
                    })
                })
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => bail!("Unknown format: {} (use csv|json)", fmt),
    }
    println!("Exported {} commission(s) to {}", records.len(), out);
    Ok(())
}
