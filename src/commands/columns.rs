// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Column;
use crate::utils::{id_for_project, pretty_table};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use std::collections::HashMap;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let project_id = id_for_project(conn, sub.get_one::<String>("project").unwrap())?;
            let name = sub.get_one::<String>("name").unwrap().trim();
            let done = sub.get_flag("done");
            let position = match sub.get_one::<i64>("position") {
                Some(p) => *p,
                None => conn.query_row(
                    "SELECT COALESCE(MAX(position), -1) + 1 FROM board_columns WHERE project_id=?1",
                    params![project_id],
                    |r| r.get(0),
                )?,
            };
            conn.execute(
                "INSERT INTO board_columns(project_id, name, position, is_done) VALUES (?1,?2,?3,?4)",
                params![project_id, name, position, done],
            )
            .with_context(|| format!("Could not add column '{}'", name))?;
            println!("Added column '{}' at position {}", name, position);
        }
        Some(("list", sub)) => {
            let project_id = id_for_project(conn, sub.get_one::<String>("project").unwrap())?;
            let columns = list_columns(conn, project_id)?;
            let mut stmt = conn.prepare(
                "SELECT column_id, COUNT(*) FROM tasks WHERE project_id=?1 GROUP BY column_id",
            )?;
            let counts = stmt
                .query_map(params![project_id], |r| {
                    Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?))
                })?
                .collect::<rusqlite::Result<HashMap<i64, i64>>>()?;
            let data = columns
                .into_iter()
                .map(|c| {
                    vec![
                        c.position.to_string(),
                        c.name,
                        if c.is_done { "yes".into() } else { String::new() },
                        counts.get(&c.id).copied().unwrap_or(0).to_string(),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Pos", "Column", "Done", "Tasks"], data));
        }
        _ => {}
    }
    Ok(())
}

/// Columns of a project in board order.
pub fn list_columns(conn: &Connection, project_id: i64) -> Result<Vec<Column>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, name, position, is_done FROM board_columns
         WHERE project_id=?1 ORDER BY position, id",
    )?;
    let columns = stmt
        .query_map(params![project_id], |r| {
            Ok(Column {
                id: r.get(0)?,
                project_id: r.get(1)?,
                name: r.get(2)?,
                position: r.get(3)?,
                is_done: r.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}
