// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::allocation::recalculate_in;
use crate::models::User;
use crate::utils::{id_for_user, maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let email = sub
                .get_one::<String>("email")
                .map(|s| s.trim())
                .filter(|s| !s.is_empty());
            conn.execute(
                "INSERT INTO users(name, email) VALUES (?1, ?2)",
                params![name, email],
            )
            .with_context(|| format!("Could not add user '{}'", name))?;
            let id = conn.last_insert_rowid();
            conn.execute(
                "INSERT INTO user_wallets(user_id) VALUES (?1) ON CONFLICT(user_id) DO NOTHING",
                params![id],
            )?;
            println!("Added user '{}' (#{})", name, id);
        }
        Some(("list", sub)) => {
            let json_flag = sub.get_flag("json");
            let jsonl_flag = sub.get_flag("jsonl");
            let users = list_users(conn)?;
            if !maybe_print_json(json_flag, jsonl_flag, &users)? {
                let data = users
                    .into_iter()
                    .map(|u| {
                        vec![
                            u.id.to_string(),
                            u.name,
                            u.email.unwrap_or_default(),
                            u.created_at,
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["ID", "Name", "Email", "Created"], data));
            }
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = id_for_user(conn, name)?;
            let projects = remove_user(conn, id)?;
            println!(
                "Removed user '{}', {} project(s) recalculated",
                name.trim(),
                projects.len()
            );
        }
        _ => {}
    }
    Ok(())
}

/// Delete a user and recalculate every project they held commissions or
/// tasks in, so their share of each team pool goes back to the others.
pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, name, email, created_at FROM users ORDER BY name")?;
    let users = stmt
        .query_map([], |r| {
            Ok(User {
                id: r.get(0)?,
                name: r.get(1)?,
                email: r.get(2)?,
                created_at: r.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

pub fn remove_user(conn: &Connection, user_id: i64) -> Result<Vec<i64>> {
    let tx = conn.unchecked_transaction()?;
    let projects = {
        let mut stmt = tx.prepare(
            "SELECT project_id FROM task_commissions WHERE user_id=?1
             UNION
             SELECT project_id FROM tasks WHERE assignee_id=?1",
        )?;
        let ids = stmt
            .query_map(params![user_id], |r| r.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        ids
    };
    tx.execute("DELETE FROM users WHERE id=?1", params![user_id])?;
    let now = Local::now().naive_local();
    for project_id in &projects {
        recalculate_in(&tx, *project_id, now)?;
    }
    tx.commit()?;
    tracing::info!(user_id, projects = projects.len(), "user removed");
    Ok(projects)
}
