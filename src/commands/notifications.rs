// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use crate::models::Notification;
use crate::utils::{id_for_user, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => {
            let json_flag = sub.get_flag("json");
            let jsonl_flag = sub.get_flag("jsonl");
            let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
            let data = list_notifications(conn, user_id, sub.get_flag("unread"))?;
            if !maybe_print_json(json_flag, jsonl_flag, &data)? {
                let rows = data
                    .iter()
                    .map(|n| {
                        vec![
                            n.id.to_string(),
                            n.created_at.clone(),
                            n.kind.clone(),
                            n.message.clone(),
                            if n.is_read { String::new() } else { "new".into() },
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "When", "Kind", "Message", ""], rows)
                );
            }
        }
        Some(("read", sub)) => {
            if let Some(id) = sub.get_one::<i64>("id") {
                let n = conn.execute(
                    "UPDATE notifications SET is_read=1 WHERE id=?1",
                    params![id],
                )?;
                if n == 0 {
                    return Err(LedgerError::not_found("Notification", id).into());
                }
                println!("Marked notification #{} as read", id);
            } else if let Some(user) = sub.get_one::<String>("user") {
                let user_id = id_for_user(conn, user)?;
                let n = conn.execute(
                    "UPDATE notifications SET is_read=1 WHERE user_id=?1 AND is_read=0",
                    params![user_id],
                )?;
                println!("Marked {} notification(s) as read", n);
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn list_notifications(
    conn: &Connection,
    user_id: i64,
    unread_only: bool,
) -> Result<Vec<Notification>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, message, task_id, is_read, created_at FROM notifications
         WHERE user_id=?1 AND (?2 = 0 OR is_read = 0)
         ORDER BY id DESC",
    )?;
    let data = stmt
        .query_map(params![user_id, unread_only], |r| {
            Ok(Notification {
                id: r.get(0)?,
                user_id: r.get(1)?,
                kind: r.get(2)?,
                message: r.get(3)?,
                task_id: r.get(4)?,
                is_read: r.get(5)?,
                created_at: r.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(data)
}
