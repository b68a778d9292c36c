// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{id_for_org, id_for_user, pretty_table};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            conn.execute("INSERT INTO organizations(name) VALUES (?1)", params![name])
                .with_context(|| format!("Could not add organization '{}'", name))?;
            println!("Added organization '{}'", name);
        }
        Some(("list", _)) => {
            let mut stmt = conn.prepare(
                "SELECT o.name,
                        (SELECT COUNT(*) FROM org_members m WHERE m.org_id=o.id),
                        (SELECT COUNT(*) FROM projects p WHERE p.org_id=o.id)
                 FROM organizations o ORDER BY o.name",
            )?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, i64>(2)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (n, members, projects) = row?;
                data.push(vec![n, members.to_string(), projects.to_string()]);
            }
            println!("{}", pretty_table(&["Organization", "Members", "Projects"], data));
        }
        Some(("member", sub)) => {
            let org = sub.get_one::<String>("org").unwrap();
            let user = sub.get_one::<String>("user").unwrap();
            let role = sub.get_one::<String>("role").unwrap().trim();
            let org_id = id_for_org(conn, org)?;
            let user_id = id_for_user(conn, user)?;
            conn.execute(
                "INSERT INTO org_members(org_id, user_id, role) VALUES (?1,?2,?3)
                 ON CONFLICT(org_id, user_id) DO UPDATE SET role=excluded.role",
                params![org_id, user_id, role],
            )?;
            println!("{} is now {} of {}", user.trim(), role, org.trim());
        }
        Some(("members", sub)) => {
            let org_id = id_for_org(conn, sub.get_one::<String>("org").unwrap())?;
            let mut stmt = conn.prepare(
                "SELECT u.name, m.role FROM org_members m JOIN users u ON u.id=m.user_id
                 WHERE m.org_id=?1 ORDER BY u.name",
            )?;
            let rows = stmt.query_map(params![org_id], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (n, role) = row?;
                data.push(vec![n, role]);
            }
            println!("{}", pretty_table(&["User", "Role"], data));
        }
        _ => {}
    }
    Ok(())
}
