// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::allocation::{load_project, validate_split};
use crate::utils::{decimal_from_db, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection) -> Result<()> {
    let rows = find_issues(conn)?;
    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

pub fn find_issues(conn: &Connection) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();

    // 1) Splits that no longer add up and projects running at a loss
    let mut stmt = conn.prepare("SELECT id FROM projects ORDER BY id")?;
    let ids = stmt
        .query_map([], |r| r.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    for id in ids {
        let p = load_project(conn, id)?;
        if let Err(e) = validate_split(p.company_share_pct, p.team_share_pct, p.finder_commission_pct)
        {
            rows.push(vec!["split_mismatch".into(), format!("{}: {}", p.name, e)]);
        }
        if p.budget < p.direct_expenses + p.overhead_expenses {
            rows.push(vec!["negative_gross_profit".into(), p.name.clone()]);
        }
    }

    // 2) Boards without columns cannot take new tasks
    let mut stmt = conn.prepare(
        "SELECT name FROM projects p
         WHERE NOT EXISTS (SELECT 1 FROM board_columns c WHERE c.project_id=p.id)",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let name: String = r.get(0)?;
        rows.push(vec!["no_columns".into(), name]);
    }

    // 3) Commissions credited to someone who is not the assignee any more
    let mut stmt = conn.prepare(
        "SELECT c.id, t.title FROM task_commissions c JOIN tasks t ON t.id=c.task_id
         WHERE t.assignee_id IS NULL OR t.assignee_id != c.user_id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let title: String = r.get(1)?;
        rows.push(vec!["stale_commission".into(), format!("#{} {}", id, title)]);
    }

    // 4) Wallet balances that drifted from confirmed commissions
    let mut stmt = conn.prepare("SELECT user_id, balance FROM user_wallets")?;
    let wallets = stmt
        .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for (user_id, balance) in wallets {
        let mut st = conn.prepare_cached(
            "SELECT amount FROM task_commissions WHERE user_id=?1 AND status='confirmed'",
        )?;
        let mut cur = st.query([user_id])?;
        let mut expected = rust_decimal::Decimal::ZERO;
        while let Some(r) = cur.next()? {
            let s: String = r.get(0)?;
            expected += decimal_from_db(&s)?;
        }
        if decimal_from_db(&balance)? != expected {
            rows.push(vec![
                "wallet_drift".into(),
                format!("user #{}: {} vs {}", user_id, balance, expected),
            ]);
        }
    }
    Ok(rows)
}
