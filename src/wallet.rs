// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::error::LedgerResult;
use crate::models::UserWallet;
use crate::utils::decimal_from_db;

fn sum_confirmed(conn: &Connection, user_id: i64, month: Option<&str>) -> LedgerResult<Decimal> {
    let mut stmt = conn.prepare_cached(
        "SELECT amount FROM task_commissions
         WHERE user_id=?1 AND status='confirmed'
           AND (?2 IS NULL OR substr(confirmed_at,1,7)=?2)",
    )?;
    let mut rows = stmt.query(params![user_id, month])?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let s: String = r.get(0)?;
        total += decimal_from_db(&s)?;
    }
    Ok(total)
}

/// Recompute a user's balance from their confirmed commissions, keeping the
/// monthly target.
pub fn refresh_wallet(conn: &Connection, user_id: i64) -> LedgerResult<Decimal> {
    let balance = sum_confirmed(conn, user_id, None)?;
    conn.execute(
        "INSERT INTO user_wallets(user_id, balance) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET balance=excluded.balance",
        params![user_id, balance.to_string()],
    )?;
    Ok(balance)
}

pub fn set_monthly_target(conn: &Connection, user_id: i64, target: Decimal) -> LedgerResult<()> {
    conn.execute(
        "INSERT INTO user_wallets(user_id, monthly_target) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET monthly_target=excluded.monthly_target",
        params![user_id, target.to_string()],
    )?;
    Ok(())
}

/// Wallet as shown to the user. `monthly_earnings` covers the calendar month
/// containing `today`. A user without a wallet row reads as all zeros.
pub fn load_wallet(conn: &Connection, user_id: i64, today: NaiveDate) -> LedgerResult<UserWallet> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT balance, monthly_target FROM user_wallets WHERE user_id=?1",
            params![user_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let (balance, monthly_target) = match row {
        Some((b, t)) => (decimal_from_db(&b)?, decimal_from_db(&t)?),
        None => (Decimal::ZERO, Decimal::ZERO),
    };
    let month = today.format("%Y-%m").to_string();
    Ok(UserWallet {
        user_id,
        balance,
        monthly_target,
        monthly_earnings: sum_confirmed(conn, user_id, Some(&month))?,
    })
}
