// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Project profit allocation.
//!
//! A project's gross profit (budget minus direct and overhead expenses) is
//! split three ways between the company, the team pool and the finder.
//! The team pool is then spread over the project's task commissions, see
//! [`crate::commission::redistribute`].

use chrono::{Local, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Project, ProjectFinancials};
use crate::utils::{decimal_from_db, money};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Accepts a split iff `|company + team + finder - 100| <= 0.01`.
/// Individual shares are not range-checked.
pub fn validate_split(company: Decimal, team: Decimal, finder: Decimal) -> LedgerResult<()> {
    let sum = company + team + finder;
    if (sum - HUNDRED).abs() <= Decimal::new(1, 2) {
        Ok(())
    } else {
        Err(LedgerError::SplitMismatch { sum })
    }
}

/// Derive the financials row for a project. Frozen projects and projects
/// running at a loss get zero shares.
pub fn compute_allocation(p: &Project) -> ProjectFinancials {
    let total_expenses = p.direct_expenses + p.overhead_expenses;
    let gross_profit = p.budget - total_expenses;
    let share = |pct: Decimal| {
        if p.is_frozen || gross_profit <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            money(gross_profit * pct / HUNDRED)
        }
    };
    ProjectFinancials {
        project_id: p.id,
        total_expenses,
        gross_profit,
        is_frozen: p.is_frozen,
        company_earnings: share(p.company_share_pct),
        team_pool: share(p.team_share_pct),
        finder_commission: share(p.finder_commission_pct),
    }
}

/// Display-only percentage of `part` in `whole`, clamped to 0..=100.
pub fn progress_pct(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let pct = (part * HUNDRED / whole).round_dp(1);
    pct.clamp(Decimal::ZERO, HUNDRED)
}

pub fn load_project(conn: &Connection, project_id: i64) -> LedgerResult<Project> {
    let row = conn
        .query_row(
            "SELECT id, org_id, name, budget, direct_expenses, overhead_expenses,
                    company_share_pct, team_share_pct, finder_commission_pct, finder_id, is_frozen
             FROM projects WHERE id=?1",
            params![project_id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, String>(7)?,
                    r.get::<_, String>(8)?,
                    r.get::<_, Option<i64>>(9)?,
                    r.get::<_, bool>(10)?,
                ))
            },
        )
        .optional()?;
    let Some((id, org_id, name, budget, direct, overhead, company, team, finder, finder_id, frozen)) =
        row
    else {
        return Err(LedgerError::not_found("Project", project_id));
    };
    Ok(Project {
        id,
        org_id,
        name,
        budget: decimal_from_db(&budget)?,
        direct_expenses: decimal_from_db(&direct)?,
        overhead_expenses: decimal_from_db(&overhead)?,
        company_share_pct: decimal_from_db(&company)?,
        team_share_pct: decimal_from_db(&team)?,
        finder_commission_pct: decimal_from_db(&finder)?,
        finder_id,
        is_frozen: frozen,
    })
}

pub fn load_financials(
    conn: &Connection,
    project_id: i64,
) -> LedgerResult<Option<ProjectFinancials>> {
    let row = conn
        .query_row(
            "SELECT total_expenses, gross_profit, is_frozen, company_earnings, team_pool, finder_commission
             FROM project_financials WHERE project_id=?1",
            params![project_id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, bool>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;
    let Some((total, gross, frozen, company, team, finder)) = row else {
        return Ok(None);
    };
    Ok(Some(ProjectFinancials {
        project_id,
        total_expenses: decimal_from_db(&total)?,
        gross_profit: decimal_from_db(&gross)?,
        is_frozen: frozen,
        company_earnings: decimal_from_db(&company)?,
        team_pool: decimal_from_db(&team)?,
        finder_commission: decimal_from_db(&finder)?,
    }))
}

fn sum_expenses(conn: &Connection, project_id: i64, kind: &str) -> LedgerResult<Decimal> {
    let mut stmt = conn.prepare_cached("SELECT amount FROM expenses WHERE project_id=?1 AND kind=?2")?;
    let mut rows = stmt.query(params![project_id, kind])?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let s: String = r.get(0)?;
        total += decimal_from_db(&s)?;
    }
    Ok(total)
}

/// Recalculate inside the caller's transaction. Expense totals are only
/// written back when the project has itemised expenses of that kind, so a
/// figure typed directly into the project survives.
pub fn recalculate_in(
    conn: &Connection,
    project_id: i64,
    now: NaiveDateTime,
) -> LedgerResult<ProjectFinancials> {
    let mut project = load_project(conn, project_id)?;

    let itemised: i64 = conn.query_row(
        "SELECT COUNT(*) FROM expenses WHERE project_id=?1",
        params![project_id],
        |r| r.get(0),
    )?;
    if itemised > 0 {
        project.direct_expenses = sum_expenses(conn, project_id, "direct")?;
        project.overhead_expenses = sum_expenses(conn, project_id, "overhead")?;
        conn.execute(
            "UPDATE projects SET direct_expenses=?1, overhead_expenses=?2 WHERE id=?3",
            params![
                project.direct_expenses.to_string(),
                project.overhead_expenses.to_string(),
                project_id
            ],
        )?;
    }

    let fin = compute_allocation(&project);
    conn.execute(
        "INSERT INTO project_financials(project_id, total_expenses, gross_profit, is_frozen,
                                        company_earnings, team_pool, finder_commission, updated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,datetime('now'))
         ON CONFLICT(project_id) DO UPDATE SET
            total_expenses=excluded.total_expenses,
            gross_profit=excluded.gross_profit,
            is_frozen=excluded.is_frozen,
            company_earnings=excluded.company_earnings,
            team_pool=excluded.team_pool,
            finder_commission=excluded.finder_commission,
            updated_at=excluded.updated_at",
        params![
            project_id,
            fin.total_expenses.to_string(),
            fin.gross_profit.to_string(),
            fin.is_frozen,
            fin.company_earnings.to_string(),
            fin.team_pool.to_string(),
            fin.finder_commission.to_string(),
        ],
    )?;

    let users = crate::commission::redistribute(conn, &project, fin.team_pool, now)?;
    for user_id in &users {
        crate::wallet::refresh_wallet(conn, *user_id)?;
    }

    tracing::info!(
        project_id,
        gross_profit = %fin.gross_profit,
        team_pool = %fin.team_pool,
        frozen = fin.is_frozen,
        wallets = users.len(),
        "recalculated project financials"
    );
    Ok(fin)
}

/// Recalculate a project's financials, commissions and the affected wallets
/// as one transaction.
pub fn recalculate_project_financials(
    conn: &Connection,
    project_id: i64,
) -> LedgerResult<ProjectFinancials> {
    let tx = conn.unchecked_transaction()?;
    let fin = recalculate_in(&tx, project_id, Local::now().naive_local())?;
    tx.commit()?;
    Ok(fin)
}
