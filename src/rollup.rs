// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Organization-level totals over the full fetched set of projects and
//! commissions.

use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::allocation::{compute_allocation, load_financials, load_project};
use crate::error::LedgerResult;
use crate::models::CommissionStatus;
use crate::utils::decimal_from_db;

#[derive(Debug, Clone, Serialize)]
pub struct FinancialRecord {
    pub project_id: i64,
    pub project_name: String,
    pub budget: Decimal,
    pub total_expenses: Decimal,
    pub gross_profit: Decimal,
    pub is_frozen: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommissionRecord {
    pub id: i64,
    pub task_id: i64,
    pub task_title: String,
    pub project_id: i64,
    pub project_name: String,
    pub user_id: i64,
    pub user_name: String,
    pub amount: Decimal,
    pub status: CommissionStatus,
    pub manual_override: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrgRollup {
    pub projects: usize,
    pub frozen_projects: usize,
    pub total_budget: Decimal,
    pub total_expenses: Decimal,
    pub total_gross_profit: Decimal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommissionFilter {
    pub status: Option<CommissionStatus>,
    pub project_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommissionTotals {
    pub pending: Decimal,
    pub confirmed: Decimal,
    pub frozen: Decimal,
}

pub fn rollup(records: &[FinancialRecord]) -> OrgRollup {
    records.iter().fold(OrgRollup::default(), |mut acc, r| {
        acc.projects += 1;
        if r.is_frozen {
            acc.frozen_projects += 1;
        }
        acc.total_budget += r.budget;
        acc.total_expenses += r.total_expenses;
        acc.total_gross_profit += r.gross_profit;
        acc
    })
}

pub fn filter_commissions<'a>(
    records: &'a [CommissionRecord],
    filter: &CommissionFilter,
) -> Vec<&'a CommissionRecord> {
    records
        .iter()
        .filter(|r| filter.status.is_none_or(|s| r.status == s))
        .filter(|r| filter.project_id.is_none_or(|p| r.project_id == p))
        .collect()
}

pub fn commission_totals<'a, I>(records: I) -> CommissionTotals
where
    I: IntoIterator<Item = &'a CommissionRecord>,
{
    let mut t = CommissionTotals::default();
    for r in records {
        match r.status {
            CommissionStatus::Pending => t.pending += r.amount,
            CommissionStatus::Confirmed => t.confirmed += r.amount,
            CommissionStatus::Frozen => t.frozen += r.amount,
        }
    }
    t
}

/// Financials for every project of an organization. Projects that were never
/// recalculated are derived on the fly.
pub fn load_org_financials(conn: &Connection, org_id: i64) -> LedgerResult<Vec<FinancialRecord>> {
    let mut stmt = conn.prepare("SELECT id FROM projects WHERE org_id=?1 ORDER BY name")?;
    let ids = stmt
        .query_map(params![org_id], |r| r.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let project = load_project(conn, id)?;
        let fin = match load_financials(conn, id)? {
            Some(f) => f,
            None => compute_allocation(&project),
        };
        out.push(FinancialRecord {
            project_id: id,
            project_name: project.name,
            budget: project.budget,
            total_expenses: fin.total_expenses,
            gross_profit: fin.gross_profit,
            is_frozen: fin.is_frozen,
        });
    }
    Ok(out)
}

pub fn load_org_commissions(conn: &Connection, org_id: i64) -> LedgerResult<Vec<CommissionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.task_id, t.title, c.project_id, p.name, c.user_id, u.name,
                c.amount, c.status, c.manual_override
         FROM task_commissions c
         JOIN tasks t ON t.id=c.task_id
         JOIN projects p ON p.id=c.project_id
         JOIN users u ON u.id=c.user_id
         WHERE p.org_id=?1
         ORDER BY p.name, c.id",
    )?;
    let raw = stmt
        .query_map(params![org_id], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, i64>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, i64>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, i64>(5)?,
                r.get::<_, String>(6)?,
                r.get::<_, String>(7)?,
                r.get::<_, String>(8)?,
                r.get::<_, bool>(9)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut out = Vec::with_capacity(raw.len());
    for (id, task_id, task_title, project_id, project_name, user_id, user_name, amount, status, manual) in
        raw
    {
        out.push(CommissionRecord {
            id,
            task_id,
            task_title,
            project_id,
            project_name,
            user_id,
            user_name,
            amount: decimal_from_db(&amount)?,
            status: status.parse()?,
            manual_override: manual,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fin(id: i64, budget: i64, expenses: i64, frozen: bool) -> FinancialRecord {
        FinancialRecord {
            project_id: id,
            project_name: format!("p{id}"),
            budget: Decimal::from(budget),
            total_expenses: Decimal::from(expenses),
            gross_profit: Decimal::from(budget - expenses),
            is_frozen: frozen,
        }
    }

    fn commission(id: i64, project_id: i64, status: CommissionStatus, amount: i64) -> CommissionRecord {
        CommissionRecord {
            id,
            task_id: id,
            task_title: format!("task {id}"),
            project_id,
            project_name: format!("p{project_id}"),
            user_id: 1,
            user_name: "ana".into(),
            amount: Decimal::from(amount),
            status,
            manual_override: false,
        }
    }

    #[test]
    fn rollup_is_order_independent() {
        let mut records = vec![
            fin(1, 10_000, 4_000, false),
            fin(2, 5_000, 6_000, true),
            fin(3, 2_500, 0, false),
        ];
        let forward = rollup(&records);
        records.reverse();
        assert_eq!(rollup(&records), forward);
        records.swap(0, 1);
        assert_eq!(rollup(&records), forward);

        assert_eq!(forward.projects, 3);
        assert_eq!(forward.frozen_projects, 1);
        assert_eq!(forward.total_budget, Decimal::from(17_500));
        assert_eq!(forward.total_expenses, Decimal::from(10_000));
        assert_eq!(forward.total_gross_profit, Decimal::from(7_500));
    }

    #[test]
    fn empty_rollup_is_zero() {
        assert_eq!(rollup(&[]), OrgRollup::default());
    }

    #[test]
    fn filters_by_status_and_project() {
        let records = vec![
            commission(1, 1, CommissionStatus::Pending, 10),
            commission(2, 1, CommissionStatus::Confirmed, 20),
            commission(3, 2, CommissionStatus::Confirmed, 30),
        ];
        let all = filter_commissions(&records, &CommissionFilter::default());
        assert_eq!(all.len(), 3);

        let confirmed = filter_commissions(
            &records,
            &CommissionFilter {
                status: Some(CommissionStatus::Confirmed),
                project_id: None,
            },
        );
        assert_eq!(confirmed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3]);

        let both = filter_commissions(
            &records,
            &CommissionFilter {
                status: Some(CommissionStatus::Confirmed),
                project_id: Some(1),
            },
        );
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].id, 2);

        let totals = commission_totals(confirmed);
        assert_eq!(totals.confirmed, Decimal::from(50));
        assert!(totals.pending.is_zero());
    }
}
