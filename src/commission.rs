// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Per-task commissions and the manual-override edit flow.

use chrono::{Local, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{CommissionStatus, Project, TaskCommission};
use crate::utils::{decimal_from_db, money};

pub fn load_commission(conn: &Connection, id: i64) -> LedgerResult<TaskCommission> {
    let row = conn
        .query_row(
            "SELECT id, task_id, project_id, user_id, amount, status, manual_override, confirmed_at
             FROM task_commissions WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, i64>(2)?,
                    r.get::<_, i64>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, bool>(6)?,
                    r.get::<_, Option<NaiveDateTime>>(7)?,
                ))
            },
        )
        .optional()?;
    let Some((id, task_id, project_id, user_id, amount, status, manual_override, confirmed_at)) =
        row
    else {
        return Err(LedgerError::not_found("Commission", id));
    };
    Ok(TaskCommission {
        id,
        task_id,
        project_id,
        user_id,
        amount: decimal_from_db(&amount)?,
        status: status.parse()?,
        manual_override,
        confirmed_at,
    })
}

struct PoolRow {
    id: i64,
    user_id: i64,
    amount: Decimal,
    manual_override: bool,
    confirmed_at: Option<NaiveDateTime>,
    weight: Decimal,
    completed: bool,
}

/// Bring the project's commission rows in line with its tasks and spread the
/// team pool over them. Returns every user whose wallet may have changed.
///
/// Overridden rows keep their amount and status, and their amounts come off
/// the pool first. What is left goes to the automatic rows pro rata by task
/// weight, rounded on the running total, so the automatic amounts add up to
/// the remaining pool exactly.
pub fn redistribute(
    conn: &Connection,
    project: &Project,
    team_pool: Decimal,
    now: NaiveDateTime,
) -> LedgerResult<Vec<i64>> {
    let mut affected = BTreeSet::new();

    // Rows whose task lost its assignee or changed hands.
    {
        let mut stmt = conn.prepare(
            "SELECT c.id, c.user_id, t.assignee_id FROM task_commissions c
             JOIN tasks t ON t.id=c.task_id WHERE c.project_id=?1",
        )?;
        let stale = stmt
            .query_map(params![project.id], |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, Option<i64>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (id, user_id, assignee) in stale {
            match assignee {
                None => {
                    conn.execute("DELETE FROM task_commissions WHERE id=?1", params![id])?;
                    affected.insert(user_id);
                }
                Some(a) if a != user_id => {
                    conn.execute(
                        "UPDATE task_commissions SET user_id=?1 WHERE id=?2",
                        params![a, id],
                    )?;
                    affected.insert(user_id);
                }
                Some(_) => {}
            }
        }
    }
    conn.execute(
        "INSERT INTO task_commissions(task_id, project_id, user_id)
         SELECT id, project_id, assignee_id FROM tasks
         WHERE project_id=?1 AND assignee_id IS NOT NULL
         ON CONFLICT(task_id) DO NOTHING",
        params![project.id],
    )?;

    let rows = {
        let mut stmt = conn.prepare(
            "SELECT c.id, c.user_id, c.amount, c.manual_override, c.confirmed_at, t.weight, t.completed_at
             FROM task_commissions c JOIN tasks t ON t.id=c.task_id
             WHERE c.project_id=?1 ORDER BY c.id",
        )?;
        let raw = stmt
            .query_map(params![project.id], |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, bool>(3)?,
                    r.get::<_, Option<NaiveDateTime>>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, Option<String>>(6)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut rows = Vec::with_capacity(raw.len());
        for (id, user_id, amount, manual_override, confirmed_at, weight, completed_at) in raw {
            rows.push(PoolRow {
                id,
                user_id,
                amount: decimal_from_db(&amount)?,
                manual_override,
                confirmed_at,
                weight: decimal_from_db(&weight)?.max(Decimal::ZERO),
                completed: completed_at.is_some(),
            });
        }
        rows
    };

    let manual_total: Decimal = rows
        .iter()
        .filter(|r| r.manual_override)
        .map(|r| r.amount)
        .sum();
    let remaining = (team_pool - manual_total).max(Decimal::ZERO);
    let auto: Vec<&PoolRow> = rows.iter().filter(|r| !r.manual_override).collect();
    let total_weight: Decimal = auto.iter().map(|r| r.weight).sum();

    // Each row gets the difference between two rounded cumulative shares, so
    // the rows can never add up to more than `remaining`.
    let mut cum_weight = Decimal::ZERO;
    let mut handed_out = Decimal::ZERO;
    for row in &auto {
        let amount = if total_weight.is_zero() || row.weight.is_zero() {
            Decimal::ZERO
        } else {
            cum_weight += row.weight;
            let upto = if cum_weight == total_weight {
                remaining
            } else {
                money(remaining * cum_weight / total_weight)
            };
            let share = upto - handed_out;
            handed_out = upto;
            share
        };

        let status = if project.is_frozen {
            CommissionStatus::Frozen
        } else if row.completed {
            CommissionStatus::Confirmed
        } else {
            CommissionStatus::Pending
        };
        let confirmed_at = match status {
            CommissionStatus::Confirmed => Some(row.confirmed_at.unwrap_or(now)),
            _ => None,
        };
        conn.execute(
            "UPDATE task_commissions SET amount=?1, status=?2, confirmed_at=?3, updated_at=datetime('now')
             WHERE id=?4",
            params![amount.to_string(), status.as_str(), confirmed_at, row.id],
        )?;
        affected.insert(row.user_id);
    }

    tracing::debug!(
        project_id = project.id,
        automatic = auto.len(),
        overridden = rows.len() - auto.len(),
        %remaining,
        "team pool distributed"
    );
    Ok(affected.into_iter().collect())
}

/// Persistence seam for [`CommissionEditor`].
pub trait CommissionStore {
    fn load(&self, id: i64) -> LedgerResult<TaskCommission>;

    /// Store a user-set amount and status and mark the row as overridden.
    fn save_override(
        &self,
        id: i64,
        amount: Decimal,
        status: CommissionStatus,
    ) -> LedgerResult<TaskCommission>;

    /// Clear the override and recalculate the owning project.
    fn reset(&self, id: i64) -> LedgerResult<TaskCommission>;
}

pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl CommissionStore for SqliteStore<'_> {
    fn load(&self, id: i64) -> LedgerResult<TaskCommission> {
        load_commission(self.conn, id)
    }

    fn save_override(
        &self,
        id: i64,
        amount: Decimal,
        status: CommissionStatus,
    ) -> LedgerResult<TaskCommission> {
        let tx = self.conn.unchecked_transaction()?;
        let current = load_commission(&tx, id)?;
        let confirmed_at = match status {
            CommissionStatus::Confirmed => Some(
                current
                    .confirmed_at
                    .unwrap_or_else(|| Local::now().naive_local()),
            ),
            _ => None,
        };
        tx.execute(
            "UPDATE task_commissions
             SET amount=?1, status=?2, manual_override=1, confirmed_at=?3, updated_at=datetime('now')
             WHERE id=?4",
            params![amount.to_string(), status.as_str(), confirmed_at, id],
        )?;
        crate::wallet::refresh_wallet(&tx, current.user_id)?;
        tx.commit()?;
        tracing::info!(commission_id = id, %amount, %status, "commission overridden");
        load_commission(self.conn, id)
    }

    fn reset(&self, id: i64) -> LedgerResult<TaskCommission> {
        let tx = self.conn.unchecked_transaction()?;
        let current = load_commission(&tx, id)?;
        tx.execute(
            "UPDATE task_commissions SET manual_override=0, updated_at=datetime('now') WHERE id=?1",
            params![id],
        )?;
        crate::allocation::recalculate_in(&tx, current.project_id, Local::now().naive_local())?;
        tx.commit()?;
        tracing::info!(commission_id = id, project_id = current.project_id, "commission reset");
        load_commission(self.conn, id)
    }
}

/// Draft values held while a commission is being edited.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub amount: Decimal,
    pub status: CommissionStatus,
    was_manual: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditState {
    Auto,
    Editing(Draft),
    Manual,
}

/// Drives one commission record through Auto → Editing → Manual → Auto.
/// A failed store call leaves both the record and the state as they were
/// before the call (for `save`, as they were before editing began).
pub struct CommissionEditor<S: CommissionStore> {
    store: S,
    record: TaskCommission,
    state: EditState,
}

impl<S: CommissionStore> CommissionEditor<S> {
    pub fn open(store: S, id: i64) -> LedgerResult<Self> {
        let record = store.load(id)?;
        let state = if record.manual_override {
            EditState::Manual
        } else {
            EditState::Auto
        };
        Ok(Self {
            store,
            record,
            state,
        })
    }

    pub fn record(&self) -> &TaskCommission {
        &self.record
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn begin_edit(&mut self) -> LedgerResult<&mut Draft> {
        let was_manual = match self.state {
            EditState::Auto => false,
            EditState::Manual => true,
            EditState::Editing(_) => {
                return Err(LedgerError::InvalidState("already editing".into()));
            }
        };
        self.state = EditState::Editing(Draft {
            amount: self.record.amount,
            status: self.record.status,
            was_manual,
        });
        self.draft_mut()
            .ok_or_else(|| LedgerError::InvalidState("edit did not start".into()))
    }

    pub fn draft_mut(&mut self) -> Option<&mut Draft> {
        match &mut self.state {
            EditState::Editing(draft) => Some(draft),
            _ => None,
        }
    }

    /// Discard the draft. A no-op outside of editing.
    pub fn cancel(&mut self) {
        if let EditState::Editing(draft) = &self.state {
            self.state = Self::resting(draft.was_manual);
        }
    }

    pub fn save(&mut self) -> LedgerResult<&TaskCommission> {
        let draft = match &self.state {
            EditState::Editing(draft) => draft.clone(),
            _ => return Err(LedgerError::InvalidState("nothing to save".into())),
        };
        match self
            .store
            .save_override(self.record.id, draft.amount, draft.status)
        {
            Ok(saved) => {
                self.record = saved;
                self.state = EditState::Manual;
                Ok(&self.record)
            }
            Err(e) => {
                tracing::warn!(commission_id = self.record.id, error = %e, "save failed");
                self.state = Self::resting(draft.was_manual);
                Err(e)
            }
        }
    }

    /// Resetting an automatic record only re-runs the recalculation.
    pub fn reset(&mut self) -> LedgerResult<&TaskCommission> {
        if matches!(self.state, EditState::Editing(_)) {
            return Err(LedgerError::InvalidState(
                "finish or cancel the edit before resetting".into(),
            ));
        }
        match self.store.reset(self.record.id) {
            Ok(fresh) => {
                self.record = fresh;
                self.state = EditState::Auto;
                Ok(&self.record)
            }
            Err(e) => {
                tracing::warn!(commission_id = self.record.id, error = %e, "reset failed");
                Err(e)
            }
        }
    }

    fn resting(manual: bool) -> EditState {
        if manual {
            EditState::Manual
        } else {
            EditState::Auto
        }
    }
}
