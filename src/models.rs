// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub org_id: i64,
    pub name: String,
    pub budget: Decimal,
    pub direct_expenses: Decimal,
    pub overhead_expenses: Decimal,
    pub company_share_pct: Decimal,
    pub team_share_pct: Decimal,
    pub finder_commission_pct: Decimal,
    pub finder_id: Option<i64>,
    pub is_frozen: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFinancials {
    pub project_id: i64,
    pub total_expenses: Decimal,
    pub gross_profit: Decimal,
    pub is_frozen: bool,
    pub company_earnings: Decimal,
    pub team_pool: Decimal,
    pub finder_commission: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Confirmed,
    Frozen,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Confirmed => "confirmed",
            CommissionStatus::Frozen => "frozen",
        }
    }
}

impl fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommissionStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(CommissionStatus::Pending),
            "confirmed" => Ok(CommissionStatus::Confirmed),
            "frozen" => Ok(CommissionStatus::Frozen),
            other => Err(LedgerError::Invalid(format!(
                "commission status '{}' (use pending|confirmed|frozen)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCommission {
    pub id: i64,
    pub task_id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub status: CommissionStatus,
    pub manual_override: bool,
    pub confirmed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWallet {
    pub user_id: i64,
    pub balance: Decimal,
    pub monthly_target: Decimal,
    pub monthly_earnings: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(LedgerError::Invalid(format!(
                "priority '{}' (use low|medium|high|urgent)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseKind {
    Direct,
    Overhead,
}

impl ExpenseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseKind::Direct => "direct",
            ExpenseKind::Overhead => "overhead",
        }
    }
}

impl FromStr for ExpenseKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(ExpenseKind::Direct),
            "overhead" => Ok(ExpenseKind::Overhead),
            other => Err(LedgerError::Invalid(format!(
                "expense kind '{}' (use direct|overhead)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub position: i64,
    pub is_done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub column_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<i64>,
    pub priority: Priority,
    pub due_date: Option<String>,
    pub weight: Decimal,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub message: String,
    pub task_id: Option<i64>,
    pub is_read: bool,
    pub created_at: String,
}
