// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Deadline badges for task cards. Recomputed from the wall clock on every
//! listing; all times are local.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDate {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineStatus {
    Overdue,
    Urgent,
    Warning,
}

impl DeadlineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineStatus::Overdue => "overdue",
            DeadlineStatus::Urgent => "urgent",
            DeadlineStatus::Warning => "warning",
        }
    }
}

impl fmt::Display for DeadlineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

pub fn parse_due(s: &str) -> LedgerResult<DueDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(DueDate::Date(d));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(DueDate::DateTime)
        .ok_or_else(|| {
            LedgerError::Invalid(format!(
                "due date '{}' (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM)",
                s
            ))
        })
}

/// Done tasks never classify. A date-only due date is overdue once its day
/// has passed and is measured from local midnight for the 24h/48h windows.
pub fn classify(due: DueDate, done: bool, now: NaiveDateTime) -> Option<DeadlineStatus> {
    if done {
        return None;
    }
    let due_at = match due {
        DueDate::Date(d) => {
            if d < now.date() {
                return Some(DeadlineStatus::Overdue);
            }
            d.and_hms_opt(0, 0, 0)?
        }
        DueDate::DateTime(dt) => {
            if dt < now {
                return Some(DeadlineStatus::Overdue);
            }
            dt
        }
    };
    let left = due_at - now;
    if left <= Duration::hours(24) {
        Some(DeadlineStatus::Urgent)
    } else if left <= Duration::hours(48) {
        Some(DeadlineStatus::Warning)
    } else {
        None
    }
}

/// Classify a stored due date; unparseable values classify as nothing.
pub fn classify_str(due: Option<&str>, done: bool, now: NaiveDateTime) -> Option<DeadlineStatus> {
    let due = parse_due(due?).ok()?;
    classify(due, done, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-01-10T12:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn due(s: &str) -> DueDate {
        parse_due(s).unwrap()
    }

    #[test]
    fn classifies_reference_dates() {
        assert_eq!(classify(due("2024-01-09"), false, now()), Some(DeadlineStatus::Overdue));
        assert_eq!(classify(due("2024-01-11T08:00"), false, now()), Some(DeadlineStatus::Urgent));
        assert_eq!(classify(due("2024-01-12T10:00"), false, now()), Some(DeadlineStatus::Warning));
        assert_eq!(classify(due("2024-01-20"), false, now()), None);
    }

    #[test]
    fn done_tasks_never_classify() {
        for s in ["2024-01-09", "2024-01-11T08:00", "2024-01-12T10:00", "2024-01-20"] {
            assert_eq!(classify(due(s), true, now()), None, "{s}");
        }
    }

    #[test]
    fn window_edges() {
        assert_eq!(classify(due("2024-01-11 12:00"), false, now()), Some(DeadlineStatus::Urgent));
        assert_eq!(classify(due("2024-01-12T12:00:00"), false, now()), Some(DeadlineStatus::Warning));
        assert_eq!(classify(due("2024-01-12T12:01"), false, now()), None);
        assert_eq!(classify(due("2024-01-10T11:59"), false, now()), Some(DeadlineStatus::Overdue));
    }

    #[test]
    fn date_only_today_is_not_overdue() {
        assert_eq!(classify(due("2024-01-10"), false, now()), Some(DeadlineStatus::Urgent));
        assert_eq!(classify(due("2024-01-11"), false, now()), Some(DeadlineStatus::Urgent));
        assert_eq!(classify(due("2024-01-12"), false, now()), Some(DeadlineStatus::Warning));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_due("next tuesday").is_err());
        assert_eq!(classify_str(Some("soon"), false, now()), None);
        assert_eq!(classify_str(None, false, now()), None);
    }
}
