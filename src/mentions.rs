// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::LedgerResult;

static MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w@.])@([A-Za-z0-9_][A-Za-z0-9_.-]*)").expect("mention pattern")
});

/// `@name` tokens in order of first appearance, case-insensitively unique.
/// E-mail addresses are not mentions.
pub fn parse_mentions(text: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for cap in MENTION.captures_iter(text) {
        let name = cap[1].trim_end_matches(['.', '-']);
        if name.is_empty() {
            continue;
        }
        if !seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            seen.push(name.to_string());
        }
    }
    seen
}

/// Create a `mention` notification for every known user named in `text`,
/// except the author. Unknown names are skipped. Returns the notified ids.
pub fn notify_mentions(
    conn: &Connection,
    text: &str,
    task_id: Option<i64>,
    author_id: Option<i64>,
) -> LedgerResult<Vec<i64>> {
    let mut notified = Vec::new();
    for name in parse_mentions(text) {
        let user: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE name=?1 COLLATE NOCASE",
                params![name],
                |r| r.get(0),
            )
            .optional()?;
        let Some(user_id) = user else {
            tracing::debug!(%name, "mention of unknown user ignored");
            continue;
        };
        if Some(user_id) == author_id || notified.contains(&user_id) {
            continue;
        }
        let message = match task_id {
            Some(t) => format!("You were mentioned on task #{}", t),
            None => "You were mentioned".to_string(),
        };
        conn.execute(
            "INSERT INTO notifications(user_id, kind, message, task_id) VALUES (?1,'mention',?2,?3)",
            params![user_id, message, task_id],
        )?;
        notified.push(user_id);
    }
    Ok(notified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_names_in_order_once() {
        assert_eq!(
            parse_mentions("@ana can you check with @Bruno? cc @ana."),
            vec!["ana".to_string(), "Bruno".to_string()]
        );
    }

    #[test]
    fn ignores_emails_and_bare_at() {
        assert!(parse_mentions("mail ana@example.com @ or @@").is_empty());
        assert_eq!(parse_mentions("(@carla.lima)"), vec!["carla.lima".to_string()]);
    }
}
