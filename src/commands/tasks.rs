// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::allocation::recalculate_in;
use crate::commands::columns::list_columns;
use crate::deadline::{classify_str, parse_due};
use crate::error::LedgerError;
use crate::mentions::notify_mentions;
use crate::models::{Priority, Task};
use crate::utils::{
    decimal_from_db, id_for_project, id_for_user, maybe_print_json, parse_decimal, pretty_table,
};
use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<i64>,
    pub priority: Priority,
    pub due_date: Option<String>,
    pub weight: Decimal,
}

impl NewTask {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            assignee_id: None,
            priority: Priority::Medium,
            due_date: None,
            weight: Decimal::ONE,
        }
    }
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("move", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let column = sub.get_one::<String>("column").unwrap();
            move_task(conn, id, column)?;
            println!("Moved task #{} to '{}'", id, column.trim());
        }
        Some(("assign", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let user = sub.get_one::<String>("user");
            let user_id = match user {
                Some(u) => Some(id_for_user(conn, u)?),
                None => None,
            };
            assign_task(conn, id, user_id)?;
            match user {
                Some(u) => println!("Assigned task #{} to {}", id, u.trim()),
                None => println!("Unassigned task #{}", id),
            }
        }
        Some(("comment", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let text = sub.get_one::<String>("text").unwrap();
            let author = match sub.get_one::<String>("by") {
                Some(u) => Some(id_for_user(conn, u)?),
                None => None,
            };
            let notified = comment_on_task(conn, id, text, author)?;
            println!("Comment added, {} user(s) notified", notified.len());
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let project_id = load_task(conn, id)?.project_id;
            let tx = conn.unchecked_transaction()?;
            let user: Option<i64> = tx
                .query_row(
                    "SELECT user_id FROM task_commissions WHERE task_id=?1",
                    params![id],
                    |r| r.get(0),
                )
                .optional()?;
            tx.execute("DELETE FROM tasks WHERE id=?1", params![id])?;
            recalculate_in(&tx, project_id, Local::now().naive_local())?;
            if let Some(u) = user {
                crate::wallet::refresh_wallet(&tx, u)?;
            }
            tx.commit()?;
            println!("Removed task #{}", id);
        }
        _ => {}
    }
    Ok(())
}

pub fn load_task(conn: &Connection, task_id: i64) -> Result<Task> {
    let row = conn
        .query_row(
            "SELECT id, project_id, column_id, title, description, assignee_id, priority,
                    due_date, weight, completed_at
             FROM tasks WHERE id=?1",
            params![task_id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, i64>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, Option<String>>(4)?,
                    r.get::<_, Option<i64>>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, Option<String>>(7)?,
                    r.get::<_, String>(8)?,
                    r.get::<_, Option<NaiveDateTime>>(9)?,
                ))
            },
        )
        .optional()?;
    let Some((id, project_id, column_id, title, description, assignee_id, priority, due_date, weight, completed_at)) =
        row
    else {
        return Err(LedgerError::not_found("Task", task_id).into());
    };
    Ok(Task {
        id,
        project_id,
        column_id,
        title,
        description,
        assignee_id,
        priority: priority.parse()?,
        due_date,
        weight: decimal_from_db(&weight)?,
        completed_at,
    })
}

/// Add a task to the project's first column. Fails when the project has no
/// columns at all.
pub fn add_task(
    conn: &Connection,
    project_id: i64,
    task: &NewTask,
    author_id: Option<i64>,
) -> Result<i64> {
    if let Some(due) = &task.due_date {
        parse_due(due)?;
    }
    let first = list_columns(conn, project_id)?.into_iter().next();
    let column = first.ok_or_else(|| {
        LedgerError::InvalidState(format!("project #{} has no board columns", project_id))
    })?;
    let now = Local::now().naive_local();
    let completed_at: Option<NaiveDateTime> = column.is_done.then_some(now);

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO tasks(project_id, column_id, title, description, assignee_id, priority,
                           due_date, weight, completed_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
        params![
            project_id,
            column.id,
            task.title.trim(),
            task.description,
            task.assignee_id,
            task.priority.as_str(),
            task.due_date.as_deref().map(str::trim),
            task.weight.to_string(),
            completed_at
        ],
    )?;
    let task_id = tx.last_insert_rowid();
    if let Some(text) = &task.description {
        notify_mentions(&tx, text, Some(task_id), author_id)?;
    }
    if let Some(assignee) = task.assignee_id {
        if Some(assignee) != author_id {
            tx.execute(
                "INSERT INTO notifications(user_id, kind, message, task_id)
                 VALUES (?1,'assigned',?2,?3)",
                params![
                    assignee,
                    format!("You were assigned '{}'", task.title.trim()),
                    task_id
                ],
            )?;
        }
    }
    recalculate_in(&tx, project_id, now)?;
    tx.commit()?;
    tracing::info!(task_id, project_id, "task added");
    Ok(task_id)
}

/// Move a task to a column of its own project. Entering a done column marks
/// the task completed; leaving one clears it.
pub fn move_task(conn: &Connection, task_id: i64, column: &str) -> Result<()> {
    let task = load_task(conn, task_id)?;
    let name = column.trim();
    let target = list_columns(conn, task.project_id)?
        .into_iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| LedgerError::not_found("Column", name))?;
    let now = Local::now().naive_local();
    let completed_at = if target.is_done {
        Some(task.completed_at.unwrap_or(now))
    } else {
        None
    };
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE tasks SET column_id=?1, completed_at=?2 WHERE id=?3",
        params![target.id, completed_at, task_id],
    )?;
    recalculate_in(&tx, task.project_id, now)?;
    tx.commit()?;
    Ok(())
}

pub fn assign_task(conn: &Connection, task_id: i64, user_id: Option<i64>) -> Result<()> {
    let project_id = load_task(conn, task_id)?.project_id;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE tasks SET assignee_id=?1 WHERE id=?2",
        params![user_id, task_id],
    )?;
    if let Some(u) = user_id {
        tx.execute(
            "INSERT INTO notifications(user_id, kind, message, task_id)
             VALUES (?1,'assigned',?2,?3)",
            params![u, format!("You were assigned task #{}", task_id), task_id],
        )?;
    }
    recalculate_in(&tx, project_id, Local::now().naive_local())?;
    tx.commit()?;
    Ok(())
}

pub fn comment_on_task(
    conn: &Connection,
    task_id: i64,
    text: &str,
    author_id: Option<i64>,
) -> Result<Vec<i64>> {
    load_task(conn, task_id)?;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO task_comments(task_id, author_id, body) VALUES (?1,?2,?3)",
        params![task_id, author_id, text.trim()],
    )?;
    let notified = notify_mentions(&tx, text, Some(task_id), author_id)?;
    tx.commit()?;
    Ok(notified)
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project_id = id_for_project(conn, sub.get_one::<String>("project").unwrap())?;
    let assignee_id = match sub.get_one::<String>("assignee") {
        Some(u) => Some(id_for_user(conn, u)?),
        None => None,
    };
    let author_id = match sub.get_one::<String>("by") {
        Some(u) => Some(id_for_user(conn, u)?),
        None => None,
    };
    let task = NewTask {
        title: sub.get_one::<String>("title").unwrap().trim().to_string(),
        description: sub.get_one::<String>("description").cloned(),
        assignee_id,
        priority: sub.get_one::<String>("priority").unwrap().parse()?,
        due_date: sub.get_one::<String>("due").cloned(),
        weight: parse_decimal(sub.get_one::<String>("weight").unwrap())?,
    };
    let id = add_task(conn, project_id, &task, author_id)?;
    println!("Added task #{} '{}'", id, task.title);
    Ok(())
}

#[derive(Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub column: String,
    pub title: String,
    pub assignee: String,
    pub priority: String,
    pub due_date: String,
    pub deadline: Option<crate::deadline::DeadlineStatus>,
    pub done: bool,
}

pub fn query_tasks(
    conn: &Connection,
    project_id: i64,
    assignee_id: Option<i64>,
    now: NaiveDateTime,
) -> Result<Vec<TaskRow>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, c.name, t.title, COALESCE(u.name,''), t.priority, t.due_date, t.completed_at
         FROM tasks t
         JOIN board_columns c ON c.id=t.column_id
         LEFT JOIN users u ON u.id=t.assignee_id
         WHERE t.project_id=?1 AND (?2 IS NULL OR t.assignee_id=?2)
         ORDER BY c.position, t.id",
    )?;
    let raw = stmt
        .query_map(params![project_id, assignee_id], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, Option<String>>(5)?,
                r.get::<_, Option<String>>(6)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(raw
        .into_iter()
        .map(|(id, column, title, assignee, priority, due, completed)| {
            let done = completed.is_some();
            TaskRow {
                id,
                column,
                title,
                assignee,
                priority,
                deadline: classify_str(due.as_deref(), done, now),
                due_date: due.unwrap_or_default(),
                done,
            }
        })
        .collect())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let project_id = id_for_project(conn, sub.get_one::<String>("project").unwrap())?;
    let assignee = match sub.get_one::<String>("assignee") {
        Some(u) => Some(id_for_user(conn, u)?),
        None => None,
    };
    let data = query_tasks(conn, project_id, assignee, Local::now().naive_local())?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows = data
            .iter()
            .map(|t| {
                vec![
                    t.id.to_string(),
                    t.column.clone(),
                    t.title.clone(),
                    t.assignee.clone(),
                    t.priority.clone(),
                    t.due_date.clone(),
                    t.deadline.map(|d| d.to_string()).unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Column", "Title", "Assignee", "Priority", "Due", "Deadline"],
                rows
            )
        );
    }
    Ok(())
}
