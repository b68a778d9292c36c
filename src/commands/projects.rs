// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::allocation::{
    compute_allocation, load_financials, load_project, progress_pct,
    recalculate_project_financials, validate_split,
};
use crate::utils::{
    display_money, id_for_org, id_for_project, id_for_user, maybe_print_json, parse_decimal,
    pretty_table,
};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;

pub const DEFAULT_COLUMNS: &[(&str, bool)] = &[("To Do", false), ("In Progress", false), ("Done", true)];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    pub company: Decimal,
    pub team: Decimal,
    pub finder: Decimal,
}

impl Default for Split {
    fn default() -> Self {
        Self {
            company: Decimal::from(50),
            team: Decimal::from(40),
            finder: Decimal::from(10),
        }
    }
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("split", sub)) => {
            let project_id = id_for_project(conn, sub.get_one::<String>("project").unwrap())?;
            let split = split_from_args(sub)?;
            update_split(conn, project_id, split)?;
            println!(
                "Split updated to {}/{}/{}",
                split.company, split.team, split.finder
            );
        }
        Some(("budget", sub)) => {
            let project_id = id_for_project(conn, sub.get_one::<String>("project").unwrap())?;
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            update_and_recalc(
                conn,
                project_id,
                "UPDATE projects SET budget=?1 WHERE id=?2",
                params![amount.to_string(), project_id],
            )?;
            println!("Budget set to {}", display_money(conn, amount)?);
        }
        Some(("freeze", sub)) => set_frozen(conn, sub, true)?,
        Some(("unfreeze", sub)) => set_frozen(conn, sub, false)?,
        Some(("recalc", sub)) => {
            let project_id = id_for_project(conn, sub.get_one::<String>("project").unwrap())?;
            let fin = recalculate_project_financials(conn, project_id)?;
            println!(
                "Recalculated: gross profit {}",
                display_money(conn, fin.gross_profit)?
            );
        }
        Some(("rm", sub)) => {
            let key = sub.get_one::<String>("project").unwrap();
            let project_id = id_for_project(conn, key)?;
            let users = project_users(conn, project_id)?;
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM projects WHERE id=?1", params![project_id])?;
            for u in users {
                crate::wallet::refresh_wallet(&tx, u)?;
            }
            tx.commit()?;
            println!("Removed project '{}'", key.trim());
        }
        _ => {}
    }
    Ok(())
}

fn split_from_args(sub: &clap::ArgMatches) -> Result<Split> {
    let d = Split::default();
    let get = |name: &str, fallback: Decimal| -> Result<Decimal> {
        match sub.get_one::<String>(name) {
            Some(s) => parse_decimal(s),
            None => Ok(fallback),
        }
    };
    Ok(Split {
        company: get("company", d.company)?,
        team: get("team", d.team)?,
        finder: get("finder", d.finder)?,
    })
}

/// Insert a project with the default board. The split is checked before
/// anything is written.
pub fn create_project(
    conn: &Connection,
    org_id: i64,
    name: &str,
    budget: Decimal,
    split: Split,
    finder_id: Option<i64>,
) -> Result<i64> {
    validate_split(split.company, split.team, split.finder)?;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO projects(org_id, name, budget, company_share_pct, team_share_pct,
                              finder_commission_pct, finder_id)
         VALUES (?1,?2,?3,?4,?5,?6,?7)",
        params![
            org_id,
            name,
            budget.to_string(),
            split.company.to_string(),
            split.team.to_string(),
            split.finder.to_string(),
            finder_id
        ],
    )
    .with_context(|| format!("Could not add project '{}'", name))?;
    let project_id = tx.last_insert_rowid();
    for (pos, (col, done)) in DEFAULT_COLUMNS.iter().enumerate() {
        tx.execute(
            "INSERT INTO board_columns(project_id, name, position, is_done) VALUES (?1,?2,?3,?4)",
            params![project_id, col, pos as i64, done],
        )?;
    }
    crate::allocation::recalculate_in(&tx, project_id, chrono::Local::now().naive_local())?;
    tx.commit()?;
    tracing::info!(project_id, name, "project created");
    Ok(project_id)
}

pub fn update_split(conn: &Connection, project_id: i64, split: Split) -> Result<()> {
    validate_split(split.company, split.team, split.finder)?;
    update_and_recalc(
        conn,
        project_id,
        "UPDATE projects SET company_share_pct=?1, team_share_pct=?2, finder_commission_pct=?3
         WHERE id=?4",
        params![
            split.company.to_string(),
            split.team.to_string(),
            split.finder.to_string(),
            project_id
        ],
    )
}

pub fn set_project_frozen(conn: &Connection, project_id: i64, frozen: bool) -> Result<()> {
    update_and_recalc(
        conn,
        project_id,
        "UPDATE projects SET is_frozen=?1 WHERE id=?2",
        params![frozen, project_id],
    )
}

fn update_and_recalc(
    conn: &Connection,
    project_id: i64,
    sql: &str,
    args: &[&dyn rusqlite::ToSql],
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(sql, args)?;
    crate::allocation::recalculate_in(&tx, project_id, chrono::Local::now().naive_local())?;
    tx.commit()?;
    Ok(())
}

fn project_users(conn: &Connection, project_id: i64) -> Result<Vec<i64>> {
    let mut stmt =
        conn.prepare("SELECT DISTINCT user_id FROM task_commissions WHERE project_id=?1")?;
    let ids = stmt
        .query_map(params![project_id], |r| r.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let org_id = id_for_org(conn, sub.get_one::<String>("org").unwrap())?;
    let name = sub.get_one::<String>("name").unwrap().trim();
    let budget = parse_decimal(sub.get_one::<String>("budget").unwrap())?;
    let split = split_from_args(sub)?;
    let finder_id = match sub.get_one::<String>("finder-user") {
        Some(u) => Some(id_for_user(conn, u)?),
        None => None,
    };
    let id = create_project(conn, org_id, name, budget, split, finder_id)?;
    println!(
        "Added project '{}' (#{}) with budget {}",
        name,
        id,
        display_money(conn, budget)?
    );
    Ok(())
}

fn set_frozen(conn: &Connection, sub: &clap::ArgMatches, frozen: bool) -> Result<()> {
    let key = sub.get_one::<String>("project").unwrap();
    let project_id = id_for_project(conn, key)?;
    set_project_frozen(conn, project_id, frozen)?;
    println!(
        "Project '{}' {}",
        key.trim(),
        if frozen { "frozen" } else { "unfrozen" }
    );
    Ok(())
}

#[derive(Serialize)]
struct ProjectRow {
    id: i64,
    organization: String,
    name: String,
    budget: Decimal,
    total_expenses: Decimal,
    gross_profit: Decimal,
    is_frozen: bool,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let org_filter = match sub.get_one::<String>("org") {
        Some(o) => Some(id_for_org(conn, o)?),
        None => None,
    };
    let mut stmt = conn.prepare(
        "SELECT p.id, o.name FROM projects p JOIN organizations o ON o.id=p.org_id
         WHERE (?1 IS NULL OR p.org_id=?1) ORDER BY o.name, p.name",
    )?;
    let ids = stmt
        .query_map(params![org_filter], |r| {
            Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut data = Vec::new();
    for (id, organization) in ids {
        let p = load_project(conn, id)?;
        let fin = match load_financials(conn, id)? {
            Some(f) => f,
            None => compute_allocation(&p),
        };
        data.push(ProjectRow {
            id,
            organization,
            name: p.name,
            budget: p.budget,
            total_expenses: fin.total_expenses,
            gross_profit: fin.gross_profit,
            is_frozen: fin.is_frozen,
        });
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let mut rows = Vec::new();
        for r in &data {
            rows.push(vec![
                r.id.to_string(),
                r.organization.clone(),
                r.name.clone(),
                display_money(conn, r.budget)?,
                display_money(conn, r.total_expenses)?,
                display_money(conn, r.gross_profit)?,
                if r.is_frozen { "yes".into() } else { String::new() },
            ]);
        }
        println!(
            "{}",
            pretty_table(
                &["ID", "Org", "Project", "Budget", "Expenses", "Gross Profit", "Frozen"],
                rows
            )
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ProjectCard {
    pub id: i64,
    pub name: String,
    pub budget: Decimal,
    pub total_expenses: Decimal,
    pub gross_profit: Decimal,
    pub budget_used_pct: Decimal,
    pub is_frozen: bool,
    pub company_earnings: Option<Decimal>,
    pub team_pool: Option<Decimal>,
    pub finder_commission: Option<Decimal>,
    pub finder: Option<String>,
    pub tasks_done: i64,
    pub tasks_total: i64,
    pub tasks_done_pct: Decimal,
}

/// Summary of one project. Shares read as `None` while the project is frozen.
pub fn project_card(conn: &Connection, project_id: i64) -> Result<ProjectCard> {
    let p = load_project(conn, project_id)?;
    let fin = match load_financials(conn, project_id)? {
        Some(f) => f,
        None => compute_allocation(&p),
    };
    let (tasks_total, tasks_done): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COUNT(completed_at) FROM tasks WHERE project_id=?1",
        params![project_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let finder: Option<String> = match p.finder_id {
        Some(id) => conn
            .query_row("SELECT name FROM users WHERE id=?1", params![id], |r| r.get(0))
            .optional()?,
        None => None,
    };
    let trusted = |v: Decimal| if fin.is_frozen { None } else { Some(v) };
    Ok(ProjectCard {
        id: p.id,
        name: p.name,
        budget: p.budget,
        total_expenses: fin.total_expenses,
        gross_profit: fin.gross_profit,
        budget_used_pct: progress_pct(fin.total_expenses, p.budget),
        is_frozen: fin.is_frozen,
        company_earnings: trusted(fin.company_earnings),
        team_pool: trusted(fin.team_pool),
        finder_commission: trusted(fin.finder_commission),
        finder,
        tasks_done,
        tasks_total,
        tasks_done_pct: progress_pct(Decimal::from(tasks_done), Decimal::from(tasks_total)),
    })
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let project_id = id_for_project(conn, sub.get_one::<String>("project").unwrap())?;
    let card = project_card(conn, project_id)?;
    if maybe_print_json(json_flag, jsonl_flag, &card)? {
        return Ok(());
    }
    let p = load_project(conn, project_id)?;
    let share = |v: Option<Decimal>, pct: Decimal| -> Result<String> {
        Ok(match v {
            Some(v) => format!("{} ({}%)", display_money(conn, v)?, pct),
            None => "frozen".to_string(),
        })
    };
    let mut finder = share(card.finder_commission, p.finder_commission_pct)?;
    if let Some(name) = &card.finder {
        finder = format!("{} to {}", finder, name);
    }
    let rows = vec![
        vec!["Budget".into(), display_money(conn, card.budget)?],
        vec![
            "Expenses".into(),
            format!(
                "{} ({}% of budget)",
                display_money(conn, card.total_expenses)?,
                card.budget_used_pct
            ),
        ],
        vec!["Gross profit".into(), display_money(conn, card.gross_profit)?],
        vec!["Company".into(), share(card.company_earnings, p.company_share_pct)?],
        vec!["Team pool".into(), share(card.team_pool, p.team_share_pct)?],
        vec!["Finder".into(), finder],
        vec![
            "Tasks".into(),
            format!("{}/{} done ({}%)", card.tasks_done, card.tasks_total, card.tasks_done_pct),
        ],
    ];
    println!("{}", pretty_table(&[card.name.as_str(), ""], rows));
    Ok(())
}
