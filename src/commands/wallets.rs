// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::allocation::progress_pct;
use crate::utils::{display_money, id_for_user, maybe_print_json, parse_decimal, pretty_table};
use crate::wallet::{load_wallet, set_monthly_target};
use anyhow::Result;
use chrono::Local;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => {
            let json_flag = sub.get_flag("json");
            let jsonl_flag = sub.get_flag("jsonl");
            let user = sub.get_one::<String>("user").unwrap();
            let user_id = id_for_user(conn, user)?;
            let w = load_wallet(conn, user_id, Local::now().date_naive())?;
            if !maybe_print_json(json_flag, jsonl_flag, &w)? {
                let rows = vec![
                    vec!["Balance".into(), display_money(conn, w.balance)?],
                    vec!["This month".into(), display_money(conn, w.monthly_earnings)?],
                    vec!["Monthly target".into(), display_money(conn, w.monthly_target)?],
                    vec![
                        "Progress".into(),
                        format!("{}%", progress_pct(w.monthly_earnings, w.monthly_target)),
                    ],
                ];
                println!("{}", pretty_table(&[user.trim(), ""], rows));
            }
        }
        Some(("target", sub)) => {
            let user = sub.get_one::<String>("user").unwrap();
            let user_id = id_for_user(conn, user)?;
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            set_monthly_target(conn, user_id, amount)?;
            println!(
                "Monthly target for {} set to {}",
                user.trim(),
                display_money(conn, amount)?
            );
        }
        _ => {}
    }
    Ok(())
}
