// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{SUPPORTED_LOCALES, get_setting, pretty_table, set_setting};
use anyhow::{Result, bail};
use rusqlite::Connection;

const KEYS: &[&str] = &["currency", "locale"];

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("get", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().trim();
            check_key(key)?;
            match get_setting(conn, key)? {
                Some(v) => println!("{}", v),
                None => println!("{} (default)", default_for(key)),
            }
        }
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().trim();
            let raw = sub.get_one::<String>("value").unwrap().trim();
            check_key(key)?;
            let value = match key {
                "currency" => {
                    if raw.len() != 3 || !raw.chars().all(|c| c.is_ascii_alphabetic()) {
                        bail!("Currency must be a 3-letter code, got '{}'", raw);
                    }
                    raw.to_uppercase()
                }
                _ => {
                    if !SUPPORTED_LOCALES.contains(&raw) {
                        bail!(
                            "Unsupported locale '{}' (use {})",
                            raw,
                            SUPPORTED_LOCALES.join("|")
                        );
                    }
                    raw.to_string()
                }
            };
            set_setting(conn, key, &value)?;
            println!("{} = {}", key, value);
        }
        Some(("list", _)) => {
            let mut rows = Vec::new();
            for key in KEYS {
                let v = get_setting(conn, key)?.unwrap_or_else(|| default_for(key).to_string());
                rows.push(vec![key.to_string(), v]);
            }
            println!("{}", pretty_table(&["Key", "Value"], rows));
        }
        _ => {}
    }
    Ok(())
}

fn check_key(key: &str) -> Result<()> {
    if !KEYS.contains(&key) {
        bail!("Unknown setting '{}' (use {})", key, KEYS.join("|"));
    }
    Ok(())
}

fn default_for(key: &str) -> &'static str {
    match key {
        "currency" => crate::utils::DEFAULT_CURRENCY,
        _ => crate::utils::DEFAULT_LOCALE,
    }
}
