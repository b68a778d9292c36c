// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{LedgerError, LedgerResult};

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_LOCALE: &str = "en-US";
pub const SUPPORTED_LOCALES: &[&str] = &["en-US", "de-DE", "pt-BR"];

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Amounts are stored as TEXT; a row that fails to parse is a storage fault.
pub fn decimal_from_db(s: &str) -> LedgerResult<Decimal> {
    s.parse::<Decimal>()
        .map_err(|e| LedgerError::Invalid(format!("stored amount '{}': {}", s, e)))
}

/// Round to cents, half away from zero.
pub fn money(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

pub fn id_for_user(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE name=?1 COLLATE NOCASE",
            params![name],
            |r| r.get(0),
        )
        .optional()?;
    id.ok_or_else(|| LedgerError::not_found("User", name).into())
}

pub fn id_for_org(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM organizations WHERE name=?1",
            params![name],
            |r| r.get(0),
        )
        .optional()?;
    id.ok_or_else(|| LedgerError::not_found("Organization", name).into())
}

/// Resolve a project by numeric id or by name. Names are only unique within an
/// organization, so a name shared across organizations must be given as an id.
pub fn id_for_project(conn: &Connection, key: &str) -> Result<i64> {
    let key = key.trim();
    if let Ok(id) = key.parse::<i64>() {
        let found: Option<i64> = conn
            .query_row("SELECT id FROM projects WHERE id=?1", params![id], |r| {
                r.get(0)
            })
            .optional()?;
        if let Some(id) = found {
            return Ok(id);
        }
    }
    let mut stmt = conn.prepare("SELECT id FROM projects WHERE name=?1")?;
    let ids = stmt
        .query_map(params![key], |r| r.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    match ids.as_slice() {
        [id] => Ok(*id),
        [] => Err(LedgerError::not_found("Project", key).into()),
        _ => Err(anyhow!(
            "Project name '{}' is ambiguous ({} matches); use its id",
            key,
            ids.len()
        )),
    }
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn get_currency(conn: &Connection) -> Result<String> {
    Ok(get_setting(conn, "currency")?.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
}

pub fn get_locale(conn: &Connection) -> Result<String> {
    Ok(get_setting(conn, "locale")?.unwrap_or_else(|| DEFAULT_LOCALE.to_string()))
}

/// Formats with the configured currency and locale.
pub fn display_money(conn: &Connection, d: Decimal) -> Result<String> {
    Ok(format_currency(d, &get_currency(conn)?, &get_locale(conn)?))
}

struct LocaleFmt {
    group: char,
    decimal: char,
    symbol_after: bool,
    space: bool,
}

fn locale_fmt(locale: &str) -> LocaleFmt {
    match locale {
        "de-DE" => LocaleFmt {
            group: '.',
            decimal: ',',
            symbol_after: true,
            space: true,
        },
        "pt-BR" => LocaleFmt {
            group: '.',
            decimal: ',',
            symbol_after: false,
            space: true,
        },
        _ => LocaleFmt {
            group: ',',
            decimal: '.',
            symbol_after: false,
            space: false,
        },
    }
}

fn currency_symbol(code: &str) -> Option<&'static str> {
    match code {
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "BRL" => Some("R$"),
        "GBP" => Some("£"),
        _ => None,
    }
}

/// Render an amount as a localized currency string, rounded to cents.
/// Unknown locales fall back to `en-US`; unknown currency codes are printed
/// verbatim, separated from the number by a space.
pub fn format_currency(amount: Decimal, code: &str, locale: &str) -> String {
    let lf = locale_fmt(locale);
    let code = code.trim().to_uppercase();
    let rounded = money(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(lf.group);
        }
        grouped.push(ch);
    }
    let number = format!("{}{}{}", grouped, lf.decimal, frac_part);

    let (symbol, space) = match currency_symbol(&code) {
        Some(s) => (s.to_string(), lf.space),
        None => (code, true),
    };
    let sep = if space { " " } else { "" };
    let body = if lf.symbol_after {
        format!("{}{}{}", number, sep, symbol)
    } else {
        format!("{}{}{}", symbol, sep, number)
    };
    if negative { format!("-{}", body) } else { body }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn formats_us_dollars() {
        assert_eq!(format_currency(d("1234.5"), "USD", "en-US"), "$1,234.50");
        assert_eq!(format_currency(d("-5"), "usd", "en-US"), "-$5.00");
        assert_eq!(format_currency(d("0.005"), "USD", "en-US"), "$0.01");
        assert_eq!(format_currency(d("1000000"), "USD", "en-US"), "$1,000,000.00");
    }

    #[test]
    fn formats_european_and_brazilian_locales() {
        assert_eq!(format_currency(d("1234.56"), "EUR", "de-DE"), "1.234,56 €");
        assert_eq!(format_currency(d("1234.56"), "BRL", "pt-BR"), "R$ 1.234,56");
    }

    #[test]
    fn unknown_code_and_locale_fall_back() {
        assert_eq!(format_currency(d("1234.56"), "CHF", "xx-XX"), "CHF 1,234.56");
        assert_eq!(format_currency(d("999"), "JPY", "en-US"), "JPY 999.00");
    }

    #[test]
    fn money_rounds_half_away_from_zero() {
        assert_eq!(money(d("2.345")), d("2.35"));
        assert_eq!(money(d("-2.345")), d("-2.35"));
    }
}
