// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::get_default_owner;
use crate::models::{MAX_DAY_OF_MONTH, TransactionKind, YearMonth};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

pub const MAX_NOTE_LEN: usize = 500;
pub const MAX_CATEGORY_NAME_LEN: usize = 255;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_month(s: &str) -> Result<YearMonth> {
    Ok(s.parse::<YearMonth>()?)
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Positive amount with at most two decimals, normalized to exactly two.
pub fn parse_amount(s: &str) -> Result<Decimal> {
    let d = parse_decimal(s)?;
    if d <= Decimal::ZERO {
        return Err(anyhow!("Amount must be greater than zero, got {}", d));
    }
    if d.normalize().scale() > 2 {
        return Err(anyhow!("Amount '{}' has more than two decimals", s.trim()));
    }
    let mut fixed = d;
    fixed.rescale(2);
    Ok(fixed)
}

pub fn parse_day_of_month(s: &str) -> Result<u32> {
    let day: u32 = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid day of month '{}'", s))?;
    if !(1..=MAX_DAY_OF_MONTH).contains(&day) {
        return Err(anyhow!(
            "Day of month must be between 1 and {}, got {}",
            MAX_DAY_OF_MONTH,
            day
        ));
    }
    Ok(day)
}

pub fn parse_kind(s: &str) -> Result<TransactionKind> {
    Ok(s.parse::<TransactionKind>()?)
}

pub fn parse_id(s: &str) -> Result<i64> {
    s.trim()
        .parse::<i64>()
        .with_context(|| format!("Invalid id '{}'", s))
}

pub fn check_note(note: Option<String>) -> Result<Option<String>> {
    match note {
        Some(n) if n.chars().count() > MAX_NOTE_LEN => Err(anyhow!(
            "Note is longer than {} characters",
            MAX_NOTE_LEN
        )),
        other => Ok(other),
    }
}

/// Trimmed value of an optional string argument, `None` when blank.
pub fn opt_arg(sub: &clap::ArgMatches, name: &str) -> Option<String> {
    sub.get_one::<String>(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

pub fn required_arg<'a>(sub: &'a clap::ArgMatches, name: &str) -> Result<&'a str> {
    sub.get_one::<String>(name)
        .map(|s| s.as_str())
        .with_context(|| format!("Missing --{}", name))
}

/// `--owner` when given, otherwise the configured default owner.
pub fn resolve_owner(conn: &Connection, sub: &clap::ArgMatches) -> Result<i64> {
    match opt_arg(sub, "owner") {
        Some(raw) => parse_id(&raw),
        None => get_default_owner(conn),
    }
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

pub fn id_for_category(conn: &Connection, owner: i64, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM categories WHERE owner_id=?1 AND name=?2")?;
    let id: i64 = stmt
        .query_row(params![owner, name], |r| r.get(0))
        .with_context(|| format!("Category '{}' not found", name))?;
    Ok(id)
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
