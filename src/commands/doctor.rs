// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::YearMonth;
use crate::utils::pretty_table;
use anyhow::Result;
use chrono::Local;
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection) -> Result<()> {
    let rows = check(conn, YearMonth::of(Local::now().date_naive()))?;
    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

/// Integrity findings as (issue, detail) rows; `current` is the month
/// markers may not go past.
pub fn check(conn: &Connection, current: YearMonth) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();

    // 1) Markers ahead of the current month (backfilled with a future date)
    let mut stmt = conn.prepare(
        "SELECT id, last_materialized FROM recurring_transactions
         WHERE last_materialized IS NOT NULL ORDER BY id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let raw: String = r.get(1)?;
        match raw.parse::<YearMonth>() {
            Ok(m) if m > current => {
                rows.push(vec!["future_marker".into(), format!("rule {} at {}", id, m)])
            }
            Ok(_) => {}
            Err(_) => rows.push(vec!["bad_marker".into(), format!("rule {} '{}'", id, raw)]),
        }
    }

    // 2) Category owned by someone else
    for (table, label) in [
        ("recurring_transactions", "rule"),
        ("transactions", "transaction"),
    ] {
        let mut stmt = conn.prepare(&format!(
            "SELECT x.id, x.owner_id, c.owner_id FROM {table} x
             JOIN categories c ON x.category_id=c.id
             WHERE x.owner_id<>c.owner_id ORDER BY x.id"
        ))?;
        let mut cur = stmt.query([])?;
        while let Some(r) = cur.next()? {
            let id: i64 = r.get(0)?;
            let owner: i64 = r.get(1)?;
            let cat_owner: i64 = r.get(2)?;
            rows.push(vec![
                "foreign_category".into(),
                format!("{} {} (owner {}) uses category of owner {}", label, id, owner, cat_owner),
            ]);
        }
    }

    // 3) Amounts that do not parse or are not positive
    for (table, label) in [
        ("recurring_transactions", "rule"),
        ("transactions", "transaction"),
    ] {
        let mut stmt = conn.prepare(&format!("SELECT id, amount FROM {table} ORDER BY id"))?;
        let mut cur = stmt.query([])?;
        while let Some(r) = cur.next()? {
            let id: i64 = r.get(0)?;
            let raw: String = r.get(1)?;
            match raw.parse::<Decimal>() {
                Ok(d) if d > Decimal::ZERO => {}
                _ => rows.push(vec!["bad_amount".into(), format!("{} {} '{}'", label, id, raw)]),
            }
        }
    }

    // 4) More than one materialized transaction per rule and month
    let mut stmt = conn.prepare(
        "SELECT origin_rule_id, substr(date,1,7) AS month, COUNT(*) FROM transactions
         WHERE origin_rule_id IS NOT NULL
         GROUP BY origin_rule_id, month HAVING COUNT(*) > 1",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let month: String = r.get(1)?;
        let n: i64 = r.get(2)?;
        rows.push(vec![
            "duplicate_materialization".into(),
            format!("rule {} has {} transactions in {}", id, n, month),
        ]);
    }

    Ok(rows)
}
