// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::TransactionKind;
use crate::utils::{maybe_print_json, parse_kind, parse_month, pretty_table, required_arg, resolve_owner};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("cashflow", sub)) => {
            let owner = resolve_owner(conn, sub)?;
            let months = *sub.get_one::<usize>("months").unwrap_or(&12);
            let data = cashflow(conn, owner, months)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|r| {
                        vec![
                            r.month.clone(),
                            format!("{:.2}", r.income),
                            format!("{:.2}", r.expense),
                            format!("{:.2}", r.net),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Month", "Income", "Expense", "Net"], rows)
                );
            }
        }
        Some(("by-category", sub)) => {
            let owner = resolve_owner(conn, sub)?;
            let month = parse_month(required_arg(sub, "month")?)?;
            let kind = parse_kind(required_arg(sub, "kind")?)?;
            let data = by_category(conn, owner, &month.to_string(), kind)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|r| {
                        vec![
                            r.category.clone(),
                            format!("{:.2}", r.total),
                            format!("{:.1}%", r.share),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["Category", "Total", "Share"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}

fn parse_stored_amount(raw: &str, date: &str) -> Result<Decimal> {
    raw.parse::<Decimal>()
        .with_context(|| format!("Invalid amount '{}' on {}", raw, date))
}

#[derive(Debug, Serialize)]
pub struct CashflowRow {
    pub month: String,
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
}

/// Income and expense totals for the latest `months` months, newest first.
pub fn cashflow(conn: &Connection, owner: i64, months: usize) -> Result<Vec<CashflowRow>> {
    let mut stmt = conn.prepare(
        "SELECT substr(date,1,7) AS month, date, amount, kind
         FROM transactions WHERE owner_id=?1",
    )?;
    let rows = stmt.query_map(params![owner], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;

    let mut map: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for row in rows {
        let (month, date, amount, kind) = row?;
        let amt = parse_stored_amount(&amount, &date)?;
        let entry = map.entry(month).or_insert((Decimal::ZERO, Decimal::ZERO));
        match parse_kind(&kind)? {
            TransactionKind::Income => entry.0 += amt,
            TransactionKind::Expense => entry.1 += amt,
        }
    }
    Ok(map
        .into_iter()
        .rev()
        .take(months)
        .map(|(month, (income, expense))| CashflowRow {
            month,
            income,
            expense,
            net: income - expense,
        })
        .collect())
}

#[derive(Debug, Serialize)]
pub struct CategoryRow {
    pub category: String,
    pub total: Decimal,
    /// Percentage of the month's total for this kind.
    pub share: Decimal,
}

pub fn by_category(
    conn: &Connection,
    owner: i64,
    month: &str,
    kind: TransactionKind,
) -> Result<Vec<CategoryRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.name, t.date, t.amount
         FROM transactions t LEFT JOIN categories c ON t.category_id=c.id
         WHERE t.owner_id=?1 AND substr(t.date,1,7)=?2 AND t.kind=?3",
    )?;
    let rows = stmt.query_map(params![owner, month, kind.as_str()], |r| {
        Ok((
            r.get::<_, Option<String>>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;

    let mut agg: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut grand = Decimal::ZERO;
    for row in rows {
        let (cat, date, amount) = row?;
        let amt = parse_stored_amount(&amount, &date)?;
        *agg
            .entry(cat.unwrap_or_else(|| "(uncategorized)".into()))
            .or_insert(Decimal::ZERO) += amt;
        grand += amt;
    }

    let mut items: Vec<CategoryRow> = agg
        .into_iter()
        .map(|(category, total)| CategoryRow {
            category,
            total,
            share: if grand.is_zero() {
                Decimal::ZERO
            } else {
                (total * Decimal::ONE_HUNDRED / grand).round_dp(1)
            },
        })
        .collect();
    items.sort_by(|a, b| b.total.cmp(&a.total));
    Ok(items)
}
