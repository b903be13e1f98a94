// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{
    check_note, id_for_category, maybe_print_json, opt_arg, parse_amount, parse_date, parse_id,
    parse_kind, parse_month, pretty_table, required_arg, resolve_owner,
};
use crate::models::{Transaction, TransactionKind};
use anyhow::{Context, Result, anyhow};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => {
            let id = parse_id(required_arg(sub, "id")?)?;
            let n = conn.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
            if n == 0 {
                return Err(anyhow!("Transaction {} not found", id));
            }
            println!("Removed transaction {}", id);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = resolve_owner(conn, sub)?;
    let date = parse_date(required_arg(sub, "date")?)?;
    let amount = parse_amount(required_arg(sub, "amount")?)?;
    let kind = parse_kind(required_arg(sub, "kind")?)?;
    let note = check_note(opt_arg(sub, "note"))?;
    let category_id = match opt_arg(sub, "category") {
        Some(cat) => Some(id_for_category(conn, owner, &cat)?),
        None => None,
    };

    conn.execute(
        "INSERT INTO transactions(owner_id, date, amount, kind, category_id, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            owner,
            date.to_string(),
            amount.to_string(),
            kind.as_str(),
            category_id,
            note
        ],
    )?;
    println!("Recorded {} {} on {}", kind, amount, date);
    Ok(())
}

pub fn load_transaction(conn: &Connection, id: i64) -> Result<Option<Transaction>> {
    let row = conn
        .query_row(
            "SELECT id, owner_id, date, amount, kind, category_id, note, origin_rule_id
             FROM transactions WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, Option<i64>>(5)?,
                    r.get::<_, Option<String>>(6)?,
                    r.get::<_, Option<i64>>(7)?,
                ))
            },
        )
        .optional()?;
    let Some((id, owner_id, date, amount, kind, category_id, note, origin_rule_id)) = row else {
        return Ok(None);
    };
    Ok(Some(Transaction {
        id,
        owner_id,
        date: parse_date(&date)?,
        amount: amount
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' on transaction {}", amount, id))?,
        kind: kind.parse::<TransactionKind>()?,
        category_id,
        note,
        origin_rule_id,
    }))
}

/// Rewrites user-editable fields; the recurring provenance is kept.
fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = parse_id(required_arg(sub, "id")?)?;
    let mut t = load_transaction(conn, id)?.with_context(|| format!("Transaction {} not found", id))?;

    if let Some(raw) = opt_arg(sub, "date") {
        t.date = parse_date(&raw)?;
    }
    if let Some(raw) = opt_arg(sub, "amount") {
        t.amount = parse_amount(&raw)?;
    }
    if let Some(raw) = opt_arg(sub, "kind") {
        t.kind = parse_kind(&raw)?;
    }
    if let Some(cat) = opt_arg(sub, "category") {
        t.category_id = Some(id_for_category(conn, t.owner_id, &cat)?);
    } else if sub.get_flag("clear_category") {
        t.category_id = None;
    }
    if sub.contains_id("note") {
        t.note = check_note(opt_arg(sub, "note"))?;
    }

    conn.execute(
        "UPDATE transactions SET date=?2, amount=?3, kind=?4, category_id=?5, note=?6 WHERE id=?1",
        params![
            t.id,
            t.date.to_string(),
            t.amount.to_string(),
            t.kind.as_str(),
            t.category_id,
            t.note
        ],
    )?;
    println!("Updated transaction {}", id);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.kind.clone(),
                    r.amount.clone(),
                    r.category.clone(),
                    r.note.clone(),
                    r.recurring_id.map(|id| id.to_string()).unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Kind", "Amount", "Category", "Note", "Recurring"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub kind: String,
    pub amount: String,
    pub category: String,
    pub note: String,
    pub recurring_id: Option<i64>,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let owner = resolve_owner(conn, sub)?;
    let mut sql = String::from(
        "SELECT t.id, t.date, t.kind, t.amount, c.name, t.note, t.origin_rule_id
         FROM transactions t LEFT JOIN categories c ON t.category_id=c.id
         WHERE t.owner_id=?",
    );
    let mut params_vec: Vec<Value> = vec![Value::Integer(owner)];

    if let Some(month) = opt_arg(sub, "month") {
        sql.push_str(" AND substr(t.date,1,7)=?");
        params_vec.push(Value::Text(parse_month(&month)?.to_string()));
    }
    if let Some(kind) = opt_arg(sub, "kind") {
        sql.push_str(" AND t.kind=?");
        params_vec.push(Value::Text(parse_kind(&kind)?.as_str().to_string()));
    }
    if let Some(cat) = opt_arg(sub, "category") {
        sql.push_str(" AND c.name=?");
        params_vec.push(Value::Text(cat));
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(Value::Integer(i64::try_from(*limit)?));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params_vec.iter()))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let category: Option<String> = r.get(4)?;
        let note: Option<String> = r.get(5)?;
        data.push(TransactionRow {
            id: r.get(0)?,
            date: r.get(1)?,
            kind: r.get(2)?,
            amount: r.get(3)?,
            category: category.unwrap_or_default(),
            note: note.unwrap_or_default(),
            recurring_id: r.get(6)?,
        });
    }
    Ok(data)
}
