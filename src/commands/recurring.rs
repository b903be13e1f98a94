// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{load_rule, load_rules};
use crate::runner::{self, resolve_target_date};
use crate::utils::{
    check_note, id_for_category, maybe_print_json, opt_arg, parse_amount, parse_day_of_month,
    parse_id, parse_kind, pretty_table, required_arg, resolve_owner,
};
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use rusqlite::{Connection, params};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => {
            let id = parse_id(required_arg(sub, "id")?)?;
            let n = conn.execute("DELETE FROM recurring_transactions WHERE id=?1", params![id])?;
            if n == 0 {
                return Err(anyhow!("Recurring transaction {} not found", id));
            }
            println!("Removed recurring transaction {}", id);
        }
        Some(("process", sub)) => process(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = resolve_owner(conn, sub)?;
    let amount = parse_amount(required_arg(sub, "amount")?)?;
    let kind = parse_kind(required_arg(sub, "kind")?)?;
    let day = parse_day_of_month(required_arg(sub, "day")?)?;
    let note = check_note(opt_arg(sub, "note"))?;
    let active = !sub.get_flag("inactive");
    let category_id = match opt_arg(sub, "category") {
        Some(cat) => Some(id_for_category(conn, owner, &cat)?),
        None => None,
    };

    conn.execute(
        "INSERT INTO recurring_transactions(owner_id, amount, kind, category_id, note, day_of_month, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            owner,
            amount.to_string(),
            kind.as_str(),
            category_id,
            note,
            day,
            active
        ],
    )?;
    println!(
        "Added recurring {} {} on day {} (id {})",
        kind,
        amount,
        day,
        conn.last_insert_rowid()
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = resolve_owner(conn, sub)?;
    let rules = load_rules(conn, owner)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rules)? {
        return Ok(());
    }
    let mut stmt = conn.prepare("SELECT name FROM categories WHERE id=?1")?;
    let mut data = Vec::new();
    for r in rules {
        let category = match r.category_id {
            Some(id) => stmt.query_row(params![id], |row| row.get::<_, String>(0))?,
            None => String::new(),
        };
        data.push(vec![
            r.id.to_string(),
            r.day_of_month.to_string(),
            r.kind.to_string(),
            r.amount.to_string(),
            category,
            r.note.unwrap_or_default(),
            if r.active { "yes".into() } else { "no".into() },
            r.last_materialized
                .map(|m| m.to_string())
                .unwrap_or_default(),
        ]);
    }
    println!(
        "{}",
        pretty_table(
            &["ID", "Day", "Kind", "Amount", "Category", "Note", "Active", "Last run"],
            data
        )
    );
    Ok(())
}

/// Changes user-editable fields. The materialization marker is left alone.
fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = parse_id(required_arg(sub, "id")?)?;
    let mut rule = load_rule(conn, id)?.with_context(|| format!("Recurring transaction {} not found", id))?;

    if let Some(raw) = opt_arg(sub, "amount") {
        rule.amount = parse_amount(&raw)?;
    }
    if let Some(raw) = opt_arg(sub, "kind") {
        rule.kind = parse_kind(&raw)?;
    }
    if let Some(raw) = opt_arg(sub, "day") {
        rule.day_of_month = parse_day_of_month(&raw)?;
    }
    if let Some(cat) = opt_arg(sub, "category") {
        rule.category_id = Some(id_for_category(conn, rule.owner_id, &cat)?);
    } else if sub.get_flag("clear_category") {
        rule.category_id = None;
    }
    if sub.contains_id("note") {
        rule.note = check_note(opt_arg(sub, "note"))?;
    }
    if sub.get_flag("activate") {
        rule.active = true;
    } else if sub.get_flag("deactivate") {
        rule.active = false;
    }

    conn.execute(
        "UPDATE recurring_transactions
         SET amount=?2, kind=?3, category_id=?4, note=?5, day_of_month=?6, active=?7
         WHERE id=?1",
        params![
            rule.id,
            rule.amount.to_string(),
            rule.kind.as_str(),
            rule.category_id,
            rule.note,
            rule.day_of_month,
            rule.active
        ],
    )?;
    println!("Updated recurring transaction {}", id);
    Ok(())
}

fn process(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let today = Local::now().date_naive();
    let target = resolve_target_date(sub.get_one::<String>("date").map(|s| s.as_str()), today)?;
    let json_flag = sub.get_flag("json");

    if sub.get_flag("dry_run") {
        let plan = runner::plan(conn, target)?;
        if maybe_print_json(json_flag, false, &plan)? {
            return Ok(());
        }
        let rows = plan
            .created_transactions()
            .map(|t| {
                vec![
                    t.origin_rule_id.to_string(),
                    t.date.to_string(),
                    t.kind.to_string(),
                    t.amount.to_string(),
                    t.note.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Rule", "Date", "Kind", "Amount", "Note"], rows)
        );
        println!(
            "Dry run. Would create {} transaction(s).",
            plan.created_count()
        );
        return Ok(());
    }

    let report = runner::run(conn, target)?;
    if !maybe_print_json(json_flag, false, &report)? {
        println!("Done. Created {} transaction(s).", report.created);
    }
    Ok(())
}
