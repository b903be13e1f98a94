// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Category;
use crate::utils::{
    MAX_CATEGORY_NAME_LEN, id_for_category, maybe_print_json, opt_arg, pretty_table,
    resolve_owner,
};
use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let owner = resolve_owner(conn, sub)?;
            let name = opt_arg(sub, "name").context("Category name must not be empty")?;
            check_name(&name)?;
            let color = opt_arg(sub, "color");
            let icon = opt_arg(sub, "icon");
            conn.execute(
                "INSERT INTO categories(owner_id, name, color, icon) VALUES (?1, ?2, ?3, ?4)",
                params![owner, name, color, icon],
            )
            .with_context(|| format!("Add category '{}'", name))?;
            println!("Added category '{}'", name);
        }
        Some(("list", sub)) => {
            let owner = resolve_owner(conn, sub)?;
            let data = list(conn, owner)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|c| {
                        vec![
                            c.id.to_string(),
                            c.name,
                            c.color.unwrap_or_default(),
                            c.icon.unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["ID", "Category", "Color", "Icon"], rows));
            }
        }
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => {
            let owner = resolve_owner(conn, sub)?;
            let name = opt_arg(sub, "name").context("Category name must not be empty")?;
            let n = conn.execute(
                "DELETE FROM categories WHERE owner_id=?1 AND name=?2",
                params![owner, name],
            )?;
            if n == 0 {
                return Err(anyhow!("Category '{}' not found", name));
            }
            println!("Removed category '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

fn check_name(name: &str) -> Result<()> {
    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(anyhow!(
            "Category name is longer than {} characters",
            MAX_CATEGORY_NAME_LEN
        ));
    }
    Ok(())
}

fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner = resolve_owner(conn, sub)?;
    let name = opt_arg(sub, "name").context("Category name must not be empty")?;
    let id = id_for_category(conn, owner, &name)?;
    let new_name = match opt_arg(sub, "new_name") {
        Some(n) => {
            check_name(&n)?;
            n
        }
        None => name.clone(),
    };
    let (mut color, mut icon): (Option<String>, Option<String>) = conn.query_row(
        "SELECT color, icon FROM categories WHERE id=?1",
        params![id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    if sub.contains_id("color") {
        color = opt_arg(sub, "color");
    }
    if sub.contains_id("icon") {
        icon = opt_arg(sub, "icon");
    }
    conn.execute(
        "UPDATE categories SET name=?2, color=?3, icon=?4 WHERE id=?1",
        params![id, new_name, color, icon],
    )
    .with_context(|| format!("Rename category '{}' to '{}'", name, new_name))?;
    println!("Updated category '{}'", new_name);
    Ok(())
}

pub fn list(conn: &Connection, owner: i64) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, name, color, icon FROM categories WHERE owner_id=?1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![owner], |r| {
        Ok(Category {
            id: r.get(0)?,
            owner_id: r.get(1)?,
            name: r.get(2)?,
            color: r.get(3)?,
            icon: r.get(4)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    Ok(data)
}
