// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{DB_ENV, db_path, get_default_owner, set_default_owner};
use crate::logging::LOG_ENV;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", _)) => {
            let rows = vec![
                vec!["database".into(), db_path()?.display().to_string()],
                vec!["default_owner".into(), get_default_owner(conn)?.to_string()],
                vec![
                    "log_filter".into(),
                    std::env::var(LOG_ENV).unwrap_or_else(|_| "(from -v)".into()),
                ],
            ];
            println!("{}", pretty_table(&["Setting", "Value"], rows));
            println!("Set {} to use a different database file.", DB_ENV);
        }
        Some(("set-owner", sub)) => {
            if let Some(id) = sub.get_one::<i64>("id") {
                set_default_owner(conn, *id)?;
                println!("Default owner set to {}", id);
            }
        }
        _ => {}
    }
    Ok(())
}
