// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use std::process::ExitCode;

use tallyclip::runner::{self, RunError};
use tallyclip::{cli, commands, db, logging};

fn run() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();
    logging::init(matches.get_count("verbose"));

    // A bad --date is reported before the store is touched.
    if let Some(("recurring", rec)) = matches.subcommand() {
        if let Some(("process", sub)) = rec.subcommand() {
            let raw = sub.get_one::<String>("date").map(|s| s.as_str());
            runner::resolve_target_date(raw, chrono::Local::now().date_naive())?;
        }
    }

    let mut conn = db::open_or_init()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("config", sub)) => commands::config::handle(&conn, sub)?,
        Some(("category", sub)) => commands::categories::handle(&conn, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&conn, sub)?,
        Some(("recurring", sub)) => commands::recurring::handle(&mut conn, sub)?,
        Some(("report", sub)) => commands::reports::handle(&conn, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<RunError>()
                .map(RunError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}
