// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, ArgGroup, Command, command, value_parser};

fn owner_arg() -> Arg {
    Arg::new("owner")
        .long("owner")
        .help("Owner id (defaults to the configured default owner)")
}

fn json_args() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print as JSON lines"),
    ]
}

fn kind_arg(required: bool) -> Arg {
    Arg::new("kind")
        .long("kind")
        .required(required)
        .help("income or expense")
}

fn category_cmd() -> Command {
    Command::new("category")
        .about("Manage categories")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("color").long("color"))
                .arg(Arg::new("icon").long("icon"))
                .arg(owner_arg()),
        )
        .subcommand(Command::new("list").arg(owner_arg()).args(json_args()))
        .subcommand(
            Command::new("edit")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("new_name").long("new-name"))
                .arg(Arg::new("color").long("color"))
                .arg(Arg::new("icon").long("icon"))
                .arg(owner_arg()),
        )
        .subcommand(
            Command::new("rm")
                .arg(Arg::new("name").long("name").required(true))
                .arg(owner_arg()),
        )
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Record and list transactions")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(Arg::new("date").long("date").required(true).help("YYYY-MM-DD"))
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(kind_arg(true))
                .arg(Arg::new("category").long("category"))
                .arg(Arg::new("note").long("note"))
                .arg(owner_arg()),
        )
        .subcommand(
            Command::new("list")
                .arg(Arg::new("month").long("month").help("YYYY-MM"))
                .arg(kind_arg(false))
                .arg(Arg::new("category").long("category"))
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize)),
                )
                .arg(owner_arg())
                .args(json_args()),
        )
        .subcommand(
            Command::new("edit")
                .arg(Arg::new("id").long("id").required(true))
                .arg(Arg::new("date").long("date").help("YYYY-MM-DD"))
                .arg(Arg::new("amount").long("amount"))
                .arg(kind_arg(false))
                .arg(Arg::new("category").long("category"))
                .arg(
                    Arg::new("clear_category")
                        .long("clear-category")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("category"),
                )
                .arg(Arg::new("note").long("note")),
        )
        .subcommand(Command::new("rm").arg(Arg::new("id").long("id").required(true)))
}

fn recurring_cmd() -> Command {
    Command::new("recurring")
        .about("Monthly recurring transactions")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(kind_arg(true))
                .arg(
                    Arg::new("day")
                        .long("day")
                        .required(true)
                        .help("Day of month, 1-28"),
                )
                .arg(Arg::new("category").long("category"))
                .arg(Arg::new("note").long("note"))
                .arg(
                    Arg::new("inactive")
                        .long("inactive")
                        .action(ArgAction::SetTrue),
                )
                .arg(owner_arg()),
        )
        .subcommand(Command::new("list").arg(owner_arg()).args(json_args()))
        .subcommand(
            Command::new("edit")
                .arg(Arg::new("id").long("id").required(true))
                .arg(Arg::new("amount").long("amount"))
                .arg(kind_arg(false))
                .arg(Arg::new("day").long("day"))
                .arg(Arg::new("category").long("category"))
                .arg(
                    Arg::new("clear_category")
                        .long("clear-category")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("category"),
                )
                .arg(Arg::new("note").long("note"))
                .arg(
                    Arg::new("activate")
                        .long("activate")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("deactivate")
                        .long("deactivate")
                        .action(ArgAction::SetTrue),
                )
                .group(
                    ArgGroup::new("state")
                        .args(["activate", "deactivate"])
                        .multiple(false),
                ),
        )
        .subcommand(Command::new("rm").arg(Arg::new("id").long("id").required(true)))
        .subcommand(
            Command::new("process")
                .about("Create this month's transactions for rules due on the date")
                .arg(
                    Arg::new("date")
                        .long("date")
                        .help("YYYY-MM-DD, defaults to today"),
                )
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Show what would be created without writing"),
                )
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
        )
}

fn report_cmd() -> Command {
    Command::new("report")
        .about("Income and expense summaries")
        .subcommand_required(true)
        .subcommand(
            Command::new("cashflow")
                .arg(
                    Arg::new("months")
                        .long("months")
                        .value_parser(value_parser!(usize))
                        .default_value("12"),
                )
                .arg(owner_arg())
                .args(json_args()),
        )
        .subcommand(
            Command::new("by-category")
                .arg(Arg::new("month").long("month").required(true).help("YYYY-MM"))
                .arg(kind_arg(false).default_value("expense"))
                .arg(owner_arg())
                .args(json_args()),
        )
}

fn config_cmd() -> Command {
    Command::new("config")
        .about("Show or change settings")
        .subcommand_required(true)
        .subcommand(Command::new("show"))
        .subcommand(
            Command::new("set-owner").arg(
                Arg::new("id")
                    .long("id")
                    .required(true)
                    .value_parser(value_parser!(i64)),
            ),
        )
}

pub fn build_cli() -> Command {
    command!()
        .name("tallyclip")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (-v info, -vv debug)"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(config_cmd())
        .subcommand(category_cmd())
        .subcommand(tx_cmd())
        .subcommand(recurring_cmd())
        .subcommand(report_cmd())
        .subcommand(Command::new("doctor").about("Check ledger integrity"))
}
