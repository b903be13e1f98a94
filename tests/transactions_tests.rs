// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, params};
use tallyclip::commands::{categories, transactions};
use tallyclip::models::TransactionKind;
use tallyclip::{cli, db};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute(
        "INSERT INTO categories(id, owner_id, name) VALUES (1, 1, 'Cat1')",
        [],
    )
    .unwrap();
    for i in 1..=3 {
        conn.execute(
            "INSERT INTO transactions(owner_id, date, amount, kind, category_id, note) VALUES (1, ?1, '10.00', 'expense', 1, '')",
            params![format!("2025-01-0{}", i)],
        )
        .unwrap();
    }
    conn.execute(
        "INSERT INTO transactions(owner_id, date, amount, kind) VALUES (2, '2025-01-09', '99.00', 'income')",
        [],
    )
    .unwrap();
    conn
}

fn list_rows(conn: &Connection, args: &[&str]) -> Vec<transactions::TransactionRow> {
    let mut argv = vec!["tallyclip", "tx", "list"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = tx_m.subcommand() {
            return transactions::query_rows(conn, list_m).unwrap();
        }
    }
    panic!("tx list not parsed");
}

#[test]
fn list_limit_respected() {
    let conn = setup();
    let rows = list_rows(&conn, &["--limit", "2"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, "2025-01-03");
}

#[test]
fn list_is_scoped_to_owner() {
    let conn = setup();
    assert_eq!(list_rows(&conn, &[]).len(), 3);
    let other = list_rows(&conn, &["--owner", "2"]);
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].kind, "income");
}

#[test]
fn list_filters_by_kind_and_month() {
    let conn = setup();
    assert_eq!(list_rows(&conn, &["--kind", "income"]).len(), 0);
    assert_eq!(list_rows(&conn, &["--month", "2025-01", "--kind", "expense"]).len(), 3);
    assert_eq!(list_rows(&conn, &["--month", "2025-02"]).len(), 0);
}

#[test]
fn add_normalizes_amount_and_resolves_category() {
    let conn = setup();
    let matches = cli::build_cli().get_matches_from([
        "tallyclip", "tx", "add", "--date", "2025-02-14", "--amount", "12.5", "--kind", "Expense",
        "--category", "Cat1", "--note", "flowers",
    ]);
    let (_, tx_m) = matches.subcommand().unwrap();
    transactions::handle(&conn, tx_m).unwrap();

    let (amount, kind, cat): (String, String, Option<i64>) = conn
        .query_row(
            "SELECT amount, kind, category_id FROM transactions WHERE date='2025-02-14'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(amount, "12.50");
    assert_eq!(kind, "expense");
    assert_eq!(cat, Some(1));
}

#[test]
fn add_rejects_non_positive_amount() {
    let conn = setup();
    let matches = cli::build_cli().get_matches_from([
        "tallyclip", "tx", "add", "--date", "2025-02-14", "--amount", "0", "--kind", "expense",
    ]);
    let (_, tx_m) = matches.subcommand().unwrap();
    let err = transactions::handle(&conn, tx_m).unwrap_err();
    assert!(err.to_string().contains("greater than zero"));
}

fn run(conn: &Connection, argv: &[&str]) -> anyhow::Result<()> {
    let mut full = vec!["tallyclip"];
    full.extend_from_slice(argv);
    let matches = cli::build_cli().get_matches_from(full);
    match matches.subcommand() {
        Some(("tx", sub)) => transactions::handle(conn, sub),
        Some(("category", sub)) => categories::handle(conn, sub),
        _ => panic!("unexpected command"),
    }
}

#[test]
fn edit_updates_only_given_fields() {
    let conn = setup();
    run(&conn, &["tx", "edit", "--id", "2", "--amount", "7.5", "--date", "2025-01-20"]).unwrap();

    let t = transactions::load_transaction(&conn, 2).unwrap().unwrap();
    assert_eq!(t.amount.to_string(), "7.50");
    assert_eq!(t.date.to_string(), "2025-01-20");
    assert_eq!(t.kind, TransactionKind::Expense);
    assert_eq!(t.category_id, Some(1));
    assert_eq!(t.owner_id, 1);

    run(&conn, &["tx", "edit", "--id", "2", "--clear-category", "--kind", "income", "--note", "refund"]).unwrap();
    let t = transactions::load_transaction(&conn, 2).unwrap().unwrap();
    assert_eq!(t.category_id, None);
    assert_eq!(t.kind, TransactionKind::Income);
    assert_eq!(t.note.as_deref(), Some("refund"));
    assert_eq!(t.amount.to_string(), "7.50");
}

#[test]
fn edit_applies_add_validation() {
    let conn = setup();
    let err = run(&conn, &["tx", "edit", "--id", "1", "--amount", "0"]).unwrap_err();
    assert!(err.to_string().contains("greater than zero"));
    assert!(run(&conn, &["tx", "edit", "--id", "1", "--date", "2025-02-30"]).is_err());
    // Owner 2's transaction cannot borrow owner 1's category.
    assert!(run(&conn, &["tx", "edit", "--id", "4", "--category", "Cat1"]).is_err());
    assert!(run(&conn, &["tx", "edit", "--id", "99", "--note", "x"]).is_err());

    let t = transactions::load_transaction(&conn, 1).unwrap().unwrap();
    assert_eq!(t.amount.to_string(), "10.00");
    assert!(transactions::load_transaction(&conn, 99).unwrap().is_none());
}

#[test]
fn edit_keeps_recurring_origin() {
    let conn = setup();
    conn.execute(
        "INSERT INTO recurring_transactions(id, owner_id, amount, kind, day_of_month) VALUES (5, 1, '40.00', 'expense', 1)",
        [],
    )
    .unwrap();
    conn.execute(
        "UPDATE transactions SET origin_rule_id=5, origin_period='2025-01' WHERE id=3",
        [],
    )
    .unwrap();
    run(&conn, &["tx", "edit", "--id", "3", "--amount", "41"]).unwrap();
    let t = transactions::load_transaction(&conn, 3).unwrap().unwrap();
    assert_eq!(t.origin_rule_id, Some(5));
}

#[test]
fn category_edit_renames_and_restyles() {
    let conn = setup();
    run(&conn, &["category", "edit", "--name", "Cat1", "--new-name", "Groceries", "--color", "#00aa00"]).unwrap();

    let cats = categories::list(&conn, 1).unwrap();
    assert_eq!(cats.len(), 1);
    assert_eq!(cats[0].id, 1);
    assert_eq!(cats[0].name, "Groceries");
    assert_eq!(cats[0].color.as_deref(), Some("#00aa00"));
    assert_eq!(cats[0].icon, None);
    // Transactions follow the category by id.
    assert_eq!(list_rows(&conn, &["--category", "Groceries"]).len(), 3);
}

#[test]
fn category_edit_rejects_clashes_and_long_names() {
    let conn = setup();
    run(&conn, &["category", "add", "--name", "Rent"]).unwrap();
    assert!(run(&conn, &["category", "edit", "--name", "Rent", "--new-name", "Cat1"]).is_err());
    let long = "x".repeat(256);
    let err = run(&conn, &["category", "edit", "--name", "Rent", "--new-name", long.as_str()]).unwrap_err();
    assert!(err.to_string().contains("longer than"));
    assert!(run(&conn, &["category", "edit", "--name", "Missing", "--color", "red"]).is_err());
}
