// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use tallyclip::commands::{doctor, reports};
use tallyclip::db;
use tallyclip::models::{TransactionKind, YearMonth};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO categories(id, owner_id, name) VALUES (1, 1, 'Rent'), (2, 1, 'Food'), (3, 2, 'Other');
        INSERT INTO transactions(owner_id, date, amount, kind, category_id) VALUES
            (1, '2025-07-01', '2500.00', 'income', NULL),
            (1, '2025-07-02', '900.00', 'expense', 1),
            (1, '2025-07-15', '60.00', 'expense', 2),
            (1, '2025-07-20', '40.00', 'expense', 2),
            (1, '2025-08-01', '2500.00', 'income', NULL),
            (1, '2025-08-02', '900.00', 'expense', 1),
            (2, '2025-08-03', '5.00', 'expense', 3);
        "#,
    )
    .unwrap();
    conn
}

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn cashflow_totals_per_month_newest_first() {
    let conn = setup();
    let rows = reports::cashflow(&conn, 1, 12).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].month, "2025-08");
    assert_eq!(rows[0].net, d("1600.00"));
    assert_eq!(rows[1].income, d("2500.00"));
    assert_eq!(rows[1].expense, d("1000.00"));

    let latest = reports::cashflow(&conn, 1, 1).unwrap();
    assert_eq!(latest.len(), 1);
}

#[test]
fn by_category_shares() {
    let conn = setup();
    let rows = reports::by_category(&conn, 1, "2025-07", TransactionKind::Expense).unwrap();
    assert_eq!(rows[0].category, "Rent");
    assert_eq!(rows[0].total, d("900.00"));
    assert_eq!(rows[0].share, d("90.0"));
    assert_eq!(rows[1].category, "Food");
    assert_eq!(rows[1].total, d("100.00"));

    let income = reports::by_category(&conn, 1, "2025-07", TransactionKind::Income).unwrap();
    assert_eq!(income[0].category, "(uncategorized)");
}

#[test]
fn doctor_flags_future_markers_and_foreign_categories() {
    let conn = setup();
    conn.execute(
        "INSERT INTO recurring_transactions(owner_id, amount, kind, category_id, day_of_month, last_materialized)
         VALUES (1, '10.00', 'expense', 3, 5, '2030-01')",
        [],
    )
    .unwrap();
    let current = YearMonth::new(2025, 8).unwrap();
    let issues = doctor::check(&conn, current).unwrap();
    let kinds: Vec<&str> = issues.iter().map(|r| r[0].as_str()).collect();
    assert!(kinds.contains(&"future_marker"));
    assert!(kinds.contains(&"foreign_category"));
}

#[test]
fn doctor_clean_ledger_has_no_issues() {
    let conn = setup();
    conn.execute(
        "INSERT INTO recurring_transactions(owner_id, amount, kind, day_of_month, last_materialized)
         VALUES (1, '10.00', 'expense', 5, ?1)",
        params!["2025-08"],
    )
    .unwrap();
    let issues = doctor::check(&conn, YearMonth::new(2025, 8).unwrap()).unwrap();
    assert!(issues.is_empty(), "{:?}", issues);
}
