// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::materializer::DueRule;
use crate::models::{RecurringRule, TransactionKind, YearMonth};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Tallyclip", "tallyclip"));

pub const DB_ENV: &str = "TALLYCLIP_DB";

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn db_path() -> Result<PathBuf> {
    if let Some(p) = std::env::var_os(DB_ENV).filter(|p| !p.is_empty()) {
        let path = PathBuf::from(p);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        return Ok(path);
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("tallyclip.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    open_at(&db_path()?)
}

pub fn open_at(path: &Path) -> Result<Connection> {
    let conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        color TEXT,
        icon TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(owner_id, name)
    );

    CREATE TABLE IF NOT EXISTS recurring_transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('income','expense')),
        category_id INTEGER,
        note TEXT,
        day_of_month INTEGER NOT NULL CHECK(day_of_month BETWEEN 1 AND 28),
        active INTEGER NOT NULL DEFAULT 1,
        last_materialized TEXT, -- YYYY-MM, written only by `recurring process`
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_recurring_active_day
        ON recurring_transactions(active, day_of_month);

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        amount TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('income','expense')),
        category_id INTEGER,
        note TEXT,
        origin_rule_id INTEGER,
        origin_period TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE SET NULL,
        FOREIGN KEY(origin_rule_id) REFERENCES recurring_transactions(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_origin
        ON transactions(origin_rule_id, origin_period);
    "#,
    )?;
    Ok(())
}

pub const DEFAULT_OWNER: i64 = 1;

pub fn get_default_owner(conn: &Connection) -> Result<i64> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key='default_owner'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    match v {
        Some(s) => s
            .parse::<i64>()
            .with_context(|| format!("Invalid default_owner setting '{}'", s)),
        None => Ok(DEFAULT_OWNER),
    }
}

pub fn set_default_owner(conn: &Connection, owner: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES('default_owner', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![owner.to_string()],
    )?;
    Ok(())
}

const RULE_COLUMNS: &str =
    "id, owner_id, amount, kind, category_id, note, day_of_month, active, last_materialized";

fn text_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn rule_from_row(r: &Row<'_>) -> rusqlite::Result<RecurringRule> {
    let amount: String = r.get(2)?;
    let kind: String = r.get(3)?;
    let marker: Option<String> = r.get(8)?;
    Ok(RecurringRule {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        amount: amount.parse::<Decimal>().map_err(|e| text_error(2, e))?,
        kind: kind
            .parse::<TransactionKind>()
            .map_err(|e| text_error(3, e))?,
        category_id: r.get(4)?,
        note: r.get(5)?,
        day_of_month: r.get(6)?,
        active: r.get(7)?,
        last_materialized: marker
            .map(|m| m.parse::<YearMonth>())
            .transpose()
            .map_err(|e| text_error(8, e))?,
    })
}

/// Every rule with `active = 1`, across all owners.
pub fn load_active_rules(conn: &Connection) -> rusqlite::Result<Vec<RecurringRule>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RULE_COLUMNS} FROM recurring_transactions WHERE active=1 ORDER BY id"
    ))?;
    let rows = stmt.query_map([], rule_from_row)?;
    rows.collect()
}

pub fn load_rules(conn: &Connection, owner: i64) -> rusqlite::Result<Vec<RecurringRule>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RULE_COLUMNS} FROM recurring_transactions WHERE owner_id=?1
         ORDER BY day_of_month, id DESC"
    ))?;
    let rows = stmt.query_map(params![owner], rule_from_row)?;
    rows.collect()
}

pub fn load_rule(conn: &Connection, id: i64) -> rusqlite::Result<Option<RecurringRule>> {
    conn.query_row(
        &format!("SELECT {RULE_COLUMNS} FROM recurring_transactions WHERE id=?1"),
        params![id],
        rule_from_row,
    )
    .optional()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Another run moved the marker into this period first.
    AlreadyClaimed,
    /// A transaction for this rule and period already exists.
    DuplicatePeriod,
    /// The rule was deleted or deactivated after the plan was made.
    RuleUnavailable,
}

/// Applies one due rule: bumps its marker and inserts the transaction inside a
/// single IMMEDIATE transaction. Either both writes land or neither does.
///
/// The marker update is a compare-and-set, so two runs racing on the same rule
/// cannot both insert.
pub fn commit_due(conn: &mut Connection, due: &DueRule) -> rusqlite::Result<CommitOutcome> {
    let period = due.marker.period.to_string();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let claimed = tx.execute(
        "UPDATE recurring_transactions SET last_materialized=?2
         WHERE id=?1 AND active=1
           AND (last_materialized IS NULL OR last_materialized<>?2)",
        params![due.marker.rule_id, period],
    )?;
    if claimed == 0 {
        let active: Option<bool> = tx
            .query_row(
                "SELECT active FROM recurring_transactions WHERE id=?1",
                params![due.marker.rule_id],
                |r| r.get(0),
            )
            .optional()?;
        tx.rollback()?;
        return Ok(match active {
            Some(true) => CommitOutcome::AlreadyClaimed,
            _ => CommitOutcome::RuleUnavailable,
        });
    }
    let t = &due.transaction;
    let inserted = tx.execute(
        "INSERT INTO transactions(owner_id, date, amount, kind, category_id, note, origin_rule_id, origin_period)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(origin_rule_id, origin_period) DO NOTHING",
        params![
            t.owner_id,
            t.date.to_string(),
            t.amount.to_string(),
            t.kind.as_str(),
            t.category_id,
            t.note,
            t.origin_rule_id,
            period
        ],
    )?;
    if inserted == 0 {
        tx.rollback()?;
        return Ok(CommitOutcome::DuplicatePeriod);
    }
    tx.commit()?;
    Ok(CommitOutcome::Committed)
}
