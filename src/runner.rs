// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Drives one materialization run: resolve the date, load active rules, plan,
//! then commit each due rule on its own.

use crate::db::{self, CommitOutcome};
use crate::materializer::{MaterializationPlan, SkippedRule, materialize};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

static DATE_ARG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Invalid date '{value}', expected YYYY-MM-DD ({reason})")]
    InvalidDate { value: String, reason: String },
    #[error("Recurring store failure: {0}")]
    Store(#[from] rusqlite::Error),
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::InvalidDate { .. } => 2,
            RunError::Store(_) => 3,
        }
    }
}

/// Parses an operator supplied date, or falls back to `today`.
pub fn resolve_target_date(arg: Option<&str>, today: NaiveDate) -> Result<NaiveDate, RunError> {
    let Some(raw) = arg else {
        return Ok(today);
    };
    let value = raw.trim();
    if !DATE_ARG.is_match(value) {
        return Err(RunError::InvalidDate {
            value: raw.to_string(),
            reason: "wrong shape".into(),
        });
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| RunError::InvalidDate {
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target: NaiveDate,
    pub created: usize,
    pub skipped: Vec<SkippedRule>,
    /// Due rules that another run committed before this one got to them.
    pub lost_races: Vec<i64>,
    /// Due rules deleted or deactivated between planning and commit.
    pub withdrawn: Vec<i64>,
}

pub fn plan(conn: &Connection, target: NaiveDate) -> Result<MaterializationPlan, RunError> {
    let rules = db::load_active_rules(conn)?;
    debug!(target_date = %target, rules = rules.len(), "loaded active recurring rules");
    Ok(materialize(target, &rules))
}

/// Materializes every due rule for `target`.
///
/// Each rule commits independently. A store error stops the run, but rules
/// committed before it stay committed and are skipped on the next run.
pub fn run(conn: &mut Connection, target: NaiveDate) -> Result<RunReport, RunError> {
    info!(target_date = %target, "processing recurring transactions");
    let plan = plan(conn, target)?;

    for s in &plan.skipped {
        debug!(rule_id = s.rule_id, reason = ?s.reason, "rule skipped");
    }

    let mut created = 0;
    let mut lost_races = Vec::new();
    let mut withdrawn = Vec::new();
    for due in &plan.due {
        let rule_id = due.marker.rule_id;
        match db::commit_due(conn, due)? {
            CommitOutcome::Committed => {
                created += 1;
                debug!(rule_id, period = %due.marker.period, amount = %due.transaction.amount, "materialized");
            }
            CommitOutcome::AlreadyClaimed => {
                warn!(rule_id, "rule was materialized concurrently, skipping");
                lost_races.push(rule_id);
            }
            CommitOutcome::DuplicatePeriod => {
                warn!(rule_id, period = %due.marker.period, "transaction for this period already exists, skipping");
                lost_races.push(rule_id);
            }
            CommitOutcome::RuleUnavailable => {
                info!(rule_id, "rule was deleted or deactivated before commit, skipping");
                withdrawn.push(rule_id);
            }
        }
    }

    info!(target_date = %target, created, skipped = plan.skipped.len(), "recurring run finished");
    Ok(RunReport {
        target,
        created,
        skipped: plan.skipped,
        lost_races,
        withdrawn,
    })
}
