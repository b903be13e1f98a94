// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Decides which recurring rules turn into transactions on a given date.
//!
//! Everything here is a pure function of the target date and a snapshot of
//! rules. Persisting the result is the job of [`crate::runner`].

use crate::models::{MAX_DAY_OF_MONTH, RecurringRule, TransactionKind, YearMonth};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

/// A transaction to insert, copied from the rule's current field values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTransaction {
    pub owner_id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category_id: Option<i64>,
    pub note: Option<String>,
    pub origin_rule_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerUpdate {
    pub rule_id: i64,
    pub period: YearMonth,
}

/// One due rule: the insert and the marker bump that must be committed together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueRule {
    pub transaction: NewTransaction,
    pub marker: MarkerUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "period", rename_all = "snake_case")]
pub enum SkipReason {
    Inactive,
    DayMismatch,
    AlreadyMaterialized(YearMonth),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedRule {
    pub rule_id: i64,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterializationPlan {
    pub target: NaiveDate,
    pub due: Vec<DueRule>,
    pub skipped: Vec<SkippedRule>,
}

impl MaterializationPlan {
    pub fn created_transactions(&self) -> impl Iterator<Item = &NewTransaction> {
        self.due.iter().map(|d| &d.transaction)
    }

    pub fn markers(&self) -> impl Iterator<Item = MarkerUpdate> + '_ {
        self.due.iter().map(|d| d.marker)
    }

    pub fn skipped_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.skipped.iter().map(|s| s.rule_id)
    }

    pub fn created_count(&self) -> usize {
        self.due.len()
    }
}

/// Why `rule` would not produce a transaction on `target`, or `None` when due.
pub fn skip_reason(rule: &RecurringRule, target: NaiveDate) -> Option<SkipReason> {
    if !rule.active {
        return Some(SkipReason::Inactive);
    }
    if rule.day_of_month == 0
        || rule.day_of_month > MAX_DAY_OF_MONTH
        || rule.day_of_month != target.day()
    {
        return Some(SkipReason::DayMismatch);
    }
    match rule.last_materialized {
        Some(marker) if marker.contains(target) => Some(SkipReason::AlreadyMaterialized(marker)),
        _ => None,
    }
}

pub fn is_due(rule: &RecurringRule, target: NaiveDate) -> bool {
    skip_reason(rule, target).is_none()
}

/// Plans at most one transaction per rule for the month of `target`.
///
/// Rules are judged independently; input order is preserved in the output.
pub fn materialize(target: NaiveDate, rules: &[RecurringRule]) -> MaterializationPlan {
    let period = YearMonth::of(target);
    let mut due = Vec::new();
    let mut skipped = Vec::new();

    for rule in rules {
        if let Some(reason) = skip_reason(rule, target) {
            skipped.push(SkippedRule {
                rule_id: rule.id,
                reason,
            });
            continue;
        }
        due.push(DueRule {
            transaction: NewTransaction {
                owner_id: rule.owner_id,
                date: target,
                amount: rule.amount,
                kind: rule.kind,
                category_id: rule.category_id,
                note: rule.note.clone(),
                origin_rule_id: rule.id,
            },
            marker: MarkerUpdate {
                rule_id: rule.id,
                period,
            },
        });
    }

    MaterializationPlan {
        target,
        due,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn rule(id: i64, day: u32, last: Option<(i32, u32)>) -> RecurringRule {
        RecurringRule {
            id,
            owner_id: 7,
            amount: d("10.00"),
            kind: TransactionKind::Expense,
            category_id: None,
            note: None,
            day_of_month: day,
            active: true,
            last_materialized: last.and_then(|(y, m)| YearMonth::new(y, m)),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Applies a plan's markers back onto the rule set, as a commit would.
    fn apply(rules: &mut [RecurringRule], plan: &MaterializationPlan) {
        for marker in plan.markers() {
            if let Some(r) = rules.iter_mut().find(|r| r.id == marker.rule_id) {
                r.last_materialized = Some(marker.period);
            }
        }
    }

    #[test]
    fn mixed_rule_set_on_first_of_month() {
        let mut salary = rule(1, 1, None);
        salary.amount = d("1200.00");
        salary.kind = TransactionKind::Income;
        let mut streaming = rule(2, 1, Some((2024, 1)));
        streaming.amount = d("9.99");
        let mut rules = vec![salary, streaming, rule(3, 5, None)];

        let target = date(2024, 2, 1);
        let plan = materialize(target, &rules);

        assert_eq!(plan.created_count(), 2);
        let created: Vec<_> = plan.created_transactions().collect();
        assert_eq!(created[0].amount, d("1200.00"));
        assert_eq!(created[0].kind, TransactionKind::Income);
        assert_eq!(created[0].date, target);
        assert_eq!(created[1].amount, d("9.99"));
        assert_eq!(created[1].kind, TransactionKind::Expense);
        let feb = YearMonth::new(2024, 2).unwrap();
        assert!(plan.markers().all(|m| m.period == feb));
        assert_eq!(plan.skipped_ids().collect::<Vec<_>>(), vec![3]);
        assert_eq!(plan.skipped[0].reason, SkipReason::DayMismatch);

        apply(&mut rules, &plan);
        let again = materialize(target, &rules);
        assert_eq!(again.created_count(), 0);
        assert_eq!(again.skipped.len(), 3);
    }

    #[test]
    fn only_first_call_in_month_materializes() {
        let mut rules = vec![rule(1, 15, None)];
        let first = materialize(date(2024, 3, 15), &rules);
        assert_eq!(first.created_count(), 1);
        apply(&mut rules, &first);

        for _ in 0..3 {
            let plan = materialize(date(2024, 3, 15), &rules);
            assert_eq!(plan.created_count(), 0);
            assert_eq!(
                plan.skipped[0].reason,
                SkipReason::AlreadyMaterialized(YearMonth::new(2024, 3).unwrap())
            );
        }
    }

    #[test]
    fn matches_exact_day_only() {
        let r = rule(1, 15, None);
        for (y, m) in [(2023, 1), (2024, 2), (2025, 12)] {
            assert!(is_due(&r, date(y, m, 15)));
            assert!(!is_due(&r, date(y, m, 14)));
            assert!(!is_due(&r, date(y, m, 16)));
        }
    }

    #[test]
    fn inactive_rule_never_due() {
        let mut r = rule(1, 3, None);
        r.active = false;
        assert_eq!(skip_reason(&r, date(2024, 6, 3)), Some(SkipReason::Inactive));
        assert_eq!(materialize(date(2024, 6, 3), &[r]).created_count(), 0);
    }

    #[test]
    fn next_month_resets_marker() {
        let r = rule(1, 10, Some((2024, 4)));
        assert!(!is_due(&r, date(2024, 4, 10)));
        assert!(is_due(&r, date(2024, 5, 10)));

        let year_end = rule(2, 10, Some((2024, 12)));
        assert!(is_due(&year_end, date(2025, 1, 10)));
        // Same month number, different year.
        let last_year = rule(3, 10, Some((2023, 5)));
        assert!(is_due(&last_year, date(2024, 5, 10)));
    }

    #[test]
    fn earlier_date_in_covered_month_is_not_reapplied() {
        let r = rule(1, 2, Some((2024, 7)));
        assert!(!is_due(&r, date(2024, 7, 2)));
    }

    #[test]
    fn out_of_range_day_never_matches() {
        assert!(!is_due(&rule(1, 0, None), date(2024, 1, 1)));
        assert!(!is_due(&rule(2, 31, None), date(2024, 1, 31)));
    }

    #[test]
    fn uses_current_rule_values() {
        let mut r = rule(4, 20, None);
        r.amount = d("55.10");
        r.category_id = Some(9);
        r.note = Some("gym".into());
        let plan = materialize(date(2024, 8, 20), &[r]);
        let tx = plan.created_transactions().next().unwrap();
        assert_eq!(tx.owner_id, 7);
        assert_eq!(tx.amount, d("55.10"));
        assert_eq!(tx.category_id, Some(9));
        assert_eq!(tx.note.as_deref(), Some("gym"));
        assert_eq!(tx.origin_rule_id, 4);
    }

    #[test]
    fn rules_are_independent() {
        let rules = vec![
            rule(1, 9, None),
            rule(2, 9, Some((2024, 9))),
            rule(3, 8, None),
            rule(4, 9, Some((2024, 8))),
        ];
        let plan = materialize(date(2024, 9, 9), &rules);
        let ids: Vec<i64> = plan.markers().map(|m| m.rule_id).collect();
        assert_eq!(ids, vec![1, 4]);

        let reversed: Vec<_> = rules.iter().rev().cloned().collect();
        let plan_rev = materialize(date(2024, 9, 9), &reversed);
        let mut ids_rev: Vec<i64> = plan_rev.markers().map(|m| m.rule_id).collect();
        ids_rev.sort();
        assert_eq!(ids_rev, ids);
    }
}
