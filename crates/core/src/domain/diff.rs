use crate::config::DEFAULT_HIGHLIGHT_THRESHOLD_PCT;
use crate::domain::record::FundRecord;
use anyhow::Result;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

pub const NO_CHANGE_MESSAGE: &str = "No change in NAVs since last execution";

#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Absolute percent move at or above which a change is significant.
    pub highlight_threshold_pct: f64,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            highlight_threshold_pct: DEFAULT_HIGHLIGHT_THRESHOLD_PCT,
        }
    }
}

/// Relative change of one matched record. A zero previous NAV makes the
/// percent change undefined, so that case is a variant rather than a division.
#[derive(Debug, Clone, PartialEq)]
pub enum NavChange {
    Comparable { pct_change: f64 },
    Incomparable { reason: IncomparableReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomparableReason {
    ZeroPreviousNav,
}

impl fmt::Display for IncomparableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncomparableReason::ZeroPreviousNav => write!(f, "previous NAV is zero"),
        }
    }
}

/// Outcome for one scheme name across the two snapshots.
#[derive(Debug, Clone)]
pub enum FundDelta {
    Matched {
        scheme_name: String,
        prev_nav: f64,
        curr_nav: f64,
        change: NavChange,
        significant: bool,
    },
    Added {
        scheme_name: String,
        curr_nav: f64,
    },
    Removed {
        scheme_name: String,
        prev_nav: f64,
    },
}

#[derive(Debug, Clone)]
pub struct DiffReport {
    /// Whether the persisted snapshot must be replaced with the current one.
    /// The caller owns the actual write.
    pub update_required: bool,
    /// Empty previous snapshot: no comparison base exists, so no per-record
    /// output is produced and an update is unconditionally required.
    pub first_run: bool,
    pub deltas: Vec<FundDelta>,
    pub messages: Vec<String>,
}

/// Diffs the previous and current snapshots by scheme name.
///
/// Records present in both snapshots get a percent change and a significance
/// classification; names only in one side become Added/Removed, and either
/// always requires a snapshot update. Current-snapshot order is kept, with
/// removed records appended in previous-snapshot order. No side effects.
pub fn compare_snapshots(
    prev: &[FundRecord],
    curr: &[FundRecord],
    opts: &DiffOptions,
) -> Result<DiffReport> {
    if prev.is_empty() {
        return Ok(DiffReport {
            update_required: true,
            first_run: true,
            deltas: Vec::new(),
            messages: Vec::new(),
        });
    }

    let mut prev_by_name: BTreeMap<&str, &FundRecord> = BTreeMap::new();
    for record in prev {
        // First occurrence wins, mirroring the resolver's duplicate policy.
        prev_by_name.entry(record.scheme_name.as_str()).or_insert(record);
    }

    let mut deltas = Vec::with_capacity(curr.len());
    let mut messages = Vec::new();
    let mut update_required = false;

    for record in curr {
        let Some(previous) = prev_by_name.get(record.scheme_name.as_str()) else {
            let curr_nav = record.nav_value()?;
            update_required = true;
            messages.push(format!(
                "{}: newly tracked at NAV {}",
                record.scheme_name, record.nav
            ));
            deltas.push(FundDelta::Added {
                scheme_name: record.scheme_name.clone(),
                curr_nav,
            });
            continue;
        };

        let prev_nav = previous.nav_value()?;
        let curr_nav = record.nav_value()?;

        let (change, significant) = if prev_nav == 0.0 {
            // Undefined percent change. Not significant, but a changed value
            // still has to make it into the stored snapshot.
            if previous.nav != record.nav {
                update_required = true;
            }
            let reason = IncomparableReason::ZeroPreviousNav;
            messages.push(format!(
                "{}: NAV {} -> {}; percent change not computable ({reason})",
                record.scheme_name, previous.nav, record.nav
            ));
            (NavChange::Incomparable { reason }, false)
        } else {
            let pct_change = (curr_nav - prev_nav) / prev_nav * 100.0;
            if pct_change != 0.0 {
                update_required = true;
            }
            // |pct_change| >= threshold, evaluated without the division so a
            // move landing exactly on the threshold is never lost to rounding.
            let significant = (curr_nav - prev_nav).abs() * 100.0
                >= opts.highlight_threshold_pct * prev_nav.abs();
            if significant {
                messages.push(format!(
                    "{}: NAV changed from {} to {} ({pct_change:+.2}%)",
                    record.scheme_name, previous.nav, record.nav
                ));
            }
            (NavChange::Comparable { pct_change }, significant)
        };

        deltas.push(FundDelta::Matched {
            scheme_name: record.scheme_name.clone(),
            prev_nav,
            curr_nav,
            change,
            significant,
        });
    }

    let curr_names: HashSet<&str> = curr.iter().map(|r| r.scheme_name.as_str()).collect();
    let mut removed_seen: HashSet<&str> = HashSet::new();
    for record in prev {
        if curr_names.contains(record.scheme_name.as_str()) {
            continue;
        }
        if !removed_seen.insert(record.scheme_name.as_str()) {
            continue;
        }
        update_required = true;
        messages.push(format!(
            "{}: no longer present in the monitored set",
            record.scheme_name
        ));
        deltas.push(FundDelta::Removed {
            scheme_name: record.scheme_name.clone(),
            prev_nav: record.nav_value()?,
        });
    }

    if !update_required {
        messages.push(NO_CHANGE_MESSAGE.to_string());
    }

    Ok(DiffReport {
        update_required,
        first_run: false,
        deltas,
        messages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, nav: &str) -> FundRecord {
        FundRecord {
            scheme_code: "100".to_string(),
            isin_growth: String::new(),
            isin_reinvestment: String::new(),
            scheme_name: name.to_string(),
            nav: nav.to_string(),
            date: "27-Jan-2026".to_string(),
        }
    }

    fn matched(report: &DiffReport, name: &str) -> (NavChange, bool) {
        report
            .deltas
            .iter()
            .find_map(|delta| match delta {
                FundDelta::Matched {
                    scheme_name,
                    change,
                    significant,
                    ..
                } if scheme_name == name => Some((change.clone(), *significant)),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn first_run_requires_update_without_messages() {
        let curr = vec![record("A", "10.0")];
        let report = compare_snapshots(&[], &curr, &DiffOptions::default()).unwrap();

        assert!(report.update_required);
        assert!(report.first_run);
        assert!(report.deltas.is_empty());
        assert!(report.messages.is_empty());
    }

    #[test]
    fn identical_snapshots_need_no_update() {
        let snapshot = vec![record("A", "10.5"), record("B", "99.1")];
        let report =
            compare_snapshots(&snapshot, &snapshot, &DiffOptions::default()).unwrap();

        assert!(!report.update_required);
        assert_eq!(report.messages, vec![NO_CHANGE_MESSAGE.to_string()]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let prev = vec![record("A", "100")];
        let opts = DiffOptions {
            highlight_threshold_pct: 3.0,
        };

        let at = compare_snapshots(&prev, &[record("A", "103")], &opts).unwrap();
        let (change, significant) = matched(&at, "A");
        match change {
            NavChange::Comparable { pct_change } => assert!((pct_change - 3.0).abs() < 1e-9),
            other => panic!("expected comparable change, got {other:?}"),
        }
        assert!(significant);
        assert_eq!(at.messages.len(), 1);
        assert!(at.messages[0].contains("A: NAV changed from 100 to 103"));

        let below = compare_snapshots(&prev, &[record("A", "102.99")], &opts).unwrap();
        let (_, significant) = matched(&below, "A");
        assert!(!significant);
        // Sub-threshold movement still dirties the snapshot.
        assert!(below.update_required);
        assert!(below.messages.is_empty());
    }

    #[test]
    fn negative_moves_count_toward_threshold() {
        let prev = vec![record("A", "100")];
        let report = compare_snapshots(&prev, &[record("A", "96")], &DiffOptions::default()).unwrap();
        let (_, significant) = matched(&report, "A");
        assert!(significant);
    }

    #[test]
    fn extra_previous_record_forces_update() {
        let prev = vec![record("A", "10.0"), record("B", "20.0")];
        let curr = vec![record("A", "10.0")];

        let report = compare_snapshots(&prev, &curr, &DiffOptions::default()).unwrap();

        assert!(report.update_required);
        assert!(report
            .deltas
            .iter()
            .any(|d| matches!(d, FundDelta::Removed { scheme_name, .. } if scheme_name == "B")));
    }

    #[test]
    fn new_record_forces_update() {
        let prev = vec![record("A", "10.0")];
        let curr = vec![record("A", "10.0"), record("B", "20.0")];

        let report = compare_snapshots(&prev, &curr, &DiffOptions::default()).unwrap();

        assert!(report.update_required);
        assert!(report
            .deltas
            .iter()
            .any(|d| matches!(d, FundDelta::Added { scheme_name, .. } if scheme_name == "B")));
        assert!(report.messages.iter().any(|m| m.contains("newly tracked")));
    }

    #[test]
    fn zero_previous_nav_is_flagged_not_significant() {
        let prev = vec![record("A", "0.00")];
        let curr = vec![record("A", "5.00")];

        let report = compare_snapshots(&prev, &curr, &DiffOptions::default()).unwrap();

        let (change, significant) = matched(&report, "A");
        assert_eq!(
            change,
            NavChange::Incomparable {
                reason: IncomparableReason::ZeroPreviousNav
            }
        );
        assert!(!significant);
        assert!(report.update_required);
        assert!(report.messages[0].contains("percent change not computable"));
    }

    #[test]
    fn zero_to_zero_counts_as_unchanged() {
        let prev = vec![record("A", "0.00")];
        let report = compare_snapshots(&prev, &prev.clone(), &DiffOptions::default()).unwrap();

        assert!(!report.update_required);
        assert_eq!(report.messages.last().map(String::as_str), Some(NO_CHANGE_MESSAGE));
    }

    #[test]
    fn reordered_snapshots_still_match_by_name() {
        // Feed reordering alone is not a change.
        let prev = vec![record("A", "10.0"), record("B", "20.0")];
        let curr = vec![record("B", "20.0"), record("A", "10.0")];

        let report = compare_snapshots(&prev, &curr, &DiffOptions::default()).unwrap();

        assert!(!report.update_required);
        assert_eq!(report.messages, vec![NO_CHANGE_MESSAGE.to_string()]);
    }
}
