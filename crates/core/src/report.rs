use crate::domain::diff::DiffReport;
use crate::domain::record::FundRecord;
use crate::domain::watch::MonitorStatus;
use crate::feed::FUND_FIELDS;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Presentation-only aggregation of one run: found/missing accounting,
/// collected recoverable warnings, and the engine's messages. No decisions
/// are made here.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub found_count: usize,
    pub missing_count: usize,
    pub missing: Vec<String>,
    pub update_required: bool,
    pub first_run: bool,
    pub warnings: Vec<String>,
    pub messages: Vec<String>,
}

impl RunSummary {
    pub fn build(status: &MonitorStatus, diff: &DiffReport, warnings: Vec<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            found_count: status.found_count(),
            missing_count: status.missing_count(),
            missing: status
                .missing_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            update_required: diff.update_required,
            first_run: diff.first_run,
            warnings,
            messages: diff.messages.clone(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("---- status ----\n");
        out.push_str(&format!(
            "{} of {} watched funds found in the feed\n",
            self.found_count,
            self.found_count + self.missing_count
        ));
        if self.missing.is_empty() {
            out.push_str("values found for all watched funds\n");
        } else {
            for name in &self.missing {
                out.push_str(&format!("fund info not found: {name}\n"));
            }
        }

        for warning in &self.warnings {
            out.push_str(&format!("warning: {warning}\n"));
        }

        if self.first_run {
            out.push_str("first run: no previous snapshot to compare against\n");
        }
        for message in &self.messages {
            out.push_str(&format!("> {message}\n"));
        }

        out
    }
}

/// Full per-fund detail blocks, shown when there is no comparison base.
pub fn render_fund_details(records: &[FundRecord]) -> String {
    let mut out = String::new();

    out.push_str("---- funds being monitored ----\n");
    for (index, record) in records.iter().enumerate() {
        out.push_str(&format!("{}) {}\n", index + 1, record.scheme_name));
        let fields = record.fields();
        for (label, value) in FUND_FIELDS.iter().zip(fields) {
            if *label == "Scheme Name" {
                continue;
            }
            out.push_str(&format!("   {label:<30}: {value}\n"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::diff::{compare_snapshots, DiffOptions, NO_CHANGE_MESSAGE};
    use crate::domain::watch::{resolve_monitored, WatchList};

    fn record(name: &str, nav: &str) -> FundRecord {
        FundRecord {
            scheme_code: "100".to_string(),
            isin_growth: "INF001".to_string(),
            isin_reinvestment: String::new(),
            scheme_name: name.to_string(),
            nav: nav.to_string(),
            date: "27-Jan-2026".to_string(),
        }
    }

    #[test]
    fn summary_counts_and_lists_missing_names() {
        let watch = WatchList::from_text("Fund A\nFund B\n").unwrap();
        let feed = vec![record("Fund A", "10.0")];
        let (current, status) = resolve_monitored(&feed, &watch);
        let diff = compare_snapshots(&current.clone(), &current, &DiffOptions::default()).unwrap();

        let summary = RunSummary::build(&status, &diff, vec!["schema drift".to_string()]);

        assert_eq!(summary.found_count, 1);
        assert_eq!(summary.missing_count, 1);
        assert_eq!(summary.missing, vec!["Fund B".to_string()]);

        let rendered = summary.render();
        assert!(rendered.contains("1 of 2 watched funds found"));
        assert!(rendered.contains("fund info not found: Fund B"));
        assert!(rendered.contains("warning: schema drift"));
        assert!(rendered.contains(NO_CHANGE_MESSAGE));
    }

    #[test]
    fn fund_details_list_every_field_except_the_name_line() {
        let rendered = render_fund_details(&[record("Fund A", "10.5")]);

        assert!(rendered.contains("1) Fund A"));
        assert!(rendered.contains("Net Asset Value"));
        assert!(rendered.contains("10.5"));
        assert!(!rendered.contains("Scheme Name"));
    }

    #[test]
    fn summary_serializes_for_machine_output() {
        let watch = WatchList::from_text("Fund A\n").unwrap();
        let feed = vec![record("Fund A", "10.0")];
        let (current, status) = resolve_monitored(&feed, &watch);
        let diff = compare_snapshots(&[], &current, &DiffOptions::default()).unwrap();

        let summary = RunSummary::build(&status, &diff, Vec::new());
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["found_count"], 1);
        assert_eq!(json["first_run"], true);
        assert_eq!(json["update_required"], true);
    }
}
