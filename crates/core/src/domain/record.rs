use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Number of fields in one feed record (and in the persisted snapshot, which
/// shares the same layout).
pub const FIELD_COUNT: usize = 6;

/// One entry from the bulk feed or the persisted snapshot. Immutable once
/// constructed; snapshots are replaced wholesale, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    pub scheme_code: String,
    pub isin_growth: String,
    pub isin_reinvestment: String,
    /// Identity key for matching across snapshots and against the watch-list.
    pub scheme_name: String,
    /// NAV exactly as published. Kept as text so a persisted snapshot
    /// round-trips field-for-field; `nav_value` parses it for comparisons.
    pub nav: String,
    /// Feed-reported valuation date, display/audit only.
    pub date: String,
}

impl FundRecord {
    pub fn from_fields(fields: &[String]) -> Result<Self> {
        anyhow::ensure!(
            fields.len() == FIELD_COUNT,
            "expected {FIELD_COUNT} fields, got {}",
            fields.len()
        );

        let record = Self {
            scheme_code: fields[0].clone(),
            isin_growth: fields[1].clone(),
            isin_reinvestment: fields[2].clone(),
            scheme_name: fields[3].clone(),
            nav: fields[4].clone(),
            date: fields[5].clone(),
        };

        record
            .nav_value()
            .with_context(|| format!("record for {:?} failed NAV validation", record.scheme_name))?;

        Ok(record)
    }

    /// Parsed NAV. Construction validates the text, so after `from_fields`
    /// this can only fail on hand-built records.
    pub fn nav_value(&self) -> Result<f64> {
        let value = self
            .nav
            .trim()
            .parse::<f64>()
            .with_context(|| format!("NAV is not numeric: {:?}", self.nav))?;
        anyhow::ensure!(value.is_finite(), "NAV is not finite: {:?}", self.nav);
        Ok(value)
    }

    pub fn fields(&self) -> [&str; FIELD_COUNT] {
        [
            &self.scheme_code,
            &self.isin_growth,
            &self.isin_reinvestment,
            &self.scheme_name,
            &self.nav,
            &self.date,
        ]
    }
}
