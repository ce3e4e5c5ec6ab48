use crate::domain::record::FundRecord;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// User-supplied set of scheme names to monitor. Names are matched verbatim
/// (case-sensitive) against the feed's scheme-name field.
#[derive(Debug, Clone)]
pub struct WatchList {
    names: Vec<String>,
}

impl WatchList {
    /// One name per line; blank lines are skipped. An empty result is a
    /// configuration error, not an empty watch.
    pub fn from_text(text: &str) -> Result<Self> {
        let names: Vec<String> = text
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        anyhow::ensure!(!names.is_empty(), "watch-list contains no fund names");
        Ok(Self { names })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading watch-list {}", path.display()))?;
        Self::from_text(&text).with_context(|| format!("loading watch-list {}", path.display()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Per-watch-name found flag for one run. Built fresh by the resolver and
/// never persisted.
#[derive(Debug, Clone)]
pub struct MonitorStatus {
    found: BTreeMap<String, bool>,
}

impl MonitorStatus {
    fn new(watch: &WatchList) -> Self {
        let found = watch
            .names()
            .iter()
            .map(|name| (name.clone(), false))
            .collect();
        Self { found }
    }

    fn mark_found(&mut self, name: &str) {
        if let Some(flag) = self.found.get_mut(name) {
            *flag = true;
        }
    }

    pub fn is_found(&self, name: &str) -> bool {
        self.found.get(name).copied().unwrap_or(false)
    }

    pub fn found_count(&self) -> usize {
        self.found.values().filter(|found| **found).count()
    }

    pub fn missing_count(&self) -> usize {
        self.found.len() - self.found_count()
    }

    pub fn missing_names(&self) -> Vec<&str> {
        self.found
            .iter()
            .filter(|(_, found)| !**found)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Intersects the full feed against the watch-list: the returned records are
/// the watched subsequence of the feed, in feed order. Unmatched names stay
/// flagged as missing; absence is reported, never an error.
///
/// Duplicate scheme names within one feed keep the first occurrence so the
/// snapshot stays unique by name.
pub fn resolve_monitored(feed: &[FundRecord], watch: &WatchList) -> (Vec<FundRecord>, MonitorStatus) {
    let mut status = MonitorStatus::new(watch);
    let mut seen: HashSet<&str> = HashSet::new();
    let mut monitored = Vec::new();

    for record in feed {
        if !watch.contains(&record.scheme_name) {
            continue;
        }
        if !seen.insert(record.scheme_name.as_str()) {
            tracing::warn!(
                scheme_name = %record.scheme_name,
                "duplicate scheme name in feed; keeping first occurrence"
            );
            continue;
        }
        status.mark_found(&record.scheme_name);
        monitored.push(record.clone());
    }

    (monitored, status)
}
