use crate::domain::record::FundRecord;
use crate::feed;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// The persisted "last observed" set of monitored records, stored in the
/// shared feed format. Holds exactly one snapshot; `save` replaces it
/// wholesale.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedSnapshot {
    pub records: Vec<FundRecord>,
    pub schema_mismatch: bool,
    pub dropped_rows: usize,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or zero-byte file is the normal first-run case, not an
    /// error. A header mismatch is surfaced as a flag; malformed rows are
    /// dropped by the codec.
    pub fn load(&self) -> Result<LoadedSnapshot> {
        if !self.path.exists() {
            return Ok(LoadedSnapshot::default());
        }

        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading snapshot {}", self.path.display()))?;
        if text.is_empty() {
            return Ok(LoadedSnapshot::default());
        }

        let parsed = feed::parse(&text)
            .with_context(|| format!("parsing snapshot {}", self.path.display()))?;

        if parsed.schema_mismatch {
            tracing::warn!(
                path = %self.path.display(),
                "snapshot header does not match the expected field layout"
            );
        }
        if parsed.dropped_rows > 0 {
            tracing::debug!(
                path = %self.path.display(),
                dropped = parsed.dropped_rows,
                "dropped malformed snapshot rows"
            );
        }

        Ok(LoadedSnapshot {
            records: parsed.records,
            schema_mismatch: parsed.schema_mismatch,
            dropped_rows: parsed.dropped_rows,
        })
    }

    /// Fully replaces the stored snapshot. The content is written to a
    /// sibling temp file and renamed into place, so a crash mid-write can
    /// never leave a half-written file where the next run expects a valid
    /// snapshot.
    pub fn save(&self, records: &[FundRecord]) -> Result<()> {
        let body = feed::write_records(records)?;

        let tmp = self.tmp_path();
        fs::write(&tmp, body)
            .with_context(|| format!("writing snapshot temp file {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing snapshot {}", self.path.display()))?;

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
