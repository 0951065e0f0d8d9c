use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slova_text::DocumentStatus;

use crate::error::Result;
use crate::orchestrator::DocumentOutcome;

/// Write `contents` to `<path>.tmp`, fsync, then rename over `path`. A
/// reader never sees a partially written `path`.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.flush()?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Problem file names kept per status for the audit list.
pub const SAMPLE_LIMIT: usize = 50;

/// Durable progress of an extraction run.
///
/// Owned by the orchestrator's control task; workers never see it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub processed: BTreeSet<String>,
    #[serde(default)]
    pub counts: BTreeMap<DocumentStatus, u64>,
    #[serde(default)]
    pub samples: BTreeMap<DocumentStatus, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    /// Read a checkpoint, or start empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let checkpoint: Self = serde_json::from_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            processed = checkpoint.processed.len(),
            "checkpoint loaded"
        );
        Ok(checkpoint)
    }

    /// Write atomically: temp file in the same directory, fsync, rename.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be serialized or written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut body = serde_json::to_vec_pretty(self)?;
        body.push(b'\n');
        write_atomic(path, &body)
    }

    #[must_use]
    pub fn is_processed(&self, id: &str) -> bool {
        self.processed.contains(id)
    }

    #[must_use]
    pub fn count(&self, status: DocumentStatus) -> u64 {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Fold one outcome in. Returns `false` if the id was already recorded,
    /// in which case counts are left alone.
    pub fn record(&mut self, outcome: &DocumentOutcome) -> bool {
        if !self.processed.insert(outcome.id.clone()) {
            return false;
        }
        *self.counts.entry(outcome.status).or_insert(0) += 1;
        if outcome.status.is_problem() {
            let samples = self.samples.entry(outcome.status).or_default();
            if samples.len() < SAMPLE_LIMIT {
                samples.push(outcome.file_name.clone());
            }
        }
        true
    }

    /// Fold a finished batch in and stamp the update time.
    pub fn merge<'a>(&mut self, outcomes: impl IntoIterator<Item = &'a DocumentOutcome>) -> usize {
        let added = outcomes.into_iter().filter(|o| self.record(o)).count();
        self.updated_at = Some(Utc::now());
        added
    }
}
