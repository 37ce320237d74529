//! Pruning of old per-day card directories.
//!
//! Card directories are named by day key (`images/20250115/`). Anything
//! strictly older than `today - N days` is removed; other names are left alone.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::core::DayKey;
use crate::errors::Result;
use crate::utils::cutoff_day;

/// What a prune pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneSummary {
    /// Day keys whose directories were removed.
    pub removed: Vec<String>,
    /// Day keys whose removal failed.
    pub failed: Vec<String>,
}

impl PruneSummary {
    /// Number of directories removed.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// Removes expired artifacts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RetentionPruner: Send + Sync {
    /// Removes artifacts older than `older_than_days`.
    async fn prune(&self, older_than_days: u32) -> Result<PruneSummary>;
}

/// Prunes dated sub-directories of the images directory.
#[derive(Debug, Clone)]
pub struct DirectoryPruner {
    images_dir: PathBuf,
    today: Option<NaiveDate>,
}

impl DirectoryPruner {
    /// Creates a pruner for `images_dir`, measuring age from the local date.
    #[must_use]
    pub fn new(images_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            today: None,
        }
    }

    /// Pins "today".
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[async_trait]
impl RetentionPruner for DirectoryPruner {
    async fn prune(&self, older_than_days: u32) -> Result<PruneSummary> {
        let mut summary = PruneSummary::default();
        if !self.images_dir.is_dir() {
            debug!(dir = %self.images_dir.display(), "No images directory, nothing to prune");
            return Ok(summary);
        }

        let cutoff = cutoff_day(self.today(), older_than_days);
        let mut expired = Vec::new();
        for entry in std::fs::read_dir(&self.images_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            // Non-date names are not ours to delete.
            match DayKey::parse(name.as_str()) {
                Ok(day) if day < cutoff => expired.push((name, entry.path())),
                _ => {}
            }
        }
        expired.sort();

        for (name, path) in expired {
            match std::fs::remove_dir_all(&path) {
                Ok(()) => {
                    debug!(day = %name, "Removed expired card directory");
                    summary.removed.push(name);
                }
                Err(e) => {
                    warn!(day = %name, error = %e, "Could not remove card directory");
                    summary.failed.push(name);
                }
            }
        }

        info!(
            %cutoff,
            removed = summary.removed_count(),
            failed = summary.failed.len(),
            "Retention prune finished"
        );
        Ok(summary)
    }
}
