//! Run state shared between stages.

use serde::{Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

use crate::core::{DayKey, Item};

/// The fixed stages of a daily run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageName {
    /// Fetch today's items from the feed.
    Collect,
    /// Draw the day's cards.
    Render,
    /// Merge into the catalog and rebuild the site page.
    Persist,
    /// Push artifacts to the host.
    Publish,
    /// Wait until the host serves them.
    Propagation,
    /// Post the carousel.
    Social,
    /// Drop expired card directories.
    Prune,
    /// Check token lifetime.
    Credentials,
}

impl StageName {
    /// Every stage in execution order.
    pub const ALL: [Self; 8] = [
        Self::Collect,
        Self::Render,
        Self::Persist,
        Self::Publish,
        Self::Propagation,
        Self::Social,
        Self::Prune,
        Self::Credentials,
    ];

    /// Stable label used in logs and reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Collect => "1. collect",
            Self::Render => "2. render",
            Self::Persist => "3. persist",
            Self::Publish => "4. publish",
            Self::Propagation => "5. propagation",
            Self::Social => "6. social",
            Self::Prune => "7. prune",
            Self::Credentials => "8. credentials",
        }
    }

    /// Whether a failure here is logged instead of aborting the run.
    #[must_use]
    pub fn is_best_effort(self) -> bool {
        matches!(self, Self::Prune | Self::Credentials)
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for StageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Mutable state of one run.
///
/// Earlier stages write it and later stages read it; nothing else crosses
/// stage boundaries.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Correlates the log lines of one run.
    pub run_id: Uuid,
    /// The stage currently executing; `None` before the first one starts.
    pub stage: Option<StageName>,
    /// Day of the collected batch.
    pub date: Option<DayKey>,
    /// Collected items.
    pub items: Vec<Item>,
    /// Pages host id, when configured.
    pub host_id: Option<String>,
    /// Cards written by the render stage.
    pub artifacts: usize,
    /// Ranks whose card the render stage could not draw.
    pub skipped_ranks: Vec<u32>,
    /// Catalog size after the merge.
    pub catalog_size: usize,
    /// Id of the published carousel.
    pub post_id: Option<String>,
    /// Warning produced by the credential check.
    pub credential_warning: Option<String>,
}

impl RunContext {
    /// Creates the context for a new run.
    #[must_use]
    pub fn new(host_id: Option<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stage: None,
            date: None,
            items: Vec::new(),
            host_id,
            artifacts: 0,
            skipped_ranks: Vec::new(),
            catalog_size: 0,
            post_id: None,
            credential_warning: None,
        }
    }

    /// Marks `stage` as the one executing.
    pub fn enter(&mut self, stage: StageName) {
        self.stage = Some(stage);
    }

    /// Collected items whose card was drawn; only these can go into the
    /// carousel.
    #[must_use]
    pub fn rendered_items(&self) -> Vec<Item> {
        self.items
            .iter()
            .filter(|item| !self.skipped_ranks.contains(&item.rank))
            .cloned()
            .collect()
    }

    /// Label of the current stage.
    #[must_use]
    pub fn stage_label(&self) -> &'static str {
        self.stage.map_or("0. startup", StageName::label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_numbered_in_order() {
        for (i, stage) in StageName::ALL.iter().enumerate() {
            assert!(stage.label().starts_with(&format!("{}. ", i + 1)));
        }
        assert_eq!(StageName::Persist.to_string(), "3. persist");
    }

    #[test]
    fn test_only_trailing_stages_are_best_effort() {
        let best_effort: Vec<_> = StageName::ALL
            .into_iter()
            .filter(|s| s.is_best_effort())
            .collect();
        assert_eq!(best_effort, vec![StageName::Prune, StageName::Credentials]);
    }

    #[test]
    fn test_context_tracks_stage() {
        let mut ctx = RunContext::new(Some("octo".into()));
        assert_eq!(ctx.stage_label(), "0. startup");
        ctx.enter(StageName::Render);
        assert_eq!(ctx.stage_label(), "2. render");
    }

    #[test]
    fn test_rendered_items_leave_out_skipped_cards() {
        let mut ctx = RunContext::new(None);
        ctx.items = crate::testing::fixtures::items_for_day("20250115", 4);
        ctx.skipped_ranks = vec![2, 4];

        let ranks: Vec<u32> = ctx.rendered_items().iter().map(|i| i.rank).collect();
        assert_eq!(ranks, vec![1, 3]);
    }

    #[test]
    fn test_stage_serializes_as_label() {
        assert_eq!(
            serde_json::to_string(&StageName::Social).unwrap(),
            "\"6. social\""
        );
    }
}
