//! Collaborators injected into the orchestrator.

use async_trait::async_trait;
use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::core::Item;
use crate::credentials::CredentialMonitor;
use crate::errors::{DealflowError, Result};
use crate::feed::FeedSource;
use crate::notify::Notifier;
use crate::propagation::PropagationChecker;
use crate::publish::ArtifactPublisher;
use crate::render::Renderer;
use crate::retention::RetentionPruner;
use crate::site::SiteGenerator;
use crate::social::SocialPublisher;

/// Every capability a run needs, one per stage plus the notifier.
#[derive(Clone)]
pub struct Collaborators {
    /// Stage 1.
    pub feed: Arc<dyn FeedSource>,
    /// Stage 2.
    pub renderer: Arc<dyn Renderer>,
    /// Stage 3, catalog half.
    pub catalog: Arc<dyn CatalogStore>,
    /// Stage 3, site half.
    pub site: Arc<dyn SiteGenerator>,
    /// Stage 4.
    pub publisher: Arc<dyn ArtifactPublisher>,
    /// Stage 5.
    pub propagation: PropagationChecker,
    /// Stage 6.
    pub social: Arc<dyn SocialPublisher>,
    /// Stage 7.
    pub pruner: Arc<dyn RetentionPruner>,
    /// Stage 8.
    pub credentials: Arc<dyn CredentialMonitor>,
    /// Receives the single terminal report.
    pub notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("propagation", &self.propagation)
            .finish_non_exhaustive()
    }
}

/// Stand-in for a collaborator that could not be configured.
///
/// Startup still succeeds; the stage that needs it fails with the recorded
/// configuration error and the run reports it like any other failure.
#[derive(Debug, Clone)]
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    /// Records why the collaborator is missing.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Keeps `built` or swaps in an [`Unavailable`] carrying its error.
    pub fn or_unavailable<T>(built: Result<T>) -> std::result::Result<T, Self> {
        built.map_err(|e| Self::new(e.to_string()))
    }

    fn error(&self) -> DealflowError {
        DealflowError::config(self.reason.clone())
    }
}

#[async_trait]
impl FeedSource for Unavailable {
    async fn collect(&self, _limit: usize) -> Result<Vec<Item>> {
        Err(self.error())
    }
}

#[async_trait]
impl SocialPublisher for Unavailable {
    async fn publish(&self, _items: &[Item]) -> Result<String> {
        Err(self.error())
    }
}
