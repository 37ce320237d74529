//! Recording collaborators for testing.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{CatalogLoad, CatalogStore};
use crate::core::Item;
use crate::credentials::CredentialMonitor;
use crate::errors::{DealflowError, Result};
use crate::feed::FeedSource;
use crate::notify::Notifier;
use crate::propagation::{Probe, Sleeper};
use crate::publish::ArtifactPublisher;
use crate::render::{item_file_name, RenderSummary, Renderer, COVER_FILE, END_FILE};
use crate::retention::{PruneSummary, RetentionPruner};
use crate::site::SiteGenerator;
use crate::social::SocialPublisher;

fn mock_error(message: &str) -> DealflowError {
    DealflowError::api("mock", message)
}

/// Shared, ordered record of collaborator calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a call.
    pub fn record(&self, call: impl Into<String>) {
        self.0.lock().push(call.into());
    }

    /// Calls so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Returns true if `call` was recorded.
    #[must_use]
    pub fn contains(&self, call: &str) -> bool {
        self.0.lock().iter().any(|c| c == call)
    }
}

/// Feed returning a fixed batch, or a fixed error.
#[derive(Debug, Default)]
pub struct StaticFeed {
    items: Mutex<Vec<Item>>,
    error: Option<String>,
    log: CallLog,
    limits: Mutex<Vec<usize>>,
}

impl StaticFeed {
    /// Returns `items` on every call.
    #[must_use]
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Default::default()
        }
    }

    /// Fails every call.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Records calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Swaps the batch returned by later calls.
    pub fn set_items(&self, items: Vec<Item>) {
        *self.items.lock() = items;
    }

    /// Limits requested so far.
    #[must_use]
    pub fn limits(&self) -> Vec<usize> {
        self.limits.lock().clone()
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn collect(&self, limit: usize) -> Result<Vec<Item>> {
        self.log.record("collect");
        self.limits.lock().push(limit);
        match &self.error {
            Some(message) => Err(mock_error(message)),
            None => Ok(self.items.lock().iter().take(limit).cloned().collect()),
        }
    }
}

/// Renderer that writes nothing and reports one card per item it does not skip.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    error: Option<String>,
    skip: Vec<u32>,
    log: CallLog,
    batches: Mutex<Vec<usize>>,
}

impl RecordingRenderer {
    /// Creates a succeeding renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer that always fails.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Creates a renderer that cannot produce the cards of `ranks`.
    #[must_use]
    pub fn skipping(ranks: &[u32]) -> Self {
        Self {
            skip: ranks.to_vec(),
            ..Default::default()
        }
    }

    /// Records calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Batch sizes rendered so far.
    #[must_use]
    pub fn batches(&self) -> Vec<usize> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn render(&self, items: &[Item]) -> Result<RenderSummary> {
        self.log.record("render");
        self.batches.lock().push(items.len());
        if let Some(message) = &self.error {
            return Err(mock_error(message));
        }

        let (skipped, drawn): (Vec<&Item>, Vec<&Item>) =
            items.iter().partition(|i| self.skip.contains(&i.rank));
        let mut files = vec![COVER_FILE.to_string()];
        files.extend(drawn.iter().map(|i| item_file_name(i.rank)));
        files.push(END_FILE.to_string());
        Ok(RenderSummary {
            dir: PathBuf::from("images").join(items.first().map_or("", |i| i.date.as_str())),
            files,
            bytes: 0,
            skipped: skipped.iter().map(|i| i.rank).collect(),
        })
    }
}

/// Site generator remembering the catalog sizes it was handed.
#[derive(Debug, Default)]
pub struct RecordingSiteGenerator {
    error: Option<String>,
    log: CallLog,
    sizes: Mutex<Vec<usize>>,
}

impl RecordingSiteGenerator {
    /// Creates a succeeding generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator that always fails.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Records calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Catalog sizes seen so far.
    #[must_use]
    pub fn sizes(&self) -> Vec<usize> {
        self.sizes.lock().clone()
    }
}

#[async_trait]
impl SiteGenerator for RecordingSiteGenerator {
    async fn regenerate(&self, catalog: &[Item]) -> Result<()> {
        self.log.record("regenerate");
        self.sizes.lock().push(catalog.len());
        match &self.error {
            Some(message) => Err(mock_error(message)),
            None => Ok(()),
        }
    }
}

/// Artifact publisher with a fixed answer.
#[derive(Debug)]
pub struct StaticPublisher {
    outcome: std::result::Result<bool, String>,
    log: CallLog,
}

impl StaticPublisher {
    /// Always reports `pushed`.
    #[must_use]
    pub fn new(pushed: bool) -> Self {
        Self {
            outcome: Ok(pushed),
            log: CallLog::default(),
        }
    }

    /// Always fails.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            log: CallLog::default(),
        }
    }

    /// Records calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }
}

#[async_trait]
impl ArtifactPublisher for StaticPublisher {
    async fn publish(&self) -> Result<bool> {
        self.log.record("publish");
        self.outcome.clone().map_err(|m| mock_error(&m))
    }
}

/// Social publisher returning a fixed post id.
#[derive(Debug, Default)]
pub struct RecordingSocialPublisher {
    error: Option<String>,
    log: CallLog,
    posts: Mutex<Vec<Vec<Item>>>,
}

impl RecordingSocialPublisher {
    /// Creates a succeeding publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a publisher that always fails.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Records calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Item batches posted so far.
    #[must_use]
    pub fn posts(&self) -> Vec<Vec<Item>> {
        self.posts.lock().clone()
    }
}

#[async_trait]
impl SocialPublisher for RecordingSocialPublisher {
    async fn publish(&self, items: &[Item]) -> Result<String> {
        self.log.record("social");
        if let Some(message) = &self.error {
            return Err(mock_error(message));
        }
        let mut posts = self.posts.lock();
        posts.push(items.to_vec());
        Ok(format!("post-{}", posts.len()))
    }
}

/// Pruner recording the retention windows it was asked for.
#[derive(Debug, Default)]
pub struct RecordingPruner {
    error: Option<String>,
    log: CallLog,
    windows: Mutex<Vec<u32>>,
}

impl RecordingPruner {
    /// Creates a succeeding pruner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pruner that always fails.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Records calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Retention windows requested so far.
    #[must_use]
    pub fn windows(&self) -> Vec<u32> {
        self.windows.lock().clone()
    }
}

#[async_trait]
impl RetentionPruner for RecordingPruner {
    async fn prune(&self, older_than_days: u32) -> Result<PruneSummary> {
        self.log.record("prune");
        self.windows.lock().push(older_than_days);
        match &self.error {
            Some(message) => Err(mock_error(message)),
            None => Ok(PruneSummary::default()),
        }
    }
}

/// Credential monitor with a fixed answer.
#[derive(Debug)]
pub struct StaticMonitor {
    outcome: std::result::Result<Option<String>, String>,
    log: CallLog,
}

impl StaticMonitor {
    /// Never warns.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            outcome: Ok(None),
            log: CallLog::default(),
        }
    }

    /// Always returns `warning`.
    #[must_use]
    pub fn warning(warning: impl Into<String>) -> Self {
        Self {
            outcome: Ok(Some(warning.into())),
            log: CallLog::default(),
        }
    }

    /// Always fails.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            log: CallLog::default(),
        }
    }

    /// Records calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }
}

impl CredentialMonitor for StaticMonitor {
    fn check(&self, _today: NaiveDate) -> Result<Option<String>> {
        self.log.record("credentials");
        self.outcome.clone().map_err(|m| mock_error(&m))
    }
}

/// Catalog store whose writes always fail.
#[derive(Debug, Default)]
pub struct FailingCatalogStore {
    log: CallLog,
}

impl FailingCatalogStore {
    /// Creates the store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }
}

impl CatalogStore for FailingCatalogStore {
    fn load(&self) -> Result<CatalogLoad> {
        self.log.record("load");
        Ok(CatalogLoad::Missing)
    }

    fn replace(&self, _items: &[Item]) -> Result<()> {
        self.log.record("replace");
        Err(DealflowError::catalog(
            "mock/products.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only store"),
        ))
    }
}

/// Notifier keeping every message.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    log: CallLog,
}

impl RecordingNotifier {
    /// Creates the notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Messages sent so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) {
        self.log.record("notify");
        self.messages.lock().push(text.to_string());
    }
}

#[derive(Debug, Clone, Copy)]
enum ProbeScript {
    Never,
    FoundOn(u32),
    FailingThenFound(u32),
}

/// Probe answering from a script.
#[derive(Debug)]
pub struct ScriptedProbe {
    script: ProbeScript,
    urls: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    fn scripted(script: ProbeScript) -> Self {
        Self {
            script,
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Never reports the URL as served.
    #[must_use]
    pub fn never_found() -> Self {
        Self::scripted(ProbeScript::Never)
    }

    /// Reports "not found" until probe `attempt` (1-based).
    #[must_use]
    pub fn found_on(attempt: u32) -> Self {
        Self::scripted(ProbeScript::FoundOn(attempt))
    }

    /// Fails with a transport error `errors` times, then reports found.
    #[must_use]
    pub fn failing_then_found(errors: u32) -> Self {
        Self::scripted(ProbeScript::FailingThenFound(errors))
    }

    /// Probes made so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        u32::try_from(self.urls.lock().len()).unwrap_or(u32::MAX)
    }

    /// URLs probed so far.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn exists(&self, url: &str) -> Result<bool> {
        let attempt = {
            let mut urls = self.urls.lock();
            urls.push(url.to_string());
            u32::try_from(urls.len()).unwrap_or(u32::MAX)
        };
        match self.script {
            ProbeScript::Never => Ok(false),
            ProbeScript::FoundOn(k) => Ok(attempt >= k),
            ProbeScript::FailingThenFound(errors) if attempt <= errors => {
                Err(mock_error("connection reset"))
            }
            ProbeScript::FailingThenFound(_) => Ok(true),
        }
    }
}

/// Sleeper that returns at once and records the requested durations.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates the sleeper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested sleeps, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Total requested sleep time.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}
