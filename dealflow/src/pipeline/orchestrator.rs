//! The fixed-order daily run.

use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use std::time::Duration;
use tracing::{info, warn, Instrument};

use super::context::{RunContext, StageName};
use super::ports::Collaborators;
use super::report::{FailureReport, RunOutcome, SuccessReport};
use crate::config::AppConfig;
use crate::core::DayKey;
use crate::errors::DealflowError;
use crate::observability::StageTimer;
use crate::propagation::{Propagation, PropagationChecker, PropagationPolicy};

/// Knobs the orchestrator reads; everything else lives in the collaborators.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Items requested from the feed.
    pub item_limit: usize,
    /// Pages host id; without it stage 5 waits `fallback_delay` instead.
    pub host_id: Option<String>,
    /// Probe budget for stage 5.
    pub propagation: PropagationPolicy,
    /// Fixed wait used without a host id.
    pub fallback_delay: Duration,
    /// Days of artifacts kept by stage 7.
    pub retention_days: u32,
    /// Pins the date used by the credential check.
    pub today: Option<NaiveDate>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            item_limit: 10,
            host_id: None,
            propagation: PropagationPolicy::default(),
            fallback_delay: Duration::from_secs(120),
            retention_days: 30,
            today: None,
        }
    }
}

impl RunSettings {
    /// Derives run settings from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let settings = &config.settings;
        Self {
            item_limit: settings.item_limit,
            host_id: config.credentials.github_id.clone(),
            propagation: PropagationPolicy::new(
                settings.propagation_max_attempts,
                settings.propagation_interval(),
            ),
            fallback_delay: settings.propagation_fallback(),
            retention_days: settings.retention_days,
            today: None,
        }
    }
}

/// Runs the eight stages in order and reports exactly once.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    collaborators: Collaborators,
    settings: RunSettings,
}

impl Orchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(collaborators: Collaborators, settings: RunSettings) -> Self {
        Self {
            collaborators,
            settings,
        }
    }

    /// Executes one daily run.
    ///
    /// The first fatal failure stops the run; later stages never start. One
    /// notification goes out either way.
    pub async fn run(&self) -> RunOutcome {
        let mut ctx = RunContext::new(self.settings.host_id.clone());
        let span = tracing::info_span!("run", run_id = %ctx.run_id);

        async {
            info!("Daily run started");
            let outcome = match self.run_stages(&mut ctx).await {
                Ok(()) => RunOutcome::Succeeded(SuccessReport::from_context(&ctx)),
                Err(error) => RunOutcome::Failed(FailureReport::new(&ctx, &error)),
            };

            match &outcome {
                RunOutcome::Succeeded(report) => {
                    info!(items = report.items, catalog = report.catalog_size, "Daily run succeeded");
                }
                RunOutcome::Failed(report) => {
                    warn!(stage = report.stage_label(), error = %report.message, "Daily run failed");
                }
            }
            self.collaborators.notifier.notify(&outcome.text()).await;
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, ctx: &mut RunContext) -> anyhow::Result<()> {
        for stage in StageName::ALL {
            ctx.enter(stage);
            let timer = StageTimer::start(stage.label());
            match self.run_stage(stage, ctx).await {
                Ok(()) => {
                    timer.completed();
                }
                Err(error) if stage.is_best_effort() => {
                    timer.skipped(&error);
                }
                Err(error) => {
                    timer.failed(&error);
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    async fn run_stage(&self, stage: StageName, ctx: &mut RunContext) -> anyhow::Result<()> {
        match stage {
            StageName::Collect => self.collect(ctx).await,
            StageName::Render => self.render(ctx).await,
            StageName::Persist => self.persist(ctx).await,
            StageName::Publish => self.publish().await,
            StageName::Propagation => self.wait_for_propagation(ctx).await,
            StageName::Social => self.post_carousel(ctx).await,
            StageName::Prune => self.prune().await,
            StageName::Credentials => self.check_credentials(ctx),
        }
    }

    async fn collect(&self, ctx: &mut RunContext) -> anyhow::Result<()> {
        let items = self
            .collaborators
            .feed
            .collect(self.settings.item_limit)
            .await
            .context("collecting deal items")?;
        let first = items.first().ok_or(DealflowError::EmptyFeed)?;
        ctx.date = Some(DayKey::parse(first.date.clone())?);

        info!(count = items.len(), "Items collected");
        ctx.items = items;
        Ok(())
    }

    async fn render(&self, ctx: &mut RunContext) -> anyhow::Result<()> {
        let summary = self
            .collaborators
            .renderer
            .render(&ctx.items)
            .await
            .context("rendering cards")?;
        if !summary.skipped.is_empty() {
            warn!(ranks = ?summary.skipped, "Some product cards were not drawn");
        }
        ctx.artifacts = summary.count();
        ctx.skipped_ranks = summary.skipped;
        Ok(())
    }

    async fn persist(&self, ctx: &mut RunContext) -> anyhow::Result<()> {
        let merged = self
            .collaborators
            .catalog
            .persist(&ctx.items)
            .context("persisting catalog")?;
        self.collaborators
            .site
            .regenerate(&merged)
            .await
            .context("regenerating site page")?;
        ctx.catalog_size = merged.len();
        Ok(())
    }

    async fn publish(&self) -> anyhow::Result<()> {
        let pushed = self
            .collaborators
            .publisher
            .publish()
            .await
            .context("publishing artifacts")?;
        if !pushed {
            return Err(DealflowError::Publish("artifacts were not pushed".to_string()).into());
        }
        Ok(())
    }

    async fn wait_for_propagation(&self, ctx: &RunContext) -> anyhow::Result<()> {
        let date = ctx
            .date
            .as_ref()
            .ok_or_else(|| anyhow!("no batch date recorded"))?;
        let checker = &self.collaborators.propagation;

        let Some(host_id) = ctx.host_id.as_deref() else {
            warn!("Host id not configured, cannot probe propagation");
            checker.wait_fixed(self.settings.fallback_delay).await;
            return Ok(());
        };

        match checker
            .wait_until_visible(host_id, date, self.settings.propagation)
            .await
        {
            Propagation::Ready { .. } => Ok(()),
            Propagation::TimedOut { attempts } => Err(DealflowError::PropagationTimeout {
                url: PropagationChecker::probe_url(host_id, date),
                attempts,
            }
            .into()),
        }
    }

    async fn post_carousel(&self, ctx: &mut RunContext) -> anyhow::Result<()> {
        let post_id = self
            .collaborators
            .social
            .publish(&ctx.rendered_items())
            .await
            .context("posting carousel")?;
        info!(%post_id, "Carousel posted");
        ctx.post_id = Some(post_id);
        Ok(())
    }

    async fn prune(&self) -> anyhow::Result<()> {
        let summary = self
            .collaborators
            .pruner
            .prune(self.settings.retention_days)
            .await
            .context("pruning old cards")?;
        info!(removed = summary.removed_count(), "Old cards pruned");
        Ok(())
    }

    fn check_credentials(&self, ctx: &mut RunContext) -> anyhow::Result<()> {
        let today = self
            .settings
            .today
            .unwrap_or_else(|| Local::now().date_naive());
        ctx.credential_warning = self
            .collaborators
            .credentials
            .check(today)
            .context("checking token lifetime")?;
        Ok(())
    }
}
