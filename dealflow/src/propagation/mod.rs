//! Propagation checking for the static host.
//!
//! After a push the pages host needs a while before new files are served.
//! [`PropagationChecker`] probes the day's cover card with HEAD requests until
//! it is served or the attempt budget runs out. The two terminal outcomes are
//! [`Propagation::Ready`] and [`Propagation::TimedOut`].
//!
//! Sleeps happen only *between* probes: `n` probes sleep `n - 1` times.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::DayKey;
use crate::errors::Result;
use crate::publish::PagesHost;
use crate::render::COVER_FILE;

/// Attempt budget for a propagation wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationPolicy {
    /// Maximum probes, including the first.
    pub max_attempts: u32,
    /// Pause between probes.
    pub interval: Duration,
}

impl Default for PropagationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            interval: Duration::from_secs(30),
        }
    }
}

impl PropagationPolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Wall-clock ceiling spent sleeping when every probe misses.
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Terminal outcome of a propagation wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// The probe URL answered with a success status.
    Ready {
        /// Probes made, 1-based.
        attempts: u32,
    },
    /// The budget ran out.
    TimedOut {
        /// Probes made.
        attempts: u32,
    },
}

impl Propagation {
    /// Returns true for [`Propagation::Ready`].
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Probes made before reaching this outcome.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Ready { attempts } | Self::TimedOut { attempts } => *attempts,
        }
    }
}

/// An existence check against a public URL.
#[async_trait]
pub trait Probe: Send + Sync {
    /// `Ok(true)` when the URL is served with a success status, `Ok(false)`
    /// for any other status, `Err` for transport failures.
    async fn exists(&self, url: &str) -> Result<bool>;
}

/// HEAD-request probe; no body is transferred.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    /// Creates a probe using a shared client.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn exists(&self, url: &str) -> Result<bool> {
        let response = self.client.head(url).send().await?;
        debug!(url, status = response.status().as_u16(), "Probe response");
        Ok(response.status().is_success())
    }
}

/// Suspension between probes.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleeps for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Polls a day's cover card until it is publicly served.
#[derive(Clone)]
pub struct PropagationChecker {
    probe: Arc<dyn Probe>,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for PropagationChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagationChecker").finish_non_exhaustive()
    }
}

impl PropagationChecker {
    /// Creates a checker with the tokio sleeper.
    #[must_use]
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        Self::with_sleeper(probe, Arc::new(TokioSleeper))
    }

    /// Creates a checker with a custom sleeper.
    #[must_use]
    pub fn with_sleeper(probe: Arc<dyn Probe>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { probe, sleeper }
    }

    /// The canonical probe URL: the day's cover card on the pages host.
    #[must_use]
    pub fn probe_url(host_id: &str, date: &DayKey) -> String {
        PagesHost::new(host_id).artifact_url(date, COVER_FILE)
    }

    /// Probes until the cover is visible or `policy.max_attempts` is spent.
    ///
    /// A `max_attempts` of zero is treated as one.
    pub async fn wait_until_visible(
        &self,
        host_id: &str,
        date: &DayKey,
        policy: PropagationPolicy,
    ) -> Propagation {
        let url = Self::probe_url(host_id, date);
        let max_attempts = policy.max_attempts.max(1);
        info!(
            %url,
            max_attempts,
            interval_secs = policy.interval.as_secs(),
            budget_secs = policy.ceiling().as_secs(),
            "Waiting for artifacts to propagate"
        );

        for attempt in 1..=max_attempts {
            match self.probe.exists(&url).await {
                Ok(true) => {
                    info!(attempt, "Artifacts are visible");
                    return Propagation::Ready { attempts: attempt };
                }
                Ok(false) => debug!(attempt, max_attempts, "Not visible yet"),
                Err(e) => warn!(attempt, max_attempts, error = %e, "Probe failed"),
            }

            if attempt < max_attempts {
                self.sleeper.sleep(policy.interval).await;
            }
        }

        warn!(%url, attempts = max_attempts, "Gave up waiting for propagation");
        Propagation::TimedOut {
            attempts: max_attempts,
        }
    }

    /// Waits a fixed delay instead of probing, for when no host id is known.
    pub async fn wait_fixed(&self, delay: Duration) {
        info!(delay_secs = delay.as_secs(), "No host id, waiting a fixed delay");
        self.sleeper.sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::{RecordingSleeper, ScriptedProbe};

    fn day() -> DayKey {
        DayKey::parse("20250115").unwrap()
    }

    #[test]
    fn test_probe_url_points_at_cover() {
        assert_eq!(
            PropagationChecker::probe_url("octo", &day()),
            "https://octo.github.io/images/20250115/00_cover.jpg"
        );
    }

    #[test]
    fn test_policy_ceiling() {
        let policy = PropagationPolicy::new(20, Duration::from_secs(30));
        assert_eq!(policy.ceiling(), Duration::from_secs(570));
    }

    #[tokio::test]
    async fn test_never_found_times_out() {
        let probe = Arc::new(ScriptedProbe::never_found());
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker = PropagationChecker::with_sleeper(probe.clone(), sleeper.clone());

        let outcome = checker
            .wait_until_visible("octo", &day(), PropagationPolicy::new(5, Duration::from_secs(30)))
            .await;

        assert_eq!(outcome, Propagation::TimedOut { attempts: 5 });
        assert_eq!(probe.calls(), 5);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(30); 4]);
    }

    #[tokio::test]
    async fn test_found_on_third_attempt() {
        let probe = Arc::new(ScriptedProbe::found_on(3));
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker = PropagationChecker::with_sleeper(probe.clone(), sleeper.clone());

        let outcome = checker
            .wait_until_visible("octo", &day(), PropagationPolicy::new(20, Duration::from_secs(1)))
            .await;

        assert_eq!(outcome, Propagation::Ready { attempts: 3 });
        assert_eq!(probe.calls(), 3);
        assert_eq!(sleeper.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn test_found_immediately_never_sleeps() {
        let probe = Arc::new(ScriptedProbe::found_on(1));
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker = PropagationChecker::with_sleeper(probe.clone(), sleeper.clone());

        let outcome = checker
            .wait_until_visible("octo", &day(), PropagationPolicy::default())
            .await;

        assert!(outcome.is_ready());
        assert_eq!(outcome.attempts(), 1);
        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_transport_errors_count_as_misses() {
        let probe = Arc::new(ScriptedProbe::failing_then_found(2));
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker = PropagationChecker::with_sleeper(probe.clone(), sleeper);

        let outcome = checker
            .wait_until_visible("octo", &day(), PropagationPolicy::new(4, Duration::ZERO))
            .await;

        assert_eq!(outcome, Propagation::Ready { attempts: 3 });
        assert_eq!(probe.urls()[0], "https://octo.github.io/images/20250115/00_cover.jpg");
    }

    #[tokio::test]
    async fn test_zero_attempts_still_probes_once() {
        let probe = Arc::new(ScriptedProbe::never_found());
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker = PropagationChecker::with_sleeper(probe.clone(), sleeper.clone());

        let outcome = checker
            .wait_until_visible("octo", &day(), PropagationPolicy::new(0, Duration::from_secs(1)))
            .await;

        assert_eq!(outcome, Propagation::TimedOut { attempts: 1 });
        assert_eq!(probe.calls(), 1);
        assert!(sleeper.sleeps().is_empty());
    }
}
