//! Per-stage wall-clock timing.

use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Times one stage and logs how it ended.
#[derive(Debug)]
pub struct StageTimer {
    stage: &'static str,
    started: Instant,
}

impl StageTimer {
    /// Logs the stage start and begins timing.
    #[must_use]
    pub fn start(stage: &'static str) -> Self {
        info!(stage, "Stage started");
        Self {
            stage,
            started: Instant::now(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Logs completion and returns the duration.
    pub fn completed(self) -> Duration {
        let elapsed = self.elapsed();
        info!(stage = self.stage, duration_ms = millis(elapsed), "Stage completed");
        elapsed
    }

    /// Logs a fatal stage error.
    pub fn failed(self, err: &anyhow::Error) -> Duration {
        let elapsed = self.elapsed();
        error!(
            stage = self.stage,
            duration_ms = millis(elapsed),
            error = %format!("{err:#}"),
            "Stage failed"
        );
        elapsed
    }

    /// Logs a best-effort stage error; the run carries on.
    pub fn skipped(self, err: &anyhow::Error) -> Duration {
        let elapsed = self.elapsed();
        warn!(
            stage = self.stage,
            duration_ms = millis(elapsed),
            error = %format!("{err:#}"),
            "Best-effort stage failed, continuing"
        );
        elapsed
    }
}

#[allow(clippy::cast_precision_loss)]
fn millis(elapsed: Duration) -> f64 {
    elapsed.as_micros() as f64 / 1000.0
}
