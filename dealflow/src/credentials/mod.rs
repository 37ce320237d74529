//! Credential lifetime monitoring.
//!
//! The Instagram long-lived token expires a fixed number of days after it
//! was refreshed. The monitor turns the refresh date into a warning line once
//! expiry is close.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::config::{Credentials, PipelineSettings};
use crate::errors::Result;

/// Checks tracked credentials for upcoming expiry.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialMonitor: Send + Sync {
    /// Returns a warning text when a credential is about to expire.
    fn check(&self, today: NaiveDate) -> Result<Option<String>>;
}

/// Lifetime tracking for the social access token.
#[derive(Debug, Clone)]
pub struct TokenLifetime {
    update_date: Option<String>,
    lifetime_days: i64,
    warning_days: i64,
}

impl TokenLifetime {
    /// Creates a monitor for a token refreshed on `update_date` (`YYYY-MM-DD`).
    #[must_use]
    pub fn new(update_date: Option<String>, lifetime_days: i64, warning_days: i64) -> Self {
        Self {
            update_date,
            lifetime_days,
            warning_days,
        }
    }

    /// Builds the monitor from loaded configuration.
    #[must_use]
    pub fn from_config(credentials: &Credentials, settings: &PipelineSettings) -> Self {
        Self::new(
            credentials.token_update_date.clone(),
            settings.token_lifetime_days,
            settings.token_warning_days,
        )
    }

    /// Days left before expiry; negative once expired.
    pub fn remaining_days(&self, today: NaiveDate) -> Result<Option<i64>> {
        let creds = Credentials {
            token_update_date: self.update_date.clone(),
            ..Default::default()
        };
        Ok(creds
            .token_update_day()?
            .map(|updated| self.lifetime_days - (today - updated).num_days()))
    }
}

impl CredentialMonitor for TokenLifetime {
    fn check(&self, today: NaiveDate) -> Result<Option<String>> {
        let Some(remaining) = self.remaining_days(today)? else {
            warn!("Token refresh date not configured, skipping lifetime check");
            return Ok(None);
        };
        debug!(remaining, "Token lifetime checked");

        if remaining > self.warning_days {
            return Ok(None);
        }
        let status = if remaining < 0 {
            format!("인스타그램 토큰이 {}일 전에 만료되었습니다.", -remaining)
        } else {
            format!("인스타그램 토큰 만료까지 {remaining}일 남았습니다.")
        };
        let text = format!(
            "🚨 [토큰 갱신 경보]\n{status}\n봇이 멈추기 전에 토큰을 갱신하고 secrets.json을 수정해주세요!"
        );
        warn!(remaining, "Access token close to expiry");
        Ok(Some(text))
    }
}
