//! Configuration for a pipeline run.
//!
//! The whole configuration is built once in `main` and handed to each
//! collaborator as it is constructed:
//!
//! - [`Credentials`]: API keys and tokens, read from a JSON secrets file with a
//!   per-key environment fallback.
//! - [`PipelineSettings`]: paths, limits and timing knobs, all defaulted and
//!   optionally overridden by a JSON settings file.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{DealflowError, Result};

/// Secret keys recognised in the secrets file and the environment.
pub mod keys {
    /// Affiliate gateway access key.
    pub const COUPANG_ACCESS_KEY: &str = "COUPANG_ACCESS_KEY";
    /// Affiliate gateway secret key.
    pub const COUPANG_SECRET_KEY: &str = "COUPANG_SECRET_KEY";
    /// Telegram bot token.
    pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
    /// Telegram chat receiving status messages.
    pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
    /// GitHub account hosting the pages site.
    pub const GITHUB_ID: &str = "GITHUB_ID";
    /// Instagram business page id.
    pub const INSTA_PAGE_ID: &str = "INSTA_PAGE_ID";
    /// Instagram long-lived access token.
    pub const INSTA_ACCESS_TOKEN: &str = "INSTA_ACCESS_TOKEN";
    /// Day the Instagram token was issued, `YYYY-MM-DD`.
    pub const TOKEN_UPDATE_DATE: &str = "TOKEN_UPDATE_DATE";
}

/// Credentials for the external services.
///
/// Every field is optional here; a collaborator that needs one asks for it
/// through [`Credentials::require`] when it is built.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Affiliate gateway access key.
    pub coupang_access_key: Option<String>,
    /// Affiliate gateway secret key.
    pub coupang_secret_key: Option<String>,
    /// Telegram bot token.
    pub telegram_bot_token: Option<String>,
    /// Telegram chat id.
    pub telegram_chat_id: Option<String>,
    /// GitHub account; also the pages host id.
    pub github_id: Option<String>,
    /// Instagram page id.
    pub insta_page_id: Option<String>,
    /// Instagram access token.
    pub insta_access_token: Option<String>,
    /// Day the Instagram token was last refreshed.
    pub token_update_date: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("has_coupang_keys", &self.coupang_access_key.is_some())
            .field("has_telegram", &self.telegram_bot_token.is_some())
            .field("github_id", &self.github_id)
            .field("has_instagram", &self.insta_access_token.is_some())
            .field("token_update_date", &self.token_update_date)
            .finish()
    }
}

impl Credentials {
    /// Loads credentials from the process environment and an optional secrets file.
    pub fn load(secrets_path: &Path) -> Result<Self> {
        Self::load_with(secrets_path, |key| std::env::var(key).ok())
    }

    /// Loads credentials with a custom environment lookup.
    ///
    /// File values win; the environment fills whatever the file lacks. A
    /// missing file is fine, an unreadable or malformed one is not.
    pub fn load_with<F>(secrets_path: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_values = read_secrets_file(secrets_path)?;
        let lookup = |key: &str| {
            file_values
                .get(key)
                .cloned()
                .or_else(|| env(key))
                .filter(|v| !v.trim().is_empty())
        };

        Ok(Self {
            coupang_access_key: lookup(keys::COUPANG_ACCESS_KEY),
            coupang_secret_key: lookup(keys::COUPANG_SECRET_KEY),
            telegram_bot_token: lookup(keys::TELEGRAM_BOT_TOKEN),
            telegram_chat_id: lookup(keys::TELEGRAM_CHAT_ID),
            github_id: lookup(keys::GITHUB_ID),
            insta_page_id: lookup(keys::INSTA_PAGE_ID),
            insta_access_token: lookup(keys::INSTA_ACCESS_TOKEN),
            token_update_date: lookup(keys::TOKEN_UPDATE_DATE),
        })
    }

    /// Returns a required credential or a configuration error naming it.
    pub fn require<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
        value
            .as_deref()
            .ok_or_else(|| DealflowError::config(format!("missing credential {key}")))
    }

    /// Parses the token refresh date, if one is configured.
    pub fn token_update_day(&self) -> Result<Option<NaiveDate>> {
        self.token_update_date
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                    DealflowError::config(format!(
                        "{} '{raw}' is not YYYY-MM-DD: {e}",
                        keys::TOKEN_UPDATE_DATE
                    ))
                })
            })
            .transpose()
    }
}

fn read_secrets_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No secrets file, using environment only");
        return Ok(HashMap::new());
    }
    let raw = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let object = value.as_object().ok_or_else(|| {
        DealflowError::config(format!("{} must contain a JSON object", path.display()))
    })?;

    // Non-string values (numbers in chat ids) are kept in their JSON text form.
    Ok(object
        .iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k.clone(), s.clone())),
            serde_json::Value::Null => None,
            other => Some((k.clone(), other.to_string())),
        })
        .collect())
}

/// Paths, limits and timings for the daily run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Products requested from the feed.
    pub item_limit: usize,
    /// Product cards included in the carousel (cover and end card are extra).
    pub carousel_item_limit: usize,
    /// The persisted catalog document.
    pub catalog_path: PathBuf,
    /// Root of the per-day card directories.
    pub images_dir: PathBuf,
    /// Card typeface; the bundled font is used when it cannot be read.
    pub font_path: PathBuf,
    /// Where `index.html` is written.
    pub site_dir: PathBuf,
    /// Working tree published by git.
    pub repo_dir: PathBuf,
    /// Propagation probes before giving up.
    pub propagation_max_attempts: u32,
    /// Seconds between propagation probes.
    pub propagation_interval_seconds: u64,
    /// Fixed wait used when no host id is configured.
    pub propagation_fallback_seconds: u64,
    /// Days of card directories to keep.
    pub retention_days: u32,
    /// Lifetime of the Instagram token.
    pub token_lifetime_days: i64,
    /// Warn when this many days (or fewer) remain.
    pub token_warning_days: i64,
    /// Remote pushed to.
    pub git_remote: String,
    /// Branch pushed.
    pub git_branch: String,
    /// Per-request timeout for HTTP calls.
    pub http_timeout_seconds: u64,
    /// Graph API version segment.
    pub graph_api_version: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            item_limit: 10,
            carousel_item_limit: 8,
            catalog_path: PathBuf::from("data/products.json"),
            images_dir: PathBuf::from("images"),
            font_path: PathBuf::from("fonts/GmarketSansBold.ttf"),
            site_dir: PathBuf::from("."),
            repo_dir: PathBuf::from("."),
            propagation_max_attempts: 20,
            propagation_interval_seconds: 30,
            propagation_fallback_seconds: 120,
            retention_days: 30,
            token_lifetime_days: 60,
            token_warning_days: 7,
            git_remote: "origin".to_string(),
            git_branch: "main".to_string(),
            http_timeout_seconds: 10,
            graph_api_version: "v19.0".to_string(),
        }
    }
}

impl PipelineSettings {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a JSON file, or returns defaults when it is absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)?;
                let settings: Self = serde_json::from_str(&raw)?;
                settings.validate()?;
                Ok(settings)
            }
            Some(p) => Err(DealflowError::config(format!(
                "settings file {} does not exist",
                p.display()
            ))),
            None => Ok(Self::default()),
        }
    }

    /// Rejects settings that would make a stage meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.item_limit == 0 {
            return Err(DealflowError::config("item_limit must be at least 1"));
        }
        if self.propagation_max_attempts == 0 {
            return Err(DealflowError::config(
                "propagation_max_attempts must be at least 1",
            ));
        }
        Ok(())
    }

    /// Sets the propagation budget.
    #[must_use]
    pub fn with_propagation(mut self, max_attempts: u32, interval_seconds: u64) -> Self {
        self.propagation_max_attempts = max_attempts;
        self.propagation_interval_seconds = interval_seconds;
        self
    }

    /// Interval between propagation probes.
    #[must_use]
    pub fn propagation_interval(&self) -> Duration {
        Duration::from_secs(self.propagation_interval_seconds)
    }

    /// Fixed wait used without a host id.
    #[must_use]
    pub fn propagation_fallback(&self) -> Duration {
        Duration::from_secs(self.propagation_fallback_seconds)
    }

    /// HTTP request timeout.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

/// Everything a run needs, built once at process start.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Service credentials.
    pub credentials: Credentials,
    /// Run settings.
    pub settings: PipelineSettings,
}

impl AppConfig {
    /// Loads credentials and settings.
    pub fn load(secrets_path: &Path, settings_path: Option<&Path>) -> Result<Self> {
        let settings = PipelineSettings::load(settings_path)?;
        let credentials = Credentials::load(secrets_path)?;
        tracing::debug!(?credentials, "Configuration loaded");
        Ok(Self {
            credentials,
            settings,
        })
    }

    /// Builds the shared HTTP client with the configured timeout.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.settings.http_timeout())
            .user_agent(concat!("dealflow/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_secrets_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let creds = Credentials::load_with(&dir.path().join("secrets.json"), no_env).unwrap();
        assert!(creds.coupang_access_key.is_none());
        assert!(creds.github_id.is_none());
    }

    #[test]
    fn test_file_wins_over_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"GITHUB_ID": "from-file", "TELEGRAM_CHAT_ID": 12345, "INSTA_PAGE_ID": ""}}"#
        )
        .unwrap();

        let env = |key: &str| match key {
            "GITHUB_ID" => Some("from-env".to_string()),
            "COUPANG_ACCESS_KEY" => Some("env-access".to_string()),
            "INSTA_PAGE_ID" => Some("env-page".to_string()),
            _ => None,
        };
        let creds = Credentials::load_with(&path, env).unwrap();

        assert_eq!(creds.github_id.as_deref(), Some("from-file"));
        assert_eq!(creds.telegram_chat_id.as_deref(), Some("12345"));
        assert_eq!(creds.coupang_access_key.as_deref(), Some("env-access"));
        // Empty file values count as absent.
        assert_eq!(creds.insta_page_id.as_deref(), None);
    }

    #[test]
    fn test_malformed_secrets_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(Credentials::load_with(&path, no_env).is_err());
    }

    #[test]
    fn test_require_names_the_key() {
        let creds = Credentials::default();
        let err = Credentials::require(&creds.github_id, keys::GITHUB_ID).unwrap_err();
        assert!(err.to_string().contains("GITHUB_ID"));
    }

    #[test]
    fn test_token_update_day() {
        let creds = Credentials {
            token_update_date: Some("2025-01-02".into()),
            ..Default::default()
        };
        assert_eq!(
            creds.token_update_day().unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 2)
        );

        let bad = Credentials {
            token_update_date: Some("02/01/2025".into()),
            ..Default::default()
        };
        assert!(bad.token_update_day().is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials {
            coupang_secret_key: Some("super-secret".into()),
            ..Default::default()
        };
        assert!(!format!("{creds:?}").contains("super-secret"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.item_limit, 10);
        assert_eq!(settings.propagation_max_attempts, 20);
        assert_eq!(settings.propagation_interval(), Duration::from_secs(30));
        assert_eq!(settings.retention_days, 30);
        assert_eq!(settings.font_path, PathBuf::from("fonts/GmarketSansBold.ttf"));
    }

    #[test]
    fn test_settings_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dealflow.json");
        std::fs::write(&path, r#"{"item_limit": 5, "git_branch": "gh-pages"}"#).unwrap();

        let settings = PipelineSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.item_limit, 5);
        assert_eq!(settings.git_branch, "gh-pages");
        assert_eq!(settings.retention_days, 30);
    }

    #[test]
    fn test_settings_validation() {
        let settings = PipelineSettings::new().with_propagation(0, 30);
        assert!(settings.validate().is_err());
    }
}
