//! # Dealflow
//!
//! A daily deal pipeline: collect today's promoted products, draw cards for
//! them, fold them into a cross-day catalog, publish the artifacts to a
//! static host, wait until they are publicly served, and post a carousel.
//!
//! The run is a fixed sequence of stages:
//!
//! - **Collect**: fetch ranked items from the affiliate feed
//! - **Render**: cover, one card per item, closing card
//! - **Persist**: merge-by-day upsert into the catalog, then rebuild the page
//! - **Publish**: git push to the pages host
//! - **Propagation**: poll until the cover card is served
//! - **Social**: post the carousel
//! - **Prune** and **Credentials**: best-effort housekeeping
//!
//! Exactly one notification is sent per run, success or failure.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dealflow::prelude::*;
//!
//! let config = AppConfig::load(Path::new("secrets.json"), None)?;
//! let orchestrator = Orchestrator::new(collaborators, RunSettings::from_config(&config));
//! let outcome = orchestrator.run().await;
//! std::process::exit(i32::from(outcome.exit_code()));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod catalog;
pub mod config;
pub mod core;
pub mod credentials;
pub mod errors;
pub mod feed;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod propagation;
pub mod publish;
pub mod render;
pub mod retention;
pub mod site;
pub mod social;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::catalog::{
        merge_by_day, CatalogLoad, CatalogStore, InMemoryCatalogStore, JsonCatalogStore,
    };
    pub use crate::config::{AppConfig, Credentials, PipelineSettings};
    pub use crate::core::{DayKey, Item};
    pub use crate::credentials::{CredentialMonitor, TokenLifetime};
    pub use crate::errors::{DealflowError, Result};
    pub use crate::feed::{CoupangFeed, FeedSource};
    pub use crate::notify::{LogNotifier, Notifier, TelegramNotifier};
    pub use crate::pipeline::{
        Collaborators, Orchestrator, RunOutcome, RunSettings, StageName, Unavailable,
    };
    pub use crate::propagation::{
        HttpProbe, Propagation, PropagationChecker, PropagationPolicy,
    };
    pub use crate::publish::{ArtifactPublisher, GitPublisher, PagesHost};
    pub use crate::render::{CardFont, CardRenderer, Renderer};
    pub use crate::retention::{DirectoryPruner, RetentionPruner};
    pub use crate::site::{HtmlSiteGenerator, SiteGenerator};
    pub use crate::social::{InstagramPublisher, SocialPublisher};
}
