//! Testing utilities for the daily pipeline.
//!
//! This module provides:
//! - Item fixtures
//! - Recording collaborators that share a [`CallLog`] so tests can assert
//!   stage order

pub mod fixtures;
pub mod mocks;

pub use fixtures::{item, items_for_day};
pub use mocks::{
    CallLog, FailingCatalogStore, RecordingNotifier, RecordingPruner, RecordingRenderer,
    RecordingSiteGenerator, RecordingSleeper, RecordingSocialPublisher, ScriptedProbe,
    StaticFeed, StaticMonitor, StaticPublisher,
};
