//! The cross-day catalog of published items.
//!
//! This module provides:
//! - Merge-by-day upsert ([`merge_by_day`]): a day's batch replaces every
//!   stored entry for that day and goes in front of the older days
//! - A tagged load result ([`CatalogLoad`]) so the "corrupt means empty"
//!   repair path is explicit
//! - Stores: a JSON file with atomic whole-document replace, and an
//!   in-memory store for tests

mod merge;
mod store;

pub use merge::{batch_day, merge_by_day};
pub use store::{CatalogLoad, CatalogStore, InMemoryCatalogStore, JsonCatalogStore};
