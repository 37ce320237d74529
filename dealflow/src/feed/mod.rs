//! Product feed collaborators.
//!
//! This module provides:
//! - The [`FeedSource`] port consumed by the collect stage
//! - [`CoupangFeed`], the affiliate gateway client, with HMAC request signing
//!   and deep-link shortening

mod coupang;
mod signing;

pub use coupang::{clean_product_url, CoupangFeed, GATEWAY_URL};
pub use signing::{authorization_header, sign_request};

use async_trait::async_trait;

use crate::core::Item;
use crate::errors::Result;

/// Source of today's promoted items.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Returns up to `limit` items ranked 1..N in feed order. May be empty;
    /// the caller decides whether that is fatal.
    async fn collect(&self, limit: usize) -> Result<Vec<Item>>;
}
