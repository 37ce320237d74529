//! Social carousel publishing.
//!
//! This module provides:
//! - The [`SocialPublisher`] port used by the social stage
//! - Carousel URL selection and caption text
//! - [`InstagramPublisher`], the Graph API client

mod caption;
mod instagram;

pub use caption::build_caption;
pub use instagram::InstagramPublisher;

use async_trait::async_trait;

use crate::core::{DayKey, Item};
use crate::errors::Result;
use crate::publish::PagesHost;
use crate::render::{item_file_name, COVER_FILE, END_FILE};

/// Posts a carousel referencing already-public cards.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    /// Publishes the day's carousel and returns the post id.
    async fn publish(&self, items: &[Item]) -> Result<String>;
}

/// Public card URLs in carousel order: cover, the first `max_items`
/// product cards, closing card.
#[must_use]
pub fn carousel_urls(host: &PagesHost, date: &DayKey, items: &[Item], max_items: usize) -> Vec<String> {
    let mut urls = Vec::with_capacity(max_items.min(items.len()) + 2);
    urls.push(host.artifact_url(date, COVER_FILE));
    urls.extend(
        items
            .iter()
            .take(max_items)
            .map(|item| host.artifact_url(date, &item_file_name(item.rank))),
    );
    urls.push(host.artifact_url(date, END_FILE));
    urls
}
