//! Card rendering for a day's items.
//!
//! A day's cards live in `images/{YYYYMMDD}/`:
//!
//! ```text
//! images/20250115/
//! ├── 00_cover.jpg
//! ├── 01.jpg ... 10.jpg   # one per item, by rank
//! └── 11_end.jpg
//! ```
//!
//! The file names are shared with the propagation probe and the carousel.

mod cards;

pub use cards::{CardFont, CardRenderer, CANVAS_SIZE};

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::core::Item;
use crate::errors::Result;

/// The cover card; also the propagation sentinel.
pub const COVER_FILE: &str = "00_cover.jpg";

/// The closing card.
pub const END_FILE: &str = "11_end.jpg";

/// File name of an item's card.
#[must_use]
pub fn item_file_name(rank: u32) -> String {
    format!("{rank:02}.jpg")
}

/// Directory holding one day's cards.
#[must_use]
pub fn day_dir(images_dir: &Path, date: &str) -> PathBuf {
    images_dir.join(date)
}

/// What a render pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Directory the cards were written to.
    pub dir: PathBuf,
    /// Card files written, in carousel order.
    pub files: Vec<String>,
    /// Total bytes written.
    pub bytes: u64,
    /// Ranks whose card could not be produced.
    pub skipped: Vec<u32>,
}

impl RenderSummary {
    /// Number of cards written.
    #[must_use]
    pub fn count(&self) -> usize {
        self.files.len()
    }
}

/// Renders the cover, one card per item, and the closing card.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Writes the day's cards. Individual item failures are skipped and
    /// reported in the summary; cover or closing card failures are errors.
    async fn render(&self, items: &[Item]) -> Result<RenderSummary>;
}
