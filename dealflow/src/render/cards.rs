//! Card images drawn with the `image` crate; text goes through `imageproc`.

use ab_glyph::{FontArc, PxScale};
use async_trait::async_trait;
use chrono::Datelike;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{day_dir, item_file_name, RenderSummary, Renderer, COVER_FILE, END_FILE};
use crate::core::{DayKey, Item};
use crate::errors::{DealflowError, Result};
use crate::utils::format_won;

/// Square canvas edge in pixels.
pub const CANVAS_SIZE: u32 = 1080;

const PHOTO_SIZE: u32 = 800;
const PHOTO_ORIGIN: (i64, i64) = (140, 50);

const NAME_ORIGIN: (i32, i32) = (90, 860);
const NAME_MAX_WIDTH: u32 = 900;
const NAME_SIZE: f32 = 50.0;
// Name size plus a 10px gap.
const NAME_LINE_HEIGHT: i32 = 60;
const ID_SIZE: f32 = 30.0;
const ID_RIGHT_EDGE: i32 = 1030;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const ACCENT: Rgb<u8> = Rgb([0xE6, 0x00, 0x23]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);
const MUTED: Rgb<u8> = Rgb([128, 128, 128]);

static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// The typeface used on every card.
#[derive(Clone)]
pub struct CardFont {
    font: FontArc,
    source: String,
}

impl fmt::Debug for CardFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardFont").field("source", &self.source).finish()
    }
}

impl CardFont {
    /// DejaVu Sans Bold, shipped with the crate. It has no Hangul glyphs.
    pub fn bundled() -> Result<Self> {
        let font = FontArc::try_from_slice(BUNDLED_FONT)
            .map_err(|e| DealflowError::Render(format!("bundled font: {e}")))?;
        Ok(Self {
            font,
            source: "bundled DejaVu Sans Bold".to_string(),
        })
    }

    /// Reads a TrueType/OpenType file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| DealflowError::Render(format!("{}: {e}", path.display())))?;
        Ok(Self {
            font,
            source: path.display().to_string(),
        })
    }

    /// The configured font when it loads, otherwise the bundled one.
    pub fn load_or_bundled(path: &Path) -> Result<Self> {
        match Self::from_file(path) {
            Ok(font) => Ok(font),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Card font unavailable, using the bundled font (Korean text will not render)"
                );
                Self::bundled()
            }
        }
    }

    /// Where the glyphs come from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    fn width(&self, size: f32, text: &str) -> u32 {
        text_size(PxScale::from(size), &self.font, text).0
    }

    fn draw(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: f32, text: &str) {
        draw_text_mut(canvas, color, x, y, PxScale::from(size), &self.font, text);
    }
}

/// Greedy word wrap: a word moves to the next line once the line would be
/// wider than `max_width`. A single over-long word keeps a line to itself.
fn wrap_words(text: &str, max_width: u32, measure: impl Fn(&str) -> u32) -> Vec<String> {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut current = first.to_string();
    for word in words {
        let candidate = format!("{current} {word}");
        if measure(&candidate) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    lines.push(current);
    lines
}

fn blank_canvas() -> RgbImage {
    RgbImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, BACKGROUND)
}

/// "1월 15일", without leading zeros.
fn short_date(date: &DayKey) -> String {
    match date.to_date() {
        Some(day) => format!("{}월 {}일", day.month(), day.day()),
        None => date.to_string(),
    }
}

/// Cover card: the day and how many picks the carousel holds.
#[must_use]
pub fn compose_cover(font: &CardFont, date: &DayKey, picks: usize) -> RgbImage {
    let mut canvas = blank_canvas();
    font.draw(&mut canvas, INK, 100, 300, 60.0, "오늘 단 하루!");
    font.draw(&mut canvas, INK, 100, 400, 100.0, "쿠팡 골드박스");
    font.draw(
        &mut canvas,
        ACCENT,
        100,
        520,
        100.0,
        &format!("{} 베스트 {picks}", short_date(date)),
    );
    font.draw(&mut canvas, MUTED, 100, 700, 60.0, "▶ 옆으로 넘겨서 확인하세요");
    canvas
}

/// Product card: photo, rank, wrapped name, price and the item number.
#[must_use]
pub fn compose_product_card(font: &CardFont, photo: &DynamicImage, item: &Item) -> RgbImage {
    let mut canvas = blank_canvas();
    let resized = photo
        .resize_exact(PHOTO_SIZE, PHOTO_SIZE, FilterType::Lanczos3)
        .to_rgb8();
    imageops::overlay(&mut canvas, &resized, PHOTO_ORIGIN.0, PHOTO_ORIGIN.1);

    font.draw(&mut canvas, ACCENT, 50, 40, 120.0, &item.rank.to_string());

    let (x, mut y) = NAME_ORIGIN;
    for line in wrap_words(&item.name, NAME_MAX_WIDTH, |t| font.width(NAME_SIZE, t)) {
        font.draw(&mut canvas, INK, x, y, NAME_SIZE, &line);
        y += NAME_LINE_HEIGHT;
    }
    font.draw(&mut canvas, ACCENT, x, y + 15, 70.0, &format_won(item.price));

    let id_text = format!("No. {}", item.id);
    let id_width = i32::try_from(font.width(ID_SIZE, &id_text)).unwrap_or(0);
    font.draw(&mut canvas, MUTED, ID_RIGHT_EDGE - id_width, 1020, ID_SIZE, &id_text);
    canvas
}

/// Closing card pointing readers at the profile link.
#[must_use]
pub fn compose_end_card(font: &CardFont) -> RgbImage {
    let mut canvas = blank_canvas();
    font.draw(&mut canvas, INK, 100, 400, 80.0, "구매 링크는");
    font.draw(&mut canvas, ACCENT, 100, 500, 80.0, "프로필 상단 클릭!");
    font.draw(&mut canvas, MUTED, 100, 650, 50.0, "매일 아침 8시 업데이트");
    canvas
}

fn save_jpeg(canvas: &RgbImage, path: &Path) -> Result<u64> {
    canvas
        .save_with_format(path, ImageFormat::Jpeg)
        .map_err(|e| DealflowError::Render(format!("{}: {e}", path.display())))?;
    Ok(std::fs::metadata(path)?.len())
}

/// Renders cards to `images/{date}/`, fetching product photos over HTTP.
#[derive(Debug, Clone)]
pub struct CardRenderer {
    client: reqwest::Client,
    images_dir: PathBuf,
    font: CardFont,
    carousel_size: usize,
}

impl CardRenderer {
    /// Creates a renderer writing under `images_dir` with `font`.
    #[must_use]
    pub fn new(client: reqwest::Client, images_dir: impl Into<PathBuf>, font: CardFont) -> Self {
        Self {
            client,
            images_dir: images_dir.into(),
            font,
            carousel_size: 8,
        }
    }

    /// Product cards the carousel will show; the cover advertises this many.
    #[must_use]
    pub fn with_carousel_size(mut self, size: usize) -> Self {
        self.carousel_size = size;
        self
    }

    async fn fetch_photo(&self, url: &str) -> Result<DynamicImage> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        image::load_from_memory(&bytes)
            .map_err(|e| DealflowError::Render(format!("cannot decode {url}: {e}")))
    }

    async fn render_item(&self, item: &Item, dir: &Path) -> Result<(String, u64)> {
        let photo = self.fetch_photo(&item.image_url).await?;
        let name = item_file_name(item.rank);
        let card = compose_product_card(&self.font, &photo, item);
        let bytes = save_jpeg(&card, &dir.join(&name))?;
        debug!(rank = item.rank, bytes, "Product card written");
        Ok((name, bytes))
    }
}

#[async_trait]
impl Renderer for CardRenderer {
    async fn render(&self, items: &[Item]) -> Result<RenderSummary> {
        let first = items.first().ok_or(DealflowError::EmptyInput)?;
        let date = DayKey::parse(first.date.clone())?;
        let dir = day_dir(&self.images_dir, date.as_str());
        std::fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), items = items.len(), font = self.font.source(), "Rendering cards");

        let mut summary = RenderSummary {
            dir: dir.clone(),
            ..Default::default()
        };

        let picks = items.len().min(self.carousel_size);
        summary.bytes += save_jpeg(&compose_cover(&self.font, &date, picks), &dir.join(COVER_FILE))?;
        summary.files.push(COVER_FILE.to_string());

        for item in items {
            match self.render_item(item, &dir).await {
                Ok((name, bytes)) => {
                    summary.bytes += bytes;
                    summary.files.push(name);
                }
                Err(e) => {
                    warn!(rank = item.rank, error = %e, "Skipping product card");
                    summary.skipped.push(item.rank);
                }
            }
        }

        summary.bytes += save_jpeg(&compose_end_card(&self.font), &dir.join(END_FILE))?;
        summary.files.push(END_FILE.to_string());

        #[allow(clippy::cast_precision_loss)]
        let megabytes = summary.bytes as f64 / (1024.0 * 1024.0);
        info!(
            cards = summary.count(),
            skipped = summary.skipped.len(),
            megabytes = format!("{megabytes:.2}"),
            "Cards rendered"
        );
        Ok(summary)
    }
}
