//! Static page regenerated from the full catalog.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! The page lists every stored day, newest first (catalog order), with one
//! card per item linking to its tracked URL.

use async_trait::async_trait;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::path::PathBuf;
use tracing::info;

use crate::core::{DayKey, Item};
use crate::errors::Result;
use crate::render::item_file_name;
use crate::utils::format_won;

/// Rebuilds site artifacts that depend on the catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SiteGenerator: Send + Sync {
    /// Regenerates the site from the full merged catalog.
    async fn regenerate(&self, catalog: &[Item]) -> Result<()>;
}

/// Groups items by date in first-appearance order.
#[must_use]
pub fn group_by_day(catalog: &[Item]) -> Vec<(&str, Vec<&Item>)> {
    let mut groups: Vec<(&str, Vec<&Item>)> = Vec::new();
    for item in catalog {
        match groups.iter_mut().find(|(day, _)| *day == item.date) {
            Some((_, items)) => items.push(item),
            None => groups.push((item.date.as_str(), vec![item])),
        }
    }
    groups
}

fn day_heading(date: &str) -> String {
    match DayKey::parse(date) {
        Ok(day) => {
            let (month, dom) = day.month_day();
            format!("{month}월 {dom}일 골드박스")
        }
        Err(_) => date.to_string(),
    }
}

fn item_card(item: &Item) -> Markup {
    html! {
        li.item id=(item.id) {
            a href=(item.link) target="_blank" rel="noopener sponsored" {
                img src=(format!("images/{}/{}", item.date, item_file_name(item.rank)))
                    alt=(item.name) loading="lazy";
                div.meta {
                    span.rank { (item.rank) "위" }
                    span.name { (item.name) }
                    span.price { (format_won(item.price)) }
                    span.id { "No." (item.id) }
                }
            }
        }
    }
}

/// Renders the whole page.
#[must_use]
pub fn render_page(catalog: &[Item]) -> Markup {
    html! {
        (DOCTYPE)
        html lang="ko" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "오늘의 골드박스" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                header { h1 { "오늘의 골드박스" } p { "상품 번호로 검색하면 더 빠르게 찾을 수 있어요." } }
                main {
                    @if catalog.is_empty() {
                        p.empty { "아직 등록된 상품이 없습니다." }
                    }
                    @for (date, items) in group_by_day(catalog) {
                        section.day id=(format!("d{date}")) {
                            h2 { (day_heading(date)) }
                            ul.items {
                                @for item in items { (item_card(item)) }
                            }
                        }
                    }
                }
            }
        }
    }
}

const STYLE: &str = "body{font-family:sans-serif;margin:0 auto;max-width:960px;padding:1rem}\
ul.items{list-style:none;padding:0;display:grid;grid-template-columns:repeat(auto-fill,minmax(200px,1fr));gap:1rem}\
li.item img{width:100%;height:auto}\
.meta{display:flex;flex-direction:column}\
.rank,.price{color:#E60023;font-weight:bold}\
.id{color:#888;font-size:.8rem}";

/// Writes `index.html` into the site directory.
#[derive(Debug, Clone)]
pub struct HtmlSiteGenerator {
    site_dir: PathBuf,
}

impl HtmlSiteGenerator {
    /// Creates a generator writing into `site_dir`.
    #[must_use]
    pub fn new(site_dir: impl Into<PathBuf>) -> Self {
        Self {
            site_dir: site_dir.into(),
        }
    }

    /// Path of the generated page.
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.site_dir.join("index.html")
    }
}

#[async_trait]
impl SiteGenerator for HtmlSiteGenerator {
    async fn regenerate(&self, catalog: &[Item]) -> Result<()> {
        std::fs::create_dir_all(&self.site_dir)?;
        let page = render_page(catalog).into_string();
        let path = self.index_path();
        std::fs::write(&path, page)?;
        info!(path = %path.display(), items = catalog.len(), "Site page regenerated");
        Ok(())
    }
}
