//! Carousel caption text.

use crate::core::{DayKey, Item};
use crate::utils::format_won;

const HASHTAGS: &str = "#쿠팡 #골드박스 #특가 #할인 #쇼핑 #살림템 #자취템 #육아템";

/// Builds the caption: heading, one block per item, hashtag footer.
#[must_use]
pub fn build_caption(date: &DayKey, items: &[Item]) -> String {
    let (month, day) = date.month_day();
    let mut caption = format!("🔥 {month}월 {day}일 골드박스 BEST {} 🔥\n\n", items.len());
    caption.push_str("오늘 단 하루 특가! 놓치면 손해인 상품들을 모았습니다.\n");
    caption.push_str("👉 구매 링크는 프로필 상단 링크 클릭!\n");
    caption.push_str("👉 상품 번호로 검색하면 더 빠르게 찾을 수 있어요.\n\n");

    for item in items {
        caption.push_str(&format!("[{}위] {}\n", item.rank, item.name));
        caption.push_str(&format!("💰 {} (No.{})\n\n", format_won(item.price), item.id));
    }

    caption.push_str(".\n.\n");
    caption.push_str(HASHTAGS);
    caption
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::items_for_day;

    #[test]
    fn test_caption_lists_every_item() {
        let day = DayKey::parse("20250115").unwrap();
        let mut items = items_for_day("20250115", 2);
        items[1].price = 1_234_000;

        let caption = build_caption(&day, &items);

        assert!(caption.starts_with("🔥 01월 15일 골드박스 BEST 2 🔥"));
        assert!(caption.contains("[1위] "));
        assert!(caption.contains("💰 1,234,000원 (No.20250115-02)"));
        assert!(caption.ends_with(HASHTAGS));
    }
}
