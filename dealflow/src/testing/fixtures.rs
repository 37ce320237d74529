//! Item fixtures.

use crate::core::Item;

/// One item for `date` at `rank`, with predictable field values.
#[must_use]
pub fn item(date: &str, rank: u32) -> Item {
    Item {
        id: format!("{date}-{rank:02}"),
        date: date.to_string(),
        rank,
        name: format!("Product {rank}"),
        price: 10_000 + u64::from(rank) * 1_000,
        image_url: format!("https://img.example/{date}/{rank}.jpg"),
        link: format!("https://link.example/{date}/{rank}"),
    }
}

/// `count` items for `date`, ranked `1..=count` in order.
#[must_use]
pub fn items_for_day(date: &str, count: usize) -> Vec<Item> {
    (1..=count)
        .map(|rank| item(date, u32::try_from(rank).unwrap_or(u32::MAX)))
        .collect()
}
