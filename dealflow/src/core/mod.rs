//! Core data types shared by every stage.

mod item;

pub use item::{DayKey, Item};
