//! Merge-by-day upsert.

use crate::core::Item;
use crate::errors::{DealflowError, Result};

/// Returns the single date shared by a batch.
///
/// Fails with [`DealflowError::EmptyInput`] for an empty batch and
/// [`DealflowError::MixedDates`] when items disagree on the date.
pub fn batch_day(new_items: &[Item]) -> Result<&str> {
    let first = new_items.first().ok_or(DealflowError::EmptyInput)?;
    if let Some(other) = new_items.iter().find(|item| item.date != first.date) {
        return Err(DealflowError::MixedDates {
            expected: first.date.clone(),
            found: other.date.clone(),
        });
    }
    Ok(&first.date)
}

/// Replaces the batch's day in `existing` and puts the batch first.
///
/// Entries for other days keep their relative order. Running the merge twice
/// with the same batch gives the same catalog as running it once.
///
/// A later batch for the same day that is shorter drops the ranks it no
/// longer carries. Nothing is kept from the earlier run of that day.
pub fn merge_by_day(existing: Vec<Item>, new_items: &[Item]) -> Result<Vec<Item>> {
    let day = batch_day(new_items)?;

    let mut merged = Vec::with_capacity(existing.len() + new_items.len());
    merged.extend_from_slice(new_items);
    merged.extend(existing.into_iter().filter(|item| item.date != day));
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::items_for_day;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_into_empty() {
        let batch = items_for_day("20250115", 3);
        let merged = merge_by_day(Vec::new(), &batch).unwrap();
        assert_eq!(merged, batch);
    }

    #[test]
    fn test_new_day_goes_first() {
        let older = items_for_day("20250114", 2);
        let batch = items_for_day("20250115", 2);

        let merged = merge_by_day(older.clone(), &batch).unwrap();
        let dates: Vec<&str> = merged.iter().map(|i| i.date.as_str()).collect();
        assert_eq!(dates, ["20250115", "20250115", "20250114", "20250114"]);
        assert_eq!(&merged[2..], older.as_slice());
    }

    #[test]
    fn test_same_day_is_replaced_not_appended() {
        let first_run = items_for_day("20250115", 10);
        let second_run = items_for_day("20250115", 8);

        let once = merge_by_day(Vec::new(), &first_run).unwrap();
        let twice = merge_by_day(once, &second_run).unwrap();

        assert_eq!(twice.len(), 8);
        assert_eq!(twice, second_run);
    }

    #[test]
    fn test_idempotent() {
        let mut existing = items_for_day("20250113", 2);
        existing.extend(items_for_day("20250112", 3));
        let batch = items_for_day("20250115", 4);

        let once = merge_by_day(existing.clone(), &batch).unwrap();
        let twice = merge_by_day(once.clone(), &batch).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_untouched_days_keep_relative_order() {
        // Stored order is not date order; the merge must not sort it.
        let mut existing = items_for_day("20250110", 1);
        existing.extend(items_for_day("20250115", 2));
        existing.extend(items_for_day("20250112", 1));
        let batch = items_for_day("20250115", 1);

        let merged = merge_by_day(existing, &batch).unwrap();
        let dates: Vec<&str> = merged.iter().map(|i| i.date.as_str()).collect();
        assert_eq!(dates, ["20250115", "20250110", "20250112"]);
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let err = merge_by_day(items_for_day("20250114", 1), &[]).unwrap_err();
        assert!(matches!(err, DealflowError::EmptyInput));
    }

    #[test]
    fn test_mixed_dates_are_rejected() {
        let mut batch = items_for_day("20250115", 1);
        batch.extend(items_for_day("20250116", 1));

        let err = batch_day(&batch).unwrap_err();
        assert!(matches!(err, DealflowError::MixedDates { .. }));
    }
}
