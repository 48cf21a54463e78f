#[path = "common/mod.rs"]
mod common;

use common::*;
use proptest::prelude::*;
use upsell::{batch_count, partition, summarize, UpsellError};

proptest! {
    /// Concatenating the batches gives back the input, every batch but the last is
    /// full, and indices count up from zero.
    #[test]
    fn partition_is_an_exact_ordered_split(items in proptest::collection::vec(any::<u16>(), 0..200), size in 1usize..17) {
        let batches = partition(&items, size).unwrap();
        let flat: Vec<u16> = batches.iter().flat_map(|b| b.items().iter().copied()).collect();
        prop_assert_eq!(&flat, &items);
        prop_assert_eq!(batches.len(), batch_count(items.len(), size));
        for (i, b) in batches.iter().enumerate() {
            prop_assert_eq!(b.index(), i);
            prop_assert!(!b.is_empty());
            if i + 1 < batches.len() {
                prop_assert_eq!(b.len(), size);
            }
        }
    }
}

/// 12 products with batch size 5 split into 5 + 5 + 2.
#[test]
fn twelve_items_make_three_batches() {
    let batches = partition(&products(12), 5).unwrap();
    let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![5, 5, 2]);
    assert_eq!(batches[2][0].child_id, "C10");
}

#[test]
fn empty_input_is_not_an_error() {
    let batches = partition::<u8>(&[], 5).unwrap();
    assert!(batches.is_empty());
}

#[test]
fn zero_batch_size_is_rejected() {
    let err = partition(&products(3), 0).unwrap_err();
    assert!(matches!(err, UpsellError::InvalidBatchSize(0)));
}

/// Children sharing a parent produce one summary line; order is first occurrence.
#[test]
fn summary_dedupes_in_first_occurrence_order() {
    let mut items = products(5);
    items.push(product(0));
    let s = summarize(&items);
    assert_eq!(
        s.as_str(),
        "P0: Parent product 0\nP1: Parent product 1\nP2: Parent product 2"
    );
    assert_eq!(s.line_count(), 3);
}

/// Dedup is on the formatted line: one parent with two titles keeps both lines.
#[test]
fn summary_keys_on_the_whole_line() {
    let mut a = product(0);
    let mut b = product(1);
    a.title = "Basin".into();
    b.title = "Basin (white)".into();
    let s = summarize(&[a, b]);
    assert_eq!(s.as_str(), "P0: Basin\nP0: Basin (white)");
}

#[test]
fn summary_is_deterministic() {
    let items = products(40);
    assert_eq!(summarize(&items), summarize(&items));
    assert_eq!(summarize(&[]).as_str(), "");
    assert_eq!(summarize(&[]).line_count(), 0);
}
