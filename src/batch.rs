//! Fixed-size, order-preserving partitioning of the catalog into model batches.

use crate::error::{Result, UpsellError};
use std::ops::Deref;

/// A contiguous run of items with its position in the partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch<T> {
    index: usize,
    items: Vec<T>,
}

impl<T> Batch<T> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> Deref for Batch<T> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        &self.items
    }
}

/// Split `items` into batches of `size`; only the last batch may be shorter.
/// An empty input yields no batches. `size == 0` is a caller bug and is rejected.
pub fn partition<T: Clone>(items: &[T], size: usize) -> Result<Vec<Batch<T>>> {
    if size == 0 {
        return Err(UpsellError::InvalidBatchSize(size));
    }
    Ok(items
        .chunks(size)
        .enumerate()
        .map(|(index, chunk)| Batch { index, items: chunk.to_vec() })
        .collect())
}

/// Number of batches `partition` would produce.
#[inline]
pub fn batch_count(len: usize, size: usize) -> usize {
    if size == 0 { 0 } else { len.div_ceil(size) }
}
