//! Bounded chunking of value lists for generated SQL.

use std::num::NonZeroUsize;

use crate::error::{CompareError, Result};

/// Splits an ordered list into chunks of at most `limit` items.
///
/// Chunk boundaries depend only on the input length and the limit, so the same
/// input always yields the same statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPredicateBuilder {
    limit: NonZeroUsize,
}

impl BatchPredicateBuilder {
    pub fn new(limit: usize) -> Result<Self> {
        NonZeroUsize::new(limit)
            .map(|limit| Self { limit })
            .ok_or_else(|| CompareError::Config("max_sql_in_values must be greater than 0".into()))
    }

    pub fn limit(&self) -> usize {
        self.limit.get()
    }

    /// Lazily yield consecutive chunks in input order.
    pub fn chunks<'a, T>(&self, values: &'a [T]) -> std::slice::Chunks<'a, T> {
        values.chunks(self.limit.get())
    }

    /// Number of chunks `values.len()` items produce.
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.limit.get())
    }
}
