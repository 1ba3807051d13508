// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache-line padding for hot atomics.
//!
//! Counters written from many threads (ID sequence words, stats counters)
//! are wrapped so that two of them never share a cache line. Purely a
//! performance concern: correctness does not depend on the alignment.

use std::ops::Deref;

/// Assumed cache line size. 64 bytes covers x86_64 and most aarch64 cores.
pub const CACHE_LINE_SIZE: usize = 64;

/// Aligns and pads `T` to a full cache line.
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn padded_atomic_is_line_aligned() {
        assert_eq!(std::mem::align_of::<CachePadded<AtomicU64>>(), CACHE_LINE_SIZE);
        assert_eq!(std::mem::size_of::<CachePadded<AtomicU64>>(), CACHE_LINE_SIZE);
    }

    #[test]
    fn deref_reaches_inner_value() {
        let counter = CachePadded::new(AtomicU64::new(7));
        counter.fetch_add(1, Ordering::Relaxed);
        assert_eq!(counter.into_inner().into_inner(), 8);
    }
}
