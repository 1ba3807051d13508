// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation abstractions

use crate::cache::CachePadded;
use crate::clock::{Clock, SystemClock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Trait for truncating identifiers to a short prefix.
pub trait ShortId {
    /// Returns a string slice truncated to at most `n` characters.
    fn short(&self, n: usize) -> &str;
}

impl ShortId for str {
    fn short(&self, n: usize) -> &str {
        match self.char_indices().nth(n) {
            Some((end, _)) => &self[..end],
            None => self,
        }
    }
}

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `is_empty()`, `short()`, `Display`,
/// `From<String>`, `From<&str>`, `From<u64>`, `PartialEq<str>` and
/// `Borrow<str>` implementations.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct MyId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Returns a string slice truncated to at most `n` characters.
            pub fn short(&self, n: usize) -> &str {
                $crate::id::ShortId::short(self.0.as_str(), n)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                Self(n.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Generates unique numeric identifiers.
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next(&self) -> u64;
}

/// 2024-01-01T00:00:00Z; keeps 41 timestamp bits good until ~2093.
pub const SNOWFLAKE_EPOCH_MS: u64 = 1_704_067_200_000;

const SEQUENCE_BITS: u32 = 12;
const NODE_BITS: u32 = 10;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + NODE_BITS;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const NODE_MASK: u64 = (1 << NODE_BITS) - 1;

/// Snowflake-style generator: `timestamp(41) | node(10) | sequence(12)`.
///
/// Lock-free. When the sequence for a millisecond is exhausted, or the clock
/// steps backwards, the generator borrows the next millisecond instead of
/// waiting, so IDs stay strictly increasing per generator.
#[derive(Clone)]
pub struct SnowflakeIdGen<C: Clock = SystemClock> {
    clock: C,
    node: u64,
    last: Arc<CachePadded<AtomicU64>>,
}

impl SnowflakeIdGen<SystemClock> {
    pub fn new(node: u16) -> Self {
        Self::with_clock(node, SystemClock)
    }
}

impl<C: Clock> SnowflakeIdGen<C> {
    /// `node` is truncated to its low 10 bits.
    pub fn with_clock(node: u16, clock: C) -> Self {
        Self {
            clock,
            node: u64::from(node) & NODE_MASK,
            last: Arc::new(CachePadded::new(AtomicU64::new(0))),
        }
    }

    /// Split an ID back into `(epoch_ms, node, sequence)`.
    pub fn decompose(id: u64) -> (u64, u64, u64) {
        (
            (id >> TIMESTAMP_SHIFT) + SNOWFLAKE_EPOCH_MS,
            (id >> SEQUENCE_BITS) & NODE_MASK,
            id & SEQUENCE_MASK,
        )
    }
}

impl<C: Clock> IdGen for SnowflakeIdGen<C> {
    fn next(&self) -> u64 {
        let now = self.clock.epoch_ms().saturating_sub(SNOWFLAKE_EPOCH_MS);
        let fresh = |ts: u64| (ts << TIMESTAMP_SHIFT) | (self.node << SEQUENCE_BITS);

        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let last_ts = last >> TIMESTAMP_SHIFT;
            let candidate = if last == 0 || now > last_ts {
                fresh(now)
            } else if last & SEQUENCE_MASK == SEQUENCE_MASK {
                fresh(last_ts + 1)
            } else {
                last + 1
            };
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Sequential ID generator for testing
#[derive(Clone)]
pub struct SequentialIdGen {
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn starting_at(first: u64) -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(first)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
