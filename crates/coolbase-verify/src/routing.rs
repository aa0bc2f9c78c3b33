//! Partition routing: which key ranges exist for a table.
//!
//! Ranges partition the 128-bit key space. A cheque naming a range start
//! that no partition begins at is implausible on its face and refused
//! before any storage work happens.

use std::collections::{HashMap, HashSet};

use coolbase_core::EntryKey;

/// Answers range-plausibility questions for the verifier.
pub trait Routing: Send + Sync {
    /// True if a partition of the table starts at `range`.
    fn serves_range(&self, tablespace: &str, table: &str, range: &EntryKey) -> bool;
}

/// An in-memory routing table, keyed by `(tablespace, table)`.
#[derive(Debug, Clone, Default)]
pub struct StaticRouting {
    ranges: HashMap<(String, String), HashSet<EntryKey>>,
}

impl StaticRouting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the partition starts for a table.
    pub fn table(
        mut self,
        tablespace: impl Into<String>,
        table: impl Into<String>,
        starts: impl IntoIterator<Item = EntryKey>,
    ) -> Self {
        self.ranges.insert(
            (tablespace.into(), table.into()),
            starts.into_iter().collect(),
        );
        self
    }
}

impl Routing for StaticRouting {
    fn serves_range(&self, tablespace: &str, table: &str, range: &EntryKey) -> bool {
        self.ranges
            .get(&(tablespace.to_string(), table.to_string()))
            .is_some_and(|starts| starts.contains(range))
    }
}
