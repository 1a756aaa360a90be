// src/recording/buffer.rs
//! Per-category record buffer
//!
//! Records are appended in arrival order inside their category bucket.
//! Ordering across categories is not kept. The buffer itself is unbounded;
//! the controller's count threshold keeps it small.

use crate::recording::occurrence::CategoryKey;
use crate::recording::record::Record;
use std::collections::BTreeMap;

/// Records grouped by category key
pub type RecordGroups = BTreeMap<CategoryKey, Vec<Record>>;

/// Buffer owned by one session between flushes
#[derive(Debug, Default)]
pub struct RecordBuffer {
    groups: RecordGroups,
    count: usize,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to its category bucket
    pub fn push(&mut self, record: Record, key: CategoryKey) {
        self.groups.entry(key).or_default().push(record);
        self.count += 1;
    }

    /// Records buffered across all categories
    pub fn total_count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn groups(&self) -> &RecordGroups {
        &self.groups
    }

    /// Drop every bucket and zero the count
    pub fn reset(&mut self) {
        self.groups.clear();
        self.count = 0;
    }

    /// Move the buffered groups out, leaving the buffer reset
    pub fn take(&mut self) -> RecordGroups {
        self.count = 0;
        std::mem::take(&mut self.groups)
    }
}
