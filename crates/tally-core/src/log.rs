//! Append-only operation log with timestamp deduplication

use crate::clock::VectorClock;
use crate::operation::Operation;
use std::collections::HashSet;

/// Ordered, append-only sequence of operations.
///
/// Entries are never reordered or mutated in place. Every appended `ts` is
/// remembered so duplicates arriving over independent gossip paths can be
/// discarded in constant time.
#[derive(Debug, Clone, Default)]
pub struct OperationLog {
    entries: Vec<Operation>,
    seen: HashSet<VectorClock>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `op` at the tail and record its timestamp.
    pub fn append(&mut self, op: Operation) {
        self.seen.insert(op.ts.clone());
        self.entries.push(op);
    }

    /// Append unless an operation with the same `ts` is already present.
    /// Returns whether the operation was added.
    pub fn append_if_new(&mut self, op: Operation) -> bool {
        if self.contains_ts(&op.ts) {
            return false;
        }
        self.append(op);
        true
    }

    pub fn contains_ts(&self, ts: &VectorClock) -> bool {
        self.seen.contains(ts)
    }

    /// Detached copy of the log, safe to hand out while the log keeps growing.
    pub fn snapshot(&self) -> Vec<Operation> {
        self.entries.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Operation> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
