//! Vector clocks for causal tracking between replicas
//!
//! A [`VectorClock`] holds one counter per configured replica. Entries past
//! the end of the vector are implicit zeros, so clocks of different widths
//! compare, merge and hash as if they were padded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Fixed-width per-replica counter vector.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock(Vec<u64>);

impl VectorClock {
    /// Create an all-zero clock with one entry per replica.
    pub fn new(width: usize) -> Self {
        Self(vec![0; width])
    }

    /// Number of explicit entries.
    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// Counter for `index`, zero when the index is past the end.
    pub fn get(&self, index: usize) -> u64 {
        self.0.get(index).copied().unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }

    /// True iff every entry of `self` is >= the matching entry of `other`.
    pub fn dominates(&self, other: &VectorClock) -> bool {
        let width = self.width().max(other.width());
        (0..width).all(|i| self.get(i) >= other.get(i))
    }

    /// Pointwise maximum, extending `self` when `other` is wider.
    pub fn merge(&mut self, other: &VectorClock) {
        if other.width() > self.width() {
            self.0.resize(other.width(), 0);
        }
        for (entry, theirs) in self.0.iter_mut().zip(other.iter()) {
            *entry = (*entry).max(theirs);
        }
    }

    /// Raise a single entry to at least `value`.
    pub fn merge_entry(&mut self, index: usize, value: u64) {
        if index >= self.width() {
            self.0.resize(index + 1, 0);
        }
        self.0[index] = self.0[index].max(value);
    }

    /// Bump the owning replica's entry and return the new counter.
    pub fn increment(&mut self, index: usize) -> u64 {
        if index >= self.width() {
            self.0.resize(index + 1, 0);
        }
        self.0[index] = self.0[index].saturating_add(1);
        self.0[index]
    }

    // Entries up to the last non-zero one; the canonical form for Eq/Hash.
    fn significant(&self) -> &[u64] {
        let len = self
            .0
            .iter()
            .rposition(|&counter| counter != 0)
            .map_or(0, |pos| pos + 1);
        &self.0[..len]
    }
}

impl PartialEq for VectorClock {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for VectorClock {}

impl Hash for VectorClock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl From<Vec<u64>> for VectorClock {
    fn from(entries: Vec<u64>) -> Self {
        Self(entries)
    }
}

impl<const N: usize> From<[u64; N]> for VectorClock {
    fn from(entries: [u64; N]) -> Self {
        Self(entries.to_vec())
    }
}

impl From<VectorClock> for Vec<u64> {
    fn from(clock: VectorClock) -> Self {
        clock.0
    }
}

impl fmt::Debug for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}
