//! Insertion-ordered frequency counting
//!
//! Keys are reported in the order they were first seen. The most-frequent
//! selection depends on that order for its default tie-break, so a plain
//! `HashMap` is not enough here.

use crate::config::TieBreak;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// One `(key, count)` bar of a histogram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramEntry<K> {
    pub key: K,
    pub count: u32,
}

/// Ordered `(key, count)` pairs, first-seen order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Histogram<K> {
    entries: Vec<HistogramEntry<K>>,
}

impl<K> Default for Histogram<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K> Histogram<K> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistogramEntry<K>> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|e| &e.key)
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.count)).sum()
    }

    /// Count for a key, if present
    pub fn get(&self, key: &K) -> Option<u32>
    where
        K: PartialEq,
    {
        self.entries.iter().find(|e| &e.key == key).map(|e| e.count)
    }

    /// Entry with the highest count, `None` for an empty histogram.
    ///
    /// `FirstSeen` keeps the earliest key among equal counts (strict `>`
    /// fold). `Lexicographic` keeps the smallest key among equal counts.
    pub fn most_frequent(&self, tie_break: TieBreak) -> Option<&HistogramEntry<K>>
    where
        K: Ord,
    {
        let mut entries = self.entries.iter();
        let first = entries.next()?;

        Some(entries.fold(first, |best, candidate| {
            let wins = match tie_break {
                TieBreak::FirstSeen => candidate.count > best.count,
                TieBreak::Lexicographic => {
                    candidate.count > best.count
                        || (candidate.count == best.count && candidate.key < best.key)
                }
            };
            if wins {
                candidate
            } else {
                best
            }
        }))
    }
}

impl<'a, K> IntoIterator for &'a Histogram<K> {
    type Item = &'a HistogramEntry<K>;
    type IntoIter = std::slice::Iter<'a, HistogramEntry<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Builder that counts keys while remembering first-seen order
#[derive(Debug)]
pub struct FrequencyCounter<K> {
    index: HashMap<K, usize>,
    entries: Vec<HistogramEntry<K>>,
}

impl<K> Default for FrequencyCounter<K> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> FrequencyCounter<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `key` and return its first-seen position
    pub fn increment(&mut self, key: K) -> usize {
        if let Some(&idx) = self.index.get(&key) {
            self.entries[idx].count += 1;
            return idx;
        }

        let idx = self.entries.len();
        self.index.insert(key.clone(), idx);
        self.entries.push(HistogramEntry { key, count: 1 });
        idx
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self) -> Histogram<K> {
        Histogram {
            entries: self.entries,
        }
    }
}
