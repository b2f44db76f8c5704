//! Confidence-merging tuple store
//!
//! Keeps one entry per [`TupleKey`] holding the highest confidence seen for
//! it. Entries are never removed, and ranking is stable with respect to
//! discovery order.

use std::collections::HashMap;

use serde::Serialize;
use snowball_core::{ExtractedTuple, TupleKey};

/// What an insert did to the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MergeOutcome {
    /// First time this key was seen
    Inserted,
    /// Key existed with a lower confidence, which was raised
    Raised { previous: f32 },
    /// Key existed with an equal or higher confidence
    Unchanged,
}

impl MergeOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// A stored key with its confidence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTuple {
    pub key: TupleKey,
    pub confidence: f32,
}

/// Deduplicated ledger of extracted tuples
#[derive(Debug, Clone, Default)]
pub struct TupleStore {
    /// Entries in discovery order
    entries: Vec<(TupleKey, f32)>,
    /// Key -> position in `entries`
    index: HashMap<TupleKey, usize>,
}

impl TupleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a tuple, keeping the maximum confidence for its key
    pub fn insert(&mut self, tuple: ExtractedTuple) -> MergeOutcome {
        let key = tuple.key();

        if let Some(&position) = self.index.get(&key) {
            let stored = &mut self.entries[position].1;
            if tuple.confidence > *stored {
                let previous = *stored;
                *stored = tuple.confidence;
                return MergeOutcome::Raised { previous };
            }
            return MergeOutcome::Unchanged;
        }

        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, tuple.confidence));
        MergeOutcome::Inserted
    }

    /// Stored confidence for a key
    pub fn confidence(&self, key: &TupleKey) -> Option<f32> {
        self.index.get(key).map(|&position| self.entries[position].1)
    }

    pub fn contains(&self, key: &TupleKey) -> bool {
        self.index.contains_key(key)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All keys by confidence, highest first; ties keep discovery order
    pub fn ranked(&self) -> Vec<RankedTuple> {
        let mut ranked: Vec<RankedTuple> = self
            .entries
            .iter()
            .map(|(key, confidence)| RankedTuple {
                key: key.clone(),
                confidence: *confidence,
            })
            .collect();

        // sort_by is stable
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked
    }

    /// Highest-confidence key accepted by `filter`
    pub fn best_where(&self, mut filter: impl FnMut(&TupleKey) -> bool) -> Option<RankedTuple> {
        self.ranked().into_iter().find(|t| filter(&t.key))
    }
}
