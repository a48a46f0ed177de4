//! Read-only snapshot of engine state for progress reporting.

use crate::admission::AdmissionMetrics;
use crate::content::ContentMetrics;
use crate::node::{NodeCounts, StoreMetrics};
use crate::schedule::QueueKind;
use serde::{Deserialize, Serialize};

/// Limits currently in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentLimits {
    /// Equations up to this total length are inserted.
    pub visible: usize,
    /// Overlaps up to this length are expanded; longer ones are deferred.
    pub expand: usize,
    /// Overlap consequences longer than this are discardable.
    pub discard: usize,
    /// Completed rounds of the current and earlier passes.
    pub rounds: usize,
}

/// Equation counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquationCounts {
    /// Linked equations in the trie.
    pub live: usize,
    pub pending: usize,
    pub expanded: usize,
    /// Equations whose overlaps exceeded the expand limit.
    pub deferred: usize,
    /// Critical pairs whose consequence exceeded the discard limit.
    pub discarded: usize,
    pub pooled: usize,
}

/// Snapshot returned by [`CompletionEngine::stats`](crate::engine::CompletionEngine::stats).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub nodes: NodeCounts,
    pub equations: EquationCounts,
    pub limits: CurrentLimits,
    /// Non-empty queues, highest priority first.
    pub queues: Vec<(QueueKind, usize)>,
    /// Irreducible words of each length, from 0.
    pub irreducible_by_length: Vec<u64>,
    pub admission: AdmissionMetrics,
    pub store: StoreMetrics,
    pub pool: ContentMetrics,
    /// Jobs run so far.
    pub steps: u64,
}

impl Stats {
    /// Irreducible words of length at most `n`.
    ///
    /// For a confluent system of a finite monoid and `n` at least the
    /// longest normal form, this is the order of the monoid.
    pub fn irreducible_up_to(&self, n: usize) -> u64 {
        self.irreducible_by_length.iter().take(n + 1).sum()
    }

    /// Total queued jobs.
    pub fn queued(&self) -> usize {
        self.queues.iter().map(|(_, n)| n).sum()
    }

    /// Serialize to CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        Ok(serde_cbor::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn census_sums_are_prefix_sums() {
        let stats = Stats {
            nodes: NodeCounts::default(),
            equations: EquationCounts::default(),
            limits: CurrentLimits {
                visible: 12,
                expand: 20,
                discard: 28,
                rounds: 0,
            },
            queues: vec![(QueueKind::Overlap, 3), (QueueKind::RemoveDead, 1)],
            irreducible_by_length: vec![1, 2, 3, 0, 0],
            admission: AdmissionMetrics::default(),
            store: StoreMetrics::default(),
            pool: ContentMetrics::default(),
            steps: 0,
        };
        assert_eq!(stats.irreducible_up_to(0), 1);
        assert_eq!(stats.irreducible_up_to(3), 6);
        assert_eq!(stats.irreducible_up_to(100), 6);
        assert_eq!(stats.queued(), 4);
        assert!(!stats.to_cbor().unwrap().is_empty());
    }
}
