//! Deferred-work scheduler.
//!
//! A fixed set of FIFO queues, each with a static priority. Work is always
//! taken from the highest-priority non-empty queue, one item at a time, so
//! anything scheduled while an item runs is considered before the rest of
//! the queue that item came from.
//!
//! # Invariants
//! - The watermark is the kind of the highest-priority non-empty queue, or
//!   `None` when every queue is empty.
//! - Within one queue items run in scheduling order.
//!
//! # Determinism
//! No hashing or clocks are involved: equal scheduling sequences give equal
//! execution sequences.

mod job;

pub use job::Job;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// The queues, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueueKind {
    UrgentDeduction,
    PreCorrection,
    Dubious,
    TotalOverlap,
    Correction,
    PartialReduction,
    RemoveDead,
    Deduction,
    InverseCheck,
    DifferenceCorrection,
    DifferenceDiscovery,
    Overlap,
    Conjugation,
    PoolReexamination,
    PartialRecheck,
}

impl QueueKind {
    /// Every queue, highest priority first.
    pub const ALL: [QueueKind; 15] = [
        QueueKind::UrgentDeduction,
        QueueKind::PreCorrection,
        QueueKind::Dubious,
        QueueKind::TotalOverlap,
        QueueKind::Correction,
        QueueKind::PartialReduction,
        QueueKind::RemoveDead,
        QueueKind::Deduction,
        QueueKind::InverseCheck,
        QueueKind::DifferenceCorrection,
        QueueKind::DifferenceDiscovery,
        QueueKind::Overlap,
        QueueKind::Conjugation,
        QueueKind::PoolReexamination,
        QueueKind::PartialRecheck,
    ];

    /// Position in [`QueueKind::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Priority; higher runs first.
    #[inline]
    pub const fn priority(self) -> u8 {
        (Self::ALL.len() - self.index()) as u8
    }

    /// The lowest-priority queue; a floor of this admits every queue.
    pub const LOWEST: QueueKind = QueueKind::PartialRecheck;
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Per-queue counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerMetrics {
    pub scheduled: BTreeMap<QueueKind, u64>,
    pub executed: BTreeMap<QueueKind, u64>,
    /// Largest total number of queued items seen.
    pub peak_pending: usize,
}

impl SchedulerMetrics {
    pub fn record_scheduled(&mut self, kind: QueueKind, pending: usize) {
        *self.scheduled.entry(kind).or_insert(0) += 1;
        self.peak_pending = self.peak_pending.max(pending);
    }

    pub fn record_executed(&mut self, kind: QueueKind) {
        *self.executed.entry(kind).or_insert(0) += 1;
    }

    pub fn executed_total(&self) -> u64 {
        self.executed.values().sum()
    }

    pub fn reset(&mut self) {
        *self = SchedulerMetrics::default();
    }
}

/// Priority-ordered FIFO queues.
#[derive(Debug, Clone)]
pub struct Scheduler<J> {
    queues: Vec<VecDeque<J>>,
    watermark: Option<QueueKind>,
    pending: usize,
    metrics: SchedulerMetrics,
}

impl<J> Default for Scheduler<J> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J> Scheduler<J> {
    pub fn new() -> Self {
        Self {
            queues: QueueKind::ALL.iter().map(|_| VecDeque::new()).collect(),
            watermark: None,
            pending: 0,
            metrics: SchedulerMetrics::default(),
        }
    }

    /// Appends `job` to `kind`, raising the watermark if needed.
    pub fn schedule(&mut self, kind: QueueKind, job: J) {
        self.queues[kind.index()].push_back(job);
        self.pending += 1;
        if self.watermark.map_or(true, |w| kind < w) {
            self.watermark = Some(kind);
        }
        self.metrics.record_scheduled(kind, self.pending);
    }

    /// Highest-priority non-empty queue.
    #[inline]
    pub fn watermark(&self) -> Option<QueueKind> {
        self.watermark
    }

    /// `true` if some queue at or above `floor` has work.
    pub fn work_pending(&self, floor: QueueKind) -> bool {
        self.watermark.map_or(false, |w| w <= floor)
    }

    /// Takes the next item from the highest-priority queue at or above `floor`.
    pub fn pop(&mut self, floor: QueueKind) -> Option<(QueueKind, J)> {
        let kind = self.watermark.filter(|&w| w <= floor)?;
        let job = self.queues[kind.index()].pop_front()?;
        self.pending -= 1;
        if self.queues[kind.index()].is_empty() {
            self.watermark = QueueKind::ALL[kind.index()..]
                .iter()
                .copied()
                .find(|k| !self.queues[k.index()].is_empty());
        }
        self.metrics.record_executed(kind);
        Some((kind, job))
    }

    /// Total queued items.
    #[inline]
    pub fn len(&self) -> usize {
        self.pending
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// Items queued on `kind`.
    pub fn queue_len(&self, kind: QueueKind) -> usize {
        self.queues[kind.index()].len()
    }

    /// Queue lengths, highest priority first.
    pub fn queue_lengths(&self) -> Vec<(QueueKind, usize)> {
        QueueKind::ALL
            .iter()
            .map(|&k| (k, self.queues[k.index()].len()))
            .collect()
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_follow_declaration_order() {
        assert_eq!(QueueKind::UrgentDeduction.priority(), 15);
        assert_eq!(QueueKind::PartialRecheck.priority(), 1);
        for pair in QueueKind::ALL.windows(2) {
            assert!(pair[0].priority() > pair[1].priority());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn higher_priority_runs_first_in_either_order() {
        for flip in [false, true] {
            let mut s: Scheduler<&str> = Scheduler::new();
            let items = [(QueueKind::Overlap, "overlap"), (QueueKind::Correction, "correction")];
            let order: Vec<_> = if flip { items.iter().rev().collect() } else { items.iter().collect() };
            for &(k, j) in order {
                s.schedule(k, j);
            }
            let mut seen = Vec::new();
            while let Some((_, j)) = s.pop(QueueKind::LOWEST) {
                seen.push(j);
            }
            assert_eq!(seen, vec!["correction", "overlap"]);
        }
    }

    #[test]
    fn work_scheduled_during_a_step_preempts_the_queue() {
        let mut s: Scheduler<u32> = Scheduler::new();
        s.schedule(QueueKind::Overlap, 1);
        s.schedule(QueueKind::Overlap, 2);
        let mut seen = Vec::new();
        while let Some((kind, j)) = s.pop(QueueKind::LOWEST) {
            seen.push(j);
            if j == 1 && kind == QueueKind::Overlap {
                s.schedule(QueueKind::UrgentDeduction, 10);
            }
        }
        assert_eq!(seen, vec![1, 10, 2]);
    }

    #[test]
    fn floor_limits_draining() {
        let mut s: Scheduler<u32> = Scheduler::new();
        s.schedule(QueueKind::Conjugation, 1);
        s.schedule(QueueKind::Dubious, 2);
        assert!(s.work_pending(QueueKind::Correction));
        assert_eq!(s.pop(QueueKind::Correction), Some((QueueKind::Dubious, 2)));
        assert_eq!(s.pop(QueueKind::Correction), None);
        assert!(!s.work_pending(QueueKind::Correction));
        assert!(s.work_pending(QueueKind::LOWEST));
        assert_eq!(s.watermark(), Some(QueueKind::Conjugation));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn watermark_drops_to_next_non_empty_queue() {
        let mut s: Scheduler<u32> = Scheduler::new();
        s.schedule(QueueKind::PoolReexamination, 1);
        s.schedule(QueueKind::PreCorrection, 2);
        assert_eq!(s.watermark(), Some(QueueKind::PreCorrection));
        assert_eq!(s.pop(QueueKind::LOWEST), Some((QueueKind::PreCorrection, 2)));
        assert_eq!(s.watermark(), Some(QueueKind::PoolReexamination));
        s.pop(QueueKind::LOWEST);
        assert_eq!(s.watermark(), None);
        assert_eq!(s.pop(QueueKind::LOWEST), None);
        assert_eq!(s.metrics().executed_total(), 2);
    }
}
