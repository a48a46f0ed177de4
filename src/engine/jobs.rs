//! Admission execution and job handlers.
//!
//! Every handler re-validates the nodes it names before using them: a job
//! may run long after it was scheduled, and anything of higher priority may
//! have changed the trie in between.

use super::CompletionEngine;
use crate::admission::{AdmissionContext, AdmitHints, Decision, RejectReason};
use crate::arena::NodeId;
use crate::certificate::Validity;
use crate::content::EntryId;
use crate::node::EquationClass;
use crate::normalize::{NormalizeOptions, Provenance, WorkingEquation};
use crate::oracle::StoreReducer;
use crate::pool::PoolInsert;
use crate::schedule::{Job, QueueKind};
use crate::word::{invert_with, Generator, Word};
use tracing::{debug, trace};

impl CompletionEngine {
    // ----- scheduling -----

    /// Queues `job`, taking a reference on every node it names.
    pub(super) fn schedule(&mut self, kind: QueueKind, job: Job) {
        for id in job.nodes().into_iter().flatten() {
            self.store.attach(id);
        }
        self.scheduler.schedule(kind, job);
    }

    pub(super) fn perform(&mut self, kind: QueueKind, job: Job) {
        let held = job.nodes();
        match job {
            Job::Candidate {
                lhs,
                rhs,
                provenance,
                hints,
                essential,
            } => {
                self.submit(&lhs, &rhs, provenance, hints, essential);
            }
            Job::Correct { equation } => self.correct(equation, kind),
            Job::Dubious { equation } => self.resubmit_dubious(equation),
            Job::Overlap { first, second, offset } => self.critical_pair(first, second, offset as usize),
            Job::PartialReduction { equation } => self.partial_reduction(equation),
            Job::Reclaim => self.reclaim(),
            Job::Expand {
                equation,
                cursor,
                above,
            } => self.expand(equation, cursor, above),
            Job::InverseCheck { equation } => self.inverse_check(equation),
            Job::Retract { equation } => self.oracle_update(equation, false),
            Job::Discover { equation } => self.oracle_update(equation, true),
            Job::Conjugate { equation, rotation } => self.conjugate(equation, rotation),
            Job::PoolScan { cursor, remaining } => self.pool_scan(cursor, remaining),
            Job::Recheck { cursor } => self.recheck(cursor),
        }
        for id in held.into_iter().flatten() {
            self.store.detach(id);
        }
        self.queue_reclaim();
        self.steps += 1;
    }

    fn queue_reclaim(&mut self) {
        if !self.reclaim_queued && self.store.reclaim_pending() {
            self.reclaim_queued = true;
            self.schedule(QueueKind::RemoveDead, Job::Reclaim);
        }
    }

    // ----- admission -----

    pub(super) fn submit(
        &mut self,
        lhs: &[Generator],
        rhs: &[Generator],
        provenance: Provenance,
        hints: AdmitHints,
        essential: bool,
    ) -> Decision {
        let options = if hints.keep_lhs {
            NormalizeOptions::correction()
        } else if provenance == Provenance::Dubious {
            // Balancing may lean on the inverse pair this equation defines.
            NormalizeOptions {
                balance: false,
                ..NormalizeOptions::default()
            }
        } else {
            NormalizeOptions::default()
        };
        self.submit_with(lhs, rhs, provenance, hints, essential, options)
    }

    pub(super) fn submit_with(
        &mut self,
        lhs: &[Generator],
        rhs: &[Generator],
        provenance: Provenance,
        hints: AdmitHints,
        essential: bool,
        options: NormalizeOptions,
    ) -> Decision {
        let normalized = self.normalizer().normalize(lhs, rhs, provenance, options);
        let reducer = StoreReducer {
            store: &self.store,
            inverses: &self.inverses,
            max_len: self.config.max_word_length,
        };
        let ctx = AdmissionContext {
            store: &self.store,
            order: self.order.as_ref(),
            oracle: self.oracle.as_ref(),
            reducer: &reducer,
            coset_separator: self.alphabet.coset_separator(),
            limits: self.limits.admission(&self.config),
        };
        let decision = self.admission.decide(&normalized, &hints, &ctx);
        let WorkingEquation { lhs, rhs, provenance } = normalized.equation;
        debug!(
            lhs = %self.alphabet.format(&lhs),
            rhs = %self.alphabet.format(&rhs),
            ?provenance,
            ?decision,
            failed = normalized.failed,
            "admission"
        );
        match decision {
            Decision::Insert(_) => {
                self.insert_equation(&lhs, &rhs, hints);
            }
            Decision::ReplaceRhs { node } => self.replace_rhs(node, rhs),
            Decision::Superseded { node } => {
                if let Some(current) = self.store.equation(node).map(|eq| self.store.word(eq.rhs)) {
                    self.schedule(
                        QueueKind::UrgentDeduction,
                        Job::Candidate {
                            lhs: rhs,
                            rhs: current,
                            provenance: Provenance::RhsImprovement,
                            hints: AdmitHints::default(),
                            essential: true,
                        },
                    );
                }
            }
            Decision::Pool => self.pool_equation(lhs, rhs),
            Decision::Reject(_) => {}
            Decision::Retry(_) => self.schedule(
                QueueKind::UrgentDeduction,
                Job::Candidate {
                    lhs,
                    rhs,
                    provenance: Provenance::Retry,
                    hints: AdmitHints {
                        keep_lhs: false,
                        ..hints
                    },
                    essential,
                },
            ),
        }
        decision
    }

    /// Adds `lhs → rhs` to the trie. Both sides are irreducible.
    fn insert_equation(&mut self, lhs: &[Generator], rhs: &[Generator], hints: AdmitHints) -> NodeId {
        let last = lhs.len() - 1;
        let rhs_node = self.store.get_or_create(rhs);
        self.store.attach(rhs_node);
        let prefix = self.store.get_or_create(&lhs[..last]);
        self.store.attach(prefix);
        let trailing = self.store.get_or_create(&lhs[1..]);
        self.store.attach(trailing);
        // The right-hand side is smaller than `lhs` and so cannot contain it.
        let report = self.store.unlink_containing(lhs);
        let node = self
            .store
            .construct_equation(prefix, lhs[last], rhs_node, trailing, !hints.secondary, hints.axiom);
        self.store.detach(prefix);
        self.store.detach(trailing);
        self.store.detach(rhs_node);
        let Some(id) = self.store.equation(node).map(|eq| eq.id) else {
            fatal!("freshly constructed equation {} has no payload", node);
        };
        self.store.attach(node);
        self.registry.insert(id, node);

        for unlinked in report.unlinked_equations {
            let Some(old) = self.store.equation(unlinked).map(|eq| eq.id) else {
                continue;
            };
            if self.registry.remove(&old).is_none() {
                continue;
            }
            self.deferred.remove(&old);
            self.schedule(QueueKind::Dubious, Job::Dubious { equation: unlinked });
            if self.learned.remove(&old) {
                self.schedule(QueueKind::DifferenceCorrection, Job::Retract { equation: unlinked });
            }
            self.store.detach(unlinked);
        }
        if report.unlinked_irreducible > 0 {
            let stale: Vec<NodeId> = self
                .registry
                .values()
                .copied()
                .filter(|&n| {
                    self.store
                        .equation(n)
                        .map_or(false, |eq| !self.store.is_linked(eq.rhs))
                })
                .collect();
            for equation in stale {
                self.schedule(QueueKind::PreCorrection, Job::Correct { equation });
            }
        }

        if rhs.is_empty() {
            match *lhs {
                [x] => self.cancellability.mark_invertible(x),
                [x, y] => {
                    self.cancellability.learn_product_identity(x, y);
                }
                _ => {}
            }
        }
        self.schedule(QueueKind::InverseCheck, Job::InverseCheck { equation: node });
        self.schedule(
            QueueKind::Deduction,
            Job::Expand {
                equation: node,
                cursor: 0,
                above: 0,
            },
        );
        if !hints.secondary {
            let invertible = |g: &Generator| self.inverses[g.index()].is_some();
            let ends = lhs.first().map_or(false, invertible) || lhs.last().map_or(false, invertible);
            let all = lhs.iter().chain(rhs).all(invertible);
            if ends {
                self.schedule(QueueKind::PartialReduction, Job::PartialReduction { equation: node });
            }
            if all {
                self.schedule(
                    QueueKind::Conjugation,
                    Job::Conjugate {
                        equation: node,
                        rotation: 0,
                    },
                );
            }
        }
        if self.oracle.is_active() {
            self.schedule(QueueKind::DifferenceDiscovery, Job::Discover { equation: node });
        }
        node
    }

    fn replace_rhs(&mut self, node: NodeId, rhs: Word) {
        let Some(old) = self.store.equation(node).map(|eq| self.store.word(eq.rhs)) else {
            return;
        };
        let rhs_node = self.store.get_or_create(&rhs);
        self.store.replace_rhs(node, rhs_node);
        self.schedule(
            QueueKind::UrgentDeduction,
            Job::Candidate {
                lhs: old,
                rhs,
                provenance: Provenance::RhsImprovement,
                hints: AdmitHints::default(),
                essential: true,
            },
        );
    }

    fn pool_equation(&mut self, lhs: Word, rhs: Word) {
        let cert = self.store.certificate();
        match self.pool.insert(&lhs, rhs, self.order.as_ref()) {
            PoolInsert::Added(id) => self.pool.mark_examined(id, cert),
            PoolInsert::Existing {
                id,
                displaced,
                replaced,
            } => {
                if replaced {
                    self.pool.mark_examined(id, cert);
                }
                let kept = self.pool.get(id).map(|(_, rhs)| rhs);
                if let Some(kept) = kept.filter(|kept| *kept != displaced) {
                    self.schedule(
                        QueueKind::UrgentDeduction,
                        Job::Candidate {
                            lhs: displaced,
                            rhs: kept,
                            provenance: Provenance::RhsImprovement,
                            hints: AdmitHints::default(),
                            essential: true,
                        },
                    );
                }
            }
        }
    }

    // ----- handlers -----

    /// Re-reduces the right-hand side of a live equation.
    ///
    /// From the pre-correction queue only corrections that do not lengthen
    /// the right-hand side run at once; the rest move to the routine queue.
    fn correct(&mut self, node: NodeId, kind: QueueKind) {
        if !self.store.is_live_equation(node) {
            return;
        }
        let Some(rhs_node) = self.store.equation(node).map(|eq| eq.rhs) else {
            return;
        };
        let rhs = self.store.word(rhs_node);
        if kind == QueueKind::PreCorrection {
            match self.store.reduce(&rhs, self.config.max_word_length) {
                Ok(reduction) if !reduction.changed => return,
                Ok(reduction) if reduction.word.len() <= rhs.len() => {}
                _ => {
                    self.schedule(QueueKind::Correction, Job::Correct { equation: node });
                    return;
                }
            }
        }
        let lhs = self.store.word(node);
        let hints = AdmitHints {
            keep_lhs: true,
            ..AdmitHints::default()
        };
        self.submit(&lhs, &rhs, Provenance::Correction, hints, true);
    }

    fn resubmit_dubious(&mut self, node: NodeId) {
        let Some((rhs_node, primary, axiom)) = self
            .store
            .equation(node)
            .map(|eq| (eq.rhs, eq.primary, eq.axiom))
        else {
            return;
        };
        let lhs = self.store.word(node);
        let rhs = self.store.word(rhs_node);
        let hints = AdmitHints {
            axiom,
            secondary: !primary,
            ..AdmitHints::default()
        };
        self.submit(&lhs, &rhs, Provenance::Dubious, hints, true);
    }

    /// Finds the overlaps of `l1` and `l2` not longer than `above` and
    /// queues the ones within the expand limit. Returns `true` if any
    /// overlap was too long.
    fn queue_overlaps(&mut self, first: NodeId, l1: &[Generator], second: NodeId, l2: &[Generator], above: usize) -> bool {
        let expand = self.limits.expand();
        let visible = self.limits.visible;
        let mut deferred = false;
        for offset in 1..l1.len() {
            let shared = l1.len() - offset;
            if shared >= l2.len() || l1[offset..] != l2[..shared] {
                continue;
            }
            let length = offset + l2.len();
            if length <= above {
                continue;
            }
            if length > expand {
                deferred = true;
                continue;
            }
            let kind = if length <= visible {
                QueueKind::TotalOverlap
            } else {
                QueueKind::Overlap
            };
            self.schedule(
                kind,
                Job::Overlap {
                    first,
                    second,
                    offset: offset as u32,
                },
            );
        }
        deferred
    }

    fn expand(&mut self, node: NodeId, cursor: u64, above: usize) {
        if !self.store.is_live_equation(node) {
            return;
        }
        let Some(own) = self.store.equation(node).map(|eq| eq.id) else {
            return;
        };
        let batch = self.config.expand_batch;
        let partners: Vec<(u64, NodeId)> = self
            .registry
            .range(cursor..=own)
            .take(batch)
            .map(|(&id, &n)| (id, n))
            .collect();
        let lhs = self.store.word(node);
        let mut deferred = false;
        for &(id, partner) in &partners {
            let other = self.store.word(partner);
            deferred |= self.queue_overlaps(node, &lhs, partner, &other, above);
            if id != own {
                deferred |= self.queue_overlaps(partner, &other, node, &lhs, above);
            }
        }
        if deferred {
            self.deferred.insert(own);
        }
        match partners.last() {
            Some(&(last, _)) if partners.len() == batch && last < own => self.schedule(
                QueueKind::Deduction,
                Job::Expand {
                    equation: node,
                    cursor: last + 1,
                    above,
                },
            ),
            _ if !self.deferred.contains(&own) => self.store.set_class(node, EquationClass::Expanded),
            _ => {}
        }
    }

    /// The suffix of `first`'s left-hand side from `offset` is a proper
    /// prefix of `second`'s: both rules rewrite their overlap word.
    fn critical_pair(&mut self, first: NodeId, second: NodeId, offset: usize) {
        if !self.store.is_live_equation(first) || !self.store.is_live_equation(second) {
            return;
        }
        let (Some(e1), Some(e2)) = (self.store.equation(first), self.store.equation(second)) else {
            return;
        };
        let (id1, id2) = (e1.id, e2.id);
        let r1 = self.store.word(e1.rhs);
        let r2 = self.store.word(e2.rhs);
        let l1 = self.store.word(first);
        let l2 = self.store.word(second);
        let shared = l1.len() - offset;
        let mut left = r1;
        left.extend_from_slice(&l2[shared..]);
        let mut right = l1[..offset].to_vec();
        right.extend_from_slice(&r2);
        let length = offset + l2.len();
        trace!(first = id1, second = id2, length, "critical pair");
        // The overlap word is within the expand limit; the consequence may not be.
        let hints = AdmitHints {
            discardable: left.len() + right.len() > self.limits.discard(),
            ..AdmitHints::default()
        };
        let decision = self.submit(&left, &right, Provenance::Overlap { first: id1, second: id2 }, hints, true);
        if let Decision::Reject(RejectReason::Discardable | RejectReason::Overflow) = decision {
            self.discarded.insert((id1, id2, offset as u32));
        }
    }

    /// `u·g → r` gives `u = r·g⁻¹` and `g·v → r` gives `v = g⁻¹·r`.
    fn partial_reduction(&mut self, node: NodeId) {
        if !self.store.is_live_equation(node) {
            return;
        }
        let Some(rhs_node) = self.store.equation(node).map(|eq| eq.rhs) else {
            return;
        };
        let lhs = self.store.word(node);
        let rhs = self.store.word(rhs_node);
        let hints = AdmitHints {
            discardable: true,
            ..AdmitHints::default()
        };
        if let Some((&g, rest)) = lhs.split_last() {
            if let Some(inv) = self.inverses[g.index()] {
                let mut moved = rhs.clone();
                moved.push(inv);
                self.submit(rest, &moved, Provenance::PartialReduction, hints, false);
            }
        }
        if let Some((&g, rest)) = lhs.split_first() {
            if let Some(inv) = self.inverses[g.index()] {
                let mut moved = vec![inv];
                moved.extend_from_slice(&rhs);
                self.submit(rest, &moved, Provenance::PartialReduction, hints, false);
            }
        }
    }

    fn reclaim(&mut self) {
        self.reclaim_queued = false;
        let done = self.store.reclaim(self.config.reclaim_batch);
        trace!(done, "reclaimed nodes");
    }

    /// Learns inverse pairs from `x·y → 1` and caches the reduced inverse of
    /// the right-hand side.
    fn inverse_check(&mut self, node: NodeId) {
        if !self.store.is_live_equation(node) {
            return;
        }
        let Some(rhs_node) = self.store.equation(node).map(|eq| eq.rhs) else {
            return;
        };
        let lhs = self.store.word(node);
        let max = self.config.max_word_length;
        if self.store.length(rhs_node) == 0 {
            match *lhs {
                [x] => self.learn_inverse(x, x),
                [x, y] => {
                    let identity = self
                        .store
                        .reduce(&[y, x], max)
                        .map_or(false, |r| r.word.is_empty());
                    if identity {
                        self.learn_inverse(x, y);
                    }
                }
                _ => {}
            }
            return;
        }
        if !self.store.is_linked(rhs_node) || self.store.inverse(rhs_node).is_some() {
            return;
        }
        let rhs = self.store.word(rhs_node);
        let Some(inverse) = invert_with(&self.inverses, &rhs) else {
            return;
        };
        if let Ok(reduction) = self.store.reduce(&inverse, max) {
            let inv_node = self.store.get_or_create(&reduction.word);
            self.store.set_inverse(rhs_node, inv_node);
        }
    }

    fn learn_inverse(&mut self, x: Generator, y: Generator) {
        if self.inverses[x.index()].is_some() || self.inverses[y.index()].is_some() {
            return;
        }
        debug!(x = %self.alphabet.name(x), y = %self.alphabet.name(y), "learned inverse pair");
        self.inverses[x.index()] = Some(y);
        self.inverses[y.index()] = Some(x);
        self.cancellability.mark_invertible(x);
        self.cancellability.mark_invertible(y);
    }

    fn oracle_update(&mut self, node: NodeId, learn: bool) {
        if !self.oracle.is_active() {
            return;
        }
        let Some((rhs_node, id)) = self.store.equation(node).map(|eq| (eq.rhs, eq.id)) else {
            return;
        };
        if learn && (!self.store.is_live_equation(node) || !self.learned.insert(id)) {
            return;
        }
        let lhs = self.store.word(node);
        let rhs = self.store.word(rhs_node);
        let reducer = StoreReducer {
            store: &self.store,
            inverses: &self.inverses,
            max_len: self.config.max_word_length,
        };
        if learn {
            self.oracle.learn(&lhs, &rhs, &reducer);
        } else {
            self.oracle.retract(&lhs, &rhs, &reducer);
        }
    }

    /// Rotation 0 is the inverse equation `r⁻¹ = l⁻¹`; rotation `i` moves
    /// the first `i` letters of the relator `l·r⁻¹` to its end.
    fn conjugate(&mut self, node: NodeId, rotation: u32) {
        if !self.store.is_live_equation(node) {
            return;
        }
        let Some(rhs_node) = self.store.equation(node).map(|eq| eq.rhs) else {
            return;
        };
        let lhs = self.store.word(node);
        let rhs = self.store.word(rhs_node);
        let inv_rhs = match self.store.inverse(rhs_node) {
            Some(cached) => Some(self.store.word(cached)),
            None => invert_with(&self.inverses, &rhs),
        };
        let (Some(inv_lhs), Some(inv_rhs)) = (invert_with(&self.inverses, &lhs), inv_rhs) else {
            return;
        };
        let hints = AdmitHints {
            discardable: true,
            ..AdmitHints::default()
        };
        let mut relator = lhs;
        relator.extend_from_slice(&inv_rhs);
        let r = rotation as usize;
        if r == 0 {
            self.submit(&inv_lhs, &inv_rhs, Provenance::Conjugate, hints, false);
        } else if r < relator.len() {
            let mut rotated = relator[r..].to_vec();
            rotated.extend_from_slice(&relator[..r]);
            self.submit(&rotated, &[], Provenance::Conjugate, hints, false);
        }
        if r + 1 < relator.len() {
            self.schedule(
                QueueKind::Conjugation,
                Job::Conjugate {
                    equation: node,
                    rotation: rotation + 1,
                },
            );
        }
    }

    /// Re-examines the pool entry at `cursor`.
    ///
    /// An entry whose certificate is still valid would normalize exactly as
    /// before; it is skipped while it is also too long for the size rules.
    fn pool_scan(&mut self, cursor: u32, remaining: u32) {
        if remaining == 0 {
            return;
        }
        let id = EntryId::new(cursor);
        let Some((lhs, rhs)) = self.pool.get(id) else {
            return;
        };
        let unchanged = self
            .pool
            .examined(id)
            .map_or(false, |cert| self.store.check_certificate(&cert) == Validity::Valid);
        let too_long = lhs.len() + rhs.len() > self.limits.visible + self.config.coset_h_bonus;
        let next = if unchanged && too_long {
            cursor + 1
        } else {
            self.pool.take(id);
            let hints = AdmitHints {
                from_pool: true,
                ..AdmitHints::default()
            };
            self.submit(&lhs, &rhs, Provenance::Pool, hints, true);
            cursor
        };
        if remaining > 1 && (next as usize) < self.pool.len() {
            self.schedule(
                QueueKind::PoolReexamination,
                Job::PoolScan {
                    cursor: next,
                    remaining: remaining - 1,
                },
            );
        }
    }

    /// Checks that live right-hand sides are linked irreducible words.
    fn recheck(&mut self, cursor: u64) {
        let batch = self.config.expand_batch;
        let equations: Vec<(u64, NodeId)> = self
            .registry
            .range(cursor..)
            .take(batch)
            .map(|(&id, &n)| (id, n))
            .collect();
        for &(_, node) in &equations {
            let stale = self
                .store
                .equation(node)
                .map_or(false, |eq| !self.store.is_linked(eq.rhs) || self.store.is_final(eq.rhs));
            if stale {
                self.schedule(QueueKind::PreCorrection, Job::Correct { equation: node });
            }
        }
        if equations.len() == batch {
            if let Some(&(last, _)) = equations.last() {
                self.schedule(QueueKind::PartialRecheck, Job::Recheck { cursor: last + 1 });
            }
        }
    }
}
