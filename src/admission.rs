//! Admission control: deciding the fate of a normalized equation.
//!
//! Decision order, first match wins:
//!
//! 1. overflowed normalization: rejected if discardable, else pooled;
//! 2. trivial: rejected;
//! 3. corrections (`keep_lhs`): retry on a reducible proper part of the
//!    left-hand side, replace the right-hand side of the matching trie
//!    equation when the new one is smaller, otherwise known;
//! 4. axiom, visible, short side, forced, interesting, collapse and coset
//!    rules: inserted;
//! 5. everything else: pooled, or rejected when discardable.
//!
//! The controller only decides; the engine carries the decision out.

use crate::arena::NodeId;
use crate::node::NodeStore;
use crate::normalize::Normalized;
use crate::oracle::{InterestOracle, Reducer};
use crate::order::WordOrder;
use crate::word::Generator;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Caller knowledge about a candidate equation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmitHints {
    /// Defining relation: always inserted.
    pub axiom: bool,
    /// Insert regardless of size.
    pub force_insert: bool,
    /// Inserted equations only reduce; they seed no conjugates.
    pub secondary: bool,
    /// May be dropped instead of pooled.
    pub discardable: bool,
    /// Right-hand side correction of a trie equation.
    pub keep_lhs: bool,
    /// Came out of the overflow pool.
    pub from_pool: bool,
}

/// Externally visible outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Inserted,
    Pooled,
    Rejected,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InsertReason {
    Axiom,
    Visible,
    ShortSide,
    Forced,
    Interesting,
    Collapse,
    CosetG,
    CosetH,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RejectReason {
    Trivial,
    /// Left-hand side already in the trie with a right-hand side at least as good.
    Known,
    /// Overflowed and discardable.
    Overflow,
    Discardable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RetryReason {
    /// A proper prefix of the left-hand side is reducible.
    ReduciblePrefix,
    /// A different left-hand side ends the word.
    ReducibleSuffix,
}

/// Full decision with its reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Insert(InsertReason),
    /// The left-hand side is the trie equation `node`; its right-hand side
    /// improves.
    ReplaceRhs { node: NodeId },
    /// The left-hand side is the trie equation `node` with a right-hand side
    /// at least as small; the two right-hand sides form a new equation if
    /// they differ.
    Superseded { node: NodeId },
    Pool,
    Reject(RejectReason),
    Retry(RetryReason),
}

impl Decision {
    pub fn verdict(&self) -> Verdict {
        match self {
            Decision::Insert(_) | Decision::ReplaceRhs { .. } => Verdict::Inserted,
            Decision::Pool => Verdict::Pooled,
            Decision::Reject(_) | Decision::Superseded { .. } => Verdict::Rejected,
            Decision::Retry(_) => Verdict::Retry,
        }
    }
}

/// Size thresholds in force for a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionLimits {
    /// Equations with total length up to this are inserted.
    pub visible: usize,
    /// Equations with a side shorter than this are inserted.
    pub no_pool_below: usize,
    /// Extra total length allowed for separator-free coset equations.
    pub coset_h_bonus: usize,
}

/// Everything a decision reads.
pub struct AdmissionContext<'a> {
    pub store: &'a NodeStore,
    pub order: &'a dyn WordOrder,
    pub oracle: &'a dyn InterestOracle,
    pub reducer: &'a dyn Reducer,
    pub coset_separator: Option<Generator>,
    pub limits: AdmissionLimits,
}

/// Decision counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionMetrics {
    pub decisions: u64,
    pub inserted: BTreeMap<InsertReason, u64>,
    pub rejected: BTreeMap<RejectReason, u64>,
    pub retries: BTreeMap<RetryReason, u64>,
    pub rhs_replacements: u64,
    pub superseded: u64,
    pub pooled: u64,
}

impl AdmissionMetrics {
    pub fn record(&mut self, decision: &Decision) {
        self.decisions += 1;
        match decision {
            Decision::Insert(reason) => *self.inserted.entry(*reason).or_insert(0) += 1,
            Decision::ReplaceRhs { .. } => self.rhs_replacements += 1,
            Decision::Superseded { .. } => self.superseded += 1,
            Decision::Pool => self.pooled += 1,
            Decision::Reject(reason) => *self.rejected.entry(*reason).or_insert(0) += 1,
            Decision::Retry(reason) => *self.retries.entry(*reason).or_insert(0) += 1,
        }
    }

    pub fn inserted_total(&self) -> u64 {
        self.inserted.values().sum::<u64>() + self.rhs_replacements
    }

    pub fn rejected_total(&self) -> u64 {
        self.rejected.values().sum::<u64>() + self.superseded
    }

    pub fn reset(&mut self) {
        *self = AdmissionMetrics::default();
    }
}

/// The admission controller.
#[derive(Debug, Default, Clone)]
pub struct AdmissionController {
    metrics: AdmissionMetrics,
}

impl AdmissionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> &AdmissionMetrics {
        &self.metrics
    }

    /// Decides and records the fate of `normalized`.
    pub fn decide(&mut self, normalized: &Normalized, hints: &AdmitHints, ctx: &AdmissionContext<'_>) -> Decision {
        let decision = classify(normalized, hints, ctx);
        self.metrics.record(&decision);
        decision
    }
}

fn classify(normalized: &Normalized, hints: &AdmitHints, ctx: &AdmissionContext<'_>) -> Decision {
    let eq = &normalized.equation;
    if normalized.failed {
        return if hints.discardable {
            Decision::Reject(RejectReason::Overflow)
        } else {
            Decision::Pool
        };
    }
    if eq.is_trivial() {
        return Decision::Reject(RejectReason::Trivial);
    }
    if hints.keep_lhs {
        if let Some(decision) = check_known_lhs(&eq.lhs, &eq.rhs, ctx) {
            return decision;
        }
    }
    if hints.axiom {
        return Decision::Insert(InsertReason::Axiom);
    }
    let limits = &ctx.limits;
    if eq.total_len() <= limits.visible {
        return Decision::Insert(InsertReason::Visible);
    }
    if eq.rhs.len() < limits.no_pool_below || eq.lhs.len() < limits.no_pool_below {
        return Decision::Insert(InsertReason::ShortSide);
    }
    if hints.force_insert {
        return Decision::Insert(InsertReason::Forced);
    }
    if ctx.oracle.is_active() && ctx.oracle.is_interesting(&eq.lhs, &eq.rhs, ctx.reducer) {
        return Decision::Insert(InsertReason::Interesting);
    }
    if let Some(node) = ctx.store.find(&eq.lhs) {
        if ctx.store.max_accepted(node) as usize > eq.lhs.len() {
            return Decision::Insert(InsertReason::Collapse);
        }
    }
    if let Some(separator) = ctx.coset_separator {
        if let Some(reason) = coset_rule(&eq.lhs, &eq.rhs, separator, limits) {
            return Decision::Insert(reason);
        }
    }
    if hints.discardable {
        Decision::Reject(RejectReason::Discardable)
    } else {
        Decision::Pool
    }
}

/// Checks a correction whose left-hand side was not reduced.
///
/// Returns `None` when the left-hand side is irreducible, in which case the
/// correction is an ordinary new equation.
fn check_known_lhs(lhs: &[Generator], rhs: &[Generator], ctx: &AdmissionContext<'_>) -> Option<Decision> {
    let (end, node) = ctx.store.first_match(lhs)?;
    if end < lhs.len() {
        return Some(Decision::Retry(RetryReason::ReduciblePrefix));
    }
    if ctx.store.length(node) != lhs.len() {
        return Some(Decision::Retry(RetryReason::ReducibleSuffix));
    }
    let current = ctx.store.word(ctx.store.equation(node)?.rhs);
    Some(match ctx.order.compare(rhs, &current) {
        Ordering::Less => Decision::ReplaceRhs { node },
        Ordering::Equal => Decision::Reject(RejectReason::Known),
        Ordering::Greater => Decision::Superseded { node },
    })
}

/// Small-G: the parts after the separator fit the visible limit.
/// Small-H: no separator on either side and the total fits with the bonus.
fn coset_rule(lhs: &[Generator], rhs: &[Generator], separator: Generator, limits: &AdmissionLimits) -> Option<InsertReason> {
    let after = |w: &[Generator]| w.iter().position(|&g| g == separator).map(|p| w.len() - p - 1);
    match (after(lhs), after(rhs)) {
        (Some(l), Some(r)) if l + r <= limits.visible => Some(InsertReason::CosetG),
        (None, None) if lhs.len() + rhs.len() <= limits.visible + limits.coset_h_bonus => Some(InsertReason::CosetH),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Provenance, WorkingEquation};
    use crate::oracle::{NoOracle, StoreReducer};
    use crate::order::ShortLex;
    use crate::word::Word;

    fn w(s: &str) -> Word {
        s.bytes().map(|b| Generator::new(u16::from(b - b'a'))).collect()
    }

    fn rule(store: &mut NodeStore, lhs: &str, rhs: &str) -> NodeId {
        let (lhs, rhs) = (w(lhs), w(rhs));
        let rhs_node = store.get_or_create(&rhs);
        store.attach(rhs_node);
        let prefix = store.get_or_create(&lhs[..lhs.len() - 1]);
        store.attach(prefix);
        let trailing = store.get_or_create(&lhs[1..]);
        store.attach(trailing);
        store.unlink_containing(&lhs);
        let id = store.construct_equation(prefix, lhs[lhs.len() - 1], rhs_node, trailing, true, false);
        store.detach(prefix);
        store.detach(trailing);
        store.detach(rhs_node);
        id
    }

    fn normalized(lhs: &str, rhs: &str) -> Normalized {
        Normalized {
            equation: WorkingEquation::new(w(lhs), w(rhs), Provenance::Relation),
            failed: false,
        }
    }

    fn decide(store: &NodeStore, n: &Normalized, hints: AdmitHints, visible: usize) -> Decision {
        let order = ShortLex::new(3);
        let inverses = vec![None; 3];
        let reducer = StoreReducer {
            store,
            inverses: &inverses,
            max_len: 64,
        };
        let ctx = AdmissionContext {
            store,
            order: &order,
            oracle: &NoOracle,
            reducer: &reducer,
            coset_separator: None,
            limits: AdmissionLimits {
                visible,
                no_pool_below: 1,
                coset_h_bonus: 4,
            },
        };
        let mut controller = AdmissionController::new();
        let decision = controller.decide(n, &hints, &ctx);
        assert_eq!(controller.metrics().decisions, 1);
        decision
    }

    #[test]
    fn size_rules_in_order() {
        let store = NodeStore::new(3, 64);
        let hints = AdmitHints::default();
        assert_eq!(decide(&store, &normalized("", ""), hints, 4), Decision::Reject(RejectReason::Trivial));
        assert_eq!(decide(&store, &normalized("ccc", "a"), hints, 4), Decision::Insert(InsertReason::Visible));
        assert_eq!(decide(&store, &normalized("cccc", ""), hints, 2), Decision::Insert(InsertReason::ShortSide));
        assert_eq!(decide(&store, &normalized("cccc", "ab"), hints, 4), Decision::Pool);
        let forced = AdmitHints {
            force_insert: true,
            ..hints
        };
        assert_eq!(decide(&store, &normalized("cccc", "ab"), forced, 4), Decision::Insert(InsertReason::Forced));
        let axiom = AdmitHints { axiom: true, ..hints };
        assert_eq!(decide(&store, &normalized("cccc", "ab"), axiom, 0), Decision::Insert(InsertReason::Axiom));
        let discardable = AdmitHints {
            discardable: true,
            ..hints
        };
        assert_eq!(
            decide(&store, &normalized("cccc", "ab"), discardable, 4),
            Decision::Reject(RejectReason::Discardable)
        );
    }

    #[test]
    fn overflow_is_pooled_unless_discardable() {
        let store = NodeStore::new(3, 64);
        let mut n = normalized("cc", "a");
        n.failed = true;
        assert_eq!(decide(&store, &n, AdmitHints::default(), 10), Decision::Pool);
        let discardable = AdmitHints {
            discardable: true,
            ..AdmitHints::default()
        };
        assert_eq!(decide(&store, &n, discardable, 10), Decision::Reject(RejectReason::Overflow));
    }

    #[test]
    fn collapse_when_lhs_prefixes_a_live_rule() {
        let mut store = NodeStore::new(3, 64);
        rule(&mut store, "abcab", "");
        // "abc" is a trie node below which a longer left-hand side lives.
        assert_eq!(
            decide(&store, &normalized("abc", "ba"), AdmitHints::default(), 2),
            Decision::Insert(InsertReason::Collapse)
        );
    }

    #[test]
    fn corrections_against_known_left_hand_sides() {
        let mut store = NodeStore::new(3, 64);
        let node = rule(&mut store, "cb", "ba");
        rule(&mut store, "aa", "");
        let keep = AdmitHints {
            keep_lhs: true,
            ..AdmitHints::default()
        };
        assert_eq!(decide(&store, &normalized("cb", "a"), keep, 0), Decision::ReplaceRhs { node });
        assert_eq!(decide(&store, &normalized("cb", "ba"), keep, 0), Decision::Reject(RejectReason::Known));
        assert_eq!(decide(&store, &normalized("cb", "bb"), keep, 0), Decision::Superseded { node });
        assert_eq!(
            decide(&store, &normalized("aab", "b"), keep, 0),
            Decision::Retry(RetryReason::ReduciblePrefix)
        );
        assert_eq!(
            decide(&store, &normalized("caa", "b"), keep, 0),
            Decision::Retry(RetryReason::ReducibleSuffix)
        );
        assert_eq!(Decision::ReplaceRhs { node }.verdict(), Verdict::Inserted);
        assert_eq!(Decision::Superseded { node }.verdict(), Verdict::Rejected);
    }

    #[test]
    fn coset_rules() {
        let limits = AdmissionLimits {
            visible: 3,
            no_pool_below: 1,
            coset_h_bonus: 2,
        };
        let s = Generator::new(2);
        assert_eq!(coset_rule(&w("aacab"), &w("cb"), s, &limits), Some(InsertReason::CosetG));
        assert_eq!(coset_rule(&w("aabb"), &w("a"), s, &limits), Some(InsertReason::CosetH));
        assert_eq!(coset_rule(&w("aabbab"), &w("a"), s, &limits), None);
        assert_eq!(coset_rule(&w("cabab"), &w("ca"), s, &limits), None);
    }
}
