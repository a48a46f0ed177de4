//! The completion engine.
//!
//! Owns the node store, the overflow pool, the scheduler and the admission
//! controller, and drives them to a confluent rewriting system. Callers add
//! relations, run passes and reduce words; nothing outside the engine
//! mutates the trie.
//!
//! A pass drains the scheduler, checks the live equations, and reports
//! confluence when no overlap was deferred, nothing essential was discarded
//! and the pool is empty. Otherwise it widens the limits, re-expands what
//! was deferred, re-examines the pool and tries again.
//!
//! # Invariants
//! - Every live equation is in the registry and holds one reference from
//!   it; an equation leaves the registry when a sweep unlinks it.
//! - Every node named by a queued job holds one reference per job.
//! - Overlaps of the equation with id `n` are computed against equations
//!   with id at most `n`, so each pair is expanded once.
//!
//! # Determinism
//! Registry and deferred sets are ordered by equation id and the scheduler
//! is FIFO per queue, so equal inputs and configuration give equal rule
//! sets (see [`CompletionEngine::fingerprint`]).

mod jobs;
mod limits;

use crate::admission::{AdmissionController, AdmitHints, Verdict};
use crate::arena::NodeId;
use crate::config::{EngineConfig, LimitPolicy};
use crate::error::{ConfigError, EngineError, WordError};
use crate::fingerprint::{rules_fingerprint, HashValue};
use crate::node::{NodeStore, Reduction, ReductionOverflow};
use crate::normalize::{NormalizeOptions, Normalized, Normalizer, Provenance};
use crate::oracle::{InterestOracle, NoOracle};
use crate::order::WordOrder;
use crate::pool::EquationPool;
use crate::progress::{ProgressSink, TracingProgress};
use crate::schedule::{Job, QueueKind, Scheduler};
use crate::stats::{EquationCounts, Stats};
use crate::word::{Alphabet, Cancellability, Generator, Word};
use limits::Limits;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{info, warn};

/// How [`CompletionEngine::add_relation`] treats a relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationFlags {
    /// Defining relation: inserted whatever its size.
    pub axiom: bool,
    /// Inserted whatever its size, but not a defining relation.
    pub force_insert: bool,
    /// Only used for reduction; seeds no conjugates or partial reductions.
    pub secondary: bool,
}

impl RelationFlags {
    pub fn axiom() -> Self {
        Self {
            axiom: true,
            ..Self::default()
        }
    }
}

/// Result of [`CompletionEngine::run_pass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassOutcome {
    /// The rule set is confluent.
    Confluent,
    /// Rounds or limits ran out; the rule set may still be good enough to
    /// build an automatic structure from.
    SuggestBuild,
    /// A configured resource ceiling was reached.
    ResourceExhausted,
    /// The progress sink asked to stop. Calling `run_pass` again resumes.
    Cancelled,
}

/// Incremental Knuth–Bendix completion over a shared word trie.
pub struct CompletionEngine {
    alphabet: Alphabet,
    order: Box<dyn WordOrder>,
    config: EngineConfig,
    store: NodeStore,
    pool: EquationPool,
    scheduler: Scheduler<Job>,
    admission: AdmissionController,
    oracle: Box<dyn InterestOracle>,
    progress: Box<dyn ProgressSink>,
    limits: Limits,
    cancellability: Cancellability,
    /// Declared and learned inverses.
    inverses: Vec<Option<Generator>>,
    /// Live equations by equation id.
    registry: BTreeMap<u64, NodeId>,
    /// Equations with overlaps beyond the expand limit.
    deferred: BTreeSet<u64>,
    /// Equations shown to the oracle.
    learned: BTreeSet<u64>,
    /// Critical pairs `(first, second, offset)` whose consequence was
    /// discarded under the current limits.
    discarded: BTreeSet<(u64, u64, u32)>,
    steps: u64,
    reclaim_queued: bool,
}

impl fmt::Debug for CompletionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionEngine")
            .field("generators", &self.alphabet.len())
            .field("order", &self.order.name())
            .field("equations", &self.registry.len())
            .field("pooled", &self.pool.len())
            .field("queued", &self.scheduler.len())
            .field("limits", &self.limits)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl CompletionEngine {
    /// Creates an engine for `alphabet` under `order`.
    ///
    /// Declared inverse pairs become the axioms `g·g⁻¹ = 1` and `g⁻¹·g = 1`.
    ///
    /// # Errors
    /// Invalid configuration, an alphabet over capacity, or an order built
    /// for a different number of generators.
    pub fn new(alphabet: Alphabet, order: Box<dyn WordOrder>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if alphabet.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }
        if alphabet.len() > config.max_generators {
            return Err(ConfigError::AlphabetCapacity {
                requested: alphabet.len(),
                capacity: config.max_generators,
            });
        }
        if order.generator_count() != alphabet.len() {
            return Err(ConfigError::OrderMismatch {
                order: order.generator_count(),
                alphabet: alphabet.len(),
            });
        }
        let store = NodeStore::new(alphabet.len(), config.dense_alphabet_limit);
        let mut engine = Self {
            order,
            store,
            pool: EquationPool::new(),
            scheduler: Scheduler::new(),
            admission: AdmissionController::new(),
            oracle: Box::new(NoOracle),
            progress: Box::new(TracingProgress),
            limits: Limits::new(&config),
            cancellability: Cancellability::from_alphabet(&alphabet),
            inverses: alphabet.inverse_table().to_vec(),
            registry: BTreeMap::new(),
            deferred: BTreeSet::new(),
            learned: BTreeSet::new(),
            discarded: BTreeSet::new(),
            steps: 0,
            reclaim_queued: false,
            config,
            alphabet,
        };
        for (g, inv) in engine.alphabet.inverse_pairs() {
            engine.add_inverse_axiom(g, inv);
            if g != inv {
                engine.add_inverse_axiom(inv, g);
            }
        }
        info!(
            generators = engine.alphabet.len(),
            order = engine.order.name(),
            visible = engine.limits.visible,
            "completion engine ready"
        );
        Ok(engine)
    }

    /// Replaces the interestingness oracle.
    pub fn with_oracle(mut self, oracle: Box<dyn InterestOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Replaces the progress sink.
    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn set_progress(&mut self, progress: Box<dyn ProgressSink>) {
        self.progress = progress;
    }

    /// `g·inv = 1`, inserted without balancing: balancing with the inverse
    /// table would turn the relation into the tautology `g = g`.
    fn add_inverse_axiom(&mut self, g: Generator, inv: Generator) {
        self.limits.observe_axiom(2);
        let hints = AdmitHints {
            axiom: true,
            ..AdmitHints::default()
        };
        let options = NormalizeOptions {
            balance: false,
            ..NormalizeOptions::default()
        };
        self.submit_with(&[g, inv], &[], Provenance::Axiom, hints, true, options);
    }

    // ----- relations -----

    /// Adds the relation `lhs = rhs`.
    ///
    /// Returns `true` if the relation was inserted, pooled or queued for a
    /// retry, `false` if it was rejected (for example because it already
    /// follows from the rules).
    pub fn add_relation(&mut self, lhs: &[Generator], rhs: &[Generator], flags: RelationFlags) -> bool {
        let provenance = if flags.axiom {
            self.limits.observe_axiom(lhs.len() + rhs.len());
            Provenance::Axiom
        } else {
            Provenance::Relation
        };
        let hints = AdmitHints {
            axiom: flags.axiom,
            force_insert: flags.force_insert,
            secondary: flags.secondary,
            ..AdmitHints::default()
        };
        let verdict = self.submit(lhs, rhs, provenance, hints, true).verdict();
        matches!(verdict, Verdict::Inserted | Verdict::Pooled | Verdict::Retry)
    }

    /// [`add_relation`](Self::add_relation) on textual words.
    pub fn add_relation_str(&mut self, lhs: &str, rhs: &str, flags: RelationFlags) -> Result<bool, EngineError> {
        let lhs = self.parse(lhs)?;
        let rhs = self.parse(rhs)?;
        Ok(self.add_relation(&lhs, &rhs, flags))
    }

    fn parse(&self, text: &str) -> Result<Word, WordError> {
        let word = self.alphabet.parse(text)?;
        if word.len() > self.config.max_word_length {
            return Err(WordError::TooLong {
                length: word.len(),
                max: self.config.max_word_length,
            });
        }
        Ok(word)
    }

    // ----- queries -----

    /// Irreducible form of `word` and whether any rule applied.
    ///
    /// Usable at any time; mid-completion the result is irreducible under
    /// the current rules but not necessarily canonical.
    pub fn reduce(&self, word: &[Generator]) -> (Word, bool) {
        match self.store.reduce(word, usize::MAX) {
            Ok(reduction) => (reduction.word, reduction.changed),
            Err(_) => (word.to_vec(), false),
        }
    }

    /// Reduction that fails once the word grows past `max_len`.
    pub fn try_reduce(&self, word: &[Generator], max_len: usize) -> Result<Reduction, ReductionOverflow> {
        self.store.reduce(word, max_len)
    }

    /// [`reduce`](Self::reduce) on a textual word.
    pub fn reduce_str(&self, text: &str) -> Result<String, EngineError> {
        let word = self.parse(text)?;
        Ok(self.alphabet.format(&self.reduce(&word).0))
    }

    /// Normalizes `lhs = rhs` against the current rules without admitting it.
    pub fn normalize(&self, lhs: &[Generator], rhs: &[Generator]) -> Normalized {
        self.normalizer()
            .normalize(lhs, rhs, Provenance::Relation, NormalizeOptions::default())
    }

    fn normalizer(&self) -> Normalizer<'_> {
        Normalizer {
            store: &self.store,
            order: self.order.as_ref(),
            inverses: &self.inverses,
            cancellability: &self.cancellability,
            coset_separator: self.alphabet.coset_separator(),
            max_word_length: self.config.max_word_length,
            balance_ceiling: self.limits.balance_ceiling(self.config.balance_min_ceiling),
        }
    }

    /// Live rules `(lhs, rhs)`, ordered by left-hand side.
    pub fn rules(&self) -> Vec<(Word, Word)> {
        let mut rules: Vec<(Word, Word)> = self
            .registry
            .values()
            .filter_map(|&node| {
                let eq = self.store.equation(node)?;
                Some((self.store.word(node), self.store.word(eq.rhs)))
            })
            .collect();
        rules.sort_by(|a, b| self.order.compare(&a.0, &b.0));
        rules
    }

    /// Fingerprint of [`rules`](Self::rules).
    pub fn fingerprint(&self) -> HashValue {
        rules_fingerprint(&self.rules())
    }

    /// Pooled equations, in pool order.
    pub fn pooled(&self) -> Vec<(Word, Word)> {
        self.pool.equations()
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Known inverse of `g`, declared or learned.
    pub fn inverse(&self, g: Generator) -> Option<Generator> {
        self.inverses.get(g.index()).copied().flatten()
    }

    /// Snapshot for progress reporting.
    pub fn stats(&self) -> Stats {
        let nodes = self.store.counts();
        let equations = EquationCounts {
            live: self.registry.len(),
            pending: nodes.pending_equations,
            expanded: nodes.expanded_equations,
            deferred: self.deferred.len(),
            discarded: self.discarded.len(),
            pooled: self.pool.len(),
        };
        Stats {
            nodes,
            equations,
            limits: self.limits.snapshot(),
            queues: self
                .scheduler
                .queue_lengths()
                .into_iter()
                .filter(|&(_, n)| n > 0)
                .collect(),
            irreducible_by_length: self.store.census(self.config.census_length),
            admission: self.admission.metrics().clone(),
            store: self.store.metrics().clone(),
            pool: self.pool.metrics().clone(),
            steps: self.steps,
        }
    }

    // ----- driving -----

    /// Runs the next job. Returns `false` if nothing was queued.
    pub fn step(&mut self) -> bool {
        match self.scheduler.pop(QueueKind::LOWEST) {
            Some((kind, job)) => {
                self.perform(kind, job);
                true
            }
            None => false,
        }
    }

    /// Runs jobs until none at or above `floor` remain. Returns the number
    /// of jobs run.
    pub fn drain(&mut self, floor: QueueKind) -> usize {
        let mut ran = 0;
        while let Some((kind, job)) = self.scheduler.pop(floor) {
            self.perform(kind, job);
            ran += 1;
        }
        ran
    }

    /// `true` if a job at or above `floor` is queued.
    pub fn work_pending(&self, floor: QueueKind) -> bool {
        self.scheduler.work_pending(floor)
    }

    /// Drives completion under `policy`.
    pub fn run_pass(&mut self, policy: &LimitPolicy) -> PassOutcome {
        info!(visible = self.limits.visible, rounds = policy.max_rounds, "completion pass");
        let mut rounds = 0;
        loop {
            if let Some(outcome) = self.settle() {
                return outcome;
            }
            if self.deferred.is_empty() && self.pool.is_empty() && self.discarded.is_empty() {
                info!(equations = self.registry.len(), steps = self.steps, "confluent");
                return PassOutcome::Confluent;
            }
            rounds += 1;
            if !policy.widen || rounds >= policy.max_rounds || !self.widen(policy) {
                info!(
                    equations = self.registry.len(),
                    deferred = self.deferred.len(),
                    pooled = self.pool.len(),
                    "limits exhausted"
                );
                return PassOutcome::SuggestBuild;
            }
        }
    }

    /// Drains everything, then rechecks the live equations and drains again.
    fn settle(&mut self) -> Option<PassOutcome> {
        if let Some(outcome) = self.drain_checked() {
            return Some(outcome);
        }
        self.schedule(QueueKind::PartialRecheck, Job::Recheck { cursor: 0 });
        if let Some(outcome) = self.drain_checked() {
            return Some(outcome);
        }
        self.exhausted().then_some(PassOutcome::ResourceExhausted)
    }

    /// Drains all queues, consulting the progress sink between jobs.
    fn drain_checked(&mut self) -> Option<PassOutcome> {
        while let Some((kind, job)) = self.scheduler.pop(QueueKind::LOWEST) {
            self.perform(kind, job);
            if self.steps % self.config.progress_interval != 0 {
                continue;
            }
            let message = self.status_line();
            if self.progress.report(&message) {
                warn!(steps = self.steps, "completion cancelled");
                return Some(PassOutcome::Cancelled);
            }
            if self.exhausted() {
                return Some(PassOutcome::ResourceExhausted);
            }
        }
        None
    }

    fn exhausted(&self) -> bool {
        let over = |limit: Option<usize>, value: usize| limit.map_or(false, |max| value > max);
        let exhausted = over(self.config.max_nodes, self.store.node_count())
            || over(self.config.max_equations, self.registry.len())
            || over(self.config.max_pool_entries, self.pool.len());
        if exhausted {
            warn!(
                nodes = self.store.node_count(),
                equations = self.registry.len(),
                pooled = self.pool.len(),
                "resource ceiling reached"
            );
        }
        exhausted
    }

    fn status_line(&self) -> String {
        format!(
            "step {}: {} equations, {} pooled, {} queued, {} nodes, visible limit {}",
            self.steps,
            self.registry.len(),
            self.pool.len(),
            self.scheduler.len(),
            self.store.node_count(),
            self.limits.visible
        )
    }

    /// Widens the limits and queues the work they unlock.
    fn widen(&mut self, policy: &LimitPolicy) -> bool {
        let old_expand = self.limits.expand();
        if !self.limits.widen(self.config.limit_growth, policy.max_visible_limit) {
            return false;
        }
        info!(
            visible = self.limits.visible,
            deferred = self.deferred.len(),
            pooled = self.pool.len(),
            discarded = self.discarded.len(),
            "widening limits"
        );
        let deferred = std::mem::take(&mut self.deferred);
        for id in deferred {
            if let Some(&equation) = self.registry.get(&id) {
                self.schedule(
                    QueueKind::Deduction,
                    Job::Expand {
                        equation,
                        cursor: 0,
                        above: old_expand,
                    },
                );
            }
        }
        let discarded = std::mem::take(&mut self.discarded);
        for (first, second, offset) in discarded {
            let (Some(&first), Some(&second)) = (self.registry.get(&first), self.registry.get(&second)) else {
                continue;
            };
            self.schedule(QueueKind::Overlap, Job::Overlap { first, second, offset });
        }
        if !self.pool.is_empty() {
            self.schedule(
                QueueKind::PoolReexamination,
                Job::PoolScan {
                    cursor: 0,
                    remaining: self.pool.len() as u32,
                },
            );
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::ShortLex;

    fn engine(names: &[&str]) -> CompletionEngine {
        let alphabet = Alphabet::new(names.iter().copied()).unwrap();
        let order = Box::new(ShortLex::new(names.len()));
        CompletionEngine::new(alphabet, order, EngineConfig::default()).unwrap()
    }

    #[test]
    fn order_must_match_alphabet() {
        let alphabet = Alphabet::new(["a", "b"]).unwrap();
        let err = CompletionEngine::new(alphabet, Box::new(ShortLex::new(3)), EngineConfig::default()).unwrap_err();
        assert_eq!(err, ConfigError::OrderMismatch { order: 3, alphabet: 2 });
    }

    #[test]
    fn capacity_is_checked_before_work() {
        let alphabet = Alphabet::new(["a", "b", "c"]).unwrap();
        let config = EngineConfig {
            max_generators: 2,
            ..EngineConfig::default()
        };
        let err = CompletionEngine::new(alphabet, Box::new(ShortLex::new(3)), config).unwrap_err();
        assert_eq!(
            err,
            ConfigError::AlphabetCapacity {
                requested: 3,
                capacity: 2
            }
        );
    }

    #[test]
    fn declared_inverses_become_axioms() {
        let alphabet = Alphabet::new(["a", "A"]).unwrap().with_inverse("a", "A").unwrap();
        let engine = CompletionEngine::new(alphabet, Box::new(ShortLex::new(2)), EngineConfig::default()).unwrap();
        assert_eq!(engine.reduce_str("aAAaa").unwrap(), "a");
        assert_eq!(engine.rules().len(), 2);
    }

    #[test]
    fn trivial_relations_are_rejected() {
        let mut e = engine(&["a", "b"]);
        assert!(!e.add_relation_str("ab", "ab", RelationFlags::default()).unwrap());
        assert!(e.add_relation_str("aa", "1", RelationFlags::axiom()).unwrap());
        assert!(!e.add_relation_str("aaaa", "1", RelationFlags::default()).unwrap());
    }

    #[test]
    fn unknown_tokens_are_reported() {
        let mut e = engine(&["a", "b"]);
        let err = e.add_relation_str("az", "1", RelationFlags::default()).unwrap_err();
        assert!(matches!(err, EngineError::Word(WordError::UnknownToken { .. })));
    }

    #[test]
    fn rhs_improvements_replace_in_place() {
        let mut e = engine(&["a", "b", "c"]);
        assert!(e.add_relation_str("cc", "b", RelationFlags::default()).unwrap());
        let lhs = e.alphabet.parse("cc").unwrap();
        let rhs = e.alphabet.parse("a").unwrap();
        let corrected = e.submit(
            &lhs,
            &rhs,
            Provenance::Correction,
            AdmitHints {
                keep_lhs: true,
                ..AdmitHints::default()
            },
            true,
        );
        assert_eq!(corrected.verdict(), Verdict::Inserted);
        assert_eq!(e.reduce_str("cc").unwrap(), "a");
        // b = a is queued and settles.
        e.drain(QueueKind::LOWEST);
        assert_eq!(e.reduce_str("b").unwrap(), "a");
    }

    #[test]
    fn stats_track_limits_and_queues() {
        let mut e = engine(&["a", "b"]);
        e.add_relation_str("ba", "ab", RelationFlags::axiom()).unwrap();
        let before = e.stats();
        assert_eq!(before.equations.live, 1);
        assert!(before.queued() > 0);
        assert_eq!(before.limits.visible, 12);
        assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
        let after = e.stats();
        assert_eq!(after.queued(), 0);
        assert_eq!(after.equations.expanded, 1);
        assert!(after.steps > 0);
    }

    #[test]
    fn discarded_pairs_block_confluence_until_widened() {
        let alphabet = Alphabet::new(["a", "b", "c", "d"]).unwrap();
        let config = EngineConfig {
            initial_visible_limit: Some(4),
            discard_margin: 0,
            ..EngineConfig::default()
        };
        let mut e = CompletionEngine::new(alphabet, Box::new(ShortLex::new(4)), config).unwrap();
        e.add_relation_str("dc", "ab", RelationFlags::axiom()).unwrap();
        e.add_relation_str("cb", "ba", RelationFlags::axiom()).unwrap();

        // dcb gives dba = abb, six letters against a discard limit of four.
        assert_eq!(e.run_pass(&LimitPolicy::fixed()), PassOutcome::SuggestBuild);
        assert_eq!(e.stats().equations.discarded, 1);
        assert_eq!(e.reduce_str("dba").unwrap(), "dba");

        assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
        assert_eq!(e.stats().equations.discarded, 0);
        assert_eq!(e.reduce_str("dba").unwrap(), "abb");
        assert_eq!(e.reduce_str("dcb").unwrap(), "abb");
    }
}
