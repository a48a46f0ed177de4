//! Confluence: incremental Knuth–Bendix completion for finitely presented
//! monoids and groups.
//!
//! Rewriting rules live in one shared, reference-counted trie of words. The
//! trie doubles as the recognising automaton for left-hand sides, so
//! reduction is a single left-to-right walk with a stack of states. New
//! equations are normalized, pass admission control, and are either
//! inserted into the trie, parked in an overflow pool, or dropped; the
//! consequences of every insertion (overlaps, corrections, re-examination of
//! displaced rules) are deferred to a priority scheduler.
//!
//! # Mathematical Foundations
//!
//! A rewriting system is *confluent* when every word has exactly one
//! irreducible form. Knuth–Bendix completion reaches confluence by resolving
//! critical pairs: whenever two left-hand sides overlap, both rewrites of the
//! overlap word must reduce to the same word, and when they do not, the two
//! results form a new equation.
//!
//! # References
//!
//! - Knuth, D.E., Bendix, P.B. "Simple word problems in universal algebras" (1970)
//! - Epstein, D.B.A. et al. "Word Processing in Groups" (1992) – word differences
//! - Sims, C.C. "Computation with Finitely Presented Groups" (1994) – rewriting systems over tries
//! - Aho, A.V., Corasick, M.J. "Efficient string matching" (1975) – suffix fallback
//!
//! # Example
//!
//! ```
//! use confluence::prelude::*;
//!
//! let alphabet = Alphabet::new(["a", "b"]).unwrap();
//! let order = Box::new(ShortLex::new(alphabet.len()));
//! let mut engine = CompletionEngine::new(alphabet, order, EngineConfig::default()).unwrap();
//! engine.add_relation_str("ab", "ba", RelationFlags::axiom()).unwrap();
//! assert_eq!(engine.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
//! assert_eq!(engine.reduce_str("bbaa").unwrap(), "aabb");
//! ```

/// Logs and panics on a broken structural invariant.
///
/// These indicate a logic error inside the crate, never bad input.
macro_rules! fatal {
    ($($arg:tt)*) => {{
        let message = format!($($arg)*);
        tracing::error!(target: "confluence::invariant", "{}", message);
        panic!("invariant violation: {}", message)
    }};
}

pub mod admission;
pub mod arena;
pub mod certificate;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod node;
pub mod normalize;
pub mod oracle;
pub mod order;
pub mod pool;
pub mod progress;
pub mod schedule;
pub mod stats;
pub mod word;

pub use crate::admission::Verdict;
pub use crate::arena::NodeId;
pub use crate::config::{EngineConfig, LimitPolicy};
pub use crate::engine::{CompletionEngine, PassOutcome, RelationFlags};
pub use crate::error::{ConfigError, EngineError, WordError};
pub use crate::fingerprint::HashValue;
pub use crate::stats::Stats;
pub use crate::word::{Alphabet, Generator, Word};

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::admission::{AdmitHints, Verdict};
    pub use crate::config::{EngineConfig, LimitPolicy};
    pub use crate::engine::{CompletionEngine, PassOutcome, RelationFlags};
    pub use crate::error::{ConfigError, EngineError, WordError};
    pub use crate::fingerprint::{rules_fingerprint, HashValue};
    pub use crate::normalize::{NormalizeOptions, Normalized, Provenance, WorkingEquation};
    pub use crate::oracle::{DifferenceTracker, InterestOracle, NoOracle, Reducer};
    pub use crate::order::{Recursive, RightShortLex, ShortLex, WeightedShortLex, WordOrder};
    pub use crate::progress::{CallbackProgress, NoProgress, ProgressSink, TracingProgress};
    pub use crate::schedule::QueueKind;
    pub use crate::stats::Stats;
    pub use crate::word::{Alphabet, Generator, Word};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Honors `RUST_LOG` when debugging a scenario.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn engine(names: &[&str], relations: &[(&str, &str)]) -> CompletionEngine {
        init_tracing();
        let alphabet = Alphabet::new(names.iter().copied()).unwrap();
        let order = Box::new(ShortLex::new(names.len()));
        let mut engine = CompletionEngine::new(alphabet, order, EngineConfig::default())
            .unwrap()
            .with_progress(Box::new(NoProgress));
        for (lhs, rhs) in relations {
            assert!(engine.add_relation_str(lhs, rhs, RelationFlags::axiom()).unwrap());
        }
        engine
    }

    /// Every word over `generators` letters of length at most `max`.
    fn words(generators: u16, max: usize) -> Vec<Word> {
        let mut out = vec![Word::new()];
        let mut level = vec![Word::new()];
        for _ in 0..max {
            let mut next = Vec::new();
            for w in &level {
                for g in 0..generators {
                    let mut longer = w.clone();
                    longer.push(Generator::new(g));
                    next.push(longer);
                }
            }
            out.extend(next.iter().cloned());
            level = next;
        }
        out
    }

    const S3: &[(&str, &str)] = &[("aa", "1"), ("bbb", "1"), ("abab", "1")];

    /// The symmetric group on 3 points: a² = b³ = (ab)² = 1.
    #[test]
    fn symmetric_group_of_degree_three() {
        let mut e = engine(&["a", "b"], S3);
        assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
        assert_eq!(e.reduce_str("ababab").unwrap(), "ab");
        assert_eq!(e.reduce_str("bab").unwrap(), "a");
        let stats = e.stats();
        assert_eq!(stats.irreducible_up_to(3), 6);
        assert_eq!(&stats.irreducible_by_length[..4], &[1, 2, 3, 0]);
        assert_eq!(stats.equations.pooled, 0);
    }

    /// a² = b³ = (ab)³ = 1 presents the alternating group of degree 4.
    #[test]
    fn alternating_group_of_degree_four() {
        let mut e = engine(&["a", "b"], &[("aa", "1"), ("bbb", "1"), ("ababab", "1")]);
        assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
        assert_eq!(e.reduce_str("ababab").unwrap(), "1");
        let stats = e.stats();
        assert_eq!(stats.irreducible_up_to(e.config().census_length), 12);
        assert_eq!(stats.irreducible_up_to(3), 10);
    }

    #[test]
    fn free_abelian_rank_two() {
        let mut e = engine(&["a", "b"], &[("ab", "ba")]);
        assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
        let a = e.alphabet().generator("a").unwrap();
        let b = e.alphabet().generator("b").unwrap();
        assert_eq!(e.rules(), vec![(vec![b, a], vec![a, b])]);
        assert_eq!(e.reduce_str("bbaa").unwrap(), e.reduce_str("abab").unwrap());
        assert_eq!(e.reduce_str("bbaa").unwrap(), "aabb");
    }

    #[test]
    fn balancing_overflow_is_reported_not_fatal() {
        let alphabet = Alphabet::new(["a", "b", "B"]).unwrap().with_inverse("b", "B").unwrap();
        let config = EngineConfig {
            max_word_length: 4,
            census_length: 4,
            ..EngineConfig::default()
        };
        let mut e = CompletionEngine::new(alphabet, Box::new(Recursive::new(3)), config)
            .unwrap()
            .with_progress(Box::new(NoProgress));
        let b = e.alphabet().parse("b").unwrap();
        let aaaa = e.alphabet().parse("aaaa").unwrap();
        // Moving b across gives aaaaB, one letter past the cap.
        assert!(e.normalize(&b, &aaaa).failed);
        assert!(e.add_relation(&b, &aaaa, RelationFlags::default()));
        assert_eq!(e.pooled().len(), 1);
        assert_eq!(e.rules().len(), 2);
        assert_eq!(e.run_pass(&LimitPolicy::fixed()), PassOutcome::SuggestBuild);
    }

    #[test]
    fn rules_reduce_to_their_right_hand_sides() {
        let mut e = engine(&["a", "b"], S3);
        assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
        let rules = e.rules();
        assert!(!rules.is_empty());
        for (lhs, rhs) in &rules {
            assert_eq!(&e.reduce(lhs).0, rhs);
            assert!(!e.reduce(rhs).1);
        }
    }

    #[test]
    fn reduction_is_a_fixed_point() {
        let mut e = engine(&["a", "b"], S3);
        e.run_pass(&LimitPolicy::default());
        for w in words(2, 7) {
            let (once, _) = e.reduce(&w);
            let (twice, changed) = e.reduce(&once);
            assert_eq!(once, twice);
            assert!(!changed);
        }
    }

    #[test]
    fn completion_is_deterministic() {
        let mut first = engine(&["a", "b"], S3);
        let mut second = engine(&["a", "b"], S3);
        first.run_pass(&LimitPolicy::default());
        second.run_pass(&LimitPolicy::default());
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.rules(), second.rules());
        let before = first.fingerprint();
        first.add_relation_str("b", "1", RelationFlags::default()).unwrap();
        first.run_pass(&LimitPolicy::default());
        assert_ne!(first.fingerprint(), before);
    }

    #[test]
    fn cancelled_pass_resumes() {
        let calls = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&calls);
        let alphabet = Alphabet::new(["a", "b"]).unwrap();
        let config = EngineConfig {
            progress_interval: 1,
            ..EngineConfig::default()
        };
        let mut e = CompletionEngine::new(alphabet, Box::new(ShortLex::new(2)), config)
            .unwrap()
            .with_progress(Box::new(CallbackProgress(move |_: &str| {
                seen.set(seen.get() + 1);
                true
            })));
        for (lhs, rhs) in S3 {
            e.add_relation_str(lhs, rhs, RelationFlags::axiom()).unwrap();
        }
        assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Cancelled);
        assert_eq!(calls.get(), 1);
        assert!(e.work_pending(QueueKind::LOWEST));

        e.set_progress(Box::new(NoProgress));
        assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
        let mut fresh = engine(&["a", "b"], S3);
        fresh.run_pass(&LimitPolicy::default());
        assert_eq!(e.fingerprint(), fresh.fingerprint());
    }

    #[test]
    fn resource_ceiling_stops_the_pass() {
        let alphabet = Alphabet::new(["a", "b"]).unwrap();
        let config = EngineConfig {
            max_equations: Some(2),
            ..EngineConfig::default()
        };
        let mut e = CompletionEngine::new(alphabet, Box::new(ShortLex::new(2)), config)
            .unwrap()
            .with_progress(Box::new(NoProgress));
        for (lhs, rhs) in S3 {
            e.add_relation_str(lhs, rhs, RelationFlags::axiom()).unwrap();
        }
        assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::ResourceExhausted);
    }

    #[test]
    fn oracle_does_not_change_the_answer() {
        let mut e = engine(&["a", "b"], S3).with_oracle(Box::new(DifferenceTracker::new(4)));
        assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
        assert_eq!(e.stats().irreducible_up_to(3), 6);
    }

    /// Engine over generators `a, A, b, B, ...` with each pair declared inverse.
    fn with_inverses(names: &[&str], order: Box<dyn WordOrder>, relators: &[&str]) -> CompletionEngine {
        init_tracing();
        let mut alphabet = Alphabet::new(names.iter().copied()).unwrap();
        for pair in names.chunks(2) {
            alphabet = alphabet.with_inverse(pair[0], pair[1]).unwrap();
        }
        let mut e = CompletionEngine::new(alphabet, order, EngineConfig::default())
            .unwrap()
            .with_progress(Box::new(NoProgress));
        for relator in relators {
            e.add_relation_str(relator, "1", RelationFlags::axiom()).unwrap();
        }
        e
    }

    #[test]
    fn inverse_pairs_survive_non_length_first_orders() {
        fn recursive(n: usize) -> Box<dyn WordOrder> {
            Box::new(Recursive::new(n))
        }
        fn weighted(n: usize) -> Box<dyn WordOrder> {
            Box::new(WeightedShortLex::new((0..n).map(|i| 1 + (i % 2) as u32).collect()))
        }
        for make in [recursive as fn(usize) -> Box<dyn WordOrder>, weighted] {
            // A generator equal to the identity takes its inverse with it.
            let mut e = with_inverses(&["a", "A"], make(2), &["a"]);
            assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
            for word in ["a", "A", "aA", "Aa"] {
                assert_eq!(e.reduce_str(word).unwrap(), "1", "{word}");
            }

            let mut e = with_inverses(&["a", "A"], make(2), &["aaa"]);
            assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
            for word in ["aaa", "aA", "Aa", "AAA"] {
                assert_eq!(e.reduce_str(word).unwrap(), "1", "{word}");
            }
            assert_eq!(e.stats().irreducible_up_to(e.config().census_length), 3);

            // ba = Aab = 1 collapses the group.
            let mut e = with_inverses(&["a", "A", "b", "B"], make(4), &["ba", "Aab"]);
            assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
            for word in ["ba", "Aab", "aA", "Aa", "bB", "Bb", "a", "A", "b", "B"] {
                assert_eq!(e.reduce_str(word).unwrap(), "1", "{word}");
            }
        }
    }

    #[test]
    fn group_with_declared_inverses() {
        // Z/3 × Z/2 written with inverse generators.
        let alphabet = Alphabet::new(["a", "A", "b", "B"])
            .and_then(|a| a.with_inverse("a", "A"))
            .and_then(|a| a.with_inverse("b", "B"))
            .unwrap();
        let mut e = CompletionEngine::new(alphabet, Box::new(ShortLex::new(4)), EngineConfig::default())
            .unwrap()
            .with_progress(Box::new(NoProgress));
        for (lhs, rhs) in [("aaa", "1"), ("bb", "1"), ("ab", "ba")] {
            e.add_relation_str(lhs, rhs, RelationFlags::axiom()).unwrap();
        }
        assert_eq!(e.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
        assert_eq!(e.stats().irreducible_up_to(e.config().census_length), 6);
        assert_eq!(e.reduce_str("AB").unwrap(), e.reduce_str("BA").unwrap());
        assert_eq!(e.reduce_str("aaaa").unwrap(), "a");
    }
}
