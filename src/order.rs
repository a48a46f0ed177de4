//! Total orders on words.
//!
//! The engine only consumes orders through [`WordOrder`]. Every order here is
//! a reduction order: total, well-founded and compatible with concatenation
//! (`u < v` implies `x·u·y < x·v·y`), so rewriting a left-hand side to its
//! right-hand side always terminates.
//!
//! # Geodesic orders
//! An order is *geodesic* when `u < v` implies `|u| <= |v|`. Reduction under
//! a geodesic order never lengthens a word, which lets the normalizer balance
//! equations by length alone.

use crate::word::Generator;
use std::cmp::Ordering;
use std::fmt;

/// A reduction order on words.
pub trait WordOrder: fmt::Debug {
    /// Compares two words.
    fn compare(&self, a: &[Generator], b: &[Generator]) -> Ordering;

    /// `true` if smaller words are never longer.
    fn is_geodesic(&self) -> bool {
        true
    }

    /// Number of generators the order was built for.
    fn generator_count(&self) -> usize;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Generator ranking shared by the lexicographic orders.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Ranking(Vec<u16>);

impl Ranking {
    fn identity(n: usize) -> Self {
        Self((0..n).map(|i| i as u16).collect())
    }

    /// `sequence` lists generators from smallest to largest.
    fn from_sequence(sequence: &[Generator]) -> Self {
        let mut ranks = vec![u16::MAX; sequence.len()];
        for (rank, g) in sequence.iter().enumerate() {
            ranks[g.index()] = rank as u16;
        }
        debug_assert!(
            ranks.iter().all(|&r| r != u16::MAX),
            "ranking must be a permutation of the generators"
        );
        Self(ranks)
    }

    #[inline]
    fn cmp(&self, a: Generator, b: Generator) -> Ordering {
        self.0[a.index()].cmp(&self.0[b.index()])
    }

    fn lex(&self, a: &[Generator], b: &[Generator]) -> Ordering {
        for (&x, &y) in a.iter().zip(b) {
            match self.cmp(x, y) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        a.len().cmp(&b.len())
    }

    fn lex_from_right(&self, a: &[Generator], b: &[Generator]) -> Ordering {
        for (&x, &y) in a.iter().rev().zip(b.iter().rev()) {
            match self.cmp(x, y) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        a.len().cmp(&b.len())
    }
}

/// Length first, then lexicographic by generator rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortLex {
    ranking: Ranking,
}

impl ShortLex {
    /// Generators ranked by alphabet index.
    pub fn new(generators: usize) -> Self {
        Self {
            ranking: Ranking::identity(generators),
        }
    }

    /// Generators ranked by position in `sequence` (smallest first).
    pub fn with_ranking(sequence: &[Generator]) -> Self {
        Self {
            ranking: Ranking::from_sequence(sequence),
        }
    }
}

impl WordOrder for ShortLex {
    fn compare(&self, a: &[Generator], b: &[Generator]) -> Ordering {
        a.len().cmp(&b.len()).then_with(|| self.ranking.lex(a, b))
    }

    fn generator_count(&self) -> usize {
        self.ranking.0.len()
    }

    fn name(&self) -> &'static str {
        "shortlex"
    }
}

/// Length first, then lexicographic reading from the right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RightShortLex {
    ranking: Ranking,
}

impl RightShortLex {
    pub fn new(generators: usize) -> Self {
        Self {
            ranking: Ranking::identity(generators),
        }
    }

    pub fn with_ranking(sequence: &[Generator]) -> Self {
        Self {
            ranking: Ranking::from_sequence(sequence),
        }
    }
}

impl WordOrder for RightShortLex {
    fn compare(&self, a: &[Generator], b: &[Generator]) -> Ordering {
        a.len()
            .cmp(&b.len())
            .then_with(|| self.ranking.lex_from_right(a, b))
    }

    fn generator_count(&self) -> usize {
        self.ranking.0.len()
    }

    fn name(&self) -> &'static str {
        "right-shortlex"
    }
}

/// Total weight first, then shortlex.
///
/// Weights must be positive. The order is geodesic only when all weights
/// are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedShortLex {
    ranking: Ranking,
    weights: Vec<u32>,
}

impl WeightedShortLex {
    /// `weights[g]` is the weight of generator `g`; zero weights are raised to 1.
    pub fn new(weights: Vec<u32>) -> Self {
        let weights: Vec<u32> = weights.into_iter().map(|w| w.max(1)).collect();
        Self {
            ranking: Ranking::identity(weights.len()),
            weights,
        }
    }

    fn weight(&self, w: &[Generator]) -> u64 {
        w.iter().map(|g| u64::from(self.weights[g.index()])).sum()
    }
}

impl WordOrder for WeightedShortLex {
    fn compare(&self, a: &[Generator], b: &[Generator]) -> Ordering {
        self.weight(a)
            .cmp(&self.weight(b))
            .then_with(|| a.len().cmp(&b.len()))
            .then_with(|| self.ranking.lex(a, b))
    }

    fn is_geodesic(&self) -> bool {
        self.weights.windows(2).all(|w| w[0] == w[1])
    }

    fn generator_count(&self) -> usize {
        self.weights.len()
    }

    fn name(&self) -> &'static str {
        "weighted-shortlex"
    }
}

/// Recursive path ordering, scanning from the right.
///
/// Large generators dominate any number of smaller ones: with `a < b`,
/// `b > a^n` for every `n`. Not geodesic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recursive {
    ranking: Ranking,
}

impl Recursive {
    pub fn new(generators: usize) -> Self {
        Self {
            ranking: Ranking::identity(generators),
        }
    }

    pub fn with_ranking(sequence: &[Generator]) -> Self {
        Self {
            ranking: Ranking::from_sequence(sequence),
        }
    }
}

impl WordOrder for Recursive {
    fn compare(&self, a: &[Generator], b: &[Generator]) -> Ordering {
        let mut l = a.len();
        let mut r = b.len();
        let mut last_moved = Ordering::Equal;
        loop {
            if l == 0 {
                return if r == 0 { last_moved } else { Ordering::Less };
            }
            if r == 0 {
                return Ordering::Greater;
            }
            match self.ranking.cmp(a[l - 1], b[r - 1]) {
                Ordering::Less => {
                    l -= 1;
                    last_moved = Ordering::Greater;
                }
                Ordering::Greater => {
                    r -= 1;
                    last_moved = Ordering::Less;
                }
                Ordering::Equal => {
                    l -= 1;
                    r -= 1;
                }
            }
        }
    }

    fn is_geodesic(&self) -> bool {
        false
    }

    fn generator_count(&self) -> usize {
        self.ranking.0.len()
    }

    fn name(&self) -> &'static str {
        "recursive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(s: &str) -> Vec<Generator> {
        s.bytes().map(|b| Generator::new(u16::from(b - b'a'))).collect()
    }

    #[test]
    fn shortlex_orders_by_length_then_rank() {
        let order = ShortLex::new(3);
        assert_eq!(order.compare(&w("b"), &w("aa")), Ordering::Less);
        assert_eq!(order.compare(&w("ba"), &w("ab")), Ordering::Greater);
        assert_eq!(order.compare(&w("abc"), &w("abc")), Ordering::Equal);
        assert!(order.is_geodesic());
    }

    #[test]
    fn ranking_overrides_index() {
        // c < b < a
        let seq = [Generator::new(2), Generator::new(1), Generator::new(0)];
        let order = ShortLex::with_ranking(&seq);
        assert_eq!(order.compare(&w("a"), &w("c")), Ordering::Greater);
    }

    #[test]
    fn right_shortlex_reads_backwards() {
        let order = RightShortLex::new(2);
        // Same length; last letters a < b decide.
        assert_eq!(order.compare(&w("ba"), &w("ab")), Ordering::Less);
    }

    #[test]
    fn weighted_prefers_light_words() {
        let order = WeightedShortLex::new(vec![1, 5]);
        assert_eq!(order.compare(&w("aaaa"), &w("b")), Ordering::Less);
        assert!(!order.is_geodesic());
        assert!(WeightedShortLex::new(vec![2, 2]).is_geodesic());
    }

    #[test]
    fn recursive_big_letter_dominates() {
        let order = Recursive::new(3);
        assert_eq!(order.compare(&w("b"), &w("aaaa")), Ordering::Greater);
        assert_eq!(order.compare(&w("cb"), &w("c")), Ordering::Greater);
        assert_eq!(order.compare(&w("c"), &w("aaaa")), Ordering::Greater);
        assert_eq!(order.compare(&w(""), &w("a")), Ordering::Less);
        assert_eq!(order.compare(&w("ab"), &w("ab")), Ordering::Equal);
        assert!(!order.is_geodesic());
    }

    #[test]
    fn orders_are_antisymmetric_on_small_words() {
        let words: Vec<Vec<Generator>> = ["", "a", "b", "ab", "ba", "aab", "bba", "abab"]
            .iter()
            .map(|s| w(s))
            .collect();
        let orders: Vec<Box<dyn WordOrder>> = vec![
            Box::new(ShortLex::new(2)),
            Box::new(RightShortLex::new(2)),
            Box::new(WeightedShortLex::new(vec![1, 3])),
            Box::new(Recursive::new(2)),
        ];
        for order in &orders {
            for x in &words {
                for y in &words {
                    assert_eq!(order.compare(x, y), order.compare(y, x).reverse());
                }
            }
        }
    }
}
