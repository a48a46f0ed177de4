//! Moving letters across the equals sign.
//!
//! `u·g = r` is equivalent to `u = r·g⁻¹`, and `g·u = r` to `u = g⁻¹·r`,
//! whenever `g` is invertible. Balancing applies these transfers to the
//! left-hand side while they make the equation smaller.

use super::{Normalizer, Shape};
use crate::node::ReductionOverflow;
use crate::word::{invert_with, Generator, Word};
use std::cmp::Ordering;

impl Normalizer<'_> {
    /// Balances an oriented equation whose sides are irreducible.
    pub(crate) fn balance(&self, l: Word, r: Word) -> Result<Shape, ReductionOverflow> {
        if self.order.is_geodesic() {
            Ok(self.balance_geodesic(l, r))
        } else {
            self.balance_general(l, r)
        }
    }

    /// Inverse of `g` usable for a transfer.
    ///
    /// The pair must cancel under the live rules in both orders; an inverse
    /// equation out of the trie for re-examination does not count.
    fn transfer_inverse(&self, g: Generator) -> Option<Generator> {
        let inv = self.inverse(g)?;
        let cancels = |x: Generator, y: Generator| {
            self.store
                .reduce(&[x, y], self.max_word_length)
                .map_or(false, |reduction| reduction.word.is_empty())
        };
        (cancels(g, inv) && cancels(inv, g)).then_some(inv)
    }

    /// Transfer of the last letter of `l`, if it is invertible.
    fn right_transfer(&self, l: &[Generator], r: &[Generator]) -> Option<(Word, Word)> {
        let (&g, rest) = l.split_last()?;
        let inv = self.transfer_inverse(g)?;
        let mut nr = r.to_vec();
        nr.push(inv);
        Some((rest.to_vec(), nr))
    }

    /// Transfer of the first letter of `l`, if it is invertible.
    fn left_transfer(&self, l: &[Generator], r: &[Generator]) -> Option<(Word, Word)> {
        let (&g, rest) = l.split_first()?;
        let inv = self.transfer_inverse(g)?;
        let mut nr = Vec::with_capacity(r.len() + 1);
        nr.push(inv);
        nr.extend_from_slice(r);
        Some((rest.to_vec(), nr))
    }

    /// Length-first orders: move letters while the left side is at least two
    /// letters longer. At exactly two longer the move must keep the equation
    /// oriented. The new right-hand side is reduced by the next round.
    fn balance_geodesic(&self, mut l: Word, mut r: Word) -> Shape {
        while l.len() >= r.len() + 2 {
            let strict = l.len() > r.len() + 2;
            let accept = |(nl, nr): &(Word, Word)| strict || self.order.compare(nl, nr) == Ordering::Greater;
            let next = self
                .right_transfer(&l, &r)
                .filter(accept)
                .or_else(|| self.left_transfer(&l, &r).filter(accept));
            match next {
                Some((nl, nr)) => {
                    l = nl;
                    r = nr;
                }
                None => break,
            }
        }
        Shape::Oriented(l, r)
    }

    /// Other orders: a transfer may lengthen the right-hand side, so each
    /// candidate is reduced and accepted only if its greater side is smaller
    /// than the current left-hand side. Stops once both sides exceed the
    /// balancing ceiling.
    fn balance_general(&self, mut l: Word, mut r: Word) -> Result<Shape, ReductionOverflow> {
        loop {
            if l.len() > self.balance_ceiling && r.len() > self.balance_ceiling {
                break;
            }
            let mut accepted = None;
            for candidate in [self.right_transfer(&l, &r), self.left_transfer(&l, &r)] {
                let Some((a, b)) = candidate else {
                    continue;
                };
                let b = self.reduce(&b)?;
                let (greater, smaller) = match self.order.compare(&a, &b) {
                    Ordering::Equal => return Ok(Shape::Trivial),
                    Ordering::Greater => (a, b),
                    Ordering::Less => (b, a),
                };
                if self.order.compare(&greater, &l) == Ordering::Less {
                    accepted = Some((greater, smaller));
                    break;
                }
            }
            match accepted {
                Some((nl, nr)) => {
                    l = nl;
                    r = nr;
                }
                None => break,
            }
        }
        Ok(Shape::Oriented(l, r))
    }

    /// Coset systems: `h·S·u = r` with `S` the separator and `h` invertible
    /// becomes `S·u = h⁻¹·r`, kept only if the equation gets smaller.
    pub(crate) fn migrate_separator(&self, l: Word, r: Word) -> Result<Shape, ReductionOverflow> {
        let Some(separator) = self.coset_separator else {
            return Ok(Shape::Oriented(l, r));
        };
        let position = match l.iter().position(|&g| g == separator) {
            Some(p) if p > 0 => p,
            _ => return Ok(Shape::Oriented(l, r)),
        };
        let Some(mut moved) = invert_with(self.inverses, &l[..position]) else {
            return Ok(Shape::Oriented(l, r));
        };
        moved.extend_from_slice(&r);
        let a = l[position..].to_vec();
        let b = self.reduce(&moved)?;
        let (greater, smaller) = match self.order.compare(&a, &b) {
            Ordering::Equal => return Ok(Shape::Trivial),
            Ordering::Greater => (a, b),
            Ordering::Less => (b, a),
        };
        if self.order.compare(&greater, &l) == Ordering::Less {
            Ok(Shape::Oriented(greater, smaller))
        } else {
            Ok(Shape::Oriented(l, r))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::node::NodeStore;
    use crate::normalize::{NormalizeOptions, Normalizer, Provenance};
    use crate::order::ShortLex;
    use crate::word::{Cancellability, Generator, Word};

    fn w(s: &str) -> Word {
        s.bytes().map(|b| Generator::new(u16::from(b - b'a'))).collect()
    }

    #[test]
    fn separator_moves_to_the_front() {
        // h=a (0), H=b (1), separator S=c (2), x=d (3).
        let store = NodeStore::new(4, 64);
        let inverses = vec![Some(Generator::new(1)), Some(Generator::new(0)), None, None];
        let cancellability = Cancellability::new(4);
        let order = ShortLex::new(4);
        let normalizer = Normalizer {
            store: &store,
            order: &order,
            inverses: &inverses,
            cancellability: &cancellability,
            coset_separator: Some(Generator::new(2)),
            max_word_length: 64,
            balance_ceiling: 60,
        };
        // a·S·d·d = d becomes S·d·d = b·d.
        let n = normalizer.normalize(&w("acdd"), &w("d"), Provenance::Relation, NormalizeOptions::default());
        assert!(!n.failed);
        assert_eq!(n.equation.lhs, w("cdd"));
        assert_eq!(n.equation.rhs, w("bd"));
    }
}
