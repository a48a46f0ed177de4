//! Generators, words and alphabets.
//!
//! A word is a plain `Vec<Generator>`; all algorithms take `&[Generator]`.
//! The [`Alphabet`] owns generator names, declared inverses and, for coset
//! systems, the distinguished separator symbol.
//!
//! # Textual form
//! - Tokens are separated by `*` (`"a*b*A"`). When every generator name is a
//!   single character, juxtaposition is also accepted (`"abA"`).
//! - The empty word is written `1` (an empty string also parses as empty).

use crate::error::{ConfigError, WordError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A generator of the presentation.
///
/// The inner `u16` is the generator's index in its [`Alphabet`]; orders
/// decide how generators compare, not this index.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generator(u16);

impl Generator {
    /// Creates a generator from its alphabet index.
    #[inline]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    #[inline]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns the index as `usize` for table lookups.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// A finite sequence of generators.
pub type Word = Vec<Generator>;

/// Encodes a word as little-endian bytes, two per generator.
///
/// Used as the key format of the content store.
pub fn word_to_bytes(word: &[Generator]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(word.len() * 2);
    for g in word {
        bytes.extend_from_slice(&g.0.to_le_bytes());
    }
    bytes
}

/// Decodes a word produced by [`word_to_bytes`]. A trailing odd byte is ignored.
pub fn word_from_bytes(bytes: &[u8]) -> Word {
    bytes
        .chunks_exact(2)
        .map(|pair| Generator(u16::from_le_bytes([pair[0], pair[1]])))
        .collect()
}

/// Generator names, declared inverses and coset structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alphabet {
    names: Vec<String>,
    #[serde(skip)]
    lookup: HashMap<String, Generator>,
    inverses: Vec<Option<Generator>>,
    coset_separator: Option<Generator>,
    subgroup: Vec<bool>,
    single_char: bool,
}

/// Upper bound imposed by the `u16` generator representation.
pub const MAX_GENERATORS: usize = u16::MAX as usize;

impl Alphabet {
    /// Creates an alphabet from generator names, in index order.
    ///
    /// Names must be non-empty, unique, must not contain `*` or whitespace,
    /// and must not be `1`.
    pub fn new<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_capacity(names, MAX_GENERATORS)
    }

    /// Like [`Alphabet::new`], but rejects alphabets larger than `capacity`.
    pub fn with_capacity<I, S>(names: I, capacity: usize) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }
        let capacity = capacity.min(MAX_GENERATORS);
        if names.len() > capacity {
            return Err(ConfigError::AlphabetCapacity {
                requested: names.len(),
                capacity,
            });
        }
        let mut lookup = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.is_empty()
                || name == "1"
                || name.contains('*')
                || name.chars().any(char::is_whitespace)
            {
                return Err(ConfigError::InvalidGeneratorName(name.clone()));
            }
            if lookup.insert(name.clone(), Generator(i as u16)).is_some() {
                return Err(ConfigError::DuplicateGenerator(name.clone()));
            }
        }
        let single_char = names.iter().all(|n| n.chars().count() == 1);
        let len = names.len();
        Ok(Self {
            names,
            lookup,
            inverses: vec![None; len],
            coset_separator: None,
            subgroup: vec![false; len],
            single_char,
        })
    }

    /// Declares `a` and `b` mutually inverse.
    pub fn with_inverse(mut self, a: &str, b: &str) -> Result<Self, ConfigError> {
        let ga = self.require(a)?;
        let gb = self.require(b)?;
        self.set_inverse(ga, gb)?;
        self.set_inverse(gb, ga)?;
        Ok(self)
    }

    /// Declares `a` to be its own inverse.
    pub fn with_self_inverse(self, a: &str) -> Result<Self, ConfigError> {
        self.with_inverse(a, a)
    }

    /// Marks `name` as the coset separator symbol.
    pub fn with_coset_separator(mut self, name: &str) -> Result<Self, ConfigError> {
        self.coset_separator = Some(self.require(name)?);
        Ok(self)
    }

    /// Marks the named generators as subgroup generators of a coset system.
    pub fn with_subgroup_generators(mut self, names: &[&str]) -> Result<Self, ConfigError> {
        for name in names {
            let g = self.require(name)?;
            self.subgroup[g.index()] = true;
        }
        Ok(self)
    }

    fn require(&self, name: &str) -> Result<Generator, ConfigError> {
        self.lookup
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownGenerator(name.to_string()))
    }

    fn set_inverse(&mut self, g: Generator, inv: Generator) -> Result<(), ConfigError> {
        match self.inverses[g.index()] {
            Some(existing) if existing != inv => Err(ConfigError::ConflictingInverse {
                generator: self.names[g.index()].clone(),
                existing: self.names[existing.index()].clone(),
            }),
            _ => {
                self.inverses[g.index()] = Some(inv);
                Ok(())
            }
        }
    }

    /// Number of generators.
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false`: construction rejects empty alphabets.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All generators in index order.
    pub fn generators(&self) -> impl Iterator<Item = Generator> + '_ {
        (0..self.names.len()).map(|i| Generator(i as u16))
    }

    /// Looks up a generator by name.
    pub fn generator(&self, name: &str) -> Option<Generator> {
        self.lookup.get(name).copied()
    }

    /// The name of `g`.
    pub fn name(&self, g: Generator) -> &str {
        &self.names[g.index()]
    }

    /// The declared inverse of `g`, if any.
    #[inline]
    pub fn inverse(&self, g: Generator) -> Option<Generator> {
        self.inverses[g.index()]
    }

    /// Declared inverse table, indexed by generator.
    pub fn inverse_table(&self) -> &[Option<Generator>] {
        &self.inverses
    }

    /// Pairs `(g, g⁻¹)` with `g <= g⁻¹` by index, each pair once.
    pub fn inverse_pairs(&self) -> Vec<(Generator, Generator)> {
        self.generators()
            .filter_map(|g| self.inverse(g).map(|inv| (g, inv)))
            .filter(|(g, inv)| g <= inv)
            .collect()
    }

    /// The coset separator, for coset systems.
    pub fn coset_separator(&self) -> Option<Generator> {
        self.coset_separator
    }

    /// Returns `true` if `g` was declared a subgroup generator.
    pub fn is_subgroup_generator(&self, g: Generator) -> bool {
        self.subgroup[g.index()]
    }

    /// Parses a textual word.
    pub fn parse(&self, text: &str) -> Result<Word, WordError> {
        let text = text.trim();
        if text.is_empty() || text == "1" {
            return Ok(Word::new());
        }
        let mut word = Word::new();
        if text.contains('*') || !self.single_char {
            for (position, token) in text.split('*').map(str::trim).enumerate() {
                if token == "1" {
                    continue;
                }
                word.push(self.token(token, position)?);
            }
        } else {
            for (position, ch) in text.chars().enumerate() {
                if ch.is_whitespace() {
                    continue;
                }
                let mut buf = [0u8; 4];
                word.push(self.token(ch.encode_utf8(&mut buf), position)?);
            }
        }
        Ok(word)
    }

    fn token(&self, token: &str, position: usize) -> Result<Generator, WordError> {
        self.lookup
            .get(token)
            .copied()
            .ok_or_else(|| WordError::UnknownToken {
                token: token.to_string(),
                position,
            })
    }

    /// Formats a word; the empty word is `1`.
    pub fn format(&self, word: &[Generator]) -> String {
        if word.is_empty() {
            return "1".to_string();
        }
        let sep = if self.single_char { "" } else { "*" };
        word.iter()
            .map(|g| self.names[g.index()].as_str())
            .collect::<Vec<_>>()
            .join(sep)
    }

    /// Formal inverse of a word under the declared inverses.
    ///
    /// Returns `None` if some letter has no declared inverse.
    pub fn invert(&self, word: &[Generator]) -> Option<Word> {
        invert_with(&self.inverses, word)
    }

    /// Rebuilds the name lookup after deserialization.
    pub fn rebuild_lookup(&mut self) {
        self.lookup = self
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), Generator(i as u16)))
            .collect();
    }
}

/// Inverts `word` letter by letter using `inverses`, reversing the order.
pub fn invert_with(inverses: &[Option<Generator>], word: &[Generator]) -> Option<Word> {
    word.iter().rev().map(|g| inverses[g.index()]).collect()
}

/// Per-generator cancellation properties, learned as the run goes on.
///
/// `left[g]` means `g·u = g·v` implies `u = v`; `right[g]` means
/// `u·g = v·g` implies `u = v`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellability {
    left: Vec<bool>,
    right: Vec<bool>,
}

impl Cancellability {
    /// No generator is known to cancel.
    pub fn new(generators: usize) -> Self {
        Self {
            left: vec![false; generators],
            right: vec![false; generators],
        }
    }

    /// Initial state for an alphabet: declared inverse pairs cancel both ways.
    pub fn from_alphabet(alphabet: &Alphabet) -> Self {
        let mut c = Self::new(alphabet.len());
        for (g, inv) in alphabet.inverse_pairs() {
            c.mark_invertible(g);
            c.mark_invertible(inv);
        }
        c
    }

    /// Records `x·y = 1`: `y` cancels on the left, `x` on the right.
    pub fn learn_product_identity(&mut self, x: Generator, y: Generator) -> bool {
        let changed = !self.left[y.index()] || !self.right[x.index()];
        self.left[y.index()] = true;
        self.right[x.index()] = true;
        changed
    }

    /// Records that `g` is invertible.
    pub fn mark_invertible(&mut self, g: Generator) {
        self.left[g.index()] = true;
        self.right[g.index()] = true;
    }

    #[inline]
    pub fn cancels_left(&self, g: Generator) -> bool {
        self.left[g.index()]
    }

    #[inline]
    pub fn cancels_right(&self, g: Generator) -> bool {
        self.right[g.index()]
    }
}
