//! Engine configuration and size-limit policies.
//!
//! All numeric thresholds of the completion heuristics live here with their
//! defaults. They govern speed and convergence, never correctness: any
//! valid configuration yields a correct rewriting system when the engine
//! reports confluence.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Tunables of a [`CompletionEngine`](crate::engine::CompletionEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard cap on word length during reduction and balancing.
    pub max_word_length: usize,
    /// Largest alphabet accepted.
    pub max_generators: usize,
    /// Alphabets up to this size use dense child tables.
    pub dense_alphabet_limit: usize,
    /// Starting visible limit; `None` derives it from the axioms.
    pub initial_visible_limit: Option<usize>,
    pub min_visible_limit: usize,
    /// Expand limit is the visible limit plus this.
    pub expand_margin: usize,
    /// Critical-pair consequences longer than visible plus this are discardable.
    pub discard_margin: usize,
    /// Per-round widening of the visible limit.
    pub limit_growth: usize,
    /// Equations with a side shorter than this are always inserted.
    pub no_pool_below: usize,
    /// Lower bound of the non-geodesic balancing ceiling.
    pub balance_min_ceiling: usize,
    /// Extra allowance for separator-free equations in coset systems.
    pub coset_h_bonus: usize,
    /// Longest word length counted in the irreducible census.
    pub census_length: usize,
    /// Steps between progress reports.
    pub progress_interval: u64,
    /// Nodes destroyed per reclamation job.
    pub reclaim_batch: usize,
    /// Partner equations per expansion step.
    pub expand_batch: usize,
    pub max_nodes: Option<usize>,
    pub max_equations: Option<usize>,
    pub max_pool_entries: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_word_length: 1024,
            max_generators: 4096,
            dense_alphabet_limit: 64,
            initial_visible_limit: None,
            min_visible_limit: 12,
            expand_margin: 8,
            discard_margin: 16,
            limit_growth: 4,
            no_pool_below: 1,
            balance_min_ceiling: 60,
            coset_h_bonus: 4,
            census_length: 8,
            progress_interval: 1024,
            reclaim_batch: 256,
            expand_batch: 32,
            max_nodes: None,
            max_equations: None,
            max_pool_entries: None,
        }
    }
}

impl EngineConfig {
    /// Rejects values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_word_length == 0 {
            return Err(ConfigError::InvalidValue("max_word_length must be positive"));
        }
        if self.max_generators == 0 {
            return Err(ConfigError::InvalidValue("max_generators must be positive"));
        }
        if self.limit_growth == 0 {
            return Err(ConfigError::InvalidValue("limit_growth must be positive"));
        }
        if self.progress_interval == 0 {
            return Err(ConfigError::InvalidValue("progress_interval must be positive"));
        }
        if self.reclaim_batch == 0 || self.expand_batch == 0 {
            return Err(ConfigError::InvalidValue("batch sizes must be positive"));
        }
        if self.initial_visible_limit == Some(0) {
            return Err(ConfigError::InvalidValue("initial_visible_limit must be positive"));
        }
        if self.census_length > self.max_word_length {
            return Err(ConfigError::InvalidValue("census_length must not exceed max_word_length"));
        }
        Ok(())
    }

    /// Serialize to CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        Ok(serde_cbor::to_vec(self)?)
    }

    /// Deserialize from CBOR bytes and validate.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_cbor::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }
}

/// How [`run_pass`](crate::engine::CompletionEngine::run_pass) widens limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitPolicy {
    /// Completion rounds before giving up with `SuggestBuild`.
    pub max_rounds: usize,
    /// Widen the limits between rounds.
    pub widen: bool,
    /// The visible limit never grows past this.
    pub max_visible_limit: Option<usize>,
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 16,
            widen: true,
            max_visible_limit: None,
        }
    }
}

impl LimitPolicy {
    /// A single round at the current limits.
    pub fn fixed() -> Self {
        Self {
            max_rounds: 1,
            widen: false,
            max_visible_limit: None,
        }
    }

    /// Up to `rounds` widening rounds.
    pub fn rounds(rounds: usize) -> Self {
        Self {
            max_rounds: rounds.max(1),
            ..Self::default()
        }
    }
}
