//! Size limits in force during completion.

use crate::admission::AdmissionLimits;
use crate::config::EngineConfig;
use crate::stats::CurrentLimits;

/// Visible, expand and discard limits.
///
/// The expand and discard limits follow the visible limit at fixed margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Limits {
    pub(crate) visible: usize,
    expand_margin: usize,
    discard_margin: usize,
    /// The visible limit is derived from the axioms.
    derived: bool,
    pub(crate) rounds: usize,
}

impl Limits {
    pub(crate) fn new(config: &EngineConfig) -> Self {
        Self {
            visible: config
                .initial_visible_limit
                .unwrap_or(config.min_visible_limit),
            expand_margin: config.expand_margin,
            discard_margin: config.discard_margin,
            derived: config.initial_visible_limit.is_none(),
            rounds: 0,
        }
    }

    #[inline]
    pub(crate) fn expand(&self) -> usize {
        self.visible + self.expand_margin
    }

    #[inline]
    pub(crate) fn discard(&self) -> usize {
        self.visible + self.discard_margin
    }

    /// Lets a derived visible limit cover an axiom of total length `total`.
    pub(crate) fn observe_axiom(&mut self, total: usize) {
        if self.derived {
            self.visible = self.visible.max(total);
        }
    }

    /// Raises the visible limit by `growth`, capped at `cap`. Returns
    /// `false` when the cap was already reached.
    pub(crate) fn widen(&mut self, growth: usize, cap: Option<usize>) -> bool {
        let next = self.visible + growth;
        let next = match cap {
            Some(cap) if self.visible >= cap => return false,
            Some(cap) => next.min(cap),
            None => next,
        };
        self.visible = next;
        self.rounds += 1;
        true
    }

    pub(crate) fn balance_ceiling(&self, min: usize) -> usize {
        (self.visible / 2 + 8).max(min)
    }

    pub(crate) fn admission(&self, config: &EngineConfig) -> AdmissionLimits {
        AdmissionLimits {
            visible: self.visible,
            no_pool_below: config.no_pool_below,
            coset_h_bonus: config.coset_h_bonus,
        }
    }

    pub(crate) fn snapshot(&self) -> CurrentLimits {
        CurrentLimits {
            visible: self.visible,
            expand: self.expand(),
            discard: self.discard(),
            rounds: self.rounds,
        }
    }
}
