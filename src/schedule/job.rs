//! Jobs run by the completion engine.

use crate::admission::AdmitHints;
use crate::arena::NodeId;
use crate::normalize::Provenance;
use crate::word::Word;

/// One unit of deferred work.
///
/// Jobs name trie nodes by id. The engine attaches every node a job names
/// when it is scheduled and detaches it after the job ran, so the nodes
/// outlive the job even if they are unlinked meanwhile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Normalize and admit a word pair.
    Candidate {
        lhs: Word,
        rhs: Word,
        provenance: Provenance,
        hints: AdmitHints,
        /// Dropping this candidate as discardable makes the round incomplete.
        essential: bool,
    },
    /// Re-reduce the right-hand side of a trie equation.
    Correct { equation: NodeId },
    /// Resubmit an equation unlinked by a newer left-hand side.
    Dubious { equation: NodeId },
    /// Critical pair of `first` and `second`: the suffix of `first` from
    /// `offset` is a proper prefix of `second`.
    Overlap {
        first: NodeId,
        second: NodeId,
        offset: u32,
    },
    /// Move an invertible end letter of the left-hand side across.
    PartialReduction { equation: NodeId },
    /// Destroy a batch of dead nodes.
    Reclaim,
    /// Find overlaps of `equation` with equations whose id is at least
    /// `cursor` and at most its own. Overlap words no longer than `above`
    /// were handled by an earlier expansion.
    Expand {
        equation: NodeId,
        cursor: u64,
        above: usize,
    },
    /// Learn inverse pairs and cache the reduced inverse of the right-hand side.
    InverseCheck { equation: NodeId },
    /// Withdraw an unlinked equation from the oracle.
    Retract { equation: NodeId },
    /// Show a new equation to the oracle.
    Discover { equation: NodeId },
    /// Cyclic conjugate number `rotation` of a primary relator; rotation 0
    /// is the inverse equation.
    Conjugate { equation: NodeId, rotation: u32 },
    /// Re-examine pool entries from `cursor`, at most `remaining` more.
    PoolScan { cursor: u32, remaining: u32 },
    /// Check trie equations with id at least `cursor`.
    Recheck { cursor: u64 },
}

impl Job {
    /// Nodes the job holds a reference to.
    pub fn nodes(&self) -> [Option<NodeId>; 2] {
        match *self {
            Job::Correct { equation }
            | Job::Dubious { equation }
            | Job::PartialReduction { equation }
            | Job::Expand { equation, .. }
            | Job::InverseCheck { equation }
            | Job::Retract { equation }
            | Job::Discover { equation }
            | Job::Conjugate { equation, .. } => [Some(equation), None],
            Job::Overlap { first, second, .. } => [Some(first), Some(second)],
            Job::Candidate { .. } | Job::Reclaim | Job::PoolScan { .. } | Job::Recheck { .. } => [None, None],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_jobs_hold_both_equations() {
        let job = Job::Overlap {
            first: NodeId::new(3),
            second: NodeId::new(7),
            offset: 1,
        };
        assert_eq!(job.nodes(), [Some(NodeId::new(3)), Some(NodeId::new(7))]);
        assert_eq!(Job::Reclaim.nodes(), [None, None]);
    }
}
