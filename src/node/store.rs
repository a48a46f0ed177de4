//! Node storage, reference counting, reclamation and the interreduction sweep.

use super::{Children, EquationClass, EquationData, Node, NodeClass, Payload};
use crate::arena::{NodeArena, NodeId, ROOT};
use crate::certificate::{Certificate, Generations, Validity};
use crate::word::{Generator, Word};
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Counters for store mutations.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetrics {
    pub nodes_created: u64,
    pub nodes_reclaimed: u64,
    pub nodes_pruned: u64,
    pub sweeps: u64,
    pub swept_nodes: u64,
    pub equations_constructed: u64,
    pub rhs_replacements: u64,
}

impl StoreMetrics {
    pub fn record_created(&mut self) {
        self.nodes_created += 1;
    }

    pub fn record_reclaimed(&mut self) {
        self.nodes_reclaimed += 1;
    }

    pub fn record_pruned(&mut self) {
        self.nodes_pruned += 1;
    }

    pub fn record_sweep(&mut self, unlinked: usize) {
        self.sweeps += 1;
        self.swept_nodes += unlinked as u64;
    }

    pub fn reset(&mut self) {
        *self = StoreMetrics::default();
    }
}

/// Node counts by class.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCounts {
    /// Live arena slots, including the root.
    pub total: usize,
    pub irreducible: usize,
    pub pending_equations: usize,
    pub expanded_equations: usize,
    pub limbo: usize,
    /// Slots on the arena free list.
    pub free_slots: usize,
    /// Nodes waiting for [`NodeStore::reclaim`].
    pub awaiting_reclaim: usize,
}

/// What an interreduction sweep unlinked.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Final nodes whose left-hand side contains the new left-hand side.
    pub unlinked_equations: Vec<NodeId>,
    /// Number of non-final nodes unlinked.
    pub unlinked_irreducible: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.unlinked_equations.is_empty() && self.unlinked_irreducible == 0
    }
}

/// The trie of words.
#[derive(Debug, Clone)]
pub struct NodeStore {
    pub(super) nodes: NodeArena<Node>,
    pub(super) alphabet_len: usize,
    dense: bool,
    pub(super) generations: Generations,
    /// Unlinked, unreferenced nodes awaiting destruction.
    free_queue: Vec<NodeId>,
    /// Linked nodes whose reference count dropped to zero.
    dirty: Vec<NodeId>,
    next_equation_id: u64,
    metrics: StoreMetrics,
}

impl NodeStore {
    /// Creates a store holding only the root.
    ///
    /// Alphabets of at most `dense_limit` generators use dense child tables.
    pub fn new(alphabet_len: usize, dense_limit: usize) -> Self {
        let dense = alphabet_len <= dense_limit;
        Self {
            nodes: NodeArena::with_root(Node::root(dense, alphabet_len)),
            alphabet_len,
            dense,
            generations: Generations::new(),
            free_queue: Vec::new(),
            dirty: Vec::new(),
            next_equation_id: 1,
            metrics: StoreMetrics::default(),
        }
    }

    pub fn alphabet_len(&self) -> usize {
        self.alphabet_len
    }

    /// Live nodes, including the root and nodes in limbo.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.live_count()
    }

    // ----- read access -----

    /// Returns the node, if its slot is live.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// `true` if `id` exists (linked or in limbo).
    pub fn exists(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// `true` if `id` exists and is reachable from the root.
    pub fn is_linked(&self, id: NodeId) -> bool {
        self.nodes.get(id).map_or(false, |n| n.linked)
    }

    /// `true` if `id` carries an equation.
    pub fn is_final(&self, id: NodeId) -> bool {
        self.nodes.get(id).map_or(false, Node::is_final)
    }

    /// `true` if `id` is a linked final node.
    pub fn is_live_equation(&self, id: NodeId) -> bool {
        self.nodes
            .get(id)
            .map_or(false, |n| n.linked && n.is_final())
    }

    pub fn equation(&self, id: NodeId) -> Option<&EquationData> {
        self.nodes.get(id).and_then(Node::equation)
    }

    pub fn length(&self, id: NodeId) -> usize {
        self.nodes[id].length()
    }

    pub fn refcount(&self, id: NodeId) -> u32 {
        self.nodes[id].refcount
    }

    pub fn max_height(&self, id: NodeId) -> u32 {
        self.nodes[id].max_height
    }

    pub fn max_accepted(&self, id: NodeId) -> u32 {
        self.nodes[id].max_accepted
    }

    pub fn class(&self, id: NodeId) -> NodeClass {
        self.nodes[id].class()
    }

    /// Cached inverse of `id`, if it is still linked.
    pub fn inverse(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].inverse.filter(|&inv| self.is_linked(inv))
    }

    /// Reconstructs the word of a node by following prefixes.
    pub fn word(&self, id: NodeId) -> Word {
        let mut word = Vec::with_capacity(self.nodes[id].length());
        let mut cur = id;
        while let Some(node) = self.nodes.get(cur) {
            match (node.prefix, node.last) {
                (Some(prefix), Some(g)) => {
                    word.push(g);
                    cur = prefix;
                }
                _ => break,
            }
        }
        word.reverse();
        word
    }

    /// Linked child of `id` along `g`.
    #[inline]
    pub fn child(&self, id: NodeId, g: Generator) -> Option<NodeId> {
        self.nodes[id].children.get(g)
    }

    /// Finds the linked node spelling `word`, using child links only.
    pub fn find(&self, word: &[Generator]) -> Option<NodeId> {
        let mut cur = ROOT;
        for &g in word {
            cur = self.child(cur, g)?;
        }
        Some(cur)
    }

    /// Snapshot of the current generations.
    pub fn certificate(&self) -> Certificate {
        self.generations.certificate()
    }

    /// Classifies a certificate taken from this store.
    pub fn check_certificate(&self, cert: &Certificate) -> Validity {
        self.generations.check(cert)
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    /// Linked final nodes, in id order.
    pub fn live_equations(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.linked && n.is_final())
            .map(|(id, _)| id)
            .collect()
    }

    /// Node counts by class.
    pub fn counts(&self) -> NodeCounts {
        let mut counts = NodeCounts {
            total: self.nodes.live_count(),
            free_slots: self.nodes.free_count(),
            awaiting_reclaim: self.free_queue.len(),
            ..NodeCounts::default()
        };
        for (_, node) in self.nodes.iter() {
            match node.class() {
                NodeClass::Irreducible => counts.irreducible += 1,
                NodeClass::Pending => counts.pending_equations += 1,
                NodeClass::Expanded => counts.expanded_equations += 1,
                NodeClass::Limbo => counts.limbo += 1,
            }
        }
        counts
    }

    // ----- reference counting -----

    /// Adds a reference to `id`.
    pub fn attach(&mut self, id: NodeId) {
        match self.nodes.get_mut(id) {
            Some(node) => node.refcount += 1,
            None => fatal!("attach to destroyed node {}", id),
        }
    }

    /// Drops a reference to `id`.
    ///
    /// At zero an unlinked node is queued for [`reclaim`](Self::reclaim) and
    /// a linked one becomes a pruning candidate. Nothing is destroyed here.
    pub fn detach(&mut self, id: NodeId) {
        let node = match self.nodes.get_mut(id) {
            Some(node) => node,
            None => fatal!("detach of destroyed node {}", id),
        };
        if node.refcount == 0 {
            fatal!("detach of unreferenced node {}", id);
        }
        node.refcount -= 1;
        if node.refcount == 0 && id != ROOT {
            if node.linked {
                self.dirty.push(id);
            } else {
                self.free_queue.push(id);
            }
        }
    }

    /// `true` if [`reclaim`](Self::reclaim) has work.
    pub fn reclaim_pending(&self) -> bool {
        !self.free_queue.is_empty() || !self.dirty.is_empty()
    }

    /// Destroys up to `budget` dead nodes and prunes useless linked leaves.
    ///
    /// Destroying a node detaches its prefix, right-hand side, trailing
    /// subword and cached inverse; nodes reaching zero join the queue and
    /// are handled by this same loop, so the cascade never recurses.
    /// Returns the number of nodes destroyed or pruned.
    pub fn reclaim(&mut self, budget: usize) -> usize {
        let mut done = 0;
        while done < budget {
            if let Some(id) = self.free_queue.pop() {
                if self.destroy(id) {
                    done += 1;
                }
            } else if let Some(id) = self.dirty.pop() {
                if self.prune(id) {
                    done += 1;
                }
            } else {
                break;
            }
        }
        done
    }

    fn destroy(&mut self, id: NodeId) -> bool {
        match self.nodes.get(id) {
            // Re-attached by a job after it was queued, or already gone.
            Some(node) if node.refcount == 0 && !node.linked => {}
            _ => return false,
        }
        let node = match self.nodes.deallocate(id) {
            Some(node) => node,
            None => return false,
        };
        if let (Some(prefix), Some(g)) = (node.prefix, node.last) {
            if let Some(parent) = self.nodes.get_mut(prefix) {
                if parent.children.get(g) == Some(id) {
                    parent.children.remove(g);
                }
            }
            self.detach(prefix);
        }
        if let Payload::Equation(eq) = &node.payload {
            self.detach(eq.rhs);
            self.detach(eq.trailing_subword);
        }
        if let Some(inv) = node.inverse {
            self.detach(inv);
        }
        self.metrics.record_reclaimed();
        true
    }

    /// Unlinks a linked, non-final, unreferenced node.
    ///
    /// Such a node has no children (children hold a reference) and is not a
    /// prefix of any live left-hand side, so walks may skip it.
    fn prune(&mut self, id: NodeId) -> bool {
        match self.nodes.get(id) {
            Some(node) if node.linked && node.refcount == 0 && !node.is_final() => {}
            _ => return false,
        }
        let parent = self.unlink_from_parent(id);
        self.nodes[id].linked = false;
        self.free_queue.push(id);
        self.metrics.record_pruned();
        if let Some(parent) = parent {
            self.inspect(parent);
        }
        true
    }

    fn unlink_from_parent(&mut self, id: NodeId) -> Option<NodeId> {
        let (prefix, last) = {
            let node = &self.nodes[id];
            (node.prefix, node.last)
        };
        let (prefix, g) = match (prefix, last) {
            (Some(p), Some(g)) => (p, g),
            _ => fatal!("attempt to unlink the root"),
        };
        let parent = &mut self.nodes[prefix];
        if parent.children.get(g) == Some(id) {
            parent.children.remove(g);
        }
        self.generations.bump_removal();
        Some(prefix)
    }

    // ----- construction -----

    fn create_child(&mut self, parent: NodeId, g: Generator) -> NodeId {
        let length = self.nodes[parent].length + 1;
        let node = Node {
            prefix: Some(parent),
            last: Some(g),
            length,
            children: Children::new(self.dense, self.alphabet_len),
            refcount: 0,
            linked: true,
            max_height: 0,
            max_accepted: 0,
            payload: Payload::Irreducible,
            inverse: None,
            suffix: Cell::new(None),
        };
        let id = self.nodes.allocate(node);
        self.attach(parent);
        let alphabet_len = self.alphabet_len;
        self.nodes[parent].children.insert(g, id, alphabet_len);
        self.generations.bump_structure();
        self.metrics.record_created();
        // Pruned at the next reclaim unless the caller attaches it.
        self.dirty.push(id);
        id
    }

    /// Returns the linked node for an irreducible word, creating the path.
    ///
    /// New nodes start unreferenced; the caller attaches what it keeps
    /// before the next [`reclaim`](Self::reclaim).
    ///
    /// # Panics
    /// Panics if the path runs through a final node: the word is reducible.
    pub fn get_or_create(&mut self, word: &[Generator]) -> NodeId {
        let mut cur = ROOT;
        let mut created = None;
        for (depth, &g) in word.iter().enumerate() {
            if self.nodes[cur].is_final() {
                fatal!(
                    "cannot extend left-hand side {} (depth {} of a word of length {})",
                    cur,
                    depth,
                    word.len()
                );
            }
            cur = match self.child(cur, g) {
                Some(c) => c,
                None => {
                    let c = self.create_child(cur, g);
                    created.get_or_insert(c);
                    c
                }
            };
        }
        if created.is_some() {
            if let Some(prefix) = self.nodes[cur].prefix {
                self.inspect(prefix);
            }
        }
        cur
    }

    /// Attaches an equation at `prefix·g`.
    ///
    /// # Panics
    /// Panics if `prefix`, `rhs` or `trailing_subword` is final or unlinked,
    /// or if `prefix·g` is already linked. The caller sweeps the trie with
    /// [`unlink_containing`](Self::unlink_containing) first.
    pub fn construct_equation(
        &mut self,
        prefix: NodeId,
        g: Generator,
        rhs: NodeId,
        trailing_subword: NodeId,
        primary: bool,
        axiom: bool,
    ) -> NodeId {
        for (role, id) in [("prefix", prefix), ("rhs", rhs), ("trailing subword", trailing_subword)] {
            if !self.is_linked(id) || self.is_final(id) {
                fatal!(
                    "equation {} node {} is not a linked irreducible word (class {:?})",
                    role,
                    id,
                    self.nodes.get(id).map(Node::class)
                );
            }
        }
        if let Some(existing) = self.child(prefix, g) {
            fatal!("equation target {} already linked below {}", existing, prefix);
        }
        let id = self.create_child(prefix, g);
        self.attach(rhs);
        self.attach(trailing_subword);
        let eq_id = self.next_equation_id;
        self.next_equation_id += 1;
        let node = &mut self.nodes[id];
        node.payload = Payload::Equation(EquationData {
            rhs,
            trailing_subword,
            class: EquationClass::Pending,
            primary,
            axiom,
            id: eq_id,
        });
        node.max_accepted = node.length;
        self.metrics.equations_constructed += 1;
        self.inspect(prefix);
        id
    }

    /// Replaces the right-hand side of a final node.
    pub fn replace_rhs(&mut self, id: NodeId, rhs: NodeId) {
        if !self.is_linked(rhs) || self.is_final(rhs) {
            fatal!("replacement rhs {} of {} is not a linked irreducible word", rhs, id);
        }
        self.attach(rhs);
        let old = match &mut self.nodes[id].payload {
            Payload::Equation(eq) => std::mem::replace(&mut eq.rhs, rhs),
            Payload::Irreducible => fatal!("replace_rhs on non-final node {}", id),
        };
        self.detach(old);
        self.generations.bump_structure();
        self.metrics.rhs_replacements += 1;
    }

    /// Marks an equation's overlap processing state.
    pub fn set_class(&mut self, id: NodeId, class: EquationClass) {
        if let Payload::Equation(eq) = &mut self.nodes[id].payload {
            eq.class = class;
        }
    }

    /// Caches `inverse` as the reduced inverse of `id`.
    pub fn set_inverse(&mut self, id: NodeId, inverse: NodeId) {
        self.attach(inverse);
        if let Some(old) = self.nodes[id].inverse.replace(inverse) {
            self.detach(old);
        }
    }

    // ----- book-keeping -----

    /// Recomputes `max_height` and `max_accepted` from `id` upward.
    ///
    /// `id` itself is always recomputed; ancestors only while a value
    /// changes. Each step moves one level up, so the walk ends at the root at
    /// the latest. Unreferenced non-final nodes found on the way are queued
    /// for pruning.
    pub fn inspect(&mut self, id: NodeId) {
        let mut current = Some(id);
        let mut first = true;
        while let Some(cur) = current {
            let (height, accepted, prefix, prunable) = {
                let node = match self.nodes.get(cur) {
                    Some(node) if node.linked => node,
                    _ => break,
                };
                let mut height = 0;
                let mut accepted = if node.is_final() { node.length } else { 0 };
                for (_, child) in node.children.entries() {
                    let c = &self.nodes[child];
                    height = height.max(c.max_height + 1);
                    accepted = accepted.max(c.max_accepted);
                }
                let prunable = cur != ROOT && node.refcount == 0 && !node.is_final();
                (height, accepted, node.prefix, prunable)
            };
            if prunable {
                self.dirty.push(cur);
            }
            let node = &mut self.nodes[cur];
            let changed = node.max_height != height || node.max_accepted != accepted;
            node.max_height = height;
            node.max_accepted = accepted;
            if !changed && !first {
                break;
            }
            first = false;
            current = prefix;
        }
    }

    // ----- interreduction -----

    /// Unlinks every linked node whose word contains `lhs`.
    ///
    /// Depth-first over the trie with an explicit stack, tracking the
    /// Knuth–Morris–Pratt state of `lhs`; subtrees too shallow to complete a
    /// match are skipped using `max_height`. A matching node is unlinked
    /// together with its whole subtree.
    pub fn unlink_containing(&mut self, lhs: &[Generator]) -> SweepReport {
        let mut report = SweepReport::default();
        if lhs.is_empty() {
            return report;
        }
        let failure = kmp_failure(lhs);
        let m = lhs.len();
        let mut touched_parents = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = vec![(ROOT, 0)];
        while let Some((id, state)) = stack.pop() {
            for (g, child) in self.nodes[id].children.entries().into_iter().rev() {
                let next = kmp_step(lhs, &failure, state, g);
                if next == m {
                    self.unlink_subtree(child, &mut report);
                    touched_parents.push(id);
                } else if self.nodes[child].max_height as usize >= m - next {
                    stack.push((child, next));
                }
            }
        }
        let unlinked = report.unlinked_equations.len() + report.unlinked_irreducible;
        self.metrics.record_sweep(unlinked);
        touched_parents.sort();
        touched_parents.dedup();
        for parent in touched_parents {
            self.inspect(parent);
        }
        report
    }

    fn unlink_subtree(&mut self, top: NodeId, report: &mut SweepReport) {
        self.unlink_from_parent(top);
        let mut stack = vec![top];
        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id];
            if !node.linked {
                continue;
            }
            node.linked = false;
            if node.is_final() {
                report.unlinked_equations.push(id);
            } else {
                report.unlinked_irreducible += 1;
            }
            if node.refcount == 0 {
                self.free_queue.push(id);
            }
            stack.extend(node.children.entries().into_iter().map(|(_, c)| c));
        }
    }
}

fn kmp_failure(pattern: &[Generator]) -> Vec<usize> {
    let mut failure = vec![0; pattern.len()];
    let mut k = 0;
    for i in 1..pattern.len() {
        while k > 0 && pattern[i] != pattern[k] {
            k = failure[k - 1];
        }
        if pattern[i] == pattern[k] {
            k += 1;
        }
        failure[i] = k;
    }
    failure
}

fn kmp_step(pattern: &[Generator], failure: &[usize], mut state: usize, g: Generator) -> usize {
    if state == pattern.len() {
        state = failure[state - 1];
    }
    while state > 0 && pattern[state] != g {
        state = failure[state - 1];
    }
    if pattern[state] == g {
        state + 1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(s: &str) -> Word {
        s.bytes().map(|b| Generator::new(u16::from(b - b'a'))).collect()
    }

    /// Inserts `lhs -> rhs` the way the engine does.
    fn insert(store: &mut NodeStore, lhs: &str, rhs: &str) -> (NodeId, SweepReport) {
        let lhs = w(lhs);
        let rhs_node = store.get_or_create(&w(rhs));
        store.attach(rhs_node);
        let prefix = store.get_or_create(&lhs[..lhs.len() - 1]);
        store.attach(prefix);
        let trailing = store.get_or_create(&lhs[1..]);
        store.attach(trailing);
        let report = store.unlink_containing(&lhs);
        let id = store.construct_equation(prefix, lhs[lhs.len() - 1], rhs_node, trailing, true, false);
        store.detach(rhs_node);
        store.detach(prefix);
        store.detach(trailing);
        (id, report)
    }

    #[test]
    fn paths_are_shared() {
        let mut store = NodeStore::new(2, 64);
        let ab = store.get_or_create(&w("ab"));
        let abb = store.get_or_create(&w("abb"));
        assert_eq!(store.find(&w("ab")), Some(ab));
        assert_eq!(store.word(abb), w("abb"));
        assert_eq!(store.length(abb), 3);
        // "a" is held by "ab", "ab" by "abb".
        assert_eq!(store.refcount(store.find(&w("a")).unwrap()), 1);
        assert_eq!(store.max_height(ROOT), 3);
    }

    #[test]
    fn equation_bookkeeping() {
        let mut store = NodeStore::new(2, 64);
        let (eq, report) = insert(&mut store, "ba", "ab");
        assert!(report.is_empty());
        assert!(store.is_live_equation(eq));
        assert_eq!(store.max_accepted(ROOT), 2);
        let data = store.equation(eq).unwrap();
        assert_eq!(store.word(data.rhs), w("ab"));
        assert_eq!(store.word(data.trailing_subword), w("a"));
        assert_eq!(store.class(eq), NodeClass::Pending);
    }

    #[test]
    fn sweep_unlinks_words_containing_new_lhs() {
        let mut store = NodeStore::new(2, 64);
        let (long, _) = insert(&mut store, "abab", "");
        let kept = store.get_or_create(&w("bb"));
        store.attach(kept);
        let (_, report) = insert(&mut store, "ba", "ab");
        assert_eq!(report.unlinked_equations, vec![long]);
        assert!(!store.is_linked(long));
        assert!(store.is_linked(kept));
        assert_eq!(store.class(long), NodeClass::Limbo);
        // "aba" contained "ba" too and went with it.
        assert_eq!(store.find(&w("aba")), None);
    }

    #[test]
    fn limbo_nodes_survive_until_reclaimed() {
        let mut store = NodeStore::new(2, 64);
        let (long, _) = insert(&mut store, "abab", "");
        store.attach(long); // a pending job
        insert(&mut store, "ba", "ab");
        store.reclaim(usize::MAX);
        assert!(store.exists(long));
        assert_eq!(store.word(long), w("abab"));
        store.detach(long);
        store.reclaim(usize::MAX);
        assert!(!store.exists(long));
    }

    #[test]
    fn reclaim_cascades_without_recursion() {
        let mut store = NodeStore::new(2, 64);
        let deep = "a".repeat(5000);
        let node = store.get_or_create(&w(&deep));
        store.attach(node);
        assert_eq!(store.counts().total, 5001);
        store.detach(node);
        while store.reclaim_pending() {
            store.reclaim(1024);
        }
        assert_eq!(store.counts().total, 1);
        assert_eq!(store.max_height(ROOT), 0);
    }

    #[test]
    fn reclaim_respects_budget() {
        let mut store = NodeStore::new(2, 64);
        let node = store.get_or_create(&w("aaaa"));
        store.attach(node);
        store.detach(node);
        assert_eq!(store.reclaim(2), 2);
        assert!(store.reclaim_pending());
    }

    #[test]
    fn replace_rhs_moves_references() {
        let mut store = NodeStore::new(2, 64);
        let (eq, _) = insert(&mut store, "bb", "ab");
        let old = store.equation(eq).unwrap().rhs;
        let new = store.get_or_create(&w("a"));
        let cert = store.certificate();
        store.replace_rhs(eq, new);
        assert_eq!(store.equation(eq).unwrap().rhs, new);
        assert_eq!(store.refcount(old), 0);
        assert_ne!(store.check_certificate(&cert), Validity::Valid);
    }

    #[test]
    #[should_panic(expected = "is not a linked irreducible word")]
    fn constructing_over_a_reducible_prefix_is_fatal() {
        let mut store = NodeStore::new(2, 64);
        let (eq, _) = insert(&mut store, "ab", "");
        let rhs = ROOT;
        store.construct_equation(eq, Generator::new(0), rhs, rhs, true, false);
    }

    #[test]
    #[should_panic(expected = "cannot extend left-hand side")]
    fn extending_a_left_hand_side_is_fatal() {
        let mut store = NodeStore::new(2, 64);
        insert(&mut store, "ab", "");
        store.get_or_create(&w("abb"));
    }

    #[test]
    #[should_panic(expected = "detach of unreferenced node")]
    fn over_detach_is_fatal() {
        let mut store = NodeStore::new(2, 64);
        let a = store.get_or_create(&w("a"));
        store.detach(a);
    }

    #[test]
    fn kmp_tracks_overlapping_prefixes() {
        let pat = w("aab");
        let failure = kmp_failure(&pat);
        let mut state = 0;
        for g in w("aaab") {
            state = kmp_step(&pat, &failure, state, g);
        }
        assert_eq!(state, 3);
    }
}
