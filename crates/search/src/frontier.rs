//! Bounded best-first frontier.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use crate::node::SearchNode;

/// Priority queue of [`SearchNode`]s with a hard capacity.
///
/// Keyed by `(score, insertion sequence)`: the first entry is the next node to
/// expand (ties in insertion order), the last is the one evicted on overflow.
/// NaN scores order after every number, so they are evicted first.
#[derive(Debug)]
pub struct Frontier {
    nodes: BTreeMap<(OrderedFloat<f64>, u64), SearchNode>,
    capacity: usize,
    next_seq: u64,
}

impl Frontier {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: BTreeMap::new(),
            capacity,
            next_seq: 0,
        }
    }

    /// Insert the search root. Not subject to the capacity, so a zero-capacity
    /// frontier still expands the root once.
    pub fn seed(&mut self, node: SearchNode) {
        self.insert(node);
    }

    /// Insert `node`, returning the worst node if capacity was exceeded.
    ///
    /// The returned node may be `node` itself when it scores worst. With a
    /// capacity of zero every pushed node is returned.
    pub fn push(&mut self, node: SearchNode) -> Option<SearchNode> {
        self.insert(node);
        if self.nodes.len() > self.capacity {
            self.nodes.pop_last().map(|(_, evicted)| evicted)
        } else {
            None
        }
    }

    fn insert(&mut self, node: SearchNode) {
        let key = (OrderedFloat(node.score), self.next_seq);
        self.next_seq += 1;
        self.nodes.insert(key, node);
    }

    /// Remove and return the lowest-scoring node.
    pub fn pop(&mut self) -> Option<SearchNode> {
        self.nodes.pop_first().map(|(_, node)| node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Scores in expansion order.
    pub fn scores(&self) -> Vec<f64> {
        self.nodes.keys().map(|(s, _)| s.into_inner()).collect()
    }
}
