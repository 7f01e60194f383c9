//! # Validator Set Capability
//!
//! Membership and stake-weighted sampling of the active validator set.

use crate::entities::NodeId;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use tracing::warn;

/// Read-only view of the active validator set.
pub trait Validators: Send + Sync {
    /// Whether `node` is an active validator.
    fn contains(&self, node: &NodeId) -> bool;

    /// Stake weight of `node` (0 if unknown).
    fn weight(&self, node: &NodeId) -> u64;

    /// Sum of all stake weights.
    fn total_weight(&self) -> u64;

    /// Number of validators.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample up to `k` distinct validators, weighted by stake.
    fn sample(&self, k: usize) -> Vec<NodeId>;
}

/// Validator set fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticValidatorSet {
    weights: BTreeMap<NodeId, u64>,
}

impl StaticValidatorSet {
    pub fn new(weights: impl IntoIterator<Item = (NodeId, u64)>) -> Self {
        Self {
            weights: weights.into_iter().collect(),
        }
    }

    /// Equal-weight set.
    pub fn uniform(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self::new(nodes.into_iter().map(|n| (n, 1)))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.weights.keys()
    }
}

impl Validators for StaticValidatorSet {
    fn contains(&self, node: &NodeId) -> bool {
        self.weights.contains_key(node)
    }

    fn weight(&self, node: &NodeId) -> u64 {
        self.weights.get(node).copied().unwrap_or(0)
    }

    fn total_weight(&self) -> u64 {
        self.weights.values().sum()
    }

    fn len(&self) -> usize {
        self.weights.len()
    }

    fn sample(&self, k: usize) -> Vec<NodeId> {
        let staked: Vec<(NodeId, u64)> = self
            .weights
            .iter()
            .filter(|(_, w)| **w > 0)
            .map(|(n, w)| (*n, *w))
            .collect();
        if staked.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut rng = rand::thread_rng();
        match staked.choose_multiple_weighted(&mut rng, k, |(_, w)| *w as f64) {
            Ok(chosen) => chosen.map(|(n, _)| *n).collect(),
            Err(e) => {
                warn!(error = %e, "Validator sampling failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn node(b: u8) -> NodeId {
        NodeId([b; 20])
    }

    #[test]
    fn test_membership_and_weight() {
        let set = StaticValidatorSet::new([(node(1), 10), (node(2), 30)]);
        assert!(set.contains(&node(1)));
        assert!(!set.contains(&node(3)));
        assert_eq!(set.weight(&node(2)), 30);
        assert_eq!(set.weight(&node(3)), 0);
        assert_eq!(set.total_weight(), 40);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_sample_is_distinct_and_bounded() {
        let set = StaticValidatorSet::uniform((1..=10).map(node));
        let sample = set.sample(4);
        assert_eq!(sample.len(), 4);
        let unique: HashSet<_> = sample.iter().collect();
        assert_eq!(unique.len(), 4);
        assert!(sample.iter().all(|n| set.contains(n)));
    }

    #[test]
    fn test_sample_more_than_available() {
        let set = StaticValidatorSet::uniform((1..=3).map(node));
        assert_eq!(set.sample(10).len(), 3);
    }

    #[test]
    fn test_sample_skips_zero_stake() {
        let set = StaticValidatorSet::new([(node(1), 0), (node(2), 5)]);
        assert_eq!(set.sample(2), vec![node(2)]);
    }

    #[test]
    fn test_empty_set() {
        let set = StaticValidatorSet::default();
        assert!(set.is_empty());
        assert!(set.sample(3).is_empty());
    }
}
