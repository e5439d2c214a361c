use std::collections::HashMap;

use crate::garden::{Node, NodeId};

/// A plot and, if one stood close enough, the plot it shares an irrigator with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pairing<'a> {
    pub first: &'a Node,
    pub second: Option<&'a Node>,
}

/// Greedy nearest-neighbour pairing.
///
/// Takes plots off the back of the pool one at a time and pairs each with the
/// closest plot still in the pool, unless that one is farther than
/// `max_distance`. Not a globally optimal matching; it doesn't need to be.
pub fn pair_nodes(nodes: &[Node], max_distance: f64) -> Vec<Pairing<'_>> {
    let mut pool: Vec<&Node> = nodes.iter().collect();
    let mut pairings = Vec::with_capacity(pool.len().div_ceil(2));

    while let Some(node) = pool.pop() {
        let nearest = pool
            .iter()
            .enumerate()
            .map(|(index, other)| (index, node.position.distance(&other.position)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let second = match nearest {
            Some((index, distance)) if distance <= max_distance => Some(pool.swap_remove(index)),
            _ => None,
        };
        pairings.push(Pairing {
            first: node,
            second,
        });
    }

    pairings
}

/// Symmetric partner lookup, fixed for the duration of a planning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairLinks {
    partners: HashMap<NodeId, NodeId>,
}

impl PairLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairings(pairings: &[Pairing<'_>]) -> Self {
        let mut links = Self::new();
        for pairing in pairings {
            if let Some(second) = pairing.second {
                links.link(pairing.first.id, second.id);
            }
        }
        links
    }

    /// # Panics
    ///
    /// If either node is already linked to a different partner, or `a == b`.
    pub fn link(&mut self, a: NodeId, b: NodeId) {
        assert_ne!(a, b, "node {a} cannot be paired with itself");
        for (node, partner) in [(a, b), (b, a)] {
            if let Some(existing) = self.partners.insert(node, partner) {
                assert_eq!(
                    existing, partner,
                    "node {node} is paired with both {existing} and {partner}"
                );
            }
        }
    }

    pub fn partner(&self, id: NodeId) -> Option<NodeId> {
        self.partners.get(&id).copied()
    }

    /// Number of linked pairs.
    pub fn len(&self) -> usize {
        self.partners.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}
