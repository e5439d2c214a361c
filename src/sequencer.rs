//! Ordering and budgeting of candidate harvest orders.
//!
//! A grove of n plots has n! harvest orders. When that fits the configured
//! budget the adaptive search covers all of them exactly. Otherwise fixed
//! orders are enumerated lazily, lead plot by lead plot in priority order,
//! and scored until the budget runs out.

use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::garden::NodeId;
use crate::optimizer::{HarvestOptimizer, SearchResult, WorkingItem};
use crate::pairing::PairLinks;
use crate::valuation::Valuator;
use crate::yields::SeedType;

/// Orders all plots by the priority of the pair they belong to, lowest first.
///
/// A pair's priority is the sum of its members' values, each divided by the
/// number of plots sharing the member's colour, so valuable plots of a rare
/// colour rank highest. Within a pair the cheaper plot comes first.
pub fn priority_order(items: &[WorkingItem], links: &PairLinks, valuator: &Valuator) -> Vec<NodeId> {
    let mut colour_counts: HashMap<SeedType, usize> = HashMap::new();
    for item in items {
        *colour_counts.entry(item.data.kind).or_default() += 1;
    }
    let weighted = |item: &WorkingItem| {
        let sharing = colour_counts.get(&item.data.kind).copied().unwrap_or(1).max(1);
        valuator.value(&item.data) / sharing as f64
    };

    let mut visited = HashSet::with_capacity(items.len());
    let mut groups: Vec<(f64, Vec<(f64, NodeId)>)> = Vec::new();
    for item in items {
        if !visited.insert(item.id) {
            continue;
        }
        let mut members = vec![item];
        if let Some(partner) = links
            .partner(item.id)
            .and_then(|id| items.iter().find(|other| other.id == id))
        {
            if visited.insert(partner.id) {
                members.push(partner);
            }
        }

        let priority: f64 = members.iter().map(|m| weighted(*m)).sum();
        let mut valued: Vec<(f64, NodeId)> = members
            .iter()
            .map(|m| (valuator.value(&m.data), m.id))
            .collect();
        valued.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        groups.push((priority, valued));
    }

    groups.sort_by(|a, b| a.0.total_cmp(&b.0).then(lowest_id(&a.1).cmp(&lowest_id(&b.1))));
    groups
        .into_iter()
        .flat_map(|(_, members)| members.into_iter().map(|(_, id)| id))
        .collect()
}

fn lowest_id(members: &[(f64, NodeId)]) -> NodeId {
    members.iter().map(|(_, id)| *id).min().unwrap_or(NodeId(u64::MAX))
}

/// Lazy lexicographic permutations of `0..len`.
///
/// Permutations come out grouped by their first index, so a consumer can
/// stop early or restart at any lead with [`Permutations::starting_with`].
#[derive(Debug, Clone)]
pub struct Permutations {
    current: Vec<usize>,
    finished: bool,
}

impl Permutations {
    pub fn new(len: usize) -> Self {
        Self {
            current: (0..len).collect(),
            finished: false,
        }
    }

    /// Starts at the first permutation whose lead is `lead`.
    pub fn starting_with(len: usize, lead: usize) -> Self {
        if lead >= len {
            return Self {
                current: Vec::new(),
                finished: true,
            };
        }
        let current = std::iter::once(lead)
            .chain((0..len).filter(|&index| index != lead))
            .collect();
        Self {
            current,
            finished: false,
        }
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.current.clone();
        self.finished = !advance(&mut self.current);
        Some(result)
    }
}

// Steps to the next lexicographic permutation; false once the last one is passed.
fn advance(values: &mut [usize]) -> bool {
    let Some(pivot) = values.windows(2).rposition(|pair| pair[0] < pair[1]) else {
        return false;
    };
    let Some(successor) = values.iter().rposition(|&v| v > values[pivot]) else {
        return false;
    };
    values.swap(pivot, successor);
    values[pivot + 1..].reverse();
    true
}

/// `n!`, or `None` once it no longer fits in a `u64`.
pub fn factorial(n: usize) -> Option<u64> {
    (1..=n as u64).try_fold(1u64, |acc, k| acc.checked_mul(k))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetOutcome {
    pub best: SearchResult,
    /// Complete harvest orders covered, explicitly or through the exact search.
    pub evaluated: u64,
    /// True when the whole order space was covered.
    pub exact: bool,
    pub exhausted: bool,
}

/// Caps how many complete harvest orders a planning pass may look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermutationBudget {
    max_permutations: u64,
}

impl PermutationBudget {
    pub const fn new(max_permutations: u64) -> Self {
        Self { max_permutations }
    }

    pub const fn max_permutations(&self) -> u64 {
        self.max_permutations
    }

    /// Best harvest order for `items` within the budget.
    ///
    /// `order` is the priority order from [`priority_order`] and must name
    /// every item exactly once.
    pub fn search(
        &self,
        optimizer: &mut HarvestOptimizer<'_>,
        items: &[WorkingItem],
        order: &[NodeId],
    ) -> BudgetOutcome {
        if self.max_permutations == 0 {
            warn!("permutation budget is zero; no harvest order evaluated");
            return BudgetOutcome {
                best: SearchResult::default(),
                evaluated: 0,
                exact: items.is_empty(),
                exhausted: true,
            };
        }

        let by_id: HashMap<NodeId, &WorkingItem> = items.iter().map(|item| (item.id, item)).collect();
        let ordered: Vec<WorkingItem> = order
            .iter()
            .filter_map(|id| by_id.get(id).map(|item| **item))
            .collect();
        assert_eq!(
            ordered.len(),
            items.len(),
            "priority order must name every plot exactly once"
        );

        match factorial(ordered.len()) {
            Some(total) if total <= self.max_permutations => {
                debug!(plots = ordered.len(), orders = total, "order space fits the budget");
                BudgetOutcome {
                    best: optimizer.solve(&ordered),
                    evaluated: total,
                    exact: true,
                    exhausted: false,
                }
            }
            _ => self.enumerate(optimizer, &ordered),
        }
    }

    fn enumerate(&self, optimizer: &mut HarvestOptimizer<'_>, ordered: &[WorkingItem]) -> BudgetOutcome {
        let len = ordered.len();
        let mut remaining = self.max_permutations;
        let mut best = SearchResult {
            value: f64::NEG_INFINITY,
            sequence: Vec::new(),
        };

        for lead in 0..len {
            if remaining == 0 {
                break;
            }
            // Leftover share from cheaper leads rolls over to the pricier ones.
            let leads_left = (len - lead) as u64;
            let allowance = (remaining / leads_left).max(1).min(remaining);
            let allowance = usize::try_from(allowance).unwrap_or(usize::MAX);

            // Fixed-order memo is scoped to one lead.
            optimizer.clear_fixed_orders();
            let mut used = 0u64;
            for permutation in Permutations::starting_with(len, lead)
                .take_while(|permutation| permutation[0] == lead)
                .take(allowance)
            {
                let candidate: Vec<WorkingItem> = permutation.iter().map(|&index| ordered[index]).collect();
                let result = optimizer.evaluate_order(&candidate);
                used += 1;
                if result.value > best.value {
                    best = result;
                }
            }
            remaining -= used;
        }

        let evaluated = self.max_permutations - remaining;
        info!(
            evaluated,
            budget = self.max_permutations,
            value = best.value,
            "permutation budget exhausted; keeping best order found"
        );
        BudgetOutcome {
            best,
            evaluated,
            exact: false,
            exhausted: true,
        }
    }
}
