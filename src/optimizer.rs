//! Expected-value search over harvest orders.
//!
//! Harvesting a plot collects its value, then its partner (if still standing)
//! wilts with probability `1 - p` and survives with probability `p`. Either
//! way every plot left standing is upgraded toward the harvested colour. The
//! search tries every standing plot as the next harvest and memoizes each
//! distinct standing set, so a sub-problem is solved at most once per pass.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, trace};

use crate::garden::NodeId;
use crate::pairing::PairLinks;
use crate::upgrade::UpgradeModel;
use crate::valuation::Valuator;
use crate::yields::{YieldData, YieldKey};

/// A standing plot as the search sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingItem {
    pub data: YieldData,
    pub id: NodeId,
}

impl WorkingItem {
    pub const fn new(id: NodeId, data: YieldData) -> Self {
        Self { data, id }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResult {
    pub value: f64,
    pub sequence: Vec<NodeId>,
}

/// The plots still standing after `items[chosen]` is harvested.
///
/// `wilted` names the partner that withered, if any. Everything that remains
/// is upgraded toward the harvested plot's colour.
pub fn remaining_after_harvest(
    items: &[WorkingItem],
    chosen: usize,
    wilted: Option<NodeId>,
    upgrades: &UpgradeModel,
) -> Vec<WorkingItem> {
    let target = items[chosen].data.kind;
    items
        .iter()
        .enumerate()
        .filter(|&(index, item)| index != chosen && Some(item.id) != wilted)
        .map(|(_, item)| WorkingItem::new(item.id, upgrades.upgrade(&item.data, target)))
        .collect()
}

// Structural key of a standing set: ids with rounded yields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey(Vec<(NodeId, YieldKey)>);

impl CacheKey {
    fn unordered(items: &[WorkingItem]) -> Self {
        let mut entries = Self::ordered(items).0;
        entries.sort_unstable_by_key(|(id, _)| *id);
        Self(entries)
    }

    fn ordered(items: &[WorkingItem]) -> Self {
        Self(items.iter().map(|item| (item.id, item.data.key())).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub pruned: u64,
    /// Fixed harvest orders scored through [`HarvestOptimizer::evaluate_order`].
    pub orders_evaluated: u64,
    pub calls_by_depth: BTreeMap<usize, u64>,
}

impl SearchStats {
    fn record_call(&mut self, depth: usize) {
        self.calls += 1;
        *self.calls_by_depth.entry(depth).or_default() += 1;
    }

    pub fn hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }

    pub fn log(&self, detailed: bool) {
        info!(
            calls = self.calls,
            pruned = self.pruned,
            cache_hits = self.cache_hits,
            cache_misses = self.cache_misses,
            hit_rate = format_args!("{:.1}%", self.hit_rate() * 100.0),
            orders = self.orders_evaluated,
            "search finished"
        );
        if detailed {
            for (depth, calls) in &self.calls_by_depth {
                info!(depth, calls, "calls by depth");
            }
        }
    }
}

/// Pass-scoped solver. Build one per planning pass and drop it afterwards:
/// its caches are only valid for the links and chance it was built with.
pub struct HarvestOptimizer<'a> {
    valuator: &'a Valuator<'a>,
    upgrades: UpgradeModel,
    links: &'a PairLinks,
    survival_chance: f64,
    solved: HashMap<CacheKey, SearchResult>,
    ordered: HashMap<CacheKey, f64>,
    stats: SearchStats,
}

impl<'a> HarvestOptimizer<'a> {
    pub fn new(
        valuator: &'a Valuator<'a>,
        upgrades: UpgradeModel,
        links: &'a PairLinks,
        survival_chance: f64,
    ) -> Self {
        Self {
            valuator,
            upgrades,
            links,
            survival_chance: survival_chance.clamp(0.0, 1.0),
            solved: HashMap::new(),
            ordered: HashMap::new(),
            stats: SearchStats::default(),
        }
    }

    pub const fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub const fn survival_chance(&self) -> f64 {
        self.survival_chance
    }

    pub fn clear_cache(&mut self) {
        self.solved.clear();
        self.ordered.clear();
        self.stats = SearchStats::default();
    }

    /// Drops memoized fixed-order suffixes, keeping stats and adaptive results.
    pub fn clear_fixed_orders(&mut self) {
        self.ordered.clear();
    }

    /// Number of memoized fixed-order suffixes.
    pub fn cached_orders(&self) -> usize {
        self.ordered.len()
    }

    /// Best expected value over all adaptive harvest orders, and the order
    /// that achieves it.
    ///
    /// The result does not depend on the order of `items`.
    ///
    /// # Panics
    ///
    /// If two items share a node id.
    pub fn solve(&mut self, items: &[WorkingItem]) -> SearchResult {
        assert_distinct(items);
        let mut canonical = items.to_vec();
        canonical.sort_by_key(|item| item.id);
        self.search(&canonical, 0)
    }

    /// Expected value of harvesting in exactly the given order, skipping
    /// plots that withered along the way.
    ///
    /// # Panics
    ///
    /// If two items share a node id.
    pub fn evaluate_order(&mut self, order: &[WorkingItem]) -> SearchResult {
        assert_distinct(order);
        self.stats.orders_evaluated += 1;
        SearchResult {
            value: self.expected_in_order(order, 0),
            sequence: order.iter().map(|item| item.id).collect(),
        }
    }

    fn search(&mut self, items: &[WorkingItem], depth: usize) -> SearchResult {
        self.stats.record_call(depth);
        if items.is_empty() {
            return SearchResult::default();
        }

        let key = CacheKey::unordered(items);
        if let Some(hit) = self.solved.get(&key) {
            self.stats.cache_hits += 1;
            trace!(depth, remaining = items.len(), "cache hit");
            return hit.clone();
        }
        self.stats.cache_misses += 1;

        let p = self.survival_chance;
        let mut best_value = f64::NEG_INFINITY;
        let mut best_sequence = Vec::new();

        for (index, chosen) in items.iter().enumerate() {
            let value_chosen = self.valuator.value(&chosen.data);
            let partner = self.standing_partner(chosen.id, items);

            let survived = match partner {
                Some(_) if p > 0.0 => {
                    let kept = remaining_after_harvest(items, index, None, &self.upgrades);
                    let outcome = self.search(&kept, depth + 1);
                    // Losing the partner can't beat keeping it, so this bounds
                    // every outcome of harvesting `chosen` now.
                    if value_chosen + outcome.value <= best_value {
                        self.stats.pruned += 1;
                        trace!(
                            depth,
                            node = %chosen.id,
                            bound = value_chosen + outcome.value,
                            best = best_value,
                            "pruned"
                        );
                        continue;
                    }
                    Some(outcome)
                }
                _ => None,
            };

            let wilted = remaining_after_harvest(items, index, partner, &self.upgrades);
            let wilt = self.search(&wilted, depth + 1);

            let expected = match &survived {
                Some(survive) => value_chosen + (1.0 - p) * wilt.value + p * survive.value,
                None => value_chosen + wilt.value,
            };

            if expected > best_value {
                best_value = expected;
                let tail = survived.map_or(wilt.sequence, |survive| survive.sequence);
                best_sequence = std::iter::once(chosen.id).chain(tail).collect();
                trace!(depth, node = %chosen.id, value = best_value, "new best");
            }
        }

        let result = SearchResult {
            value: best_value,
            sequence: best_sequence,
        };
        if depth == 0 {
            debug!(value = result.value, plots = items.len(), "solved");
        }
        self.solved.insert(key, result.clone());
        result
    }

    fn expected_in_order(&mut self, order: &[WorkingItem], depth: usize) -> f64 {
        self.stats.record_call(depth);
        let Some(chosen) = order.first() else {
            return 0.0;
        };

        let key = CacheKey::ordered(order);
        if let Some(&value) = self.ordered.get(&key) {
            self.stats.cache_hits += 1;
            return value;
        }
        self.stats.cache_misses += 1;

        let p = self.survival_chance;
        let value_chosen = self.valuator.value(&chosen.data);
        let partner = self.standing_partner(chosen.id, order);

        let wilted = remaining_after_harvest(order, 0, partner, &self.upgrades);
        let wilt = self.expected_in_order(&wilted, depth + 1);
        let expected = match partner {
            Some(_) if p > 0.0 => {
                let kept = remaining_after_harvest(order, 0, None, &self.upgrades);
                let survive = self.expected_in_order(&kept, depth + 1);
                value_chosen + (1.0 - p) * wilt + p * survive
            }
            _ => value_chosen + wilt,
        };

        self.ordered.insert(key, expected);
        expected
    }

    fn standing_partner(&self, id: NodeId, items: &[WorkingItem]) -> Option<NodeId> {
        self.links
            .partner(id)
            .filter(|partner| items.iter().any(|item| item.id == *partner))
    }
}

fn assert_distinct(items: &[WorkingItem]) {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        assert!(
            seen.insert(item.id),
            "node {} appears twice in one working set",
            item.id
        );
    }
}
