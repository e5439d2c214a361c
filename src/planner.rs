//! Planning pass driver: pairs the grove, values each pair for display and
//! recomputes the harvest plan whenever the grove's composition changes.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::garden::{ensure_unique_ids, Node, NodeId};
use crate::optimizer::{HarvestOptimizer, WorkingItem};
use crate::pairing::{pair_nodes, PairLinks};
use crate::prices::PriceBook;
use crate::sequencer::{priority_order, PermutationBudget};
use crate::upgrade::UpgradeModel;
use crate::valuation::Valuator;
use crate::yields::{extract, YieldData, YieldKey};

/// Everything a pass reads besides the nodes themselves.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub config: &'a Config,
    pub prices: Option<&'a PriceBook>,
    /// Chance in `[0, 1]` that a partner plot survives.
    pub survival_chance: f64,
    /// Whether the map upgrades other colours on harvest. No plan without it.
    pub crop_rotation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestPlan {
    pub value: f64,
    pub sequence: Vec<NodeId>,
    /// False when the permutation budget cut the search short.
    pub exact: bool,
    pub permutations_evaluated: u64,
}

impl HarvestPlan {
    /// Zero-based position of `id` in the recommended order.
    pub fn step_of(&self, id: NodeId) -> Option<usize> {
        self.sequence.iter().position(|step| *step == id)
    }

    pub fn next(&self) -> Option<NodeId> {
        self.sequence.first().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Better,
    Worse,
    Even,
    Unpaired,
}

/// Display value of one pairing: each plot valued seed by seed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairValuation {
    pub node: NodeId,
    pub value: f64,
    pub partner: Option<(NodeId, f64)>,
}

impl PairValuation {
    /// How each side compares to the other, first plot first.
    pub fn verdicts(&self) -> (Verdict, Option<Verdict>) {
        match self.partner {
            None => (Verdict::Unpaired, None),
            Some((_, other)) => {
                let (mine, theirs) = match self.value.total_cmp(&other) {
                    std::cmp::Ordering::Greater => (Verdict::Better, Verdict::Worse),
                    std::cmp::Ordering::Less => (Verdict::Worse, Verdict::Better),
                    std::cmp::Ordering::Equal => (Verdict::Even, Verdict::Even),
                };
                (mine, Some(theirs))
            }
        }
    }
}

// One pairing's yields, lower key first so pop order doesn't matter.
type Composition = (YieldKey, Option<YieldKey>);

#[derive(Debug, Clone, PartialEq)]
struct PassInputs {
    compositions: Vec<Composition>,
    survival_bits: u64,
    // Wild, vivid, primal and sacred prices; `None` until a snapshot loads.
    price_bits: Option<[u64; 4]>,
}

/// Keeps the last plan alive across passes and only replans on change.
#[derive(Debug, Default)]
pub struct HarvestPlanner {
    last_inputs: Option<PassInputs>,
    plan: Option<HarvestPlan>,
    pairs: Vec<PairValuation>,
}

impl HarvestPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything; the next [`update`](Self::update) replans.
    pub fn area_changed(&mut self) {
        self.last_inputs = None;
        self.plan = None;
        self.pairs.clear();
    }

    pub fn plan(&self) -> Option<&HarvestPlan> {
        self.plan.as_ref()
    }

    pub fn pairs(&self) -> &[PairValuation] {
        &self.pairs
    }

    /// Runs one pass over the current nodes. Returns whether a new plan was
    /// computed.
    pub fn update(&mut self, nodes: &[Node], ctx: &PlanContext<'_>) -> Result<bool> {
        ensure_unique_ids(nodes)?;

        let pairings = pair_nodes(nodes, ctx.config.max_pair_distance);
        let valuator = Valuator::new(ctx.config, ctx.prices);
        self.pairs = pairings
            .iter()
            .map(|pairing| PairValuation {
                node: pairing.first.id,
                value: valuator.node_value(pairing.first),
                partner: pairing
                    .second
                    .map(|second| (second.id, valuator.node_value(second))),
            })
            .collect();

        if !ctx.crop_rotation {
            if self.plan.take().is_some() {
                debug!("crop rotation inactive; dropping plan");
            }
            self.last_inputs = None;
            return Ok(false);
        }

        let items: Vec<WorkingItem> = nodes
            .iter()
            .map(|node| WorkingItem::new(node.id, extract(node)))
            .collect();
        let keys: HashMap<NodeId, YieldKey> = items.iter().map(|item| (item.id, item.data.key())).collect();
        let key_of = |node: &Node| keys.get(&node.id).copied().unwrap_or_else(|| YieldData::degraded().key());

        let mut compositions: Vec<Composition> = pairings
            .iter()
            .map(|pairing| {
                let first = key_of(pairing.first);
                match pairing.second.map(|second| key_of(second)) {
                    Some(second) if second < first => (second, Some(first)),
                    second => (first, second),
                }
            })
            .collect();
        compositions.sort_unstable();
        let inputs = PassInputs {
            compositions,
            survival_bits: ctx.survival_chance.to_bits(),
            price_bits: ctx
                .prices
                .map(|p| [p.wild, p.vivid, p.primal, p.sacred].map(f64::to_bits)),
        };
        if self.last_inputs.as_ref() == Some(&inputs) {
            return Ok(false);
        }

        let links = PairLinks::from_pairings(&pairings);
        let plan = plan_working_set(&items, &links, ctx);
        info!(
            plots = items.len(),
            pairs = links.len(),
            value = plan.value,
            exact = plan.exact,
            "harvest plan updated"
        );

        self.plan = Some(plan);
        self.last_inputs = Some(inputs);
        Ok(true)
    }
}

/// Plans a working set directly, for callers that track wilting themselves.
pub fn plan_working_set(items: &[WorkingItem], links: &PairLinks, ctx: &PlanContext<'_>) -> HarvestPlan {
    let valuator = Valuator::new(ctx.config, ctx.prices);
    let mut optimizer = HarvestOptimizer::new(
        &valuator,
        UpgradeModel::from_config(ctx.config),
        links,
        ctx.survival_chance,
    );

    let order = priority_order(items, links, &valuator);
    let outcome = PermutationBudget::new(ctx.config.max_permutations).search(&mut optimizer, items, &order);
    optimizer.stats().log(ctx.config.log_detailed);

    HarvestPlan {
        value: outcome.best.value,
        sequence: outcome.best.sequence,
        exact: outcome.exact,
        permutations_evaluated: outcome.evaluated,
    }
}
