use std::cell::{Cell, RefCell};
use tracing::warn;

use crate::config::Config;
use crate::garden::Node;
use crate::prices::PriceBook;
use crate::yields::{SeedType, YieldData, TIER_COUNT};

/// Turns plot yields into chaos values for the current price snapshot.
///
/// Without prices every plot is worth zero; the search still runs, it just
/// has nothing to tell apart. Each diagnostic is reported once per valuator
/// so a long search doesn't flood the log.
#[derive(Debug)]
pub struct Valuator<'a> {
    multipliers: [f64; TIER_COUNT],
    sacred_chance: f64,
    prices: Option<&'a PriceBook>,
    missing_prices_reported: Cell<bool>,
    unknown_kinds_reported: RefCell<Vec<SeedType>>,
}

impl<'a> Valuator<'a> {
    pub fn new(config: &Config, prices: Option<&'a PriceBook>) -> Self {
        Self {
            multipliers: config.tier_multipliers(),
            sacred_chance: config.t4_sacred_chance,
            prices,
            missing_prices_reported: Cell::new(false),
            unknown_kinds_reported: RefCell::new(Vec::new()),
        }
    }

    pub fn value(&self, data: &YieldData) -> f64 {
        let Some(prices) = self.prices() else {
            return 0.0;
        };

        let unit = self.unit_price(prices, data.kind);
        let [t1, t2, t3, t4] = data.tiers;
        let [m1, m2, m3, m4] = self.multipliers;
        m1 * unit * t1
            + m2 * unit * t2
            + m3 * unit * t3
            + (m4 * unit + self.sacred_chance * prices.sacred) * t4
    }

    /// Values a plot seed by seed, without collapsing it into one colour.
    pub fn node_value(&self, node: &Node) -> f64 {
        let Some(prices) = self.prices() else {
            return 0.0;
        };
        let Some(stacks) = node.seeds.as_deref() else {
            warn!(node = %node.id, "node has no harvest component");
            return 0.0;
        };
        if stacks.iter().any(|stack| stack.seed.is_none()) {
            warn!(node = %node.id, "some seeds have no associated seed data");
            return 0.0;
        }

        stacks
            .iter()
            .filter_map(|stack| stack.seed.map(|info| (info, stack.count)))
            .map(|(info, count)| {
                let unit = self.unit_price(prices, info.kind);
                let per_seed = match info.tier {
                    1..=3 => self.multipliers[usize::from(info.tier) - 1] * unit,
                    4 => self.multipliers[3] * unit + self.sacred_chance * prices.sacred,
                    tier => {
                        warn!(node = %node.id, tier, "seed had unknown tier");
                        0.0
                    }
                };
                per_seed * f64::from(count)
            })
            .sum()
    }

    fn prices(&self) -> Option<&'a PriceBook> {
        if self.prices.is_none() && !self.missing_prices_reported.replace(true) {
            warn!("prices are still not loaded, unable to calculate values");
        }
        self.prices
    }

    fn unit_price(&self, prices: &PriceBook, kind: SeedType) -> f64 {
        prices.unit_price(kind).unwrap_or_else(|| {
            let mut reported = self.unknown_kinds_reported.borrow_mut();
            if !reported.contains(&kind) {
                warn!(%kind, "seed had unknown type");
                reported.push(kind);
            }
            0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::garden::{Position, SeedStack};

    const EPSILON: f64 = 1e-9;

    fn prices() -> PriceBook {
        PriceBook {
            wild: 2.0,
            vivid: 3.0,
            primal: 4.0,
            sacred: 50.0,
        }
    }

    #[test]
    fn values_each_tier_with_sacred_bonus_on_t4() {
        let prices = prices();
        let valuator = Valuator::new(&Config::default(), Some(&prices));
        let data = YieldData::new(SeedType::WILD, [10.0, 4.0, 1.0, 1.0]);

        // 0*2*10 + 5*2*4 + 100*2*1 + (500*2 + 0.1*50)*1
        assert!((valuator.value(&data) - 1245.0).abs() < EPSILON);
    }

    #[test]
    fn no_prices_means_zero() {
        let valuator = Valuator::new(&Config::default(), None);
        let data = YieldData::new(SeedType::VIVID, [10.0, 10.0, 10.0, 10.0]);
        assert_eq!(valuator.value(&data), 0.0);
        assert_eq!(valuator.value(&data), 0.0);
    }

    #[test]
    fn unknown_kind_is_priced_at_zero_but_keeps_sacred_bonus() {
        let prices = prices();
        let valuator = Valuator::new(&Config::default(), Some(&prices));
        let data = YieldData::new(SeedType(42), [10.0, 10.0, 10.0, 2.0]);
        assert!((valuator.value(&data) - 0.1 * 50.0 * 2.0).abs() < EPSILON);
    }

    #[test]
    fn node_value_mixes_colours_per_seed() {
        let prices = prices();
        let valuator = Valuator::new(&Config::default(), Some(&prices));
        let node = Node::new(
            3,
            Position::default(),
            vec![
                SeedStack::new(SeedType::VIVID, 2, 4),
                SeedStack::new(SeedType::PRIMAL, 3, 1),
                SeedStack::new(SeedType::WILD, 9, 100),
            ],
        );

        // 5*3*4 + 100*4*1, unknown tier ignored
        assert!((valuator.node_value(&node) - 460.0).abs() < EPSILON);
    }

    #[test]
    fn node_value_of_unreadable_plot_is_zero() {
        let prices = prices();
        let valuator = Valuator::new(&Config::default(), Some(&prices));
        let node = Node {
            seeds: None,
            ..Node::new(4, Position::default(), vec![])
        };
        assert_eq!(valuator.node_value(&node), 0.0);
    }
}
