//! Harvest order planning for Sacred Grove plots.
//!
//! Plots are paired by proximity, valued from the current lifeforce prices,
//! and an expected-value search picks the harvest order that makes the most
//! of crop rotation upgrades when paired plots may wither.

pub mod config;
pub mod error;
pub mod garden;
pub mod optimizer;
pub mod pairing;
pub mod planner;
pub mod prices;
pub mod sequencer;
pub mod upgrade;
pub mod valuation;
pub mod yields;

pub use config::{Config, DEFAULT_CONFIG_PATH};
pub use error::{Error, Result};
pub use garden::{Garden, Node, NodeId, Position, SeedInfo, SeedStack};
pub use optimizer::{remaining_after_harvest, HarvestOptimizer, SearchResult, SearchStats, WorkingItem};
pub use pairing::{pair_nodes, PairLinks, Pairing};
pub use planner::{plan_working_set, HarvestPlan, HarvestPlanner, PairValuation, PlanContext, Verdict};
pub use prices::{CachedPrices, CurrencyOverview, PriceBook};
pub use sequencer::{priority_order, BudgetOutcome, PermutationBudget, Permutations};
pub use upgrade::UpgradeModel;
pub use valuation::Valuator;
pub use yields::{extract, SeedType, YieldData, YieldKey};
