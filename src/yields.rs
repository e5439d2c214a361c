use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::garden::Node;

pub const TIER_COUNT: usize = 4;

/// Seed colour as stored in the game's seed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedType(pub u32);

impl SeedType {
    /// Purple seeds, dropping Wild lifeforce.
    pub const WILD: Self = Self(1);
    /// Yellow seeds, dropping Vivid lifeforce.
    pub const VIVID: Self = Self(2);
    /// Blue seeds, dropping Primal lifeforce.
    pub const PRIMAL: Self = Self(3);
    /// White seeds, dropping Sacred lifeforce.
    pub const SACRED: Self = Self(4);

    /// Type assumed for plots whose seeds cannot be read.
    pub const FALLBACK: Self = Self::WILD;
}

impl fmt::Display for SeedType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::WILD => write!(f, "wild"),
            Self::VIVID => write!(f, "vivid"),
            Self::PRIMAL => write!(f, "primal"),
            Self::SACRED => write!(f, "sacred"),
            Self(other) => write!(f, "type {other}"),
        }
    }
}

/// What a plot will drop: its dominant colour and seed counts per tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldData {
    pub kind: SeedType,
    /// Seed counts for tiers 1 to 4.
    pub tiers: [f64; TIER_COUNT],
}

/// [`YieldData`] rounded to 1/1000 of a seed, usable as a hash key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YieldKey {
    kind: SeedType,
    tiers: [i64; TIER_COUNT],
}

const KEY_SCALE: f64 = 1000.0;

impl YieldData {
    pub const fn new(kind: SeedType, tiers: [f64; TIER_COUNT]) -> Self {
        Self { kind, tiers }
    }

    pub const fn degraded() -> Self {
        Self::new(SeedType::FALLBACK, [0.0; TIER_COUNT])
    }

    pub fn total(&self) -> f64 {
        self.tiers.iter().sum()
    }

    pub fn key(&self) -> YieldKey {
        YieldKey {
            kind: self.kind,
            tiers: self.tiers.map(|count| (count * KEY_SCALE).round() as i64),
        }
    }
}

fn tier_index(tier: u8) -> Option<usize> {
    match tier {
        1..=4 => Some(usize::from(tier) - 1),
        _ => None,
    }
}

/// Reads the yield of a plot.
///
/// Unreadable plots degrade to [`YieldData::degraded`] with a warning rather
/// than failing the pass.
pub fn extract(node: &Node) -> YieldData {
    let Some(stacks) = node.seeds.as_deref() else {
        warn!(node = %node.id, "node has no harvest component");
        return YieldData::degraded();
    };
    if stacks.is_empty() {
        warn!(node = %node.id, "node has no seeds");
        return YieldData::degraded();
    }

    let mut classified = Vec::with_capacity(stacks.len());
    for stack in stacks {
        match stack.seed {
            Some(info) => classified.push((info, stack.count)),
            None => {
                warn!(node = %node.id, "some seeds have no associated seed data");
                return YieldData::degraded();
            }
        }
    }

    let kind = dominant_kind(classified.iter().map(|(info, _)| info.kind));
    let mut tiers = [0.0; TIER_COUNT];
    for (info, count) in classified {
        match tier_index(info.tier) {
            Some(index) => tiers[index] += f64::from(count),
            None => warn!(node = %node.id, tier = info.tier, "seed had unknown tier"),
        }
    }

    YieldData::new(kind, tiers)
}

// Most frequent kind by stack count; the first kind to reach the maximum wins.
fn dominant_kind(kinds: impl Iterator<Item = SeedType>) -> SeedType {
    let mut counts: Vec<(SeedType, usize)> = Vec::new();
    for kind in kinds {
        match counts.iter_mut().find(|(seen, _)| *seen == kind) {
            Some((_, count)) => *count += 1,
            None => counts.push((kind, 1)),
        }
    }

    let mut best = (SeedType::FALLBACK, 0);
    for (kind, count) in counts {
        if count > best.1 {
            best = (kind, count);
        }
    }
    best.0
}
