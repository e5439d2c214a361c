//! Snapshot of the grove as handed over by the world reader: node ids,
//! positions and the seed stacks growing on each plot.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::yields::SeedType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Classification of a seed stack. Absent when the game has no data row for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedInfo {
    pub kind: SeedType,
    pub tier: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedStack {
    #[serde(default)]
    pub seed: Option<SeedInfo>,
    pub count: u32,
}

impl SeedStack {
    pub const fn new(kind: SeedType, tier: u8, count: u32) -> Self {
        Self {
            seed: Some(SeedInfo { kind, tier }),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub position: Position,
    /// `None` when the plot exposes no harvest component at all.
    #[serde(default)]
    pub seeds: Option<Vec<SeedStack>>,
}

impl Node {
    pub fn new(id: u64, position: Position, seeds: Vec<SeedStack>) -> Self {
        Self {
            id: NodeId(id),
            position,
            seeds: Some(seeds),
        }
    }
}

/// One read of the grove, plus the map modifiers that drive rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Garden {
    /// Map stat: chance for the other plot to not wither, in percent.
    #[serde(default)]
    pub survival_chance_pct: f64,
    /// Map stat: seeds of other colours upgrade on completing a plot.
    #[serde(default = "default_crop_rotation")]
    pub crop_rotation: bool,
    pub nodes: Vec<Node>,
}

const fn default_crop_rotation() -> bool {
    true
}

impl Garden {
    pub fn from_json(json: &str) -> Result<Self> {
        let garden: Self = serde_json::from_str(json)?;
        garden.validate()?;
        Ok(garden)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_unique_ids(&self.nodes)
    }

    pub fn survival_chance(&self) -> f64 {
        (self.survival_chance_pct / 100.0).clamp(0.0, 1.0)
    }
}

pub(crate) fn ensure_unique_ids(nodes: &[Node]) -> Result<()> {
    let mut seen = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !seen.insert(node.id) {
            return Err(Error::DuplicateNode(node.id));
        }
    }
    Ok(())
}
