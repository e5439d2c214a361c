use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use harvest_picker::sequencer::factorial;
use harvest_picker::{
    plan_working_set, Config, NodeId, PairLinks, PlanContext, PriceBook, SeedType, WorkingItem, YieldData,
    DEFAULT_CONFIG_PATH,
};

#[derive(Debug, Parser)]
#[command(name = "survey", version)]
#[command(about = "Expected harvest value of every possible grove composition, written to CSV")]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Cached price snapshot (JSON). Without one every colour is worth 1c.
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Chance for the other plot of a pair to survive, in percent
    #[arg(long, default_value_t = 0.0)]
    survival_pct: f64,

    /// Directory the CSV files are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

/// Colour mix of one irrigator pair. Vivid is yellow, primal blue, wild purple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PairKind {
    YY,
    BB,
    PP,
    YB,
    YP,
    BP,
}

const PAIR_KINDS: [PairKind; 6] = [
    PairKind::YY,
    PairKind::BB,
    PairKind::PP,
    PairKind::YB,
    PairKind::YP,
    PairKind::BP,
];

impl PairKind {
    fn colours(self) -> (SeedType, SeedType) {
        const Y: SeedType = SeedType::VIVID;
        const B: SeedType = SeedType::PRIMAL;
        const P: SeedType = SeedType::WILD;
        match self {
            Self::YY => (Y, Y),
            Self::BB => (B, B),
            Self::PP => (P, P),
            Self::YB => (Y, B),
            Self::YP => (Y, P),
            Self::BP => (B, P),
        }
    }
}

impl fmt::Display for PairKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// A grove is wholly defined by how many pairs of each kind it has.
type Composition = [u32; 6];

fn format_composition(composition: &Composition) -> String {
    PAIR_KINDS
        .iter()
        .zip(composition)
        .flat_map(|(kind, &count)| std::iter::repeat(kind.to_string()).take(count as usize))
        .collect::<Vec<_>>()
        .join(" ")
}

/// All ways of placing `k` balls into `n` bins.
struct BallsInBins {
    current: Vec<u32>,
    finished: bool,
}

impl BallsInBins {
    fn new(n: usize, k: u32) -> Self {
        let mut current = vec![0; n];
        if let Some(first) = current.first_mut() {
            *first = k;
        }
        Self {
            current,
            finished: n == 0 && k > 0,
        }
    }
}

impl Iterator for BallsInBins {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.current.clone();

        // Move one ball from the rightmost non-empty bin (excluding the last)
        // one step right, and gather everything behind it there.
        let n = self.current.len();
        let Some(i) = (0..n.saturating_sub(1)).rev().find(|&i| self.current[i] > 0) else {
            self.finished = true;
            return Some(result);
        };
        self.current[i] -= 1;
        let tail: u32 = self.current[i + 1..].iter().sum();
        self.current[i + 1..].iter_mut().for_each(|count| *count = 0);
        self.current[i + 1] = tail + 1;

        Some(result)
    }
}

fn weights_to_probs(reduced_y: f64, reduced_b: f64, reduced_p: f64) -> (f64, f64, f64) {
    let y = 1. - reduced_y;
    let b = 1. - reduced_b;
    let p = 1. - reduced_p;
    let sum = y + b + p;
    (y / sum, b / sum, p / sum)
}

/// Multinomial probability of drawing `composition` when each plot's colour
/// is drawn independently with probabilities `y`, `b` and `p`.
fn composition_probability(k: u32, y: f64, b: f64, p: f64, composition: &Composition) -> f64 {
    let pair_probs = [y * y, b * b, p * p, 2. * y * b, 2. * y * p, 2. * b * p];
    let fact = |n: u32| factorial(n as usize).map_or(f64::INFINITY, |v| v as f64);

    let mut prob = fact(k);
    for (&count, pair_prob) in composition.iter().zip(pair_probs) {
        prob *= pair_prob.powi(count as i32) / fact(count);
    }
    prob
}

// Seeds per plot used for every synthetic grove.
const SAMPLE_TIERS: [f64; 4] = [20.0, 6.0, 1.0, 0.0];

/// Synthetic grove: two plots per pair, ids counting up from 1.
fn synthetic_grove(composition: &Composition) -> (Vec<WorkingItem>, PairLinks) {
    let mut items = Vec::new();
    let mut links = PairLinks::new();
    let mut next_id = 1;
    for (kind, &count) in PAIR_KINDS.iter().zip(composition) {
        for _ in 0..count {
            let (first, second) = kind.colours();
            let (a, b) = (NodeId(next_id), NodeId(next_id + 1));
            next_id += 2;
            items.push(WorkingItem::new(a, YieldData::new(first, SAMPLE_TIERS)));
            items.push(WorkingItem::new(b, YieldData::new(second, SAMPLE_TIERS)));
            links.link(a, b);
        }
    }
    (items, links)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config).context("loading config")?;
    let prices = match &args.prices {
        Some(path) => PriceBook::load_cached(path)?.map(|cached| cached.book),
        None => None,
    }
    .unwrap_or(PriceBook {
        wild: 1.0,
        vivid: 1.0,
        primal: 1.0,
        sacred: 1.0,
    });
    let ctx = PlanContext {
        config: &config,
        prices: Some(&prices),
        survival_chance: (args.survival_pct / 100.0).clamp(0.0, 1.0),
        crop_rotation: true,
    };

    for y_r in [0.45, 0.35, 0.25, 0.0] {
        for b_r in [0.45, 0.35, 0.25, 0.0] {
            for p_r in [0.45, 0.35, 0.25, 0.0] {
                let filename = args.out_dir.join(format!(
                    "y{}_b{}_p{}.csv",
                    (y_r * 100.) as u32,
                    (b_r * 100.) as u32,
                    (p_r * 100.) as u32
                ));
                let file = File::create(&filename).with_context(|| format!("creating {}", filename.display()))?;
                let mut out = BufWriter::new(file);
                info!(path = %filename.display(), "writing survey");

                let (y, b, p) = weights_to_probs(y_r, b_r, p_r);
                writeln!(out, "composition,probability,expected_value,exact")?;

                // 3 or 4 pairs on a coin flip, plus another flip for Bumper Crop.
                for (k, weight) in [(3, 0.25), (4, 0.50), (5, 0.25)] {
                    let cases: Vec<Vec<u32>> = BallsInBins::new(PAIR_KINDS.len(), k).collect();
                    let rows: Vec<String> = cases
                        .into_par_iter()
                        .map(|case| {
                            let composition: Composition = [case[0], case[1], case[2], case[3], case[4], case[5]];
                            let (items, links) = synthetic_grove(&composition);
                            let plan = plan_working_set(&items, &links, &ctx);
                            format!(
                                "{},{},{:.2},{}",
                                format_composition(&composition),
                                weight * composition_probability(k, y, b, p, &composition),
                                plan.value,
                                plan.exact
                            )
                        })
                        .collect();

                    for row in rows {
                        writeln!(out, "{row}")?;
                    }
                }
                out.flush()?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn balls_in_bins_enumerates_multisets() {
        let all: Vec<Vec<u32>> = BallsInBins::new(3, 1).collect();
        assert_eq!(all, vec![vec![1, 0, 0], vec![0, 1, 0], vec![0, 0, 1]]);

        // C(6 + 3 - 1, 3)
        let groves: Vec<Vec<u32>> = BallsInBins::new(6, 3).collect();
        assert_eq!(groves.len(), 56);
        assert!(groves.iter().all(|g| g.iter().sum::<u32>() == 3));
    }

    #[test]
    fn probability_of_two_pair_groves() {
        let (y, b, p) = (0.5, 0.3, 0.2);

        // YY YY: 0.25^2
        assert!((composition_probability(2, y, b, p, &[2, 0, 0, 0, 0, 0]) - 0.0625).abs() < EPSILON);
        // YY BB: 2 * 0.25 * 0.09
        assert!((composition_probability(2, y, b, p, &[1, 1, 0, 0, 0, 0]) - 0.045).abs() < EPSILON);
        // YB YP: 2 * 0.30 * 0.20
        assert!((composition_probability(2, y, b, p, &[0, 0, 0, 1, 1, 0]) - 0.12).abs() < EPSILON);
    }

    #[test]
    fn probabilities_sum_to_one() {
        for (y_r, b_r, p_r) in [(0.0, 0.0, 0.0), (0.45, 0.25, 0.0), (0.35, 0.35, 0.45)] {
            let (y, b, p) = weights_to_probs(y_r, b_r, p_r);
            for k in [3, 4, 5] {
                let total: f64 = BallsInBins::new(6, k)
                    .map(|case| {
                        let composition: Composition = [case[0], case[1], case[2], case[3], case[4], case[5]];
                        composition_probability(k, y, b, p, &composition)
                    })
                    .sum();
                assert!((total - 1.0).abs() < EPSILON, "k={k}: {total}");
            }
        }
    }

    #[test]
    fn synthetic_grove_links_each_pair() {
        let (items, links) = synthetic_grove(&[1, 0, 0, 0, 0, 2]);
        assert_eq!(items.len(), 6);
        assert_eq!(links.len(), 3);
        assert_eq!(links.partner(NodeId(1)), Some(NodeId(2)));
        assert_eq!(items[0].data.kind, SeedType::VIVID);
        assert_eq!(items[3].data.kind, SeedType::WILD);
        assert_eq!(format_composition(&[1, 0, 0, 0, 0, 2]), "YY BP BP");
    }
}
