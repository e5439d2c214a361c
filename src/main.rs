use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use harvest_picker::{
    extract, pair_nodes, plan_working_set, remaining_after_harvest, Config, CurrencyOverview, Garden,
    HarvestPlan, HarvestPlanner, PairLinks, PairValuation, PlanContext, PriceBook, UpgradeModel, Valuator,
    Verdict, WorkingItem, DEFAULT_CONFIG_PATH,
};

#[derive(Debug, Parser)]
#[command(name = "harvest-picker", version)]
#[command(about = "Plans the harvest order of a Sacred Grove for the best expected lifeforce value")]
struct Args {
    /// Garden snapshot (JSON) to plan
    garden: PathBuf,

    /// Config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Cached price snapshot (JSON); refreshed when --overview is given
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Saved poe.ninja currency overview response to price from
    #[arg(long)]
    overview: Option<PathBuf>,

    /// Override the map's survival chance, in percent
    #[arg(long)]
    survival_pct: Option<f64>,

    /// Print the plan as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Walk through the harvest turn by turn, replanning after each plot
    #[arg(long)]
    interactive: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config).context("loading config")?;
    let garden = Garden::load(&args.garden)
        .with_context(|| format!("loading garden snapshot {}", args.garden.display()))?;
    let prices = load_prices(&args, &config)?;

    let survival_chance = args
        .survival_pct
        .map(|pct| (pct / 100.0).clamp(0.0, 1.0))
        .unwrap_or_else(|| garden.survival_chance());
    let ctx = PlanContext {
        config: &config,
        prices: prices.as_ref(),
        survival_chance,
        crop_rotation: garden.crop_rotation,
    };
    info!(
        plots = garden.nodes.len(),
        survival_chance,
        crop_rotation = garden.crop_rotation,
        "garden loaded"
    );

    let mut planner = HarvestPlanner::new();
    planner.update(&garden.nodes, &ctx)?;

    let Some(plan) = planner.plan() else {
        print_pairs(planner.pairs());
        println!("Crop rotation is not active on this map; nothing to plan.");
        return Ok(());
    };

    if args.json {
        let report = serde_json::json!({ "pairs": planner.pairs(), "plan": plan });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_pairs(planner.pairs());
        print_plan(plan);
    }

    if args.interactive {
        run_interactive(&garden, &ctx)?;
    }
    Ok(())
}

fn load_prices(args: &Args, config: &Config) -> Result<Option<PriceBook>> {
    if let Some(path) = &args.overview {
        let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let book = PriceBook::from_overview(&CurrencyOverview::from_json(&json)?);
        if let Some(cache) = &args.prices {
            book.save(cache)?;
            info!(path = %cache.display(), "price cache refreshed");
        }
        return Ok(Some(book));
    }

    let Some(cache) = &args.prices else {
        warn!("no price source given; every plot is worth zero");
        return Ok(None);
    };
    let Some(cached) = PriceBook::load_cached(cache)? else {
        return Ok(None);
    };
    if cached.is_stale(config.price_refresh_minutes) {
        warn!(
            league = %config.league,
            age_minutes = cached.age.as_secs() / 60,
            "cached prices are stale"
        );
    }
    Ok(Some(cached.book))
}

fn verdict_label(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Better => "better",
        Verdict::Worse => "worse",
        Verdict::Even => "even",
        Verdict::Unpaired => "alone",
    }
}

fn print_pairs(pairs: &[PairValuation]) {
    println!("=== Irrigator pairs ===");
    for pair in pairs {
        let (mine, theirs) = pair.verdicts();
        match (pair.partner, theirs) {
            (Some((partner, value)), Some(theirs)) => println!(
                "{} {:.1}c ({}) <-> {} {:.1}c ({})",
                pair.node,
                pair.value,
                verdict_label(mine),
                partner,
                value,
                verdict_label(theirs)
            ),
            _ => println!("{} {:.1}c ({})", pair.node, pair.value, verdict_label(mine)),
        }
    }
    println!();
}

fn print_plan(plan: &HarvestPlan) {
    println!("=== Harvest plan ===");
    println!("EV: {:.1}c", plan.value);
    if !plan.exact {
        println!(
            "(best of {} harvest orders; raise max_permutations for an exact answer)",
            plan.permutations_evaluated
        );
    }
    for (step, id) in plan.sequence.iter().enumerate() {
        println!("{:>3}. {}", step + 1, id);
    }
    println!();
}

fn prompt(question: &str) -> Result<Option<String>> {
    print!("{question}");
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_lowercase()))
}

fn run_interactive(garden: &Garden, ctx: &PlanContext<'_>) -> Result<()> {
    let links = PairLinks::from_pairings(&pair_nodes(&garden.nodes, ctx.config.max_pair_distance));
    let upgrades = UpgradeModel::from_config(ctx.config);
    let valuator = Valuator::new(ctx.config, ctx.prices);
    let initial: Vec<WorkingItem> = garden
        .nodes
        .iter()
        .map(|node| WorkingItem::new(node.id, extract(node)))
        .collect();

    let mut items = initial.clone();
    let mut turn = 1;
    let mut collected = 0.0;

    loop {
        if items.is_empty() {
            println!("All plots harvested. Collected about {collected:.1}c.");
            return Ok(());
        }

        let plan = plan_working_set(&items, &links, ctx);
        println!("=== TURN {turn} ===");
        println!("Collected so far: {collected:.1}c");
        println!("EV of what is left: {:.1}c", plan.value);
        let Some(next) = plan.next() else {
            println!("No harvest order found; check max_permutations.");
            return Ok(());
        };
        let chosen = items
            .iter()
            .position(|item| item.id == next)
            .context("planned plot is not in the working set")?;
        println!("\nHARVEST NEXT: {} ({})\n", next, items[chosen].data.kind);

        let partner = links
            .partner(next)
            .filter(|partner| items.iter().any(|item| item.id == *partner));
        let question = match partner {
            Some(partner) => format!("Did {partner} wither? (y/N, reset) "),
            None => "Press enter once harvested (or reset) ".to_string(),
        };
        let Some(answer) = prompt(&question)? else {
            return Ok(());
        };
        if answer == "reset" {
            println!("Starting over from the snapshot.\n");
            items = initial.clone();
            turn = 1;
            collected = 0.0;
            continue;
        }

        let wilted = partner.filter(|_| answer.starts_with('y'));
        collected += valuator.value(&items[chosen].data);
        items = remaining_after_harvest(&items, chosen, wilted, &upgrades);
        turn += 1;
    }
}
