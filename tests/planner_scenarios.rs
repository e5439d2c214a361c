use harvest_picker::{
    extract, pair_nodes, plan_working_set, remaining_after_harvest, Config, Garden, HarvestPlanner, NodeId,
    PairLinks, PlanContext, PriceBook, UpgradeModel, Valuator, WorkingItem,
};

const EPSILON: f64 = 1e-6;

const TWO_PLOTS: &str = r#"{
    "survival_chance_pct": 50,
    "crop_rotation": true,
    "nodes": [
        {"id": 1, "position": {"x": 0, "y": 0},
         "seeds": [{"seed": {"kind": 1, "tier": 1}, "count": 10}]},
        {"id": 2, "position": {"x": 30, "y": 40},
         "seeds": [{"seed": {"kind": 2, "tier": 1}, "count": 20}]}
    ]
}"#;

const FLAT_CONFIG: &str = r#"
seeds_per_t1_plant = 1.0
t1_upgrade_chance = 0.0
t2_upgrade_chance = 0.0
t3_upgrade_chance = 0.0
"#;

fn unit_prices() -> PriceBook {
    PriceBook {
        wild: 1.0,
        vivid: 1.0,
        primal: 1.0,
        sacred: 1.0,
    }
}

fn stack(kind: u32, tier: u8, count: u32) -> String {
    format!(r#"{{"seed": {{"kind": {kind}, "tier": {tier}}}, "count": {count}}}"#)
}

// Pairs 1000 units apart, plots within a pair 40 apart.
fn grove_json(pairs: &[[(u32, u32); 2]], survival_pct: f64) -> String {
    let mut nodes = Vec::new();
    let mut id = 1;
    for (index, pair) in pairs.iter().enumerate() {
        for (offset, (kind, count)) in pair.iter().enumerate() {
            let x = index as f64 * 1000.0 + offset as f64 * 40.0;
            nodes.push(format!(
                r#"{{"id": {id}, "position": {{"x": {x}, "y": 0}}, "seeds": [{}, {}]}}"#,
                stack(*kind, 1, *count),
                stack(*kind, 2, count / 4)
            ));
            id += 1;
        }
    }
    format!(
        r#"{{"survival_chance_pct": {survival_pct}, "nodes": [{}]}}"#,
        nodes.join(",")
    )
}

#[test]
fn snapshot_to_plan() {
    let garden = Garden::from_json(TWO_PLOTS).unwrap();
    let config = Config::from_toml_str(FLAT_CONFIG).unwrap();
    let prices = unit_prices();
    let ctx = PlanContext {
        config: &config,
        prices: Some(&prices),
        survival_chance: garden.survival_chance(),
        crop_rotation: garden.crop_rotation,
    };

    let mut planner = HarvestPlanner::new();
    assert!(planner.update(&garden.nodes, &ctx).unwrap());

    let plan = planner.plan().unwrap();
    assert!((plan.value - 25.0).abs() < EPSILON);
    assert_eq!(plan.sequence, vec![NodeId(2), NodeId(1)]);
    assert_eq!(planner.pairs().len(), 1);
}

#[test]
fn tight_budget_never_beats_the_exact_plan() {
    let garden = Garden::from_json(&grove_json(
        &[[(1, 12), (2, 30)], [(3, 8), (3, 20)], [(2, 16), (1, 4)], [(3, 40), (2, 2)]],
        40.0,
    ))
    .unwrap();
    let prices = unit_prices();

    let exact_config = Config::default();
    let tight_config = Config {
        max_permutations: 100,
        ..Config::default()
    };
    let plan_with = |config: &Config| {
        let ctx = PlanContext {
            config,
            prices: Some(&prices),
            survival_chance: garden.survival_chance(),
            crop_rotation: true,
        };
        let mut planner = HarvestPlanner::new();
        planner.update(&garden.nodes, &ctx).unwrap();
        planner.plan().cloned().unwrap()
    };

    let exact = plan_with(&exact_config);
    let tight = plan_with(&tight_config);

    assert!(exact.exact);
    assert_eq!(exact.permutations_evaluated, 40_320);
    assert!(!tight.exact);
    assert_eq!(tight.permutations_evaluated, 100);
    assert_eq!(tight.sequence.len(), 8);
    assert!(tight.value > 0.0);
    assert!(tight.value <= exact.value + EPSILON);
}

#[test]
fn plan_value_splits_over_the_first_harvest() {
    let garden = Garden::from_json(&grove_json(
        &[[(1, 12), (2, 30)], [(3, 8), (3, 20)], [(2, 16), (1, 4)]],
        35.0,
    ))
    .unwrap();
    let config = Config::default();
    let prices = unit_prices();
    let ctx = PlanContext {
        config: &config,
        prices: Some(&prices),
        survival_chance: garden.survival_chance(),
        crop_rotation: true,
    };

    let links = PairLinks::from_pairings(&pair_nodes(&garden.nodes, config.max_pair_distance));
    assert_eq!(links.len(), 3);
    let items: Vec<WorkingItem> = garden
        .nodes
        .iter()
        .map(|node| WorkingItem::new(node.id, extract(node)))
        .collect();
    let plan = plan_working_set(&items, &links, &ctx);
    assert!(plan.exact);

    let first = plan.next().unwrap();
    let chosen = items.iter().position(|item| item.id == first).unwrap();
    let partner = links.partner(first).unwrap();
    let upgrades = UpgradeModel::from_config(&config);
    let valuator = Valuator::new(&config, Some(&prices));

    let wilted = remaining_after_harvest(&items, chosen, Some(partner), &upgrades);
    let survived = remaining_after_harvest(&items, chosen, None, &upgrades);
    assert_eq!(wilted.len(), 4);
    assert_eq!(survived.len(), 5);

    let p = ctx.survival_chance;
    let replanned = valuator.value(&items[chosen].data)
        + (1.0 - p) * plan_working_set(&wilted, &links, &ctx).value
        + p * plan_working_set(&survived, &links, &ctx).value;
    assert!((plan.value - replanned).abs() < EPSILON * plan.value.max(1.0));
}

#[test]
fn unpaired_grove_is_worth_its_plain_sum_without_rotation_gains() {
    let config = Config::from_toml_str(FLAT_CONFIG).unwrap();
    let prices = unit_prices();
    let garden = Garden::from_json(
        r#"{"survival_chance_pct": 20, "nodes": [
            {"id": 7, "position": {"x": 0, "y": 0}, "seeds": [{"seed": {"kind": 1, "tier": 1}, "count": 5}]},
            {"id": 8, "position": {"x": 500, "y": 0}, "seeds": [{"seed": {"kind": 2, "tier": 1}, "count": 3}]},
            {"id": 9, "position": {"x": 0, "y": 500}, "seeds": [{"seed": {"kind": 3, "tier": 1}, "count": 8}]}
        ]}"#,
    )
    .unwrap();
    let ctx = PlanContext {
        config: &config,
        prices: Some(&prices),
        survival_chance: garden.survival_chance(),
        crop_rotation: true,
    };

    let mut planner = HarvestPlanner::new();
    planner.update(&garden.nodes, &ctx).unwrap();
    let plan = planner.plan().unwrap();

    assert!((plan.value - 16.0).abs() < EPSILON);
    assert_eq!(plan.sequence.len(), 3);
    assert!(planner.pairs().iter().all(|pair| pair.partner.is_none()));
}
