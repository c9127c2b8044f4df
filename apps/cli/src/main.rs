#![deny(warnings)]

//! Headless CLI: wires the ledger, deck and crafting engines together, runs
//! a scripted scenario for a few days and prints a KPI summary.

use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sim_core::{
    validate_book, validate_config, CardId, CardKind, CardLibrary, CardTemplate, CraftedItem,
    EffectKind, GameConfig, GameEvent, ItemId, MaterialInstance, MaterialRequirement,
    MaterialTypeId, OutputSpec, Phase, QualityGrade, RecipeBook, RecipeDefinition, RecipeId,
};
use sim_craft::craft_from_book;
use sim_deck::DeckEngine;
use sim_events::EventBus;
use sim_ledger::Ledger;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    seed: u64,
    days: u32,
    save: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args {
        seed: 42,
        days: 7,
        save: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--seed" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.seed = v;
                }
            }
            "--days" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.days = v;
                }
            }
            "--save" => args.save = it.next().map(PathBuf::from),
            _ => {}
        }
    }
    args
}

fn demo_library() -> CardLibrary {
    CardLibrary::from_templates([
        CardTemplate {
            id: CardId("herb_run".into()),
            name: "Herb Run".into(),
            cost: 1,
            kind: CardKind::Gathering {
                material_pool: vec![
                    MaterialTypeId("silver_herb".into()),
                    MaterialTypeId("moon_blossom".into()),
                ],
            },
        },
        CardTemplate {
            id: CardId("ore_dig".into()),
            name: "Ore Dig".into(),
            cost: 2,
            kind: CardKind::Gathering {
                material_pool: vec![MaterialTypeId("iron_ore".into())],
            },
        },
        CardTemplate {
            id: CardId("brew_tonic".into()),
            name: "Brew Tonic".into(),
            cost: 2,
            kind: CardKind::Recipe {
                recipe: RecipeId("tonic_of_clarity".into()),
            },
        },
        CardTemplate {
            id: CardId("lucky_ladle".into()),
            name: "Lucky Ladle".into(),
            cost: 1,
            kind: CardKind::Enhancement {
                effect: EffectKind::QualityBoost,
            },
        },
    ])
}

fn demo_book() -> RecipeBook {
    RecipeBook::from_recipes([
        RecipeDefinition {
            id: RecipeId("tonic_of_clarity".into()),
            required: vec![
                MaterialRequirement {
                    material_type: MaterialTypeId("silver_herb".into()),
                    quantity: 2,
                    min_quality: None,
                },
                MaterialRequirement {
                    material_type: MaterialTypeId("iron_ore".into()),
                    quantity: 1,
                    min_quality: Some(QualityGrade::Common),
                },
            ],
            output: OutputSpec {
                name: "Tonic of Clarity".into(),
                base_value: 60,
            },
        },
        RecipeDefinition {
            id: RecipeId("moon_charm".into()),
            required: vec![MaterialRequirement {
                material_type: MaterialTypeId("moon_blossom".into()),
                quantity: 3,
                min_quality: None,
            }],
            output: OutputSpec {
                name: "Moon Charm".into(),
                base_value: 90,
            },
        },
    ])
}

fn starting_deck() -> Vec<CardId> {
    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(CardId("herb_run".into()));
    }
    for _ in 0..3 {
        ids.push(CardId("ore_dig".into()));
    }
    for _ in 0..2 {
        ids.push(CardId("brew_tonic".into()));
    }
    ids.push(CardId("lucky_ladle".into()));
    ids
}

fn random_quality(rng: &mut ChaCha8Rng) -> QualityGrade {
    QualityGrade::ALL[rng.gen_range(0..QualityGrade::ALL.len())]
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(seed = args.seed, days = args.days, "starting CLI");

    let config = GameConfig::default();
    validate_config(&config)?;
    let book = demo_book();
    validate_book(&book)?;
    let library = Rc::new(demo_library());

    let events: Rc<EventBus<GameEvent>> = Rc::new(EventBus::new());
    events.subscribe(|e: &GameEvent| debug!(?e, "event"));

    let mut ledger = Ledger::new(config.clone(), Rc::clone(&events));
    let mut deck = DeckEngine::new(Rc::clone(&library), &config, args.seed, events);
    deck.initialize(&starting_deck())?;

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut next_item = 0u64;
    let mut id_gen = move || {
        next_item += 1;
        ItemId(format!("item-{next_item}"))
    };

    let mut inventory: Vec<MaterialInstance> = Vec::new();
    let mut crafted_total = 0u32;

    for _ in 0..args.days {
        if ledger.state().remaining_days == 0 {
            break;
        }

        // Gathering: play every affordable gathering card in hand.
        ledger.set_phase(Phase::Gathering)?;
        deck.refill_hand();
        let hand: Vec<(CardId, u32, CardKind)> = deck
            .hand()
            .iter()
            .map(|c| {
                let t = c.template();
                (t.id.clone(), t.cost, t.kind.clone())
            })
            .collect();
        for (id, cost, kind) in hand {
            let CardKind::Gathering { material_pool } = kind else {
                continue;
            };
            if !ledger.spend_action_points(cost)? {
                continue;
            }
            deck.play_card(&id)?;
            for material_type in material_pool {
                inventory.push(MaterialInstance {
                    id: id_gen(),
                    material_type,
                    quality: random_quality(&mut rng),
                });
            }
        }

        // Alchemy: resolve each recipe once if the inventory allows it.
        ledger.set_phase(Phase::Alchemy)?;
        let mut delivered: Vec<CraftedItem> = Vec::new();
        let recipe_ids: Vec<RecipeId> = book.iter().map(|r| r.id.clone()).collect();
        for recipe_id in recipe_ids {
            let result = craft_from_book(&book, &recipe_id, &inventory, &mut id_gen)?;
            if let Some(item) = result.item {
                inventory.retain(|m| !item.materials.contains(&m.id));
                delivered.push(item);
            }
        }

        // Delivery: collect gold and contribution for each finished item.
        ledger.set_phase(Phase::Delivery)?;
        for item in &delivered {
            let payout = item.output.base_value + 10 * item.quality.score() as u64;
            ledger.add_gold(payout)?;
            ledger.add_contribution(5 + 5 * item.quality.score())?;
            crafted_total += 1;
        }

        let state = ledger.state();
        println!(
            "Day {:>2} | gold: {:>5} | AP left: {} | rank: {:?} | gauge: {:>3} | crafted: {} | materials: {}",
            state.day,
            state.gold,
            state.action_points,
            state.rank,
            state.promotion_gauge,
            delivered.len(),
            inventory.len()
        );

        deck.discard_hand();
        ledger.set_phase(Phase::QuestAccept)?;
        ledger.advance_day();
    }

    let snapshot = ledger.export_snapshot();
    println!(
        "Scenario done | days played: {} | gold: {} | rank: {:?} | items crafted: {} | deck: {} cards",
        snapshot.day - 1,
        snapshot.gold,
        snapshot.rank,
        crafted_total,
        deck.total_cards()
    );

    if let Some(path) = args.save {
        persistence::save_snapshot(&path, &snapshot)?;
        println!("Snapshot written to {}", path.display());
    }

    Ok(())
}
