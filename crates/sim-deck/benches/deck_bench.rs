use criterion::{criterion_group, criterion_main, Criterion};
use sim_core::{CardId, CardKind, CardLibrary, CardTemplate, EffectKind, GameConfig};
use sim_deck::DeckEngine;
use sim_events::EventBus;
use std::rc::Rc;

fn build_engine(n: usize) -> DeckEngine {
    let templates = (0..n).map(|i| CardTemplate {
        id: CardId(format!("c{i}")),
        name: format!("Card {i}"),
        cost: 1,
        kind: CardKind::Enhancement {
            effect: EffectKind::ExtraDraw,
        },
    });
    let library = Rc::new(CardLibrary::from_templates(templates));
    let config = GameConfig {
        max_deck_size: n,
        ..GameConfig::default()
    };
    let mut engine = DeckEngine::new(library, &config, 42, Rc::new(EventBus::new()));
    let ids: Vec<CardId> = (0..n).map(|i| CardId(format!("c{i}"))).collect();
    engine.initialize(&ids).unwrap();
    engine
}

fn bench_shuffle_draw_cycle(c: &mut Criterion) {
    let mut engine = build_engine(30);
    c.bench_function("shuffle + full draw cycle, 30 cards", |b| {
        b.iter(|| {
            engine.shuffle();
            engine.draw(5);
            engine.discard_hand();
        })
    });
}

criterion_group!(benches, bench_shuffle_draw_cycle);
criterion_main!(benches);
