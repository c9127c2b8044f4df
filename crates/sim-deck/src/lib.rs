#![deny(warnings)]

//! Deck engine: draw pile, hand and discard pile with automatic reshuffle.
//!
//! Cards move between the three piles and are never copied or dropped; the
//! multiset union of the piles is invariant across every operation. The
//! shuffle RNG is seeded, so a given seed replays the same deck order.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sim_core::{CardId, CardLibrary, CardTemplate, GameConfig, GameEvent};
use sim_events::EventBus;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

/// A card instance resident in exactly one pile.
#[derive(Clone, Debug)]
pub struct Card {
    template: Rc<CardTemplate>,
}

impl Card {
    pub fn id(&self) -> &CardId {
        &self.template.id
    }

    pub fn template(&self) -> &CardTemplate {
        &self.template
    }
}

/// Errors produced by deck operations. An exhausted draw pile is not an
/// error; draws simply come up short.
#[derive(Debug, Error, PartialEq)]
pub enum DeckError {
    #[error("card {0} is not in hand")]
    CardNotInHand(CardId),
    #[error("unknown card id: {0}")]
    UnknownCard(CardId),
    #[error("deck is at its maximum size of {0}")]
    DeckFull(usize),
}

/// The three piles plus the master-data library they are built from.
///
/// The top of the draw pile is the end of its vector.
#[derive(Debug)]
pub struct DeckEngine {
    library: Rc<CardLibrary>,
    draw_pile: Vec<Card>,
    hand: Vec<Card>,
    discard_pile: Vec<Card>,
    hand_capacity: usize,
    max_deck_size: usize,
    rng: ChaCha8Rng,
    events: Rc<EventBus<GameEvent>>,
}

impl DeckEngine {
    pub fn new(
        library: Rc<CardLibrary>,
        config: &GameConfig,
        seed: u64,
        events: Rc<EventBus<GameEvent>>,
    ) -> Self {
        Self {
            library,
            draw_pile: Vec::new(),
            hand: Vec::new(),
            discard_pile: Vec::new(),
            hand_capacity: config.hand_capacity,
            max_deck_size: config.max_deck_size,
            rng: ChaCha8Rng::seed_from_u64(seed),
            events,
        }
    }

    /// Reset all piles, instantiate one card per id and shuffle the result
    /// into the draw pile.
    pub fn initialize(&mut self, card_ids: &[CardId]) -> Result<(), DeckError> {
        if card_ids.len() > self.max_deck_size {
            return Err(DeckError::DeckFull(self.max_deck_size));
        }
        let mut draw_pile = Vec::with_capacity(card_ids.len());
        for id in card_ids {
            let template = self
                .library
                .get(id)
                .ok_or_else(|| DeckError::UnknownCard(id.clone()))?;
            draw_pile.push(Card {
                template: Rc::new(template.clone()),
            });
        }
        self.draw_pile = draw_pile;
        self.hand.clear();
        self.discard_pile.clear();
        self.shuffle();
        Ok(())
    }

    /// In-place Fisher-Yates walk over the draw pile, from the last index
    /// down to 1, swapping with a uniformly chosen earlier-or-equal index.
    pub fn shuffle(&mut self) {
        for i in (1..self.draw_pile.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            self.draw_pile.swap(i, j);
        }
    }

    /// Draw up to `count` cards into the hand, recycling the discard pile
    /// into a reshuffled draw pile whenever the draw pile runs dry. Stops
    /// early once both piles are empty; the ids actually drawn come back.
    pub fn draw(&mut self, count: usize) -> Vec<CardId> {
        let mut drawn = Vec::new();
        for _ in 0..count {
            if self.draw_pile.is_empty() && !self.discard_pile.is_empty() {
                self.recycle_discard();
            }
            match self.draw_pile.pop() {
                Some(card) => {
                    drawn.push(card.id().clone());
                    self.hand.push(card);
                }
                None => break,
            }
        }
        if !drawn.is_empty() {
            self.events
                .publish(GameEvent::CardsDrawn { cards: drawn.clone() });
        }
        drawn
    }

    fn recycle_discard(&mut self) {
        debug!(count = self.discard_pile.len(), "reshuffling discard pile");
        self.draw_pile.append(&mut self.discard_pile);
        self.shuffle();
    }

    /// Move the first matching card from the hand to the discard pile.
    pub fn play_card(&mut self, card_id: &CardId) -> Result<(), DeckError> {
        let position = self
            .hand
            .iter()
            .position(|card| card.id() == card_id)
            .ok_or_else(|| DeckError::CardNotInHand(card_id.clone()))?;
        let card = self.hand.remove(position);
        self.discard_pile.push(card);
        self.events.publish(GameEvent::CardPlayed {
            card: card_id.clone(),
        });
        Ok(())
    }

    /// Move every card in the hand to the discard pile.
    pub fn discard_hand(&mut self) {
        if self.hand.is_empty() {
            return;
        }
        let moved: Vec<CardId> = self.hand.iter().map(|c| c.id().clone()).collect();
        self.discard_pile.append(&mut self.hand);
        self.events
            .publish(GameEvent::CardsDiscarded { cards: moved });
    }

    /// Top the hand back up to capacity.
    pub fn refill_hand(&mut self) -> usize {
        let need = self.hand_capacity.saturating_sub(self.hand.len());
        if need == 0 {
            return 0;
        }
        let drawn = self.draw(need).len();
        if drawn > 0 {
            self.events.publish(GameEvent::HandRefilled {
                count: drawn as u32,
            });
        }
        drawn
    }

    /// Deck-construction-time addition to the draw pile.
    pub fn add_card(&mut self, card_id: &CardId) -> Result<(), DeckError> {
        if self.total_cards() >= self.max_deck_size {
            return Err(DeckError::DeckFull(self.max_deck_size));
        }
        let template = self
            .library
            .get(card_id)
            .ok_or_else(|| DeckError::UnknownCard(card_id.clone()))?;
        self.draw_pile.push(Card {
            template: Rc::new(template.clone()),
        });
        Ok(())
    }

    /// Remove the first matching card from the draw pile; absent ids are a
    /// no-op. Returns whether a card was removed.
    pub fn remove_card(&mut self, card_id: &CardId) -> bool {
        match self.draw_pile.iter().position(|card| card.id() == card_id) {
            Some(position) => {
                self.draw_pile.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn draw_pile(&self) -> &[Card] {
        &self.draw_pile
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn discard_pile(&self) -> &[Card] {
        &self.discard_pile
    }

    pub fn hand_capacity(&self) -> usize {
        self.hand_capacity
    }

    /// Cards owned across all three piles.
    pub fn total_cards(&self) -> usize {
        self.draw_pile.len() + self.hand.len() + self.discard_pile.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{CardKind, EffectKind, MaterialTypeId};
    use std::cell::RefCell;

    fn library(n: usize) -> Rc<CardLibrary> {
        let templates = (0..n).map(|i| CardTemplate {
            id: CardId(format!("c{i}")),
            name: format!("Card {i}"),
            cost: 1,
            kind: if i % 2 == 0 {
                CardKind::Gathering {
                    material_pool: vec![MaterialTypeId("herb".into())],
                }
            } else {
                CardKind::Enhancement {
                    effect: EffectKind::ExtraDraw,
                }
            },
        });
        Rc::new(CardLibrary::from_templates(templates))
    }

    fn ids(n: usize) -> Vec<CardId> {
        (0..n).map(|i| CardId(format!("c{i}"))).collect()
    }

    fn engine(n: usize, seed: u64) -> DeckEngine {
        let mut engine = DeckEngine::new(
            library(n),
            &GameConfig::default(),
            seed,
            Rc::new(EventBus::new()),
        );
        engine.initialize(&ids(n)).unwrap();
        engine
    }

    fn engine_with_log(n: usize, seed: u64) -> (DeckEngine, Rc<RefCell<Vec<GameEvent>>>) {
        let events = Rc::new(EventBus::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        events.subscribe(move |e: &GameEvent| sink.borrow_mut().push(e.clone()));
        let mut engine = DeckEngine::new(library(n), &GameConfig::default(), seed, events);
        engine.initialize(&ids(n)).unwrap();
        (engine, log)
    }

    fn sorted_ids(cards: &[Card]) -> Vec<String> {
        let mut out: Vec<String> = cards.iter().map(|c| c.id().0.clone()).collect();
        out.sort();
        out
    }

    #[test]
    fn shuffle_preserves_the_multiset() {
        for n in [0usize, 1, 2, 10] {
            let mut engine = engine(n, 7);
            let before = sorted_ids(engine.draw_pile());
            engine.shuffle();
            assert_eq!(sorted_ids(engine.draw_pile()), before);
            assert_eq!(engine.total_cards(), n);
        }
    }

    #[test]
    fn same_seed_replays_the_same_order() {
        let a = engine(12, 99);
        let b = engine(12, 99);
        let order = |e: &DeckEngine| -> Vec<String> {
            e.draw_pile().iter().map(|c| c.id().0.clone()).collect()
        };
        assert_eq!(order(&a), order(&b));
    }

    #[test]
    fn draw_stops_at_available_cards_without_error() {
        let mut engine = engine(3, 1);
        let drawn = engine.draw(10);
        assert_eq!(drawn.len(), 3);
        assert_eq!(engine.hand().len(), 3);
        assert_eq!(engine.draw_pile().len(), 0);
        assert_eq!(engine.draw(5).len(), 0);
    }

    #[test]
    fn draw_recycles_discard_exactly_once_per_exhaustion() {
        let (mut engine, log) = engine_with_log(4, 3);
        engine.draw(4);
        engine.discard_hand();
        assert_eq!(engine.discard_pile().len(), 4);

        // Draw pile is empty, so this must silently recycle the discard pile.
        let drawn = engine.draw(2);
        assert_eq!(drawn.len(), 2);
        assert_eq!(engine.draw_pile().len(), 2);
        assert_eq!(engine.discard_pile().len(), 0);
        assert_eq!(engine.total_cards(), 4);

        let draws = log
            .borrow()
            .iter()
            .filter(|e| matches!(e, GameEvent::CardsDrawn { .. }))
            .count();
        assert_eq!(draws, 2);
    }

    #[test]
    fn play_card_moves_hand_to_discard() {
        let (mut engine, log) = engine_with_log(5, 2);
        engine.draw(3);
        let played = engine.hand()[0].id().clone();
        engine.play_card(&played).unwrap();
        assert_eq!(engine.hand().len(), 2);
        assert_eq!(engine.discard_pile().len(), 1);
        assert_eq!(engine.discard_pile()[0].id(), &played);
        assert!(log
            .borrow()
            .iter()
            .any(|e| e == &GameEvent::CardPlayed { card: played.clone() }));
    }

    #[test]
    fn playing_a_card_not_in_hand_fails() {
        let mut engine = engine(5, 2);
        engine.draw(2);
        let absent = CardId("c4".into());
        let in_hand: Vec<_> = engine.hand().iter().map(|c| c.id().clone()).collect();
        if !in_hand.contains(&absent) {
            assert_eq!(
                engine.play_card(&absent),
                Err(DeckError::CardNotInHand(absent))
            );
        }
        assert_eq!(
            engine.play_card(&CardId("nope".into())),
            Err(DeckError::CardNotInHand(CardId("nope".into())))
        );
    }

    #[test]
    fn discard_hand_empties_the_hand_and_emits_once() {
        let (mut engine, log) = engine_with_log(5, 4);
        engine.draw(4);
        engine.discard_hand();
        assert_eq!(engine.hand().len(), 0);
        assert_eq!(engine.discard_pile().len(), 4);

        // Discarding an empty hand emits nothing.
        engine.discard_hand();
        let discards = log
            .borrow()
            .iter()
            .filter(|e| matches!(e, GameEvent::CardsDiscarded { .. }))
            .count();
        assert_eq!(discards, 1);
    }

    #[test]
    fn refill_tops_up_to_capacity() {
        let (mut engine, log) = engine_with_log(8, 5);
        engine.draw(2);
        let added = engine.refill_hand();
        assert_eq!(added, 3);
        assert_eq!(engine.hand().len(), 5);
        assert_eq!(engine.refill_hand(), 0);
        assert!(log
            .borrow()
            .iter()
            .any(|e| e == &GameEvent::HandRefilled { count: 3 }));
    }

    #[test]
    fn add_card_respects_library_and_bound() {
        let mut engine = engine(3, 6);
        assert_eq!(
            engine.add_card(&CardId("ghost".into())),
            Err(DeckError::UnknownCard(CardId("ghost".into())))
        );
        engine.add_card(&CardId("c0".into())).unwrap();
        assert_eq!(engine.total_cards(), 4);

        let small = GameConfig {
            max_deck_size: 2,
            ..GameConfig::default()
        };
        let mut bounded = DeckEngine::new(library(3), &small, 6, Rc::new(EventBus::new()));
        bounded.initialize(&ids(2)).unwrap();
        assert_eq!(
            bounded.add_card(&CardId("c2".into())),
            Err(DeckError::DeckFull(2))
        );
    }

    #[test]
    fn remove_card_is_a_noop_for_absent_ids() {
        let mut engine = engine(3, 8);
        assert!(engine.remove_card(&CardId("c1".into())));
        assert_eq!(engine.total_cards(), 2);
        assert!(!engine.remove_card(&CardId("c1".into())));
        assert_eq!(engine.total_cards(), 2);
    }

    #[test]
    fn initialize_rejects_unknown_ids() {
        let mut engine = DeckEngine::new(
            library(2),
            &GameConfig::default(),
            0,
            Rc::new(EventBus::new()),
        );
        assert_eq!(
            engine.initialize(&[CardId("c0".into()), CardId("zz".into())]),
            Err(DeckError::UnknownCard(CardId("zz".into())))
        );
    }

    #[test]
    fn scripted_turn_matches_expected_pile_sizes() {
        let mut engine = engine(9, 11);
        engine.draw(5);
        assert_eq!(engine.hand().len(), 5);
        let first = engine.hand()[0].id().clone();
        engine.play_card(&first).unwrap();
        assert_eq!(engine.hand().len(), 4);
        assert_eq!(engine.discard_pile().len(), 1);
        engine.discard_hand();
        assert_eq!(engine.hand().len(), 0);
        assert_eq!(engine.discard_pile().len(), 5);
        assert_eq!(engine.total_cards(), 9);
    }

    proptest! {
        #[test]
        fn no_card_is_lost_or_duplicated(
            n in 1usize..16,
            seed in 0u64..1000,
            ops in proptest::collection::vec(0u8..5, 0..40),
        ) {
            let mut engine = engine(n, seed);
            let full_set = sorted_ids(engine.draw_pile());
            for op in ops {
                match op {
                    0 => { engine.draw(2); }
                    1 => { engine.shuffle(); }
                    2 => {
                        let first = engine.hand().first().map(|c| c.id().clone());
                        if let Some(id) = first {
                            engine.play_card(&id).unwrap();
                        }
                    }
                    3 => { engine.discard_hand(); }
                    _ => { engine.refill_hand(); }
                }
                let mut all = Vec::new();
                all.extend_from_slice(engine.draw_pile());
                all.extend_from_slice(engine.hand());
                all.extend_from_slice(engine.discard_pile());
                prop_assert_eq!(sorted_ids(&all), full_set.clone());
            }
        }

        #[test]
        fn draw_never_exceeds_requested_or_available(
            n in 0usize..12,
            count in 0usize..20,
            seed in 0u64..100,
        ) {
            let mut engine = engine(n, seed);
            let drawn = engine.draw(count);
            prop_assert_eq!(drawn.len(), count.min(n));
            prop_assert_eq!(engine.hand().len(), count.min(n));
        }
    }
}
