#![deny(warnings)]

//! Core domain models and invariants for Atelier Tycoon.
//!
//! This crate defines serializable types used across the simulation with
//! validation helpers to guarantee basic invariants. It carries no mutable
//! machinery of its own; the ledger, deck and crafting engines build on it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Unique identifier for a card template, e.g. "herb_run", "brew_tonic".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(pub String);

/// Unique identifier for a material type, e.g. "silver_herb".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MaterialTypeId(pub String);

/// Unique identifier for a recipe, e.g. "tonic_of_clarity".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub String);

/// Unique identifier for a concrete item instance (material or crafted).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MaterialTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One stage of a day's turn cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Pick up quests from the guild board.
    QuestAccept,
    /// Play gathering cards to collect materials.
    Gathering,
    /// Resolve recipes against the material inventory.
    Alchemy,
    /// Hand finished items over and collect gold/contribution.
    Delivery,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::QuestAccept,
        Phase::Gathering,
        Phase::Alchemy,
        Phase::Delivery,
    ];

    /// The phase that follows this one in the fixed day cycle.
    pub fn next(self) -> Phase {
        match self {
            Phase::QuestAccept => Phase::Gathering,
            Phase::Gathering => Phase::Alchemy,
            Phase::Alchemy => Phase::Delivery,
            Phase::Delivery => Phase::QuestAccept,
        }
    }
}

/// Guild rank held by the atelier. Ordered worst to best.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    Apprentice,
    Journeyman,
    Adept,
    Expert,
    Master,
}

impl Rank {
    /// The next rank up, or `None` at the top of the ladder.
    pub fn next(self) -> Option<Rank> {
        match self {
            Rank::Apprentice => Some(Rank::Journeyman),
            Rank::Journeyman => Some(Rank::Adept),
            Rank::Adept => Some(Rank::Expert),
            Rank::Expert => Some(Rank::Master),
            Rank::Master => None,
        }
    }
}

/// Ordered quality rating applied to materials and crafted items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityGrade {
    Poor,
    Common,
    Fine,
    Excellent,
    Legendary,
}

impl QualityGrade {
    pub const LOWEST: QualityGrade = QualityGrade::Poor;
    pub const HIGHEST: QualityGrade = QualityGrade::Legendary;

    pub const ALL: [QualityGrade; 5] = [
        QualityGrade::Poor,
        QualityGrade::Common,
        QualityGrade::Fine,
        QualityGrade::Excellent,
        QualityGrade::Legendary,
    ];

    /// Ordinal score, 0 for the lowest grade through 4 for the highest.
    pub fn score(self) -> u32 {
        match self {
            QualityGrade::Poor => 0,
            QualityGrade::Common => 1,
            QualityGrade::Fine => 2,
            QualityGrade::Excellent => 3,
            QualityGrade::Legendary => 4,
        }
    }
}

/// Effect carried by an enhancement card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Raise the quality of the next craft by one grade.
    QualityBoost,
    /// Draw additional cards immediately.
    ExtraDraw,
    /// Refund part of the action points spent on the next card.
    ApRefund,
}

/// Kind-specific payload of a card template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CardKind {
    /// A gathering trip; playing it yields materials from this pool.
    Gathering { material_pool: Vec<MaterialTypeId> },
    /// A crafting attempt bound to one recipe.
    Recipe { recipe: RecipeId },
    /// A one-shot modifier.
    Enhancement { effect: EffectKind },
}

/// Immutable master data for one card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardTemplate {
    pub id: CardId,
    /// Display name, e.g. "Herb Run".
    pub name: String,
    /// Action points consumed when the card is played.
    pub cost: u32,
    pub kind: CardKind,
}

/// Registry of card templates keyed by id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CardLibrary {
    templates: BTreeMap<CardId, CardTemplate>,
}

impl CardLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_templates(templates: impl IntoIterator<Item = CardTemplate>) -> Self {
        Self {
            templates: templates.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    pub fn insert(&mut self, template: CardTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn get(&self, id: &CardId) -> Option<&CardTemplate> {
        self.templates.get(id)
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.templates.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// A concrete material in the player's inventory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialInstance {
    pub id: ItemId,
    pub material_type: MaterialTypeId,
    pub quality: QualityGrade,
}

/// One line of a recipe: how many of which material, optionally gated on a
/// minimum quality.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    pub material_type: MaterialTypeId,
    pub quantity: u32,
    pub min_quality: Option<QualityGrade>,
}

/// What a recipe produces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Display name of the crafted item, e.g. "Tonic of Clarity".
    pub name: String,
    /// Gold paid out when the item is delivered.
    pub base_value: u64,
}

/// Immutable master data for one recipe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeDefinition {
    pub id: RecipeId,
    /// Requirements are matched in the order given here.
    pub required: Vec<MaterialRequirement>,
    pub output: OutputSpec,
}

/// Registry of recipes keyed by id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeBook {
    recipes: BTreeMap<RecipeId, RecipeDefinition>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_recipes(recipes: impl IntoIterator<Item = RecipeDefinition>) -> Self {
        Self {
            recipes: recipes.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    pub fn insert(&mut self, recipe: RecipeDefinition) {
        self.recipes.insert(recipe.id.clone(), recipe);
    }

    pub fn get(&self, id: &RecipeId) -> Option<&RecipeDefinition> {
        self.recipes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecipeDefinition> {
        self.recipes.values()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

/// An item produced by a successful craft.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CraftedItem {
    pub id: ItemId,
    /// Copied from the recipe's declared output.
    pub output: OutputSpec,
    pub quality: QualityGrade,
    pub recipe: RecipeId,
    /// Ids of the material instances consumed, for traceability.
    pub materials: Vec<ItemId>,
}

/// Event payloads published on the bus; one plain value per event kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PhaseChanged { previous: Phase, next: Phase },
    DayStarted { day: u32, remaining_days: u32 },
    ContributionAdded { amount: u32, total: u32 },
    RankPromoted { previous: Rank, next: Rank },
    CardsDrawn { cards: Vec<CardId> },
    CardPlayed { card: CardId },
    CardsDiscarded { cards: Vec<CardId> },
    HandRefilled { count: u32 },
}

/// Tunable parameters, passed explicitly to every engine that needs them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Per-day action point budget.
    pub max_action_points: u32,
    /// Length of the scenario in days.
    pub total_days: u32,
    pub starting_gold: u64,
    pub hand_capacity: usize,
    /// Upper bound on the number of cards owned across all piles.
    pub max_deck_size: usize,
    /// Contribution needed to leave each rank, lowest rank first. One entry
    /// per promotion step.
    pub promotion_thresholds: Vec<u32>,
}

impl GameConfig {
    /// Gauge required to be promoted out of `rank`, or `None` at the top.
    pub fn promotion_threshold(&self, rank: Rank) -> Option<u32> {
        rank.next()?;
        self.promotion_thresholds.get(rank as usize).copied()
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_action_points: 3,
            total_days: 30,
            starting_gold: 500,
            hand_capacity: 5,
            max_deck_size: 30,
            promotion_thresholds: vec![100, 250, 450, 700],
        }
    }
}

/// Authoritative mutable game state. Owned by the ledger; everything else
/// reads snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub phase: Phase,
    /// Starts at 1.
    pub day: u32,
    pub remaining_days: u32,
    pub gold: u64,
    /// Never exceeds the configured maximum outside the overflow calculation.
    pub action_points: u32,
    pub rank: Rank,
    pub promotion_gauge: u32,
    /// Fields the core does not interpret (overflow counters, quest-board
    /// snapshots). They round-trip through serialization untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl GameState {
    /// The state a fresh scenario starts from.
    pub fn new(config: &GameConfig) -> Self {
        Self {
            phase: Phase::QuestAccept,
            day: 1,
            remaining_days: config.total_days,
            gold: config.starting_gold,
            action_points: config.max_action_points,
            rank: Rank::Apprentice,
            promotion_gauge: 0,
            extra: BTreeMap::new(),
        }
    }
}

/// Partial state merge used for bulk/test initialization; applied without
/// gameplay-rule checks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_gauge: Option<u32>,
    /// Extension entries are merged key by key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl StatePatch {
    pub fn apply_to(&self, state: &mut GameState) {
        if let Some(phase) = self.phase {
            state.phase = phase;
        }
        if let Some(day) = self.day {
            state.day = day;
        }
        if let Some(remaining_days) = self.remaining_days {
            state.remaining_days = remaining_days;
        }
        if let Some(gold) = self.gold {
            state.gold = gold;
        }
        if let Some(action_points) = self.action_points {
            state.action_points = action_points;
        }
        if let Some(rank) = self.rank {
            state.rank = rank;
        }
        if let Some(promotion_gauge) = self.promotion_gauge {
            state.promotion_gauge = promotion_gauge;
        }
        for (key, value) in &self.extra {
            state.extra.insert(key.clone(), value.clone());
        }
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Day counters start at 1.
    #[error("day must be >= 1")]
    DayZero,
    /// Action points must stay within the configured budget.
    #[error("action points {0} exceed the configured maximum {1}")]
    ActionPointsOverMax(u32, u32),
    /// A configuration bound was zero.
    #[error("{0} must be >= 1")]
    ZeroBound(&'static str),
    /// Number of promotion thresholds must cover every promotion step.
    #[error("expected {expected} promotion thresholds, got {got}")]
    ThresholdCount { expected: usize, got: usize },
    /// Recipes need at least one requirement.
    #[error("recipe {0} has no requirements")]
    EmptyRecipe(RecipeId),
    /// Requirement quantities are at least 1.
    #[error("recipe {0} requires zero of {1}")]
    ZeroQuantity(RecipeId, MaterialTypeId),
}

/// Validate configuration bounds.
pub fn validate_config(config: &GameConfig) -> Result<(), ValidationError> {
    if config.max_action_points == 0 {
        return Err(ValidationError::ZeroBound("max_action_points"));
    }
    if config.hand_capacity == 0 {
        return Err(ValidationError::ZeroBound("hand_capacity"));
    }
    if config.max_deck_size == 0 {
        return Err(ValidationError::ZeroBound("max_deck_size"));
    }
    let expected = Rank::Master as usize;
    if config.promotion_thresholds.len() != expected {
        return Err(ValidationError::ThresholdCount {
            expected,
            got: config.promotion_thresholds.len(),
        });
    }
    if config.promotion_thresholds.iter().any(|&t| t == 0) {
        return Err(ValidationError::ZeroBound("promotion_thresholds"));
    }
    Ok(())
}

/// Validate a state value against the configuration it runs under.
pub fn validate_state(state: &GameState, config: &GameConfig) -> Result<(), ValidationError> {
    if state.day == 0 {
        return Err(ValidationError::DayZero);
    }
    if state.action_points > config.max_action_points {
        return Err(ValidationError::ActionPointsOverMax(
            state.action_points,
            config.max_action_points,
        ));
    }
    Ok(())
}

/// Validate a recipe definition.
pub fn validate_recipe(recipe: &RecipeDefinition) -> Result<(), ValidationError> {
    if recipe.required.is_empty() {
        return Err(ValidationError::EmptyRecipe(recipe.id.clone()));
    }
    for req in &recipe.required {
        if req.quantity == 0 {
            return Err(ValidationError::ZeroQuantity(
                recipe.id.clone(),
                req.material_type.clone(),
            ));
        }
    }
    Ok(())
}

/// Validate every recipe in a book.
pub fn validate_book(book: &RecipeBook) -> Result<(), ValidationError> {
    for recipe in book.iter() {
        validate_recipe(recipe)?;
    }
    Ok(())
}
