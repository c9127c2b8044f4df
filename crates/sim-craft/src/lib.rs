#![deny(warnings)]

//! Crafting resolution: recipe-to-material matching and quality scoring.
//!
//! This crate provides validated pure utilities for:
//! - Greedy requirement matching over an immutable material pool
//! - Averaged, threshold-bucketed output quality
//! - Assembling a crafted item with an injected id generator
//!
//! Nothing here mutates the pool; consuming matched materials is the
//! caller's responsibility.

use serde::{Deserialize, Serialize};
use sim_core::{
    CraftedItem, ItemId, MaterialInstance, MaterialRequirement, MaterialTypeId, QualityGrade,
    RecipeBook, RecipeDefinition, RecipeId,
};
use thiserror::Error;

/// Errors produced by crafting helpers.
#[derive(Debug, Error, PartialEq)]
pub enum CraftError {
    /// The recipe id is not in the book. Contract violation, not a shortfall.
    #[error("unknown recipe id: {0}")]
    UnknownRecipe(RecipeId),
}

/// A requirement the pool could not satisfy, with the quantity still needed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MissingRequirement {
    pub material_type: MaterialTypeId,
    pub quantity: u32,
}

/// Outcome of matching a recipe's requirements against a pool.
///
/// `matched` is filled even when the check fails, so callers can show
/// partial progress.
#[derive(Clone, Debug, PartialEq)]
pub struct RequirementCheck {
    pub can_craft: bool,
    pub matched: Vec<MaterialInstance>,
    pub missing: Vec<MissingRequirement>,
}

/// Outcome of a craft attempt. `item` is present only on success.
#[derive(Clone, Debug, PartialEq)]
pub struct CraftResult {
    pub item: Option<CraftedItem>,
    pub matched: Vec<MaterialInstance>,
    pub missing: Vec<MissingRequirement>,
}

impl CraftResult {
    pub fn is_success(&self) -> bool {
        self.item.is_some()
    }
}

/// Percentage floor for each output grade, walked highest to lowest.
pub const QUALITY_THRESHOLDS: [(QualityGrade, f32); 5] = [
    (QualityGrade::Legendary, 90.0),
    (QualityGrade::Excellent, 70.0),
    (QualityGrade::Fine, 45.0),
    (QualityGrade::Common, 20.0),
    (QualityGrade::Poor, 0.0),
];

/// Match requirements against the pool in recipe order.
///
/// Each requirement scans the pool once, skipping instances already claimed
/// by an earlier requirement of this call, and greedily claims up to
/// `quantity` instances of the right type at or above the minimum quality.
/// An instance is never claimed twice.
pub fn check_requirements(
    required: &[MaterialRequirement],
    available: &[MaterialInstance],
) -> RequirementCheck {
    let mut claimed = vec![false; available.len()];
    let mut matched = Vec::new();
    let mut missing = Vec::new();
    for req in required {
        let mut still_needed = req.quantity;
        for (index, material) in available.iter().enumerate() {
            if still_needed == 0 {
                break;
            }
            if claimed[index] || material.material_type != req.material_type {
                continue;
            }
            if let Some(min) = req.min_quality {
                if material.quality < min {
                    continue;
                }
            }
            claimed[index] = true;
            matched.push(material.clone());
            still_needed -= 1;
        }
        if still_needed > 0 {
            missing.push(MissingRequirement {
                material_type: req.material_type.clone(),
                quantity: still_needed,
            });
        }
    }
    RequirementCheck {
        can_craft: missing.is_empty(),
        matched,
        missing,
    }
}

/// Average the ordinal scores of `grades`, rescale onto 0-100 anchored at
/// the ordinal extremes and bucket the result.
///
/// Example:
/// let q = calculate_quality(&[QualityGrade::Fine, QualityGrade::Excellent]);
/// assert_eq!(q, QualityGrade::Fine); // 62.5% sits in the Fine bucket
pub fn calculate_quality(grades: &[QualityGrade]) -> QualityGrade {
    if grades.is_empty() {
        return QualityGrade::LOWEST;
    }
    let sum: u32 = grades.iter().map(|g| g.score()).sum();
    let average = sum as f32 / grades.len() as f32;
    let span = QualityGrade::HIGHEST.score() as f32 - QualityGrade::LOWEST.score() as f32;
    let percent = (average - QualityGrade::LOWEST.score() as f32) / span * 100.0;
    grade_for_percent(percent)
}

/// The highest grade whose threshold the percentage meets.
pub fn grade_for_percent(percent: f32) -> QualityGrade {
    for (grade, threshold) in QUALITY_THRESHOLDS {
        if percent >= threshold {
            return grade;
        }
    }
    QualityGrade::LOWEST
}

/// Resolve one craft attempt. On failure the result carries the missing
/// requirements and no item; on success a fresh item referencing the
/// recipe's declared output, the computed quality and the matched materials.
///
/// The id generator is injected so resolution stays free of hidden
/// randomness or clocks.
pub fn craft<F>(
    recipe: &RecipeDefinition,
    materials: &[MaterialInstance],
    id_gen: &mut F,
) -> CraftResult
where
    F: FnMut() -> ItemId,
{
    let check = check_requirements(&recipe.required, materials);
    if !check.can_craft {
        return CraftResult {
            item: None,
            matched: check.matched,
            missing: check.missing,
        };
    }
    let grades: Vec<QualityGrade> = check.matched.iter().map(|m| m.quality).collect();
    let quality = calculate_quality(&grades);
    let item = CraftedItem {
        id: id_gen(),
        output: recipe.output.clone(),
        quality,
        recipe: recipe.id.clone(),
        materials: check.matched.iter().map(|m| m.id.clone()).collect(),
    };
    CraftResult {
        item: Some(item),
        matched: check.matched,
        missing: Vec::new(),
    }
}

/// Look a recipe up by id and craft it.
pub fn craft_from_book<F>(
    book: &RecipeBook,
    recipe_id: &RecipeId,
    materials: &[MaterialInstance],
    id_gen: &mut F,
) -> Result<CraftResult, CraftError>
where
    F: FnMut() -> ItemId,
{
    let recipe = book
        .get(recipe_id)
        .ok_or_else(|| CraftError::UnknownRecipe(recipe_id.clone()))?;
    Ok(craft(recipe, materials, id_gen))
}
