//! Model-assisted crop selection.
//!
//! Instead of the goal rules and space packing in [`crate::allocate`], every
//! crop in a fixed pool is scored by a [`YieldModel`], the best
//! [`TOP_K`] are kept, and crops the shelter explicitly asked for are added
//! on top. There is no space check in this mode.

use std::cmp::Ordering;

use tracing::debug;

use crate::allocate::{Goals, LEAFY_CROPS};
use crate::crops::CropCatalog;
use crate::ml::{YieldContext, YieldModel};

/// Number of top-scoring crops kept.
pub const TOP_K: usize = 3;

/// Keyword in `additional_needs` (case-insensitive) that forces leafy crops
/// into the selection.
pub const LEAFY_KEYWORD: &str = "leafy";

/// Rank the built-in catalog by predicted yield.
pub fn rank_by_predicted_yield(
    goals: &Goals,
    model: &YieldModel,
    context: &YieldContext,
) -> Vec<String> {
    let pool: Vec<&str> = CropCatalog::builtin().names().collect();
    rank_candidates(&pool, goals, model, context)
}

/// Rank `pool` by predicted yield, keep the top [`TOP_K`], then append any
/// keyword-requested crops that are not already selected.
///
/// Sorting is stable: crops with equal scores keep their pool order, so an
/// unavailable model selects the first three crops of the pool.
pub fn rank_candidates<S: AsRef<str>>(
    pool: &[S],
    goals: &Goals,
    model: &YieldModel,
    context: &YieldContext,
) -> Vec<String> {
    let mut scored: Vec<(&str, f64)> = pool
        .iter()
        .map(|crop| {
            let crop = crop.as_ref();
            let score = model.score(context, crop, goals.volume_goal);
            // NaN sorts last.
            let score = if score.is_nan() { f64::NEG_INFINITY } else { score };
            (crop, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    debug!(?scored, "predicted yields");

    let mut selected: Vec<String> = scored
        .into_iter()
        .take(TOP_K)
        .map(|(crop, _)| crop.to_string())
        .collect();

    for crop in keyword_crops(&goals.additional_needs) {
        if !selected.iter().any(|s| s == crop) {
            selected.push(crop.to_string());
        }
    }

    selected
}

fn keyword_crops(additional_needs: &str) -> Vec<&'static str> {
    if additional_needs.to_lowercase().contains(LEAFY_KEYWORD) {
        LEAFY_CROPS.to_vec()
    } else {
        Vec::new()
    }
}
