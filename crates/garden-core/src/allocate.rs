//! Rule-based crop recommendation and greedy first-fit space allocation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crops::CropCatalog;
use crate::existing::ExistingCrop;

/// Calorie goal above which carb-heavy crops are suggested.
pub const CALORIE_THRESHOLD: f64 = 2000.0;

/// Volume goal above which high-yield crops are suggested.
pub const VOLUME_THRESHOLD: f64 = 10.0;

/// Phrase in `additional_needs` (case-insensitive) that adds leafy crops.
pub const LEAFY_GREENS_PHRASE: &str = "leafy greens";

pub const CARB_CROPS: [&str; 2] = ["Potatoes", "Corn"];
pub const HIGH_YIELD_CROPS: [&str; 3] = ["Zucchini", "Tomatoes", "Bell Peppers"];
pub const LEAFY_CROPS: [&str; 2] = ["Lettuce", "Kale"];

/// Suggested when none of the goal rules fire.
pub const DEFAULT_CROPS: [&str; 3] = ["Tomatoes", "Carrots", "Onions"];

/// A shelter's goals for one planning run.
///
/// Values are expected to be non-negative; the request layer clamps them
/// before they get here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    pub num_people: u32,
    pub volume_goal: f64,
    pub calorie_goal: f64,
    #[serde(default)]
    pub additional_needs: String,
    pub garden_size: f64,
}

/// Garden area not occupied by existing crops, floored at zero.
pub fn free_space(garden_size: f64, existing: &[ExistingCrop]) -> f64 {
    let occupied: f64 = existing.iter().map(|c| c.area).sum();
    (garden_size - occupied).max(0.0)
}

/// Derive the ordered candidate list from the goal rules.
///
/// Rules are applied in a fixed order and may produce duplicates (a high
/// volume goal always adds Tomatoes, even if a later rule would too).
pub fn candidate_crops(goals: &Goals) -> Vec<String> {
    let mut candidates: Vec<&str> = Vec::new();

    if goals.calorie_goal > CALORIE_THRESHOLD {
        candidates.extend(CARB_CROPS);
    }
    if goals.volume_goal > VOLUME_THRESHOLD {
        candidates.extend(HIGH_YIELD_CROPS);
    }
    if wants_leafy_greens(&goals.additional_needs) {
        candidates.extend(LEAFY_CROPS);
    }
    if candidates.is_empty() {
        candidates.extend(DEFAULT_CROPS);
    }

    candidates.into_iter().map(str::to_string).collect()
}

fn wants_leafy_greens(additional_needs: &str) -> bool {
    additional_needs.to_lowercase().contains(LEAFY_GREENS_PHRASE)
}

/// Greedy first-fit packing.
///
/// Walks `candidates` in order and accepts each crop whose space
/// requirement fits in what is left. A crop that does not fit is skipped
/// for good and does not consume space.
pub fn pack_first_fit<S: AsRef<str>>(
    candidates: &[S],
    free_space: f64,
    catalog: &CropCatalog,
) -> Vec<String> {
    let mut remaining = free_space.max(0.0);
    let mut accepted = Vec::new();

    for crop in candidates {
        let crop = crop.as_ref();
        let needed = catalog.space_for(crop);
        if needed <= remaining {
            remaining -= needed;
            accepted.push(crop.to_string());
        } else {
            debug!(crop, needed, remaining, "crop does not fit, skipping");
        }
    }

    accepted
}

/// Recommend crops for the given goals using the built-in catalog.
pub fn recommend_crops(goals: &Goals, free_space: f64) -> Vec<String> {
    recommend_crops_with(goals, free_space, CropCatalog::builtin())
}

/// Recommend crops for the given goals against an explicit catalog.
pub fn recommend_crops_with(goals: &Goals, free_space: f64, catalog: &CropCatalog) -> Vec<String> {
    let candidates = candidate_crops(goals);
    pack_first_fit(&candidates, free_space, catalog)
}
